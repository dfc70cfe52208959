use anyhow::Result;
use clap::{Parser, Subcommand};
use std::num::NonZeroU32;
use std::path::PathBuf;

use qrcraft::{
    export, fits_in_terminal, render_to_terminal, Color, CornerStyle, EmbedRenderer,
    EmbeddedParameters, ErrorCorrection, ExportFormat, ExportRequest, GenerationOptions,
    QrEncoder, RasterSurface, RenderState, SizeClass, Surface,
};

#[derive(Parser)]
#[command(name = "qrcraft")]
#[command(author, version, about = "Generate QR codes as PNG, SVG or JPG", long_about = None)]
struct Cli {
    /// Log what the generator is doing (repeat for more detail)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode text and save it as qrcode.<format>
    Export {
        /// Text or URL to encode
        content: String,

        /// Size class: small (200px), medium (300px) or large (400px)
        #[arg(short, long, default_value = "medium")]
        size: SizeClass,

        /// Module color
        #[arg(long, default_value = "#000000")]
        fg: Color,

        /// Background color
        #[arg(long, default_value = "#ffffff")]
        bg: Color,

        /// Error correction level: L, M, Q or H
        #[arg(short, long, default_value = "M")]
        ecl: ErrorCorrection,

        /// Quiet zone in modules (0-8)
        #[arg(short, long, default_value = "4", value_parser = clap::value_parser!(u32).range(0..=8))]
        margin: u32,

        /// sharp or rounded (accepted, currently has no visual effect)
        #[arg(long, default_value = "sharp")]
        corner_style: CornerStyle,

        /// png, svg or jpg
        #[arg(short, long, default_value = "png")]
        format: ExportFormat,

        /// Multiplier on the size class pixels (defaults: png 3, svg 1, jpg 3)
        #[arg(long)]
        scale: Option<NonZeroU32>,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// Render like the embeddable view, taking the same raw parameters
    Embed {
        #[arg(long, default_value = "")]
        content: String,

        /// "<W>x<H>", each side clamped to 32-2048
        #[arg(long, default_value = "256x256")]
        size: String,

        #[arg(long, default_value = "#000000")]
        fg: String,

        #[arg(long, default_value = "#ffffff")]
        bg: String,

        #[arg(long, default_value = "4")]
        margin: String,

        #[arg(long, default_value = "M")]
        ecl: String,

        /// PNG file to write
        #[arg(short, long, default_value = "qrcode.png")]
        output: PathBuf,
    },

    /// Show the QR code in the terminal
    Preview {
        content: String,

        #[arg(short, long, default_value = "M")]
        ecl: ErrorCorrection,

        #[arg(short, long, default_value = "2", value_parser = clap::value_parser!(u32).range(0..=8))]
        margin: u32,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };
    env_logger::Builder::new().filter_level(level).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Export {
            content,
            size,
            fg,
            bg,
            ecl,
            margin,
            corner_style,
            format,
            scale,
            output,
        } => {
            let options = GenerationOptions {
                content,
                size_class: size,
                foreground: fg,
                background: bg,
                error_correction: ecl,
                corner_style,
                margin,
            };
            let request = match scale {
                Some(scale) => ExportRequest::new(format, scale),
                None => ExportRequest::preset(format),
            };

            match export(&options, &request, &QrEncoder)? {
                Some(artifact) => {
                    let path = artifact.save_in(&output)?;
                    let px = request.effective_pixel_size(&options)?;
                    println!("Saved {} ({}x{} px)", path.display(), px, px);
                }
                None => println!("Nothing to export: content is empty"),
            }
        }

        Commands::Embed {
            content,
            size,
            fg,
            bg,
            margin,
            ecl,
            output,
        } => {
            let params = EmbeddedParameters::from_pairs([
                ("content", content),
                ("size", size),
                ("fg", fg),
                ("bg", bg),
                ("margin", margin),
                ("ecl", ecl),
            ]);

            let mut surface = RasterSurface::default();
            match EmbedRenderer::new(params).render(&QrEncoder, &mut surface) {
                RenderState::Skipped => {
                    println!("Nothing to render: content is empty");
                    return Ok(());
                }
                RenderState::Failed => {
                    println!("Could not encode the content, wrote the error placeholder instead")
                }
                _ => {}
            }

            let (width, height) = surface.dimensions();
            surface.into_image().save(&output)?;
            println!("Saved {} ({}x{} px)", output.display(), width, height);
        }

        Commands::Preview {
            content,
            ecl,
            margin,
        } => {
            let options = GenerationOptions {
                error_correction: ecl,
                margin,
                ..GenerationOptions::with_content(content)
            };

            if !fits_in_terminal(&options)? {
                println!("Warning: the QR code is larger than this terminal and may not scan");
            }
            print!("{}", render_to_terminal(&options)?);
        }
    }

    Ok(())
}
