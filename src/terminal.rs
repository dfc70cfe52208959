use terminal_size::{terminal_size, Height, Width};

use crate::error::Result;
use crate::options::GenerationOptions;
use crate::qr::ModuleMatrix;

const FALLBACK_TERMINAL: (usize, usize) = (120, 60);

fn terminal_dimensions() -> (usize, usize) {
    terminal_size()
        .map(|(Width(w), Height(h))| {
            if w < 40 || h < 30 {
                FALLBACK_TERMINAL
            } else {
                (w as usize, h as usize)
            }
        })
        .unwrap_or(FALLBACK_TERMINAL)
}

/// Renders `options.content` with half-block characters, two module rows per
/// text line, centered in the current terminal. Colors are left to the
/// terminal: dark modules are drawn, light ones are blank.
pub fn render_to_terminal(options: &GenerationOptions) -> Result<String> {
    let matrix = ModuleMatrix::encode(&options.content, options.error_correction)?;
    let (term_width, term_height) = terminal_dimensions();
    Ok(render_matrix(&matrix, options.margin, term_width, term_height))
}

/// Whether the rendering fits, leaving room for a few lines of header and footer.
pub fn fits_in_terminal(options: &GenerationOptions) -> Result<bool> {
    let matrix = ModuleMatrix::encode(&options.content, options.error_correction)?;
    let (term_width, term_height) = terminal_dimensions();

    let side = (matrix.width() + 2 * options.margin) as usize;
    Ok(side <= term_width && side.div_ceil(2) + 6 <= term_height)
}

fn render_matrix(matrix: &ModuleMatrix, margin: u32, term_width: usize, term_height: usize) -> String {
    let side = matrix.width() + 2 * margin;
    let display_width = side as usize;
    let display_height = (side as usize).div_ceil(2);

    let pad_left = term_width.saturating_sub(display_width) / 2;
    let pad_top = term_height.saturating_sub(display_height + 8) / 2;
    let left_pad = " ".repeat(pad_left);

    // Quiet zone is never dark.
    let is_dark = |row: u32, col: u32| -> bool {
        match (row.checked_sub(margin), col.checked_sub(margin)) {
            (Some(y), Some(x)) => matrix.is_dark(x, y),
            _ => false,
        }
    };

    let mut result = "\n".repeat(pad_top);
    for pair in 0..(side.div_ceil(2)) {
        let top_row = pair * 2;
        let bottom_row = top_row + 1;

        result.push_str(&left_pad);
        for col in 0..side {
            let top_dark = is_dark(top_row, col);
            let bottom_dark = bottom_row < side && is_dark(bottom_row, col);

            let ch = match (top_dark, bottom_dark) {
                (true, true) => '█',
                (true, false) => '▀',
                (false, true) => '▄',
                (false, false) => ' ',
            };
            result.push(ch);
        }
        result.push('\n');
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ErrorCorrection;

    #[test]
    fn test_render_matrix_shape() {
        let matrix = ModuleMatrix::encode("terminal", ErrorCorrection::M).unwrap();
        let side = (matrix.width() + 2 * 2) as usize;
        let rendered = render_matrix(&matrix, 2, side, 0);

        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), side.div_ceil(2));
        for line in &lines {
            assert_eq!(line.chars().count(), side);
        }
        assert!(rendered.contains('█'));
        // Top row is quiet zone.
        assert!(lines[0].chars().all(|c| c == ' '));
    }

    #[test]
    fn test_zero_margin_starts_with_finder() {
        let matrix = ModuleMatrix::encode("terminal", ErrorCorrection::M).unwrap();
        let rendered = render_matrix(&matrix, 0, 0, 0);
        assert!(rendered.starts_with('█'));
    }

    #[test]
    fn test_render_to_terminal_rejects_empty_content() {
        assert!(render_to_terminal(&GenerationOptions::default()).is_err());
    }
}
