use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The content does not fit a QR symbol at the requested error correction level.
    #[error("failed to encode QR code: {0}")]
    Encoding(String),

    #[error("image of {size}px per side exceeds the {max}px limit")]
    TooLarge { size: u64, max: u32 },

    #[error("nothing to encode: content is empty")]
    EmptyContent,

    #[error("invalid {field}: {value:?}")]
    Parse { field: &'static str, value: String },

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn parse(field: &'static str, value: &str) -> Self {
        Error::Parse {
            field,
            value: value.to_string(),
        }
    }
}

impl From<qrcode::types::QrError> for Error {
    fn from(err: qrcode::types::QrError) -> Self {
        Error::Encoding(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
