use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatermarkError {
    #[error("Input not found: {0}")]
    NotFound(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid method: {0}")]
    InvalidMethod(String),

    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("Encode error: {0}")]
    EncodeError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Generates factory methods for [`WatermarkError`] variants that wrap a `String`.
macro_rules! error_constructors {
    ($(
        $(#[doc = $doc:expr])*
        $method:ident => $variant:ident
    ),* $(,)?) => {
        impl WatermarkError {
            $(
                $(#[doc = $doc])*
                pub fn $method(msg: impl Into<String>) -> Self {
                    Self::$variant(msg.into())
                }
            )*
        }
    };
}

error_constructors! {
    /// Create a not-found error.
    not_found => NotFound,
    /// Create an unsupported-format error.
    unsupported_format => UnsupportedFormat,
    /// Create an invalid-method error.
    invalid_method => InvalidMethod,
    /// Create a decode error.
    decode => DecodeError,
    /// Create an encode error.
    encode => EncodeError,
    /// Create a configuration error.
    config => ConfigError,
}

impl From<lopdf::Error> for WatermarkError {
    fn from(e: lopdf::Error) -> Self {
        Self::DecodeError(e.to_string())
    }
}

impl From<image::ImageError> for WatermarkError {
    fn from(e: image::ImageError) -> Self {
        Self::DecodeError(e.to_string())
    }
}

impl From<zip::result::ZipError> for WatermarkError {
    fn from(e: zip::result::ZipError) -> Self {
        Self::DecodeError(e.to_string())
    }
}

impl From<serde_yml::Error> for WatermarkError {
    fn from(e: serde_yml::Error) -> Self {
        Self::ConfigError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, WatermarkError>;
