use thiserror::Error;

/// Failures raised by the rate source and the observation log.
#[derive(Error, Debug)]
pub enum FxError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Log I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<csv::Error> for FxError {
    fn from(err: csv::Error) -> Self {
        match err.into_kind() {
            csv::ErrorKind::Io(io) => FxError::Io(io),
            other => FxError::Io(std::io::Error::other(format!("{other:?}"))),
        }
    }
}

pub type Result<T> = std::result::Result<T, FxError>;
