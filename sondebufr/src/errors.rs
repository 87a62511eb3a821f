use genlib::FXY;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO Error: {0}")]
    Io(std::io::Error),

    #[error("CSV Error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Table not found: {0}")]
    TableNotFound(#[from] anyhow::Error),

    #[error("Stream is not a BUFR message")]
    NotBufr,

    #[error("Message ends before the data it declares")]
    Truncated,

    #[error("Missing \"7777\" end marker")]
    MissingEndMarker,

    #[error("Sequence descriptor {0} not found in Table D")]
    UnknownSequenceDescriptor(FXY),

    #[error("Element descriptor {0} not found in Table B")]
    UnknownElementDescriptor(FXY),

    #[error("Nested replication at {0} is not supported")]
    UnsupportedNestedReplication(FXY),

    #[error("2-03-255 with an empty reference stack")]
    OperatorStackUnderflow,

    #[error("Unsupported operator {0}")]
    UnsupportedOperator(FXY),

    #[error("Compressed messages are not supported")]
    UnsupportedCompression,

    #[error("Unsupported BUFR version: {0}")]
    UnsupportedVersion(u8),

    #[error("Invalid timestamp in section 1: {0}")]
    InvalidTimestamp(String),

    #[error("Parse Error: {0}")]
    ParseError(String),
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        match value.kind() {
            std::io::ErrorKind::UnexpectedEof => Self::Truncated,
            _ => Self::Io(value),
        }
    }
}

impl<'a> From<nom::Err<nom::error::Error<&'a [u8]>>> for Error {
    fn from(value: nom::Err<nom::error::Error<&'a [u8]>>) -> Self {
        match value {
            nom::Err::Incomplete(_) => Self::Truncated,
            nom::Err::Error(e) | nom::Err::Failure(e) => match e.code {
                nom::error::ErrorKind::Eof => Self::Truncated,
                code => Self::ParseError(format!("{:?} at {} remaining bytes", code, e.input.len())),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
