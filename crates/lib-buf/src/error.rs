use thiserror::Error;

#[derive(Debug, PartialEq, Eq, Error)]
pub enum BufferError {
    #[error("Buffer too short")]
    BufTooShort,

    #[error("Max buffer length overflow")]
    MaxLengthOverflow,

    #[error("Invalid data")]
    InvalidData,
}
