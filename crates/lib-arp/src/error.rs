use netbuf::BufferError;
use thiserror::Error;

/// Ways an inbound frame or control-plane message can fail to decode.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Buffer error: {0}")]
    Buffer(#[from] BufferError),

    #[error("Invalid or unsupported hardware type: {0}")]
    UnsupportedHardwareType(u16),

    #[error("Invalid or unsupported protocol type: {0:#06x}")]
    UnsupportedProtocolType(u16),

    #[error("Unsupported address lengths: hardware {hardware}, protocol {protocol}")]
    UnsupportedAddressLength { hardware: u8, protocol: u8 },

    #[error("Invalid opcode ({0})")]
    InvalidOpcode(u16),

    #[error("Unknown command type ({0})")]
    UnknownCommandType(u16),

    #[error("Interface name too long: {0}")]
    IfnameTooLong(String),

    #[error("Interface name is not valid UTF-8")]
    IfnameNotUtf8,
}
