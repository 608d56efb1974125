use std::fmt::Display;

use netbuf::{Endianness, ReadBuffer, Readable, WriteBuffer, Writeable};

use crate::error::DecodeError;

/// ARP operation. Anything other than these two is dropped on receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Request,
    Reply,
}

impl TryFrom<u16> for Opcode {
    type Error = DecodeError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Request),
            2 => Ok(Self::Reply),
            _ => Err(DecodeError::InvalidOpcode(value)),
        }
    }
}

impl From<Opcode> for u16 {
    fn from(opcode: Opcode) -> Self {
        match opcode {
            Opcode::Request => 1,
            Opcode::Reply => 2,
        }
    }
}

impl Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Opcode::Request => write!(f, "request"),
            Opcode::Reply => write!(f, "reply"),
        }
    }
}

impl Readable for Opcode {
    type Error = DecodeError;

    fn read<E: Endianness>(buf: &mut ReadBuffer) -> Result<Self, Self::Error> {
        Self::try_from(u16::read::<E>(buf)?)
    }
}

impl Writeable for Opcode {
    type Error = DecodeError;

    fn write<E: Endianness>(&self, buf: &mut WriteBuffer) -> Result<usize, Self::Error> {
        Ok(u16::from(*self).write::<E>(buf)?)
    }
}
