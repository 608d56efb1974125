use netbuf::{BufferError, Endianness, ReadBuffer, Readable, WriteBuffer, Writeable};

use crate::{
    error::DecodeError,
    types::{Binding, CommandType, IfaceRecord},
};

/// A control-plane response: a type code echoing the command, a payload
/// length, and the payload itself. The code is kept raw so unrecognized
/// command types can be echoed back verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    code: u16,
    payload: Vec<u8>,
}

impl Response {
    pub fn empty(kind: CommandType) -> Self {
        Self {
            code: kind.code(),
            payload: Vec::new(),
        }
    }

    pub fn with_payload(kind: CommandType, payload: Vec<u8>) -> Self {
        Self {
            code: kind.code(),
            payload,
        }
    }

    /// Echo an unrecognized type code back with no payload.
    pub fn unknown(code: u16) -> Self {
        Self {
            code,
            payload: Vec::new(),
        }
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn kind(&self) -> Option<CommandType> {
        CommandType::try_from(self.code).ok()
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Decode the payload as the packed binding records SHOW and RES carry.
    pub fn bindings<E: Endianness>(&self) -> Result<Vec<Binding>, DecodeError> {
        let mut buf = ReadBuffer::new(&self.payload);
        let mut entries = Vec::with_capacity(self.payload.len() / Binding::WIRE_LEN);

        while !buf.is_empty() {
            entries.push(Binding::read::<E>(&mut buf)?);
        }

        Ok(entries)
    }

    /// Decode the payload as the packed interface records IF_SHOW carries.
    pub fn ifaces<E: Endianness>(&self) -> Result<Vec<IfaceRecord>, DecodeError> {
        let mut buf = ReadBuffer::new(&self.payload);
        let mut records = Vec::with_capacity(self.payload.len() / IfaceRecord::WIRE_LEN);

        while !buf.is_empty() {
            records.push(IfaceRecord::read::<E>(&mut buf)?);
        }

        Ok(records)
    }
}

impl Readable for Response {
    type Error = BufferError;

    fn read<E: Endianness>(buf: &mut ReadBuffer) -> Result<Self, Self::Error> {
        let code = u16::read::<E>(buf)?;
        let len = u16::read::<E>(buf)?;
        let payload = buf.read_vec(len as usize)?;

        Ok(Self { code, payload })
    }
}

impl Writeable for Response {
    type Error = BufferError;

    fn write<E: Endianness>(&self, buf: &mut WriteBuffer) -> Result<usize, Self::Error> {
        let mut n = 0;

        n += self.code.write::<E>(buf)?;
        n += (self.payload.len() as u16).write::<E>(buf)?;
        buf.write_slice(&self.payload);

        Ok(n + self.payload.len())
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;
    use crate::types::HardwareAddr;
    use netbuf::NativeEndian;

    #[test]
    fn empty_response_is_four_bytes() {
        let mut out = WriteBuffer::new();
        let n = Response::empty(CommandType::Add)
            .write::<NativeEndian>(&mut out)
            .unwrap();

        assert_eq!(n, 4);
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn payload_round_trips_into_bindings() {
        let mac: HardwareAddr = "aa:bb:cc:dd:ee:02".parse().unwrap();
        let binding = Binding::new(Ipv4Addr::new(10, 0, 0, 2), mac, 60);

        let mut payload = WriteBuffer::new();
        binding.write::<NativeEndian>(&mut payload).unwrap();
        let response = Response::with_payload(CommandType::Show, payload.into_bytes());

        let mut out = WriteBuffer::new();
        response.write::<NativeEndian>(&mut out).unwrap();

        let mut buf = ReadBuffer::new(out.bytes());
        let decoded = Response::read::<NativeEndian>(&mut buf).unwrap();

        assert_eq!(decoded.kind(), Some(CommandType::Show));
        assert_eq!(decoded.bindings::<NativeEndian>().unwrap(), vec![binding]);
    }

    #[test]
    fn unknown_codes_survive_the_round_trip() {
        let mut out = WriteBuffer::new();
        Response::unknown(99).write::<NativeEndian>(&mut out).unwrap();

        let mut buf = ReadBuffer::new(out.bytes());
        let decoded = Response::read::<NativeEndian>(&mut buf).unwrap();

        assert_eq!(decoded.code(), 99);
        assert_eq!(decoded.kind(), None);
        assert!(decoded.payload().is_empty());
    }
}
