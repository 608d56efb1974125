use std::{fmt::Display, net::Ipv4Addr};

use netbuf::{bytes_written, BufferError, Endianness, ReadBuffer, Readable, WriteBuffer, Writeable};

use crate::{constants::MAX_IFNAME_LEN, error::DecodeError, types::HardwareAddr};

/// Control-plane command and response type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandType {
    Show,
    Resolve,
    Add,
    Delete,
    Ttl,
    /// Response-only: a delete found nothing to remove.
    DeleteNotFound,
    IfShow,
    IfConfig,
    IfMtu,
}

impl CommandType {
    pub fn code(&self) -> u16 {
        match self {
            Self::Show => 1,
            Self::Resolve => 2,
            Self::Add => 3,
            Self::Delete => 4,
            Self::Ttl => 5,
            Self::DeleteNotFound => 6,
            Self::IfShow => 7,
            Self::IfConfig => 8,
            Self::IfMtu => 9,
        }
    }
}

impl TryFrom<u16> for CommandType {
    type Error = DecodeError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Show),
            2 => Ok(Self::Resolve),
            3 => Ok(Self::Add),
            4 => Ok(Self::Delete),
            5 => Ok(Self::Ttl),
            6 => Ok(Self::DeleteNotFound),
            7 => Ok(Self::IfShow),
            8 => Ok(Self::IfConfig),
            9 => Ok(Self::IfMtu),
            _ => Err(DecodeError::UnknownCommandType(value)),
        }
    }
}

impl Display for CommandType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Show => "show",
            Self::Resolve => "res",
            Self::Add => "add",
            Self::Delete => "del",
            Self::Ttl => "ttl",
            Self::DeleteNotFound => "del-not-found",
            Self::IfShow => "if-show",
            Self::IfConfig => "if-config",
            Self::IfMtu => "if-mtu",
        };
        write!(f, "{name}")
    }
}

/// The fixed 18-byte header every client request starts with. Commands
/// that do not use a field leave it zeroed; the hardware address travels
/// in an 8-byte slot of which only the first 6 bytes are meaningful.
#[derive(Debug, Clone, Copy)]
pub struct Command {
    pub kind: CommandType,
    pub ip: Ipv4Addr,
    pub mac: HardwareAddr,
    pub ttl: u32,
}

impl Command {
    pub const WIRE_LEN: usize = 18;

    pub fn new(kind: CommandType) -> Self {
        Self {
            kind,
            ip: Ipv4Addr::UNSPECIFIED,
            mac: HardwareAddr::ZERO,
            ttl: 0,
        }
    }

    pub fn show() -> Self {
        Self::new(CommandType::Show)
    }

    pub fn resolve(ip: Ipv4Addr) -> Self {
        Self {
            ip,
            ..Self::new(CommandType::Resolve)
        }
    }

    pub fn add(ip: Ipv4Addr, mac: HardwareAddr, ttl: u32) -> Self {
        Self {
            ip,
            mac,
            ttl,
            ..Self::new(CommandType::Add)
        }
    }

    pub fn delete(ip: Ipv4Addr) -> Self {
        Self {
            ip,
            ..Self::new(CommandType::Delete)
        }
    }

    pub fn default_ttl(ttl: u32) -> Self {
        Self {
            ttl,
            ..Self::new(CommandType::Ttl)
        }
    }

    pub fn if_show() -> Self {
        Self::new(CommandType::IfShow)
    }
}

impl Readable for Command {
    type Error = DecodeError;

    fn read<E: Endianness>(buf: &mut ReadBuffer) -> Result<Self, Self::Error> {
        let kind = CommandType::try_from(u16::read::<E>(buf)?)?;
        let ip = Ipv4Addr::read::<E>(buf)?;

        let eth = buf.read_slice(8)?;
        let mac = HardwareAddr::new(eth[..6].try_into().unwrap());

        let ttl = u32::read::<E>(buf)?;

        Ok(Self { kind, ip, mac, ttl })
    }
}

impl Writeable for Command {
    type Error = BufferError;

    fn write<E: Endianness>(&self, buf: &mut WriteBuffer) -> Result<usize, Self::Error> {
        let n = bytes_written! {
            self.kind.code().write::<E>(buf)?;
            self.ip.write::<E>(buf)?
        };

        buf.write_slice(&self.mac.octets());
        buf.write_slice(&[0u8; 2]);

        Ok(n + 8 + self.ttl.write::<E>(buf)?)
    }
}

/// The trailing segment an IF_CONFIG or IF_MTU command carries after the
/// command header: a NUL-padded interface name and the new settings.
/// `value` is the address for IF_CONFIG and the MTU for IF_MTU; `length`
/// is reserved and always written 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigHeader {
    pub ifname: String,
    pub value: u32,
    pub mask: u32,
    pub length: u32,
}

impl ConfigHeader {
    pub const WIRE_LEN: usize = MAX_IFNAME_LEN + 12;

    pub fn addr(ifname: String, ip: Ipv4Addr, mask: Ipv4Addr) -> Self {
        Self {
            ifname,
            value: u32::from(ip),
            mask: u32::from(mask),
            length: 0,
        }
    }

    pub fn mtu(ifname: String, mtu: u32) -> Self {
        Self {
            ifname,
            value: mtu,
            mask: 0,
            length: 0,
        }
    }
}

impl Readable for ConfigHeader {
    type Error = DecodeError;

    fn read<E: Endianness>(buf: &mut ReadBuffer) -> Result<Self, Self::Error> {
        let ifname = read_ifname(buf)?;
        let value = u32::read::<E>(buf)?;
        let mask = u32::read::<E>(buf)?;
        let length = u32::read::<E>(buf)?;

        Ok(Self {
            ifname,
            value,
            mask,
            length,
        })
    }
}

impl Writeable for ConfigHeader {
    type Error = DecodeError;

    fn write<E: Endianness>(&self, buf: &mut WriteBuffer) -> Result<usize, Self::Error> {
        write_ifname(&self.ifname, buf)?;

        let n = bytes_written! {
            self.value.write::<E>(buf)?;
            self.mask.write::<E>(buf)?;
            self.length.write::<E>(buf)?
        };

        Ok(MAX_IFNAME_LEN + n)
    }
}

/// Read the fixed-size NUL-padded interface name field.
pub(super) fn read_ifname(buf: &mut ReadBuffer) -> Result<String, DecodeError> {
    let raw = buf.read_slice(MAX_IFNAME_LEN)?;
    let end = raw.iter().position(|b| *b == 0).unwrap_or(MAX_IFNAME_LEN);

    match std::str::from_utf8(&raw[..end]) {
        Ok(name) => Ok(name.to_string()),
        Err(_) => Err(DecodeError::IfnameNotUtf8),
    }
}

/// Write `name` into the fixed-size field, NUL-padded. The terminator must
/// fit, so the longest accepted name is one byte shorter than the field.
pub(super) fn write_ifname(name: &str, buf: &mut WriteBuffer) -> Result<usize, DecodeError> {
    if name.len() >= MAX_IFNAME_LEN {
        return Err(DecodeError::IfnameTooLong(name.to_string()));
    }

    let mut field = [0u8; MAX_IFNAME_LEN];
    field[..name.len()].copy_from_slice(name.as_bytes());
    buf.write_slice(&field);

    Ok(MAX_IFNAME_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use netbuf::NativeEndian;

    #[test]
    fn command_header_is_eighteen_bytes() {
        let mac: HardwareAddr = "aa:bb:cc:dd:ee:02".parse().unwrap();
        let command = Command::add(Ipv4Addr::new(10, 0, 0, 2), mac, 60);

        let mut out = WriteBuffer::new();
        assert_eq!(
            command.write::<NativeEndian>(&mut out),
            Ok(Command::WIRE_LEN)
        );
        assert_eq!(out.len(), Command::WIRE_LEN);

        // The 8-byte hardware slot carries the MAC plus two zero bytes
        assert_eq!(&out.bytes()[6..12], &mac.octets());
        assert_eq!(&out.bytes()[12..14], &[0, 0]);
    }

    #[test]
    fn command_round_trips() {
        let mac: HardwareAddr = "aa:bb:cc:dd:ee:02".parse().unwrap();
        let command = Command::add(Ipv4Addr::new(10, 0, 0, 2), mac, 60);

        let mut out = WriteBuffer::new();
        command.write::<NativeEndian>(&mut out).unwrap();

        let mut buf = ReadBuffer::new(out.bytes());
        let decoded = Command::read::<NativeEndian>(&mut buf).unwrap();

        assert_eq!(decoded.kind, CommandType::Add);
        assert_eq!(decoded.ip, Ipv4Addr::new(10, 0, 0, 2));
        assert_eq!(decoded.mac, mac);
        assert_eq!(decoded.ttl, 60);
    }

    #[test]
    fn unknown_type_codes_are_reported() {
        let mut out = WriteBuffer::new();
        99u16.write::<NativeEndian>(&mut out).unwrap();
        out.write_slice(&[0u8; 16]);

        let mut buf = ReadBuffer::new(out.bytes());
        assert!(matches!(
            Command::read::<NativeEndian>(&mut buf),
            Err(DecodeError::UnknownCommandType(99))
        ));
    }

    #[test]
    fn config_header_round_trips_with_padding() {
        let config = ConfigHeader::addr(
            "eth0".to_string(),
            Ipv4Addr::new(10, 0, 0, 1),
            Ipv4Addr::new(255, 255, 255, 0),
        );

        let mut out = WriteBuffer::new();
        assert_eq!(
            config.write::<NativeEndian>(&mut out).unwrap(),
            ConfigHeader::WIRE_LEN
        );

        let mut buf = ReadBuffer::new(out.bytes());
        assert_eq!(
            ConfigHeader::read::<NativeEndian>(&mut buf).unwrap(),
            config
        );
    }

    #[test]
    fn overlong_names_are_refused() {
        let config = ConfigHeader::mtu("an-interface-name-far-too-long".to_string(), 1500);

        let mut out = WriteBuffer::new();
        assert!(matches!(
            config.write::<NativeEndian>(&mut out),
            Err(DecodeError::IfnameTooLong(_))
        ));
    }
}
