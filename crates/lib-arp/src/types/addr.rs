use std::{fmt::Display, str::FromStr};

use netbuf::{BufferError, Endianness, ReadBuffer, Readable, WriteBuffer, Writeable};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseHardwareAddrError {
    #[error("Expected 6 colon-separated octets")]
    WrongSegmentCount,

    #[error("Invalid hex octet: {0}")]
    InvalidOctet(String),
}

/// A 6-byte Ethernet hardware address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HardwareAddr([u8; 6]);

impl HardwareAddr {
    /// The all-ones broadcast address.
    pub const BROADCAST: Self = Self([0xff; 6]);

    /// The all-zero placeholder a request carries as its target.
    pub const ZERO: Self = Self([0; 6]);

    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }
}

impl Display for HardwareAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let o = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            o[0], o[1], o[2], o[3], o[4], o[5]
        )
    }
}

impl FromStr for HardwareAddr {
    type Err = ParseHardwareAddrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut octets = [0u8; 6];
        let mut segments = s.split(':');

        for slot in octets.iter_mut() {
            let segment = segments
                .next()
                .ok_or(ParseHardwareAddrError::WrongSegmentCount)?;
            *slot = u8::from_str_radix(segment, 16)
                .map_err(|_| ParseHardwareAddrError::InvalidOctet(segment.to_string()))?;
        }

        if segments.next().is_some() {
            return Err(ParseHardwareAddrError::WrongSegmentCount);
        }

        Ok(Self(octets))
    }
}

impl Readable for HardwareAddr {
    type Error = BufferError;

    fn read<E: Endianness>(buf: &mut ReadBuffer) -> Result<Self, Self::Error> {
        let b = buf.read_slice(6)?;
        Ok(Self(b.try_into().unwrap()))
    }
}

impl Writeable for HardwareAddr {
    type Error = BufferError;

    fn write<E: Endianness>(&self, buf: &mut WriteBuffer) -> Result<usize, Self::Error> {
        buf.write_slice(&self.0);
        Ok(6)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display_round_trip() {
        let addr: HardwareAddr = "aa:bb:cc:dd:ee:01".parse().unwrap();

        assert_eq!(addr.octets(), [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0x01]);
        assert_eq!(addr.to_string(), "aa:bb:cc:dd:ee:01");
    }

    #[test]
    fn rejects_wrong_segment_counts() {
        assert!("aa:bb:cc:dd:ee".parse::<HardwareAddr>().is_err());
        assert!("aa:bb:cc:dd:ee:01:02".parse::<HardwareAddr>().is_err());
    }

    #[test]
    fn rejects_non_hex_octets() {
        assert!("aa:bb:cc:dd:ee:zz".parse::<HardwareAddr>().is_err());
    }
}
