use std::{fmt::Display, net::Ipv4Addr};

use netbuf::{BufferError, Endianness, ReadBuffer, Readable, WriteBuffer, Writeable};

use crate::{constants::TTL_PERMANENT, types::HardwareAddr};

/// One cache entry: an IPv4 address bound to a hardware address for a
/// number of seconds. A TTL of −1 marks a binding that never expires; the
/// constructor folds every negative TTL onto that sentinel so the rest of
/// the daemon only ever sees −1 or a non-negative count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    pub ip: Ipv4Addr,
    pub mac: HardwareAddr,
    pub ttl: i32,
}

impl Binding {
    /// Size of the packed record SHOW and RES responses carry.
    pub const WIRE_LEN: usize = 14;

    pub fn new(ip: Ipv4Addr, mac: HardwareAddr, ttl: i32) -> Self {
        Self {
            ip,
            mac,
            ttl: if ttl < 0 { TTL_PERMANENT } else { ttl },
        }
    }

    pub fn is_permanent(&self) -> bool {
        self.ttl == TTL_PERMANENT
    }
}

impl Display for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.ip, self.mac, self.ttl)
    }
}

impl Readable for Binding {
    type Error = BufferError;

    fn read<E: Endianness>(buf: &mut ReadBuffer) -> Result<Self, Self::Error> {
        let ip = Ipv4Addr::read::<E>(buf)?;
        // The wire field is unsigned; permanence rides on the sign bit
        let ttl = u32::read::<E>(buf)? as i32;
        let mac = HardwareAddr::read::<E>(buf)?;

        Ok(Self::new(ip, mac, ttl))
    }
}

impl Writeable for Binding {
    type Error = BufferError;

    fn write<E: Endianness>(&self, buf: &mut WriteBuffer) -> Result<usize, Self::Error> {
        let mut n = 0;

        n += self.ip.write::<E>(buf)?;
        n += (self.ttl as u32).write::<E>(buf)?;
        n += self.mac.write::<E>(buf)?;

        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netbuf::NativeEndian;

    fn mac() -> HardwareAddr {
        "aa:bb:cc:dd:ee:02".parse().unwrap()
    }

    #[test]
    fn negative_ttls_become_permanent() {
        let binding = Binding::new(Ipv4Addr::new(10, 0, 0, 2), mac(), -17);

        assert_eq!(binding.ttl, TTL_PERMANENT);
        assert!(binding.is_permanent());
    }

    #[test]
    fn record_is_fourteen_bytes_and_round_trips() {
        let binding = Binding::new(Ipv4Addr::new(10, 0, 0, 2), mac(), 60);

        let mut out = WriteBuffer::new();
        assert_eq!(
            binding.write::<NativeEndian>(&mut out),
            Ok(Binding::WIRE_LEN)
        );

        let mut buf = ReadBuffer::new(out.bytes());
        assert_eq!(Binding::read::<NativeEndian>(&mut buf), Ok(binding));
    }

    #[test]
    fn permanent_ttl_is_all_ones_on_the_wire() {
        let binding = Binding::new(Ipv4Addr::new(10, 0, 0, 2), mac(), TTL_PERMANENT);

        let mut out = WriteBuffer::new();
        binding.write::<NativeEndian>(&mut out).unwrap();

        assert_eq!(&out.bytes()[4..8], &[0xff; 4]);
    }

    #[test]
    fn display_matches_the_cli_rendering() {
        let binding = Binding::new(Ipv4Addr::new(10, 0, 0, 2), mac(), 60);

        assert_eq!(binding.to_string(), "(10.0.0.2, aa:bb:cc:dd:ee:02, 60)");
    }
}
