use std::{fmt::Display, net::Ipv4Addr};

use netbuf::{Endianness, ReadBuffer, Readable, WriteBuffer, Writeable};

use crate::{
    constants::MAX_IFNAME_LEN,
    error::DecodeError,
    types::{
        command::{read_ifname, write_ifname},
        HardwareAddr,
    },
};

/// Packed interface descriptor as IF_SHOW reports it. Field order mirrors
/// the daemon's in-memory descriptor; `sockfd` is meaningless outside the
/// daemon and is written as 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfaceRecord {
    pub sockfd: i32,
    pub ttl: i32,
    pub mtu: i32,
    pub ifname: String,
    pub mac: HardwareAddr,
    pub ip: Ipv4Addr,
    pub rx_pkts: u32,
    pub rx_bytes: u32,
    pub tx_pkts: u32,
    pub tx_bytes: u32,
    pub index: i32,
    pub netmask: Ipv4Addr,
}

impl IfaceRecord {
    /// Size of the packed record: three `i32`s, the name field, the MAC,
    /// then six more 32-bit fields.
    pub const WIRE_LEN: usize = 12 + MAX_IFNAME_LEN + 6 + 24;

    pub fn broadcast(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.ip) | !u32::from(self.netmask))
    }
}

impl Display for IfaceRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "======== {} ========", self.ifname)?;
        writeln!(f, "=>")?;
        writeln!(f, "=>\tLink encap: Ethernet")?;
        writeln!(f, "=>\tMAC Address: {}", self.mac)?;
        writeln!(f, "=>\tInet end: {}", self.ip)?;
        writeln!(f, "=>\tBcast: {}", self.broadcast())?;
        writeln!(f, "=>\tNetmask: {}", self.netmask)?;
        writeln!(f, "=>\tUP MTU: {}", self.mtu)?;
        writeln!(
            f,
            "=>\tRX packets: {} TX packets: {}",
            self.rx_pkts, self.tx_pkts
        )?;
        writeln!(
            f,
            "=>\tRX bytes: {} TX bytes: {}",
            self.rx_bytes, self.tx_bytes
        )?;
        writeln!(f, "=>")?;
        write!(f, "======== {} ========", self.ifname)
    }
}

impl Readable for IfaceRecord {
    type Error = DecodeError;

    fn read<E: Endianness>(buf: &mut ReadBuffer) -> Result<Self, Self::Error> {
        let sockfd = i32::read::<E>(buf)?;
        let ttl = i32::read::<E>(buf)?;
        let mtu = i32::read::<E>(buf)?;
        let ifname = read_ifname(buf)?;
        let mac = HardwareAddr::read::<E>(buf)?;
        let ip = Ipv4Addr::read::<E>(buf)?;
        let rx_pkts = u32::read::<E>(buf)?;
        let rx_bytes = u32::read::<E>(buf)?;
        let tx_pkts = u32::read::<E>(buf)?;
        let tx_bytes = u32::read::<E>(buf)?;
        let index = i32::read::<E>(buf)?;
        let netmask = Ipv4Addr::read::<E>(buf)?;

        Ok(Self {
            sockfd,
            ttl,
            mtu,
            ifname,
            mac,
            ip,
            rx_pkts,
            rx_bytes,
            tx_pkts,
            tx_bytes,
            index,
            netmask,
        })
    }
}

impl Writeable for IfaceRecord {
    type Error = DecodeError;

    fn write<E: Endianness>(&self, buf: &mut WriteBuffer) -> Result<usize, Self::Error> {
        let mut n = 0;

        n += self.sockfd.write::<E>(buf)?;
        n += self.ttl.write::<E>(buf)?;
        n += self.mtu.write::<E>(buf)?;
        n += write_ifname(&self.ifname, buf)?;
        n += self.mac.write::<E>(buf)?;
        n += self.ip.write::<E>(buf)?;
        n += self.rx_pkts.write::<E>(buf)?;
        n += self.rx_bytes.write::<E>(buf)?;
        n += self.tx_pkts.write::<E>(buf)?;
        n += self.tx_bytes.write::<E>(buf)?;
        n += self.index.write::<E>(buf)?;
        n += self.netmask.write::<E>(buf)?;

        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netbuf::NativeEndian;

    fn record() -> IfaceRecord {
        IfaceRecord {
            sockfd: 0,
            ttl: 60,
            mtu: 1500,
            ifname: "eth0".to_string(),
            mac: "aa:bb:cc:dd:ee:01".parse().unwrap(),
            ip: Ipv4Addr::new(10, 0, 0, 1),
            rx_pkts: 3,
            rx_bytes: 180,
            tx_pkts: 1,
            tx_bytes: 42,
            index: 2,
            netmask: Ipv4Addr::new(255, 255, 255, 0),
        }
    }

    #[test]
    fn record_is_seventy_two_bytes() {
        let mut out = WriteBuffer::new();
        let n = record().write::<NativeEndian>(&mut out).unwrap();

        assert_eq!(n, IfaceRecord::WIRE_LEN);
        assert_eq!(out.len(), 72);
    }

    #[test]
    fn record_round_trips() {
        let record = record();

        let mut out = WriteBuffer::new();
        record.write::<NativeEndian>(&mut out).unwrap();

        let mut buf = ReadBuffer::new(out.bytes());
        assert_eq!(IfaceRecord::read::<NativeEndian>(&mut buf).unwrap(), record);
    }

    #[test]
    fn broadcast_is_derived_from_ip_and_mask() {
        assert_eq!(record().broadcast(), Ipv4Addr::new(10, 0, 0, 255));
    }
}
