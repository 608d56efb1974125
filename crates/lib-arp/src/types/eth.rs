use netbuf::{BufferError, Endianness, ReadBuffer, Readable, WriteBuffer, Writeable};

use crate::{constants::ETHERTYPE_ARP, types::HardwareAddr};

/// The 14-byte Ethernet frame header.
#[derive(Debug, Clone, Copy)]
pub struct EthernetHeader {
    pub destination: HardwareAddr,
    pub source: HardwareAddr,
    pub ethertype: u16,
}

impl EthernetHeader {
    pub fn arp(destination: HardwareAddr, source: HardwareAddr) -> Self {
        Self {
            destination,
            source,
            ethertype: ETHERTYPE_ARP,
        }
    }
}

impl Readable for EthernetHeader {
    type Error = BufferError;

    fn read<E: Endianness>(buf: &mut ReadBuffer) -> Result<Self, Self::Error> {
        let destination = HardwareAddr::read::<E>(buf)?;
        let source = HardwareAddr::read::<E>(buf)?;
        let ethertype = u16::read::<E>(buf)?;

        Ok(Self {
            destination,
            source,
            ethertype,
        })
    }
}

impl Writeable for EthernetHeader {
    type Error = BufferError;

    fn write<E: Endianness>(&self, buf: &mut WriteBuffer) -> Result<usize, Self::Error> {
        let mut n = 0;

        n += self.destination.write::<E>(buf)?;
        n += self.source.write::<E>(buf)?;
        n += self.ethertype.write::<E>(buf)?;

        Ok(n)
    }
}
