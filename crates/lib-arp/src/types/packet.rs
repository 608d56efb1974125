use std::net::Ipv4Addr;

use netbuf::{Endianness, ReadBuffer, Readable, ReadableMulti, WriteBuffer, Writeable};

use crate::{
    constants::{ETHERTYPE_IPV4, HARDWARE_ADDR_LEN, HARDWARE_TYPE_ETHERNET, PROTOCOL_ADDR_LEN},
    error::DecodeError,
    types::{HardwareAddr, Opcode},
};

/// An ARP payload in its Ethernet/IPv4 form.
///
/// The fixed prefix advertises the lengths of the four address fields that
/// follow it. Decoding locates the addresses through those lengths, so
/// frames from stacks that disagree on them still parse far enough to be
/// rejected cleanly; only the Ethernet/IPv4 shape (type 1 over 0x0800,
/// 6-byte and 4-byte addresses) is accepted.
#[derive(Debug, Clone, Copy)]
pub struct ArpPacket {
    pub hardware_type: u16,
    pub protocol_type: u16,
    pub hardware_length: u8,
    pub protocol_length: u8,
    pub opcode: Opcode,
    pub sender_hw: HardwareAddr,
    pub sender_proto: Ipv4Addr,
    pub target_hw: HardwareAddr,
    pub target_proto: Ipv4Addr,
}

impl ArpPacket {
    fn new(
        opcode: Opcode,
        sender_hw: HardwareAddr,
        sender_proto: Ipv4Addr,
        target_hw: HardwareAddr,
        target_proto: Ipv4Addr,
    ) -> Self {
        Self {
            hardware_type: HARDWARE_TYPE_ETHERNET,
            protocol_type: ETHERTYPE_IPV4,
            hardware_length: HARDWARE_ADDR_LEN,
            protocol_length: PROTOCOL_ADDR_LEN,
            opcode,
            sender_hw,
            sender_proto,
            target_hw,
            target_proto,
        }
    }

    /// A broadcast-style request: who has `target_proto`?
    pub fn request(sender_hw: HardwareAddr, sender_proto: Ipv4Addr, target_proto: Ipv4Addr) -> Self {
        Self::new(
            Opcode::Request,
            sender_hw,
            sender_proto,
            HardwareAddr::ZERO,
            target_proto,
        )
    }

    /// The answer advertising `sender_proto` at `sender_hw`, addressed to
    /// the asking host.
    pub fn reply(
        sender_hw: HardwareAddr,
        sender_proto: Ipv4Addr,
        target_hw: HardwareAddr,
        target_proto: Ipv4Addr,
    ) -> Self {
        Self::new(Opcode::Reply, sender_hw, sender_proto, target_hw, target_proto)
    }
}

impl Readable for ArpPacket {
    type Error = DecodeError;

    fn read<E: Endianness>(buf: &mut ReadBuffer) -> Result<Self, Self::Error> {
        let hardware_type = u16::read::<E>(buf)?;
        let protocol_type = u16::read::<E>(buf)?;
        let [hardware_length, protocol_length] = u8::read_multi::<E, 2>(buf)?;
        let raw_opcode = u16::read::<E>(buf)?;

        // The address fields sit wherever the advertised lengths put them,
        // so read them out before judging whether the packet is usable.
        let sender_hw = buf.read_vec(hardware_length as usize)?;
        let sender_proto = buf.read_vec(protocol_length as usize)?;
        let target_hw = buf.read_vec(hardware_length as usize)?;
        let target_proto = buf.read_vec(protocol_length as usize)?;

        if hardware_type != HARDWARE_TYPE_ETHERNET {
            return Err(DecodeError::UnsupportedHardwareType(hardware_type));
        }

        if protocol_type != ETHERTYPE_IPV4 {
            return Err(DecodeError::UnsupportedProtocolType(protocol_type));
        }

        if hardware_length != HARDWARE_ADDR_LEN || protocol_length != PROTOCOL_ADDR_LEN {
            return Err(DecodeError::UnsupportedAddressLength {
                hardware: hardware_length,
                protocol: protocol_length,
            });
        }

        let opcode = Opcode::try_from(raw_opcode)?;

        Ok(Self {
            hardware_type,
            protocol_type,
            hardware_length,
            protocol_length,
            opcode,
            sender_hw: HardwareAddr::new(sender_hw.try_into().unwrap()),
            sender_proto: Ipv4Addr::from(<[u8; 4]>::try_from(sender_proto.as_slice()).unwrap()),
            target_hw: HardwareAddr::new(target_hw.try_into().unwrap()),
            target_proto: Ipv4Addr::from(<[u8; 4]>::try_from(target_proto.as_slice()).unwrap()),
        })
    }
}

impl Writeable for ArpPacket {
    type Error = DecodeError;

    fn write<E: Endianness>(&self, buf: &mut WriteBuffer) -> Result<usize, Self::Error> {
        let mut n = 0;

        n += self.hardware_type.write::<E>(buf)?;
        n += self.protocol_type.write::<E>(buf)?;
        n += self.hardware_length.write::<E>(buf)?;
        n += self.protocol_length.write::<E>(buf)?;
        n += self.opcode.write::<E>(buf)?;

        // The addresses are octet strings, not integers; byte order does
        // not apply to them.
        buf.write_slice(&self.sender_hw.octets());
        buf.write_slice(&self.sender_proto.octets());
        buf.write_slice(&self.target_hw.octets());
        buf.write_slice(&self.target_proto.octets());

        Ok(n + 20)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netbuf::BigEndian;

    fn request_bytes() -> Vec<u8> {
        let mut buf = WriteBuffer::new();
        ArpPacket::request(
            HardwareAddr::new([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0x03]),
            Ipv4Addr::new(10, 0, 0, 3),
            Ipv4Addr::new(10, 0, 0, 2),
        )
        .write::<BigEndian>(&mut buf)
        .unwrap();
        buf.into_bytes()
    }

    #[test]
    fn request_layout_is_fixed() {
        let bytes = request_bytes();

        assert_eq!(bytes.len(), 28);
        // hardware type 1, protocol type 0x0800, lengths 6/4, opcode 1
        assert_eq!(&bytes[..8], &[0, 1, 8, 0, 6, 4, 0, 1]);
        assert_eq!(&bytes[8..14], &[0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0x03]);
        assert_eq!(&bytes[14..18], &[10, 0, 0, 3]);
        assert_eq!(&bytes[18..24], &[0; 6]);
        assert_eq!(&bytes[24..28], &[10, 0, 0, 2]);
    }

    #[test]
    fn decode_round_trips() {
        let bytes = request_bytes();
        let mut buf = ReadBuffer::new(&bytes);
        let packet = ArpPacket::read::<BigEndian>(&mut buf).unwrap();

        assert_eq!(packet.opcode, Opcode::Request);
        assert_eq!(
            packet.sender_hw,
            HardwareAddr::new([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0x03])
        );
        assert_eq!(packet.sender_proto, Ipv4Addr::new(10, 0, 0, 3));
        assert_eq!(packet.target_hw, HardwareAddr::ZERO);
        assert_eq!(packet.target_proto, Ipv4Addr::new(10, 0, 0, 2));
    }

    #[test]
    fn rejects_foreign_hardware_types() {
        let mut bytes = request_bytes();
        bytes[1] = 6;

        let mut buf = ReadBuffer::new(&bytes);
        assert!(matches!(
            ArpPacket::read::<BigEndian>(&mut buf),
            Err(DecodeError::UnsupportedHardwareType(6))
        ));
    }

    #[test]
    fn honours_advertised_lengths_before_rejecting() {
        // 8-byte hardware addresses: the frame parses (the addresses are
        // located through hl/pl) but the shape is refused.
        let mut bytes = vec![0, 1, 8, 0, 8, 4, 0, 1];
        bytes.extend_from_slice(&[0x11; 8]);
        bytes.extend_from_slice(&[10, 0, 0, 3]);
        bytes.extend_from_slice(&[0x22; 8]);
        bytes.extend_from_slice(&[10, 0, 0, 2]);

        let mut buf = ReadBuffer::new(&bytes);
        assert!(matches!(
            ArpPacket::read::<BigEndian>(&mut buf),
            Err(DecodeError::UnsupportedAddressLength {
                hardware: 8,
                protocol: 4
            })
        ));
        assert!(buf.is_empty());
    }

    #[test]
    fn rejects_unknown_opcodes() {
        let mut bytes = request_bytes();
        bytes[7] = 3;

        let mut buf = ReadBuffer::new(&bytes);
        assert!(matches!(
            ArpPacket::read::<BigEndian>(&mut buf),
            Err(DecodeError::InvalidOpcode(3))
        ));
    }

    #[test]
    fn truncated_packets_are_errors() {
        let bytes = request_bytes();
        let mut buf = ReadBuffer::new(&bytes[..20]);

        assert!(matches!(
            ArpPacket::read::<BigEndian>(&mut buf),
            Err(DecodeError::Buffer(_))
        ));
    }
}
