use std::{io, net::Ipv4Addr, sync::Arc};

use netbuf::{BigEndian, ReadBuffer, Readable, WriteBuffer, Writeable};
use thiserror::Error;
use tracing::{debug, error, trace, warn};

use crate::{
    cache::ArpCache,
    constants::{ETHERTYPE_ARP, READ_BUFFER_SIZE},
    error::DecodeError,
    iface::Iface,
    registry::same_subnet,
    types::{ArpPacket, Binding, EthernetHeader, HardwareAddr, Opcode},
};

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Failed to encode frame: {0}")]
    Encode(#[from] DecodeError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// What the receive path decided to do with one frame.
enum Disposition {
    /// Not ARP, or ARP we have nothing to say to.
    Ignore,
    /// A reply taught us the sender's binding.
    Learned,
    /// A request we can answer: the frame to put on the wire and the MAC
    /// it goes to.
    Answer { frame: Vec<u8>, dest: HardwareAddr },
}

/// One task per owned interface: reads every frame off the raw socket,
/// answers requests for addresses the cache knows, learns from replies,
/// and originates requests when the control plane asks it to resolve.
pub struct InterfaceWorker {
    iface: Iface,
    cache: Arc<ArpCache>,
}

impl InterfaceWorker {
    pub fn new(iface: Iface, cache: Arc<ArpCache>) -> Self {
        Self { iface, cache }
    }

    pub fn iface(&self) -> &Iface {
        &self.iface
    }

    /// Whether `ip` falls inside this interface's subnet.
    pub fn covers(&self, ip: Ipv4Addr) -> bool {
        same_subnet(self.iface.ip(), ip, self.iface.netmask())
    }

    /// The reader: blocks on the socket and processes frames until a send
    /// fails. Receive and decode problems are logged and skipped; a failed
    /// send means the socket is gone and the worker with it.
    pub async fn run(self: Arc<Self>) {
        let mut buf = [0u8; READ_BUFFER_SIZE];

        loop {
            let len = match self.iface.recv(&mut buf).await {
                Ok(len) => len,
                Err(err) => {
                    warn!(interface = self.iface.name(), %err, "receive failed");
                    continue;
                }
            };

            match frame_disposition(&buf[..len], &self.cache) {
                Ok(Disposition::Ignore | Disposition::Learned) => {}
                Ok(Disposition::Answer { frame, dest }) => {
                    if let Err(err) = self.iface.send_to(&frame, dest).await {
                        error!(
                            interface = self.iface.name(),
                            %err,
                            "send failed, stopping reader"
                        );
                        return;
                    }
                }
                Err(err) => {
                    trace!(interface = self.iface.name(), %err, "dropped frame");
                }
            }
        }
    }

    /// Broadcast a request for `ip` and return without waiting. The
    /// answer, if one comes, arrives on the reader and lands in the cache.
    pub async fn resolve_ip(&self, ip: Ipv4Addr) -> Result<(), WorkerError> {
        debug!(interface = self.iface.name(), %ip, "resolving");

        let frame = build_request(self.iface.mac(), self.iface.ip(), ip)?;
        self.iface
            .send_to(&frame, HardwareAddr::BROADCAST)
            .await?;

        Ok(())
    }
}

/// Decode one raw frame and decide what to do about it. Learning happens
/// here; answering is left to the caller, which owns the socket.
fn frame_disposition(frame: &[u8], cache: &ArpCache) -> Result<Disposition, DecodeError> {
    let mut buf = ReadBuffer::new(frame);

    let eth = EthernetHeader::read::<BigEndian>(&mut buf)?;
    if eth.ethertype != ETHERTYPE_ARP {
        return Ok(Disposition::Ignore);
    }

    let packet = ArpPacket::read::<BigEndian>(&mut buf)?;

    match packet.opcode {
        Opcode::Request => {
            trace!(target = %packet.target_proto, "request seen");

            match cache.find_by_ip(packet.target_proto) {
                Some(entry) => Ok(Disposition::Answer {
                    frame: build_reply(&packet, &entry)?,
                    dest: packet.sender_hw,
                }),
                None => Ok(Disposition::Ignore),
            }
        }
        Opcode::Reply => {
            trace!(sender = %packet.sender_proto, "reply seen");

            cache.learn(packet.sender_proto, packet.sender_hw);
            Ok(Disposition::Learned)
        }
    }
}

/// The full Ethernet frame answering `request` on behalf of `entry`. Both
/// the Ethernet source and the advertised hardware address are the cached
/// MAC, not this interface's own.
fn build_reply(request: &ArpPacket, entry: &Binding) -> Result<Vec<u8>, DecodeError> {
    let reply = ArpPacket::reply(
        entry.mac,
        entry.ip,
        request.sender_hw,
        request.sender_proto,
    );
    compose(EthernetHeader::arp(request.sender_hw, entry.mac), reply)
}

/// The full broadcast frame asking for `target`.
fn build_request(
    mac: HardwareAddr,
    ip: Ipv4Addr,
    target: Ipv4Addr,
) -> Result<Vec<u8>, DecodeError> {
    let request = ArpPacket::request(mac, ip, target);
    compose(EthernetHeader::arp(HardwareAddr::BROADCAST, mac), request)
}

fn compose(eth: EthernetHeader, packet: ArpPacket) -> Result<Vec<u8>, DecodeError> {
    let mut buf = WriteBuffer::new();
    eth.write::<BigEndian>(&mut buf)?;
    packet.write::<BigEndian>(&mut buf)?;
    Ok(buf.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mac(last: u8) -> HardwareAddr {
        HardwareAddr::new([0xaa, 0xbb, 0xcc, 0xdd, 0xee, last])
    }

    fn ip(last: u8) -> Ipv4Addr {
        Ipv4Addr::new(10, 0, 0, last)
    }

    fn decode(frame: &[u8]) -> (EthernetHeader, ArpPacket) {
        let mut buf = ReadBuffer::new(frame);
        let eth = EthernetHeader::read::<BigEndian>(&mut buf).unwrap();
        let packet = ArpPacket::read::<BigEndian>(&mut buf).unwrap();
        (eth, packet)
    }

    #[test]
    fn answers_a_request_for_a_cached_address() {
        let cache = ArpCache::new(60);
        cache.add(ip(2), mac(2), 60);

        // Somebody at 10.0.0.3 asks who has 10.0.0.2
        let question = build_request(mac(3), ip(3), ip(2)).unwrap();

        let disposition = frame_disposition(&question, &cache).unwrap();
        let Disposition::Answer { frame, dest } = disposition else {
            panic!("expected an answer");
        };

        assert_eq!(dest, mac(3));

        let (eth, packet) = decode(&frame);
        assert_eq!(eth.destination, mac(3));
        assert_eq!(eth.source, mac(2));
        assert_eq!(eth.ethertype, ETHERTYPE_ARP);

        assert_eq!(packet.opcode, Opcode::Reply);
        assert_eq!(packet.sender_hw, mac(2));
        assert_eq!(packet.sender_proto, ip(2));
        assert_eq!(packet.target_hw, mac(3));
        assert_eq!(packet.target_proto, ip(3));
    }

    #[test]
    fn stays_quiet_about_unknown_addresses() {
        let cache = ArpCache::new(60);
        let question = build_request(mac(3), ip(3), ip(2)).unwrap();

        assert!(matches!(
            frame_disposition(&question, &cache),
            Ok(Disposition::Ignore)
        ));
    }

    #[test]
    fn learns_from_replies_even_unsolicited_ones() {
        let cache = ArpCache::new(60);

        let reply = compose(
            EthernetHeader::arp(mac(1), mac(5)),
            ArpPacket::reply(mac(5), ip(5), mac(1), ip(1)),
        )
        .unwrap();

        assert!(matches!(
            frame_disposition(&reply, &cache),
            Ok(Disposition::Learned)
        ));
        assert_eq!(
            cache.find_by_ip(ip(5)),
            Some(Binding::new(ip(5), mac(5), 60))
        );
    }

    #[test]
    fn ignores_frames_that_are_not_arp() {
        let cache = ArpCache::new(60);

        let mut buf = WriteBuffer::new();
        EthernetHeader {
            destination: mac(1),
            source: mac(2),
            ethertype: 0x0800,
        }
        .write::<BigEndian>(&mut buf)
        .unwrap();
        buf.write_slice(&[0u8; 40]);

        assert!(matches!(
            frame_disposition(&buf.into_bytes(), &cache),
            Ok(Disposition::Ignore)
        ));
        assert_eq!(cache.count(), 0);
    }

    #[test]
    fn requests_go_to_broadcast_with_a_zero_target() {
        let frame = build_request(mac(1), ip(1), ip(5)).unwrap();
        let (eth, packet) = decode(&frame);

        assert_eq!(eth.destination, HardwareAddr::BROADCAST);
        assert_eq!(eth.source, mac(1));

        assert_eq!(packet.opcode, Opcode::Request);
        assert_eq!(packet.sender_hw, mac(1));
        assert_eq!(packet.sender_proto, ip(1));
        assert_eq!(packet.target_hw, HardwareAddr::ZERO);
        assert_eq!(packet.target_proto, ip(5));
    }

    #[test]
    fn truncated_frames_are_decode_errors() {
        let cache = ArpCache::new(60);
        let question = build_request(mac(3), ip(3), ip(2)).unwrap();

        assert!(frame_disposition(&question[..20], &cache).is_err());
    }
}
