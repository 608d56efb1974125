use std::{
    io,
    net::Ipv4Addr,
    os::fd::{AsRawFd, FromRawFd, OwnedFd},
    sync::{
        atomic::{AtomicU32, Ordering},
        Mutex, MutexGuard, PoisonError,
    },
};

use network_interface::{
    Addr, Error as InterfaceError, NetworkInterface, NetworkInterfaceConfig,
};
use thiserror::Error;
use tokio::io::unix::AsyncFd;
use tracing::debug;

use crate::{
    constants::{DEFAULT_MTU, ETHERTYPE_ARP, MAX_IFNAME_LEN},
    types::{HardwareAddr, IfaceRecord, ParseHardwareAddrError},
};

#[derive(Debug, Error)]
pub enum IfaceError {
    #[error("No interface named {0}")]
    NotFound(String),

    #[error("Interface name {0} is too long")]
    NameTooLong(String),

    #[error("Interface {0} has no IPv4 address")]
    NoIpv4Addr(String),

    #[error("Interface {0} has no hardware address")]
    NoHardwareAddr(String),

    #[error("Invalid hardware address: {0}")]
    InvalidHardwareAddr(#[from] ParseHardwareAddrError),

    #[error("Failed to retrieve interfaces: {0}")]
    Interface(#[from] InterfaceError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// One owned Ethernet interface: its link parameters as queried at bind
/// time, the raw socket every frame moves through, and the counters the
/// control plane reports. Address, netmask and MTU stay adjustable through
/// the control plane; everything else is fixed once the socket is bound.
pub struct Iface {
    name: String,
    index: i32,
    mac: HardwareAddr,
    socket: AsyncFd<OwnedFd>,
    send_lock: tokio::sync::Mutex<()>,
    net: Mutex<IfaceNet>,
    stats: IfaceStats,
}

#[derive(Debug, Clone, Copy)]
struct IfaceNet {
    ip: Ipv4Addr,
    netmask: Ipv4Addr,
    mtu: i32,
}

#[derive(Debug, Default)]
struct IfaceStats {
    rx_pkts: AtomicU32,
    rx_bytes: AtomicU32,
    tx_pkts: AtomicU32,
    tx_bytes: AtomicU32,
}

impl Iface {
    /// Open a raw link-layer socket bound to `name` and populate the
    /// descriptor from a one-shot platform query. Must run inside a tokio
    /// runtime, which takes over readiness for the socket.
    pub fn open(name: &str) -> Result<Self, IfaceError> {
        if name.len() >= MAX_IFNAME_LEN {
            return Err(IfaceError::NameTooLong(name.to_string()));
        }

        let info = platform_query(name)?;
        let socket = open_raw_socket(name)?;
        debug!(
            interface = name,
            fd = socket.as_raw_fd(),
            index = info.index,
            "bound raw socket"
        );

        Ok(Self {
            name: name.to_string(),
            index: info.index,
            mac: info.mac,
            socket: AsyncFd::new(socket)?,
            send_lock: tokio::sync::Mutex::new(()),
            net: Mutex::new(IfaceNet {
                ip: info.ip,
                netmask: info.netmask,
                mtu: DEFAULT_MTU,
            }),
            stats: IfaceStats::default(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> i32 {
        self.index
    }

    pub fn mac(&self) -> HardwareAddr {
        self.mac
    }

    pub fn ip(&self) -> Ipv4Addr {
        self.net_lock().ip
    }

    pub fn netmask(&self) -> Ipv4Addr {
        self.net_lock().netmask
    }

    pub fn mtu(&self) -> i32 {
        self.net_lock().mtu
    }

    pub fn set_addr(&self, ip: Ipv4Addr, netmask: Ipv4Addr) {
        let mut net = self.net_lock();
        net.ip = ip;
        net.netmask = netmask;
    }

    pub fn set_mtu(&self, mtu: i32) {
        self.net_lock().mtu = mtu;
    }

    fn net_lock(&self) -> MutexGuard<'_, IfaceNet> {
        self.net.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the descriptor for IF_SHOW. The socket descriptor is
    /// reported as 0; it means nothing to another process.
    pub fn record(&self, default_ttl: i32) -> IfaceRecord {
        let net = *self.net_lock();

        IfaceRecord {
            sockfd: 0,
            ttl: default_ttl,
            mtu: net.mtu,
            ifname: self.name.clone(),
            mac: self.mac,
            ip: net.ip,
            rx_pkts: self.stats.rx_pkts.load(Ordering::Relaxed),
            rx_bytes: self.stats.rx_bytes.load(Ordering::Relaxed),
            tx_pkts: self.stats.tx_pkts.load(Ordering::Relaxed),
            tx_bytes: self.stats.tx_bytes.load(Ordering::Relaxed),
            index: self.index,
            netmask: net.netmask,
        }
    }

    /// Receive one link-layer datagram into `buf`.
    pub async fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let mut guard = self.socket.readable().await?;

            match guard.try_io(|fd| {
                let n = unsafe {
                    libc::read(
                        fd.as_raw_fd(),
                        buf.as_mut_ptr() as *mut libc::c_void,
                        buf.len(),
                    )
                };
                if n < 0 {
                    Err(io::Error::last_os_error())
                } else {
                    Ok(n as usize)
                }
            }) {
                Ok(result) => {
                    let n = result?;
                    self.stats.rx_pkts.fetch_add(1, Ordering::Relaxed);
                    self.stats.rx_bytes.fetch_add(n as u32, Ordering::Relaxed);
                    return Ok(n);
                }
                // Readiness was a false positive; wait again
                Err(_would_block) => continue,
            }
        }
    }

    /// Send one frame to `dest`. Sends on the same socket are serialized
    /// so two outgoing frames never interleave.
    pub async fn send_to(&self, frame: &[u8], dest: HardwareAddr) -> io::Result<()> {
        let _sending = self.send_lock.lock().await;
        let addr = link_addr(self.index, dest);

        loop {
            let mut guard = self.socket.writable().await?;

            match guard.try_io(|fd| {
                let n = unsafe {
                    libc::sendto(
                        fd.as_raw_fd(),
                        frame.as_ptr() as *const libc::c_void,
                        frame.len(),
                        0,
                        &addr as *const libc::sockaddr_ll as *const libc::sockaddr,
                        std::mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
                    )
                };
                if n < 0 {
                    Err(io::Error::last_os_error())
                } else {
                    Ok(n as usize)
                }
            }) {
                Ok(result) => {
                    let n = result?;
                    self.stats.tx_pkts.fetch_add(1, Ordering::Relaxed);
                    self.stats.tx_bytes.fetch_add(n as u32, Ordering::Relaxed);
                    return Ok(());
                }
                Err(_would_block) => continue,
            }
        }
    }
}

struct IfaceInfo {
    index: i32,
    mac: HardwareAddr,
    ip: Ipv4Addr,
    netmask: Ipv4Addr,
}

/// One-shot query for the link parameters of `name`.
fn platform_query(name: &str) -> Result<IfaceInfo, IfaceError> {
    let interfaces = NetworkInterface::show()?;

    for interface in interfaces {
        if interface.name != name {
            continue;
        }

        let mac = interface
            .mac_addr
            .ok_or_else(|| IfaceError::NoHardwareAddr(name.to_string()))?
            .parse::<HardwareAddr>()?;

        let (ip, netmask) = match interface.addr {
            Some(Addr::V4(v4)) => (v4.ip, v4.netmask.unwrap_or(Ipv4Addr::UNSPECIFIED)),
            _ => return Err(IfaceError::NoIpv4Addr(name.to_string())),
        };

        return Ok(IfaceInfo {
            index: interface.index as i32,
            mac,
            ip,
            netmask,
        });
    }

    Err(IfaceError::NotFound(name.to_string()))
}

/// Raw nonblocking AF_PACKET socket, bound to the named interface and set
/// up to see every Ethernet frame the NIC delivers.
fn open_raw_socket(name: &str) -> Result<OwnedFd, IfaceError> {
    let fd = unsafe {
        libc::socket(
            libc::AF_PACKET,
            libc::SOCK_RAW | libc::SOCK_NONBLOCK,
            (libc::ETH_P_ALL as u16).to_be() as libc::c_int,
        )
    };
    if fd < 0 {
        return Err(io::Error::last_os_error().into());
    }

    let socket = unsafe { OwnedFd::from_raw_fd(fd) };

    let rc = unsafe {
        libc::setsockopt(
            socket.as_raw_fd(),
            libc::SOL_SOCKET,
            libc::SO_BINDTODEVICE,
            name.as_ptr() as *const libc::c_void,
            name.len() as libc::socklen_t,
        )
    };
    if rc < 0 {
        return Err(io::Error::last_os_error().into());
    }

    Ok(socket)
}

/// Link-layer destination for `sendto` on an AF_PACKET socket.
fn link_addr(index: i32, dest: HardwareAddr) -> libc::sockaddr_ll {
    let mut addr: libc::sockaddr_ll = unsafe { std::mem::zeroed() };

    addr.sll_family = libc::AF_PACKET as libc::sa_family_t;
    addr.sll_protocol = ETHERTYPE_ARP.to_be();
    addr.sll_ifindex = index;
    addr.sll_halen = 6;
    addr.sll_addr[..6].copy_from_slice(&dest.octets());

    addr
}
