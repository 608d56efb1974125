use std::time::Duration;

/// EtherType of frames carrying ARP payloads.
pub const ETHERTYPE_ARP: u16 = 0x0806;

/// EtherType of IPv4, doubling as the ARP protocol type.
pub const ETHERTYPE_IPV4: u16 = 0x0800;

pub const HARDWARE_TYPE_ETHERNET: u16 = 1;
pub const HARDWARE_ADDR_LEN: u8 = 6;
pub const PROTOCOL_ADDR_LEN: u8 = 4;

pub const ETHERNET_HEADER_LEN: usize = 14;

/// Interface names travel on the control plane in a fixed field of this
/// size, NUL terminator included.
pub const MAX_IFNAME_LEN: usize = 22;

pub const DEFAULT_MTU: i32 = 1500;
pub const DEFAULT_TTL_SECS: i32 = 60;

/// TTL marking a binding that never ages out.
pub const TTL_PERMANENT: i32 = -1;

/// TCP port the control-plane server listens on and the client tools
/// connect to.
pub const CONTROL_PORT: u16 = 5050;

/// Largest frame or command the daemon reads in one go.
pub const READ_BUFFER_SIZE: usize = 1024;

pub const RESOLVE_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Number of cache polls a resolve command makes before giving up, ≈3 s
/// at [`RESOLVE_POLL_INTERVAL`].
pub const RESOLVE_TIMEOUT_POLLS: u32 = 300;
