mod addr;
mod binding;
mod command;
mod eth;
mod iface;
mod opcode;
mod packet;
mod response;

pub use addr::*;
pub use binding::*;
pub use command::*;
pub use eth::*;
pub use iface::*;
pub use opcode::*;
pub use packet::*;
pub use response::*;
