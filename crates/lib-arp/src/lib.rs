pub mod types;

mod cache;
mod constants;
mod daemon;
mod error;
mod iface;
mod registry;
mod server;
mod worker;

pub use cache::*;
pub use constants::*;
pub use daemon::*;
pub use error::*;
pub use iface::*;
pub use registry::*;
pub use server::*;
pub use worker::*;
