use std::{
    net::{Ipv4Addr, SocketAddr},
    sync::Arc,
};

use thiserror::Error;
use tracing::info;

use crate::{
    cache::ArpCache,
    iface::{Iface, IfaceError},
    registry::Registry,
    server::{Server, ServerError},
    worker::InterfaceWorker,
};

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("No interfaces to own, nothing to do")]
    NoInterfaces,

    #[error("Interface error: {0}")]
    Iface(#[from] IfaceError),

    #[error("Server error: {0}")]
    Server(#[from] ServerError),
}

/// The assembled daemon: the shared cache and its aging task, one worker
/// per owned interface, and the control-plane server. Runs until killed.
pub struct Daemon {
    port: u16,
    default_ttl: i32,
    interfaces: Vec<String>,
}

impl Daemon {
    pub fn new(port: u16, default_ttl: i32, interfaces: Vec<String>) -> Self {
        Self {
            port,
            default_ttl,
            interfaces,
        }
    }

    #[tokio::main]
    pub async fn run(&mut self) -> Result<(), DaemonError> {
        if self.interfaces.is_empty() {
            return Err(DaemonError::NoInterfaces);
        }

        let cache = Arc::new(ArpCache::new(self.default_ttl));
        tokio::spawn(Arc::clone(&cache).run_aging());

        let mut workers = Vec::with_capacity(self.interfaces.len());
        for name in &self.interfaces {
            info!(interface = %name, "starting interface worker");

            let iface = Iface::open(name)?;
            let worker = Arc::new(InterfaceWorker::new(iface, Arc::clone(&cache)));
            tokio::spawn(Arc::clone(&worker).run());
            workers.push(worker);
        }
        info!(count = workers.len(), "interface workers running");

        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, self.port));
        let server = Server::new(addr, cache, Arc::new(Registry::new(workers)));
        server.run().await?;

        Ok(())
    }
}
