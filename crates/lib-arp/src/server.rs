use std::{
    net::{Ipv4Addr, SocketAddr},
    sync::Arc,
};

use netbuf::{BufferError, NativeEndian, ReadBuffer, Readable, WriteBuffer, Writeable};
use thiserror::Error;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    time::sleep,
};
use tracing::{debug, info, warn};

use crate::{
    cache::ArpCache,
    constants::{READ_BUFFER_SIZE, RESOLVE_POLL_INTERVAL, RESOLVE_TIMEOUT_POLLS},
    error::DecodeError,
    registry::Registry,
    types::{Command, CommandType, ConfigHeader, Response},
};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Codec error: {0}")]
    Codec(#[from] DecodeError),

    #[error("Buffer error: {0}")]
    Buffer(#[from] BufferError),
}

/// The control-plane server: a TCP accept loop where every connection
/// carries exactly one command and receives exactly one response. There is
/// no pipelining; each connection is served to completion before the next
/// accept.
pub struct Server {
    addr: SocketAddr,
    cache: Arc<ArpCache>,
    registry: Arc<Registry>,
}

impl Server {
    pub fn new(addr: SocketAddr, cache: Arc<ArpCache>, registry: Arc<Registry>) -> Self {
        Self {
            addr,
            cache,
            registry,
        }
    }

    pub async fn run(&self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.addr).await?;
        info!(addr = %self.addr, "control plane listening");

        self.serve(listener).await
    }

    /// Accept loop over an already-bound listener.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        loop {
            let (mut stream, peer) = listener.accept().await?;
            debug!(%peer, "accepted connection");

            // A client that vanishes mid-command only costs us this one
            // connection
            if let Err(err) = self.handle(&mut stream).await {
                warn!(%peer, %err, "connection failed");
            }
        }
    }

    async fn handle(&self, stream: &mut TcpStream) -> Result<(), ServerError> {
        // One read covers every known command; the frames are small and
        // the clients write them in one piece.
        let mut buf = [0u8; READ_BUFFER_SIZE];
        let len = stream.read(&mut buf).await?;

        let mut request = ReadBuffer::new(&buf[..len]);
        let response = match Command::read::<NativeEndian>(&mut request) {
            Ok(command) => self.dispatch(command, &mut request).await?,
            Err(DecodeError::UnknownCommandType(code)) => {
                warn!(code, "unknown command type");
                Response::unknown(code)
            }
            Err(err) => {
                warn!(%err, "undecodable command, closing");
                return Ok(());
            }
        };

        let mut out = WriteBuffer::new();
        response.write::<NativeEndian>(&mut out)?;
        stream.write_all(out.bytes()).await?;

        Ok(())
    }

    async fn dispatch(
        &self,
        command: Command,
        trailer: &mut ReadBuffer<'_>,
    ) -> Result<Response, ServerError> {
        debug!(command = %command.kind, "dispatching");

        match command.kind {
            CommandType::Show => self.show(),
            CommandType::Resolve => self.resolve(command.ip).await,
            CommandType::Add => {
                self.cache
                    .add(command.ip, command.mac, command.ttl as i32);
                Ok(Response::empty(CommandType::Add))
            }
            CommandType::Delete => {
                if self.cache.remove(command.ip) {
                    Ok(Response::empty(CommandType::Delete))
                } else {
                    Ok(Response::empty(CommandType::DeleteNotFound))
                }
            }
            CommandType::Ttl => {
                // The wire carries the TTL unsigned; reinterpreting the
                // bits lets a client spell "permanent" as -1
                self.cache.set_default_ttl(command.ttl as i32);
                Ok(Response::empty(CommandType::Ttl))
            }
            CommandType::IfShow => self.if_show(),
            CommandType::IfConfig => self.if_config(trailer),
            CommandType::IfMtu => self.if_mtu(trailer),
            // Response-only code; clients never send it
            CommandType::DeleteNotFound => Ok(Response::empty(CommandType::DeleteNotFound)),
        }
    }

    fn show(&self) -> Result<Response, ServerError> {
        let mut payload = WriteBuffer::new();
        for entry in self.cache.entries() {
            entry.write::<NativeEndian>(&mut payload)?;
        }

        Ok(Response::with_payload(
            CommandType::Show,
            payload.into_bytes(),
        ))
    }

    /// Fire a request on the owning interface, then poll the cache until
    /// the reader has learned the answer or the timeout runs out.
    async fn resolve(&self, ip: Ipv4Addr) -> Result<Response, ServerError> {
        let worker = match self.registry.worker_for(ip) {
            Some(worker) => worker,
            None => {
                debug!(%ip, "no interface covers this address");
                return Ok(Response::empty(CommandType::Resolve));
            }
        };

        if let Err(err) = worker.resolve_ip(ip).await {
            warn!(%ip, %err, "request could not be sent");
            return Ok(Response::empty(CommandType::Resolve));
        }

        for _ in 0..RESOLVE_TIMEOUT_POLLS {
            if let Some(entry) = self.cache.find_by_ip(ip) {
                let mut payload = WriteBuffer::new();
                entry.write::<NativeEndian>(&mut payload)?;

                return Ok(Response::with_payload(
                    CommandType::Resolve,
                    payload.into_bytes(),
                ));
            }

            sleep(RESOLVE_POLL_INTERVAL).await;
        }

        debug!(%ip, "resolution timed out");
        Ok(Response::empty(CommandType::Resolve))
    }

    fn if_show(&self) -> Result<Response, ServerError> {
        let default_ttl = self.cache.default_ttl();

        let mut payload = WriteBuffer::new();
        for worker in self.registry.workers() {
            worker
                .iface()
                .record(default_ttl)
                .write::<NativeEndian>(&mut payload)?;
        }

        Ok(Response::with_payload(
            CommandType::IfShow,
            payload.into_bytes(),
        ))
    }

    fn if_config(&self, trailer: &mut ReadBuffer<'_>) -> Result<Response, ServerError> {
        let config = ConfigHeader::read::<NativeEndian>(trailer)?;

        match self.registry.worker_by_name(&config.ifname) {
            Some(worker) => {
                let ip = Ipv4Addr::from(config.value);
                let netmask = Ipv4Addr::from(config.mask);
                info!(interface = %config.ifname, %ip, %netmask, "reconfiguring address");
                worker.iface().set_addr(ip, netmask);
            }
            None => warn!(interface = %config.ifname, "no such interface"),
        }

        Ok(Response::empty(CommandType::IfConfig))
    }

    fn if_mtu(&self, trailer: &mut ReadBuffer<'_>) -> Result<Response, ServerError> {
        let config = ConfigHeader::read::<NativeEndian>(trailer)?;

        match self.registry.worker_by_name(&config.ifname) {
            Some(worker) => {
                info!(interface = %config.ifname, mtu = config.value, "updating MTU");
                worker.iface().set_mtu(config.value as i32);
            }
            None => warn!(interface = %config.ifname, "no such interface"),
        }

        Ok(Response::empty(CommandType::IfMtu))
    }
}
