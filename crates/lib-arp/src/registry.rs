use std::{net::Ipv4Addr, sync::Arc};

use crate::worker::InterfaceWorker;

/// The ordered set of interface workers the daemon owns. Built once at
/// startup and never resized, so it is shared without locking.
pub struct Registry {
    workers: Vec<Arc<InterfaceWorker>>,
}

impl Registry {
    pub fn new(workers: Vec<Arc<InterfaceWorker>>) -> Self {
        Self { workers }
    }

    /// First worker whose subnet contains `ip`. Selection is first-match,
    /// not longest-prefix: with overlapping subnets the interface listed
    /// earlier wins.
    pub fn worker_for(&self, ip: Ipv4Addr) -> Option<&Arc<InterfaceWorker>> {
        self.workers.iter().find(|w| w.covers(ip))
    }

    pub fn worker_by_name(&self, name: &str) -> Option<&Arc<InterfaceWorker>> {
        self.workers.iter().find(|w| w.iface().name() == name)
    }

    pub fn workers(&self) -> &[Arc<InterfaceWorker>] {
        &self.workers
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}

/// Whether `a` and `b` fall in the same subnet under `mask`.
pub(crate) fn same_subnet(a: Ipv4Addr, b: Ipv4Addr, mask: Ipv4Addr) -> bool {
    let mask = u32::from(mask);
    mask & u32::from(a) == mask & u32::from(b)
}
