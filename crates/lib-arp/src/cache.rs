use std::{
    net::Ipv4Addr,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use thiserror::Error;
use tracing::{debug, trace};

use crate::{
    constants::TTL_PERMANENT,
    types::{Binding, HardwareAddr},
};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Index {index} is out of range for a table of {count} entries")]
    OutOfRange { index: usize, count: usize },
}

/// The binding table every part of the daemon shares: interface readers
/// learn into it, the control plane queries and edits it, and the aging
/// task sweeps it. One mutex covers each operation end to end, so a sweep
/// never interleaves with an insert and an enumeration always sees a
/// consistent table.
#[derive(Debug)]
pub struct ArpCache {
    inner: Mutex<Inner>,
}

#[derive(Debug)]
struct Inner {
    entries: Vec<Binding>,
    default_ttl: i32,
}

impl ArpCache {
    pub fn new(default_ttl: i32) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: Vec::new(),
                default_ttl: sanitize_ttl(default_ttl),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fetch a binding by table position.
    pub fn get(&self, index: usize) -> Result<Binding, CacheError> {
        let inner = self.lock();
        inner
            .entries
            .get(index)
            .copied()
            .ok_or(CacheError::OutOfRange {
                index,
                count: inner.entries.len(),
            })
    }

    pub fn find_by_ip(&self, ip: Ipv4Addr) -> Option<Binding> {
        self.lock().entries.iter().find(|e| e.ip == ip).copied()
    }

    /// First binding carrying `mac`. Several IPs may share a hardware
    /// address; the earliest insert wins.
    pub fn find_by_mac(&self, mac: HardwareAddr) -> Option<Binding> {
        self.lock().entries.iter().find(|e| e.mac == mac).copied()
    }

    /// Insert a binding unless one already exists for `ip` — the existing
    /// entry wins, so a manual add is never stomped by a later learn and
    /// vice versa.
    pub fn add(&self, ip: Ipv4Addr, mac: HardwareAddr, ttl: i32) {
        let mut inner = self.lock();
        inner_add(&mut inner, ip, mac, ttl);
    }

    /// Insert with the current default TTL; the receive path uses this for
    /// bindings taken from replies.
    pub fn learn(&self, ip: Ipv4Addr, mac: HardwareAddr) {
        let mut inner = self.lock();
        let ttl = inner.default_ttl;
        inner_add(&mut inner, ip, mac, ttl);
    }

    /// Remove the binding for `ip`, reporting whether one existed.
    pub fn remove(&self, ip: Ipv4Addr) -> bool {
        let mut inner = self.lock();
        match inner.entries.iter().position(|e| e.ip == ip) {
            Some(index) => {
                inner.entries.remove(index);
                debug!(%ip, "removed binding");
                true
            }
            None => false,
        }
    }

    /// Set the TTL future inserts default to. Existing entries keep the
    /// TTL they were created with. Negative values select permanence.
    pub fn set_default_ttl(&self, ttl: i32) {
        let ttl = sanitize_ttl(ttl);
        debug!(ttl, "default TTL updated");
        self.lock().default_ttl = ttl;
    }

    pub fn default_ttl(&self) -> i32 {
        self.lock().default_ttl
    }

    /// Snapshot of the table in insertion order.
    pub fn entries(&self) -> Vec<Binding> {
        self.lock().entries.clone()
    }

    pub fn count(&self) -> usize {
        self.lock().entries.len()
    }

    /// One aging sweep: every non-permanent binding loses a second, and
    /// whatever reaches zero is evicted. Runs entirely under the lock, so
    /// entries inserted while a sweep is pending all age together on the
    /// next one.
    pub fn tick(&self) {
        let mut inner = self.lock();

        for entry in inner.entries.iter_mut() {
            if !entry.is_permanent() {
                entry.ttl -= 1;
            }
        }

        inner.entries.retain(|entry| {
            let keep = entry.is_permanent() || entry.ttl > 0;
            if !keep {
                debug!(entry = %entry, "binding expired");
            }
            keep
        });
    }

    /// Drive [`ArpCache::tick`] once per second, forever.
    pub async fn run_aging(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(Duration::from_secs(1));
        // The first tick fires immediately; skip it so a fresh entry gets
        // its full first second.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            self.tick();
        }
    }
}

fn inner_add(inner: &mut Inner, ip: Ipv4Addr, mac: HardwareAddr, ttl: i32) {
    if inner.entries.iter().any(|e| e.ip == ip) {
        trace!(%ip, "entry already present, keeping the existing binding");
        return;
    }

    let binding = Binding::new(ip, mac, ttl);
    debug!(entry = %binding, "added binding");
    inner.entries.push(binding);
}

fn sanitize_ttl(ttl: i32) -> i32 {
    if ttl < 0 {
        TTL_PERMANENT
    } else {
        ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(last: u8) -> Ipv4Addr {
        Ipv4Addr::new(10, 0, 0, last)
    }

    fn mac(last: u8) -> HardwareAddr {
        HardwareAddr::new([0xaa, 0xbb, 0xcc, 0xdd, 0xee, last])
    }

    #[test]
    fn first_writer_wins() {
        let cache = ArpCache::new(60);

        cache.add(ip(2), mac(2), 60);
        cache.add(ip(2), mac(9), 120);

        assert_eq!(cache.count(), 1);
        assert_eq!(cache.find_by_ip(ip(2)), Some(Binding::new(ip(2), mac(2), 60)));
    }

    #[test]
    fn remove_reports_whether_anything_was_removed() {
        let cache = ArpCache::new(60);

        cache.add(ip(2), mac(2), 60);
        assert!(cache.remove(ip(2)));
        assert!(!cache.remove(ip(2)));
        assert_eq!(cache.count(), 0);
    }

    #[test]
    fn entries_keep_insertion_order() {
        let cache = ArpCache::new(60);

        cache.add(ip(3), mac(3), 60);
        cache.add(ip(1), mac(1), 60);
        cache.add(ip(2), mac(2), 60);

        let ips: Vec<_> = cache.entries().iter().map(|e| e.ip).collect();
        assert_eq!(ips, vec![ip(3), ip(1), ip(2)]);
    }

    #[test]
    fn get_by_position() {
        let cache = ArpCache::new(60);
        cache.add(ip(1), mac(1), 60);

        assert_eq!(cache.get(0).unwrap(), Binding::new(ip(1), mac(1), 60));
        assert!(matches!(
            cache.get(1),
            Err(CacheError::OutOfRange { index: 1, count: 1 })
        ));
    }

    #[test]
    fn ticks_decrement_and_evict() {
        let cache = ArpCache::new(60);
        cache.add(ip(1), mac(1), 2);

        cache.tick();
        assert_eq!(cache.find_by_ip(ip(1)).map(|e| e.ttl), Some(1));

        cache.tick();
        assert_eq!(cache.find_by_ip(ip(1)), None);
    }

    #[test]
    fn entries_added_in_the_same_second_age_together() {
        let cache = ArpCache::new(60);
        cache.add(ip(1), mac(1), 5);
        cache.add(ip(2), mac(2), 5);

        cache.tick();

        let ttls: Vec<_> = cache.entries().iter().map(|e| e.ttl).collect();
        assert_eq!(ttls, vec![4, 4]);
    }

    #[test]
    fn permanent_bindings_never_age() {
        let cache = ArpCache::new(60);
        cache.add(ip(1), mac(1), TTL_PERMANENT);

        for _ in 0..120 {
            cache.tick();
        }

        assert_eq!(cache.find_by_ip(ip(1)).map(|e| e.ttl), Some(TTL_PERMANENT));
    }

    #[test]
    fn learn_uses_the_default_ttl() {
        let cache = ArpCache::new(60);
        cache.learn(ip(5), mac(5));

        assert_eq!(cache.find_by_ip(ip(5)).map(|e| e.ttl), Some(60));
    }

    #[test]
    fn negative_default_ttl_selects_permanence() {
        let cache = ArpCache::new(60);
        cache.set_default_ttl(-1);

        assert_eq!(cache.default_ttl(), TTL_PERMANENT);

        cache.learn(ip(10), mac(10));
        assert!(cache.find_by_ip(ip(10)).map(|e| e.is_permanent()).unwrap());
    }

    #[test]
    fn duplicate_macs_resolve_to_the_first_entry() {
        let cache = ArpCache::new(60);
        cache.add(ip(1), mac(7), 60);
        cache.add(ip(2), mac(7), 60);

        assert_eq!(cache.find_by_mac(mac(7)).map(|e| e.ip), Some(ip(1)));
    }
}
