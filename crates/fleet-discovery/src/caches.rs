use std::net::IpAddr;
use std::time::{Duration, Instant};

use dashmap::{DashMap, DashSet};
use mac_address::MacAddress;

/// The three in-memory caches `dhcp_hook` (§4.3) consults before touching
/// the database: an in-flight guard against concurrent calls for the same
/// MAC, a bounded "stop asking" set for hardware that was ignored, and a
/// short-circuit for MACs already resolved to a live Server. Modeled on
/// `LogLimiter`'s DashMap-plus-periodic-sweep shape.
pub struct DiscoveryCaches {
    in_flight: DashSet<MacAddress>,
    ignored: DashMap<MacAddress, Instant>,
    ignored_ttl: Duration,
    ignored_capacity: usize,
    already_discovered: DashMap<MacAddress, IpAddr>,
}

impl DiscoveryCaches {
    pub fn new(ignored_ttl: Duration, ignored_capacity: usize) -> Self {
        Self {
            in_flight: DashSet::new(),
            ignored: DashMap::new(),
            ignored_ttl,
            ignored_capacity,
            already_discovered: DashMap::new(),
        }
    }

    /// §4.3 step 1: true if `(mac, ip)` was already resolved to a live
    /// Server and nothing has changed since.
    pub fn is_already_discovered(&self, mac: MacAddress, ip: IpAddr) -> bool {
        self.already_discovered.get(&mac).is_some_and(|v| *v == ip)
    }

    pub fn mark_discovered(&self, mac: MacAddress, ip: IpAddr) {
        self.already_discovered.insert(mac, ip);
    }

    /// §4.3 step 2/3: claims the in-flight slot for `mac`, returning
    /// `false` if another call already holds it.
    pub fn try_enter_in_flight(&self, mac: MacAddress) -> bool {
        self.in_flight.insert(mac)
    }

    /// Exit paths always clear in-flight, §4.3.
    pub fn leave_in_flight(&self, mac: MacAddress) {
        self.in_flight.remove(&mac);
    }

    /// §4.3 step 2: true if `mac` is in the ignored set and its entry
    /// hasn't expired. Sweeps stale entries first so the set doesn't grow
    /// unbounded between explicit flushes.
    pub fn is_ignored(&self, mac: MacAddress) -> bool {
        self.sweep_stale();
        self.ignored.get(&mac).is_some()
    }

    /// §4.3 step 7/5: adds `mac` to the ignored set, evicting the oldest
    /// entry first if already at capacity.
    pub fn mark_ignored(&self, mac: MacAddress) {
        self.sweep_stale();
        if self.ignored.len() >= self.ignored_capacity {
            if let Some(oldest) = self
                .ignored
                .iter()
                .min_by_key(|e| *e.value())
                .map(|e| *e.key())
            {
                self.ignored.remove(&oldest);
            }
        }
        self.ignored.insert(mac, Instant::now());
    }

    /// Operator-triggered flush, §4.3: a specific MAC, or the whole set.
    pub fn flush_ignored(&self, mac: Option<MacAddress>) {
        match mac {
            Some(mac) => {
                self.ignored.remove(&mac);
            }
            None => self.ignored.clear(),
        }
    }

    fn sweep_stale(&self) {
        let ttl = self.ignored_ttl;
        self.ignored.retain(|_, inserted| inserted.elapsed() < ttl);
    }
}

/// Releases a MAC's in-flight slot on drop so every early return in
/// `dhcp_hook` clears it without repeating the call at each exit point.
pub struct InFlightGuard<'a> {
    caches: &'a DiscoveryCaches,
    mac: MacAddress,
}

impl<'a> InFlightGuard<'a> {
    pub fn new(caches: &'a DiscoveryCaches, mac: MacAddress) -> Self {
        Self { caches, mac }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.caches.leave_in_flight(self.mac);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn mac(s: &str) -> MacAddress {
        MacAddress::from_str(s).unwrap()
    }

    #[test]
    fn in_flight_guard_releases_on_drop() {
        let caches = DiscoveryCaches::new(Duration::from_secs(60), 10);
        let m = mac("AA:BB:CC:DD:EE:01");
        assert!(caches.try_enter_in_flight(m));
        assert!(!caches.try_enter_in_flight(m));
        {
            let _guard = InFlightGuard::new(&caches, m);
        }
        assert!(caches.try_enter_in_flight(m));
    }

    #[test]
    fn ignored_set_respects_capacity() {
        let caches = DiscoveryCaches::new(Duration::from_secs(60), 2);
        let m1 = mac("AA:BB:CC:DD:EE:01");
        let m2 = mac("AA:BB:CC:DD:EE:02");
        let m3 = mac("AA:BB:CC:DD:EE:03");
        caches.mark_ignored(m1);
        caches.mark_ignored(m2);
        caches.mark_ignored(m3);
        assert!(!caches.is_ignored(m1));
        assert!(caches.is_ignored(m2));
        assert!(caches.is_ignored(m3));
    }

    #[test]
    fn flush_ignored_clears_one_or_all() {
        let caches = DiscoveryCaches::new(Duration::from_secs(60), 10);
        let m1 = mac("AA:BB:CC:DD:EE:01");
        let m2 = mac("AA:BB:CC:DD:EE:02");
        caches.mark_ignored(m1);
        caches.mark_ignored(m2);
        caches.flush_ignored(Some(m1));
        assert!(!caches.is_ignored(m1));
        assert!(caches.is_ignored(m2));
        caches.flush_ignored(None);
        assert!(!caches.is_ignored(m2));
    }

    #[test]
    fn already_discovered_requires_matching_ip() {
        let caches = DiscoveryCaches::new(Duration::from_secs(60), 10);
        let m = mac("AA:BB:CC:DD:EE:01");
        let ip: IpAddr = "10.0.0.5".parse().unwrap();
        assert!(!caches.is_already_discovered(m, ip));
        caches.mark_discovered(m, ip);
        assert!(caches.is_already_discovered(m, ip));
        let other: IpAddr = "10.0.0.6".parse().unwrap();
        assert!(!caches.is_already_discovered(m, other));
    }
}
