// Copyright the wfd-source authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The multicast address pool: a thread-safe allocator of IP-address +
//! contiguous-port-range + TTL tuples, grounded on `rtsp-address-pool.c`.
//!
//! The scan order, split semantics, and "no merging on release" limitation
//! are transcribed from the original `gst_rtsp_address_pool_acquire_address`
//! and `split_range` almost line for line; see the inline notes.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Mutex;

use crate::config::PoolRangeConfig;
use crate::error::{wrap, ErrorInt, Result};

/// Flags controlling [`Pool::acquire`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct AddressFlags(u8);

impl AddressFlags {
    pub const NONE: AddressFlags = AddressFlags(0);
    pub const IPV4: AddressFlags = AddressFlags(1 << 0);
    pub const IPV6: AddressFlags = AddressFlags(1 << 1);
    pub const EVEN_PORT: AddressFlags = AddressFlags(1 << 2);

    pub fn contains(self, other: AddressFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for AddressFlags {
    type Output = AddressFlags;
    fn bitor(self, rhs: AddressFlags) -> AddressFlags {
        AddressFlags(self.0 | rhs.0)
    }
}

/// A single IP address plus a port, stored as a fixed 16-byte big-endian
/// buffer so IPv4 and IPv6 share representation. `size` is 4 for IPv4, 16
/// for IPv6.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Addr {
    pub bytes: [u8; 16],
    pub size: u8,
    pub port: u16,
}

impl Addr {
    pub fn new(ip: IpAddr, port: u16) -> Addr {
        let mut bytes = [0u8; 16];
        let size = match ip {
            IpAddr::V4(v4) => {
                bytes[..4].copy_from_slice(&v4.octets());
                4
            }
            IpAddr::V6(v6) => {
                bytes[..16].copy_from_slice(&v6.octets());
                16
            }
        };
        Addr { bytes, size, port }
    }

    pub fn is_ipv4(&self) -> bool {
        self.size == 4
    }

    pub fn is_ipv6(&self) -> bool {
        self.size == 16
    }

    pub fn is_even_port(&self) -> bool {
        self.port % 2 == 0
    }

    fn addr_bytes(&self) -> &[u8] {
        &self.bytes[..self.size as usize]
    }

    pub fn ip(&self) -> IpAddr {
        match self.size {
            4 => IpAddr::V4(Ipv4Addr::new(
                self.bytes[0],
                self.bytes[1],
                self.bytes[2],
                self.bytes[3],
            )),
            16 => {
                let mut a = [0u8; 16];
                a.copy_from_slice(&self.bytes);
                IpAddr::V6(Ipv6Addr::from(a))
            }
            other => unreachable!("invalid address size {}", other),
        }
    }

    /// Increments the address by one, carrying leftward from the last byte.
    /// Overflow past the top byte is undefined: well-formed ranges never
    /// need to increment past their `max`.
    fn increment(&mut self) {
        let mut carry: u16 = 1;
        for i in (0..self.size as usize).rev() {
            if carry == 0 {
                break;
            }
            carry += self.bytes[i] as u16;
            self.bytes[i] = (carry & 0xff) as u8;
            carry >>= 8;
        }
    }
}

fn parse_addr(s: &str, port: u16) -> Result<Addr> {
    let ip: IpAddr = s
        .parse()
        .map_err(|_| wrap!(ErrorInt::InvalidArgument {
            description: format!("invalid address {:?}", s),
        }))?;
    Ok(Addr::new(ip, port))
}

/// A contiguous range of addresses (possibly a single address) and ports,
/// with a multicast TTL.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AddrRange {
    pub min: Addr,
    pub max: Addr,
    pub ttl: u8,
}

impl AddrRange {
    fn is_single_address(&self) -> bool {
        self.min.addr_bytes() == self.max.addr_bytes()
    }

    fn port_count(&self) -> u32 {
        self.max.port as u32 - self.min.port as u32 + 1
    }
}

/// An opaque handle to an acquired [`AddrRange`]. The caller must not
/// construct one directly; it is returned by [`Pool::acquire`] and consumed
/// by [`Pool::release`].
#[derive(Clone, Copy, Debug)]
pub struct AddressHandle(AddrRange);

impl AddressHandle {
    pub fn address(&self) -> IpAddr {
        self.0.min.ip()
    }

    pub fn port0(&self) -> u16 {
        self.0.min.port
    }

    pub fn n_ports(&self) -> u32 {
        self.0.port_count()
    }

    pub fn ttl(&self) -> u8 {
        self.0.ttl
    }
}

#[derive(Default)]
struct Lists {
    free: Vec<AddrRange>,
    allocated: Vec<AddrRange>,
}

/// A pool of multicast address/port ranges. `add_range` adds capacity;
/// `acquire`/`release` allocate and return single-address, `n_ports`-wide
/// fragments. All mutation happens under one lock, matching the single
/// `GMutex` in the original `GstRTSPAddressPool`.
#[derive(Default)]
pub struct Pool {
    lists: Mutex<Lists>,
}

impl Pool {
    pub fn new() -> Pool {
        Pool::default()
    }

    /// Adds `[min_addr, max_addr]` (inclusive, same family) with port range
    /// `[min_port, max_port]` to the free list.
    pub fn add_range(
        &self,
        min_addr: &str,
        max_addr: &str,
        min_port: u16,
        max_port: u16,
        ttl: u8,
    ) -> Result<()> {
        if min_port > max_port {
            bail_invalid(format!(
                "min_port {} > max_port {}",
                min_port, max_port
            ))?;
        }
        let min = parse_addr(min_addr, min_port)?;
        let max = parse_addr(max_addr, max_port)?;
        if min.size != max.size {
            bail_invalid("min and max address families differ".to_string())?;
        }
        if min.addr_bytes() > max.addr_bytes() {
            bail_invalid("min address greater than max address".to_string())?;
        }
        let range = AddrRange { min, max, ttl };
        self.lists.lock().unwrap().free.push(range);
        Ok(())
    }

    /// Same as [`Pool::add_range`], taking a [`PoolRangeConfig`] for
    /// embedders that assemble pool capacity from structured configuration.
    pub fn add_range_from_config(&self, cfg: &PoolRangeConfig) -> Result<()> {
        self.add_range(&cfg.min_addr, &cfg.max_addr, cfg.min_port, cfg.max_port, cfg.ttl)
    }

    /// Finds the first free range (in list order) matching `flags` with at
    /// least `n_ports` consecutive ports (after an even-port skip if
    /// requested), splits off exactly that fragment, and returns it as an
    /// allocated handle.
    pub fn acquire(&self, flags: AddressFlags, n_ports: u16) -> Result<AddressHandle> {
        if n_ports == 0 {
            bail_invalid("n_ports must be > 0".to_string())?;
        }
        let mut lists = self.lists.lock().unwrap();
        let pos = lists.free.iter().position(|range| {
            if flags.contains(AddressFlags::IPV4) && !range.min.is_ipv4() {
                return false;
            }
            if flags.contains(AddressFlags::IPV6) && !range.min.is_ipv6() {
                return false;
            }
            let skip = even_port_skip(flags, range);
            let ports = range.port_count();
            ports.saturating_sub(skip as u32) >= n_ports as u32
        });
        let pos = match pos {
            Some(p) => p,
            None => {
                return Err(wrap!(ErrorInt::PoolExhausted { flags, n_ports }));
            }
        };
        let range = lists.free.remove(pos);
        let skip = even_port_skip(flags, &range);
        let (allocated, remainders) = split_range(range, skip, n_ports as u32);
        lists.free.extend(remainders);
        lists.allocated.push(allocated);
        Ok(AddressHandle(allocated))
    }

    /// Releases a previously acquired handle back to the free list.
    /// Releasing an unknown handle is a recoverable warning, not an error
    /// (matching `gst_rtsp_address_pool_release_address`'s "unknown id"
    /// path). No merging of adjacent free ranges is performed.
    pub fn release(&self, handle: AddressHandle) {
        let mut lists = self.lists.lock().unwrap();
        match lists.allocated.iter().position(|r| *r == handle.0) {
            Some(pos) => {
                let range = lists.allocated.remove(pos);
                lists.free.push(range);
            }
            None => {
                log::warn!("wfd: released unknown address pool handle {:?}", handle.0);
            }
        }
    }

    #[cfg(test)]
    fn free_ranges(&self) -> Vec<AddrRange> {
        self.lists.lock().unwrap().free.clone()
    }

    #[cfg(test)]
    fn allocated_ranges(&self) -> Vec<AddrRange> {
        self.lists.lock().unwrap().allocated.clone()
    }
}

fn bail_invalid(description: String) -> Result<()> {
    Err(wrap!(ErrorInt::InvalidArgument { description }))
}

fn even_port_skip(flags: AddressFlags, range: &AddrRange) -> u16 {
    if flags.contains(AddressFlags::EVEN_PORT) && !range.min.is_even_port() {
        1
    } else {
        0
    }
}

/// Splits `range` into the acquired single-address, `n_ports`-wide
/// fragment plus up to three remainder fragments (the rest of a
/// multi-address range, the skipped-port fragment, and the trailing-port
/// fragment), transcribed from `split_range()`.
fn split_range(mut range: AddrRange, skip: u16, n_ports: u32) -> (AddrRange, Vec<AddrRange>) {
    let mut remainders = Vec::new();

    if !range.is_single_address() {
        let mut rest = range;
        rest.min.increment();
        remainders.push(rest);
        range.max = range.min;
    }

    if skip > 0 {
        let mut skipped = range;
        skipped.max.port = skipped.min.port + skip - 1;
        remainders.push(skipped);
        range.min.port += skip;
    }

    if range.port_count() > n_ports {
        let mut trailing = range;
        trailing.min.port = range.min.port + n_ports as u16;
        remainders.push(trailing);
        range.max.port = range.min.port + n_ports as u16 - 1;
    }

    (range, remainders)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool_with_range() -> Pool {
        let pool = Pool::new();
        pool.add_range("10.0.0.1", "10.0.0.4", 5000, 5009, 1).unwrap();
        pool
    }

    #[test]
    fn acquire_even_port_on_odd_start_skips_one_port() {
        let pool = Pool::new();
        pool.add_range("10.0.0.1", "10.0.0.1", 5001, 5010, 1).unwrap();
        let handle = pool.acquire(AddressFlags::EVEN_PORT, 2).unwrap();
        assert_eq!(handle.port0(), 5002);
        assert_eq!(handle.n_ports(), 2);
    }

    #[test]
    fn acquire_exact_fit_leaves_no_trailing_remainder() {
        let pool = Pool::new();
        pool.add_range("10.0.0.1", "10.0.0.1", 5000, 5001, 1).unwrap();
        let _handle = pool.acquire(AddressFlags::NONE, 2).unwrap();
        assert!(pool.free_ranges().is_empty());
    }

    #[test]
    fn address_pool_split_scenario() {
        // Scenario 4 from the system spec: a single multi-address range,
        // acquire(EVEN_PORT, 2) splits off 10.0.0.1:5000-5001 and leaves
        // 10.0.0.2-10.0.0.4 plus the 5002-5009 fragment on 10.0.0.1.
        let pool = pool_with_range();
        let handle = pool.acquire(AddressFlags::EVEN_PORT, 2).unwrap();
        assert_eq!(handle.address(), "10.0.0.1".parse::<IpAddr>().unwrap());
        assert_eq!(handle.port0(), 5000);
        assert_eq!(handle.n_ports(), 2);

        let free = pool.free_ranges();
        assert_eq!(free.len(), 2);
        let multi_addr_remainder = free
            .iter()
            .find(|r| r.min.ip() == "10.0.0.2".parse::<IpAddr>().unwrap())
            .expect("remainder for 10.0.0.2-10.0.0.4");
        assert_eq!(multi_addr_remainder.max.ip(), "10.0.0.4".parse::<IpAddr>().unwrap());
        assert_eq!(multi_addr_remainder.min.port, 5000);
        assert_eq!(multi_addr_remainder.max.port, 5009);

        let trailing_ports = free
            .iter()
            .find(|r| r.min.ip() == "10.0.0.1".parse::<IpAddr>().unwrap())
            .expect("trailing port fragment on 10.0.0.1");
        assert_eq!(trailing_ports.min.port, 5002);
        assert_eq!(trailing_ports.max.port, 5009);
    }

    #[test]
    fn release_returns_handle_to_free_list() {
        let pool = Pool::new();
        pool.add_range("10.0.0.1", "10.0.0.1", 5000, 5001, 1).unwrap();
        let handle = pool.acquire(AddressFlags::NONE, 2).unwrap();
        assert!(pool.free_ranges().is_empty());
        pool.release(handle);
        assert_eq!(pool.free_ranges().len(), 1);
        assert!(pool.allocated_ranges().is_empty());
    }

    #[test]
    fn release_of_unknown_handle_is_a_no_op_warning() {
        let pool = pool_with_range();
        let handle = pool.acquire(AddressFlags::NONE, 2).unwrap();
        pool.release(handle);
        // Releasing again is the "unknown id" path: must not panic.
        pool.release(handle);
    }

    #[test]
    fn acquire_fails_when_no_range_has_enough_ports() {
        let pool = Pool::new();
        pool.add_range("10.0.0.1", "10.0.0.1", 5000, 5001, 1).unwrap();
        let err = pool.acquire(AddressFlags::NONE, 10).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::PoolExhausted);
    }

    #[test]
    fn add_range_from_config_matches_positional_add_range() {
        let pool = Pool::new();
        pool.add_range_from_config(&PoolRangeConfig {
            min_addr: "10.0.0.1".to_string(),
            max_addr: "10.0.0.1".to_string(),
            min_port: 5000,
            max_port: 5001,
            ttl: 1,
        })
        .unwrap();
        assert_eq!(pool.free_ranges().len(), 1);
        assert_eq!(pool.free_ranges()[0].ttl, 1);
    }

    #[test]
    fn add_range_rejects_min_greater_than_max() {
        let pool = Pool::new();
        let err = pool.add_range("10.0.0.5", "10.0.0.1", 5000, 5001, 1).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidArgument);
    }

    #[test]
    fn add_range_rejects_mismatched_families() {
        let pool = Pool::new();
        let err = pool
            .add_range("10.0.0.1", "::1", 5000, 5001, 1)
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidArgument);
    }

    #[test]
    fn acquire_respects_ipv6_flag() {
        let pool = Pool::new();
        pool.add_range("10.0.0.1", "10.0.0.1", 5000, 5001, 1).unwrap();
        pool.add_range("ff02::1", "ff02::1", 5000, 5001, 1).unwrap();
        let handle = pool.acquire(AddressFlags::IPV6, 2).unwrap();
        assert!(handle.address().is_ipv6());
    }

    proptest::proptest! {
        #[test]
        fn acquire_release_cycle_preserves_port_total(n_ports in 1u16..=8) {
            let pool = Pool::new();
            pool.add_range("10.0.0.1", "10.0.0.1", 5000, 5000 + 63, 1).unwrap();
            if let Ok(handle) = pool.acquire(AddressFlags::NONE, n_ports) {
                let total_before: u32 = 64;
                let free_ports: u32 = pool.free_ranges().iter().map(|r| r.port_count()).sum();
                let allocated_ports: u32 = pool.allocated_ranges().iter().map(|r| r.port_count()).sum();
                proptest::prop_assert_eq!(free_ports + allocated_ports, total_before);
                pool.release(handle);
                let free_after: u32 = pool.free_ranges().iter().map(|r| r.port_count()).sum();
                proptest::prop_assert_eq!(free_after, total_before);
            }
        }
    }
}
