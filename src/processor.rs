//! Processor: the per-line coherence algorithm

use log::debug;

use crate::bus::Bus;
use crate::memory::cache::Cache;
use crate::protocol::{CacheState, Protocol};

/// A processor owns one cache and talks to its peers through the bus.
/// Its id is its index on the bus.
#[derive(Clone, Debug)]
pub struct Processor {
    id: usize,
    cache: Cache,
}

impl Processor {
    pub fn make(id: usize, protocol: Protocol) -> Self {
        Self { id, cache: Cache::make(protocol) }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    pub(crate) fn cache_mut(&mut self) -> &mut Cache {
        &mut self.cache
    }

    /// Write `value` to `address`
    pub(crate) fn write_value(&mut self, bus: &mut Bus, address: usize, value: i32) {
        bus.charge_access(self.cache.is_miss(address));

        if self.cache.holds(address) {
            match self.cache.state() {
                CacheState::Modified => {
                    // Sole dirty owner already
                    self.cache.store(value);
                    return;
                }
                state @ (CacheState::Shared
                | CacheState::Exclusive
                | CacheState::Owned) => {
                    debug!("P{}: {} -> M (write hit, address {})", self.id, state, address);
                    self.cache.set_state(CacheState::Modified);
                    self.cache.store(value);
                    bus.memory_mut().mark_dirty(address);
                    bus.bus_snoop(self.id, address);
                    return;
                }
                // Invalidated by a peer since the last access
                CacheState::Invalid => {}
            }
        } else {
            self.evict(bus);
        }

        self.acquire_for_write(bus, address, value);
    }

    /// Read `address`, returning the value the cache now holds
    pub(crate) fn read_value(&mut self, bus: &mut Bus, address: usize) -> i32 {
        let miss = self.cache.is_miss(address);
        bus.charge_access(miss);

        if let Some(line) = self.cache.line() {
            // Owned lines are returned as is; the local copy is current
            if self.cache.is_valid_for(address) {
                return line.value;
            }
            if line.address != address {
                self.evict(bus);
            }
        }
        if !miss {
            // Charged as a hit but the word still comes from memory
            bus.charge_refill();
        }

        let shared = bus.read_bus_snoop(self.id, address);
        let value = bus.memory().read(address);
        let state = if shared {
            CacheState::Shared
        } else {
            CacheState::Exclusive
        };
        debug!(
            "P{}: {} -> {} (read fill, address {})",
            self.id,
            self.cache.state(),
            state,
            address
        );
        self.cache.fill(address, value, state);
        value
    }

    /// Take the line for a write: invalidate peers, then become its only
    /// holder. Exclusive when nobody else had it, Modified otherwise.
    fn acquire_for_write(&mut self, bus: &mut Bus, address: usize, value: i32) {
        let held_elsewhere = bus.bus_snoop(self.id, address);
        let state = if held_elsewhere {
            CacheState::Modified
        } else {
            CacheState::Exclusive
        };
        debug!(
            "P{}: {} -> {} (write fill, address {})",
            self.id,
            self.cache.state(),
            state,
            address
        );
        self.cache.fill(address, value, state);
        bus.memory_mut().mark_dirty(address);
    }

    /// Drop the current line before it is replaced, writing it back when it
    /// carries data newer than memory
    fn evict(&mut self, bus: &mut Bus) {
        let Some(line) = self.cache.line() else {
            return;
        };
        let state = self.cache.state();
        // A freshly written Exclusive line also owns its dirty word
        let dirty_exclusive =
            state == CacheState::Exclusive && bus.memory().is_dirty(line.address);
        if state.is_owner() || dirty_exclusive {
            debug!(
                "P{} writes back {} to address {} ({})",
                self.id, line.value, line.address, state
            );
            bus.memory_mut().write_back(line.address, line.value);
        }
    }
}
