//! Snooping bus: instruction dispatch, snoop broadcasts and cycle accounting

use std::fmt;

use log::debug;

use crate::error::CoherenceError;
use crate::instruction::{Instruction, Op};
use crate::memory::SharedMemory;
use crate::metrics::{CostModel, Metrics, MetricsSnapshot};
use crate::processor::Processor;
use crate::protocol::{CacheState, Protocol};

/// The bus owns shared memory and every processor.
/// Processors reach back to it by id only.
pub struct Bus {
    protocol: Protocol,
    memory: SharedMemory,
    costs: CostModel,
    metrics: Metrics,
    processors: Vec<Processor>,
    // Kept for status reports only
    last_instruction: Option<Instruction>,
}

impl Bus {
    pub fn make(
        protocol: Protocol,
        memory: SharedMemory,
        num_processors: usize,
        costs: CostModel,
    ) -> Self {
        assert!(num_processors > 0, "the bus needs at least one processor");
        // Every access costs at least as much as its compute share
        assert!(costs.cache_access_cycles >= costs.compute_cost);
        assert!(costs.memory_access_cycles >= costs.compute_cost);

        let processors = (0..num_processors)
            .map(|id| Processor::make(id, protocol))
            .collect();
        Self {
            protocol,
            memory,
            costs,
            metrics: Metrics::new(),
            processors,
            last_instruction: None,
        }
    }

    /// Dispatch one instruction to its processor and resolve it completely.
    /// Returns the value observed by a read.
    pub fn instruction(&mut self, instruction: Instruction) -> Option<i32> {
        let Instruction { processor: id, op, address, value } = instruction;
        assert!(
            id < self.processors.len(),
            "processor {} out of range ({} processors)",
            id,
            self.processors.len()
        );
        assert!(
            address < self.memory.len(),
            "address {} out of range ({} words)",
            address,
            self.memory.len()
        );

        self.last_instruction = Some(instruction);
        self.metrics.total_instructions += 1;

        // Take the processor out of the list so it can drive the bus.
        // Snoops skip the requester, so the placeholder is never observed.
        let placeholder = Processor::make(id, self.protocol);
        let mut processor = std::mem::replace(&mut self.processors[id], placeholder);
        let observed = match op {
            Op::Read => {
                self.metrics.load_instructions += 1;
                Some(processor.read_value(self, address))
            }
            Op::Write => {
                self.metrics.store_instructions += 1;
                processor.write_value(self, address, value);
                None
            }
        };
        self.processors[id] = processor;
        observed
    }

    /// Invalidating snoop issued on writes. Under MOESI a Modified peer is
    /// demoted to Owned; every other peer holding the address becomes
    /// Invalid. Returns whether any peer held the address.
    pub fn bus_snoop(&mut self, requesting_id: usize, address: usize) -> bool {
        self.metrics.total_cycles += self.costs.bus_cycles;
        let demote_to_owned = self.protocol.has_owned_state();

        let mut held = false;
        for peer in self.processors.iter_mut() {
            if peer.id() == requesting_id || !peer.cache().holds(address) {
                continue;
            }
            let state = peer.cache().state();
            let next = if demote_to_owned && state == CacheState::Modified {
                CacheState::Owned
            } else {
                CacheState::Invalid
            };
            debug!(
                "P{}: {} -> {} (write snoop, address {})",
                peer.id(),
                state,
                next,
                address
            );
            peer.cache_mut().set_state(next);
            held = true;
        }
        held
    }

    /// Shared snoop issued on read misses. Live peers move to Shared
    /// (Modified to Owned under MOESI); a dirty word is flushed from the
    /// first live peer. Returns whether any peer held a live copy.
    pub fn read_bus_snoop(&mut self, requesting_id: usize, address: usize) -> bool {
        self.metrics.total_cycles += self.costs.bus_cycles;
        let demote_to_owned = self.protocol.has_owned_state();

        let mut shared = false;
        for peer in self.processors.iter_mut() {
            if peer.id() == requesting_id || !peer.cache().is_valid_for(address) {
                continue;
            }
            let Some(line) = peer.cache().line() else {
                continue;
            };
            let state = peer.cache().state();
            let next = if demote_to_owned && state == CacheState::Modified {
                CacheState::Owned
            } else {
                CacheState::Shared
            };
            debug!(
                "P{}: {} -> {} (read snoop, address {})",
                peer.id(),
                state,
                next,
                address
            );
            peer.cache_mut().set_state(next);

            if self.memory.is_dirty(address) {
                debug!("P{} flushes {} to address {}", peer.id(), line.value, address);
                self.memory.write_back(address, line.value);
                self.metrics.total_cycles += self.costs.memory_access_cycles;
            }
            shared = true;
        }
        shared
    }

    /// Charge one cache access: the miss penalty or a hit, plus compute
    pub(crate) fn charge_access(&mut self, miss: bool) {
        if miss {
            self.metrics.cache_misses += 1;
            self.metrics.total_cycles += self.costs.memory_access_cycles;
        } else {
            self.metrics.total_cycles += self.costs.cache_access_cycles;
        }
        self.metrics.compute_cycles += self.costs.compute_cost;
    }

    /// Charge a memory load that was accounted as a hit
    pub(crate) fn charge_refill(&mut self) {
        self.metrics.total_cycles += self.costs.memory_access_cycles;
    }

    pub(crate) fn memory_mut(&mut self) -> &mut SharedMemory {
        &mut self.memory
    }

    pub fn memory(&self) -> &SharedMemory {
        &self.memory
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn costs(&self) -> CostModel {
        self.costs
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn processors(&self) -> &[Processor] {
        &self.processors
    }

    pub fn processor(&self, id: usize) -> &Processor {
        &self.processors[id]
    }

    pub fn last_instruction(&self) -> Option<Instruction> {
        self.last_instruction
    }

    /// Check the caches against the protocol: legal states only, and at
    /// most one Modified and one Owned copy of each address.
    /// An Owned copy next to a Modified one is accepted: the write snoop
    /// demotes a Modified peer to Owned before the writer takes the line.
    pub fn verify_coherence(&self) -> Result<(), CoherenceError> {
        for processor in &self.processors {
            let state = processor.cache().state();
            if !self.protocol.allows(state) {
                return Err(CoherenceError::IllegalState {
                    processor: processor.id(),
                    state,
                    protocol: self.protocol.kind(),
                });
            }
        }

        for address in 0..self.memory.len() {
            let holders = self.holders(address, CacheState::Modified);
            if holders.len() > 1 {
                return Err(CoherenceError::MultipleModified { address, holders });
            }
            let holders = self.holders(address, CacheState::Owned);
            if holders.len() > 1 {
                return Err(CoherenceError::MultipleOwned { address, holders });
            }
        }
        Ok(())
    }

    /// Ids of the processors holding `address` in `state`
    pub fn holders(&self, address: usize, state: CacheState) -> Vec<usize> {
        self.processors
            .iter()
            .filter(|p| p.cache().holds(address) && p.cache().state() == state)
            .map(|p| p.id())
            .collect()
    }
}

impl fmt::Display for Bus {
    /// Status dump: memory, last instruction and every cache line
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Protocol: {}", self.protocol.kind())?;
        writeln!(f, "Main memory: {:?}", self.memory.words())?;
        writeln!(f, "Dirty words: {:?}", self.memory.dirty_flags())?;
        if let Some(instruction) = self.last_instruction {
            writeln!(f, "Instruction: {}", instruction)?;
        }
        for processor in &self.processors {
            let cache = processor.cache();
            let (address, value) = match cache.line() {
                Some(line) => (line.address.to_string(), line.value.to_string()),
                None => ("empty".to_string(), "empty".to_string()),
            };
            write!(
                f,
                "\nProcessor {}: state {}, address {}, value {}",
                processor.id(),
                cache.state(),
                address,
                value
            )?;
        }
        Ok(())
    }
}
