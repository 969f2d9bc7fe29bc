//! Single-line cache held by one processor

use crate::protocol::{CacheState, Protocol};

/// The populated part of a cache line. A value never exists without
/// an address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Line {
    pub address: usize,
    pub value: i32,
}

/// Cache implementation
#[derive(Clone, Debug)]
pub struct Cache {
    protocol: Protocol,
    state: CacheState,
    // None until the first fill
    line: Option<Line>,
}

impl Cache {
    /// Make a cold cache
    pub fn make(protocol: Protocol) -> Self {
        Self {
            protocol,
            state: CacheState::Invalid,
            line: None,
        }
    }

    pub fn state(&self) -> CacheState {
        self.state
    }

    pub fn line(&self) -> Option<Line> {
        self.line
    }

    pub fn address(&self) -> Option<usize> {
        self.line.map(|line| line.address)
    }

    pub fn value(&self) -> Option<i32> {
        self.line.map(|line| line.value)
    }

    pub fn is_cold(&self) -> bool {
        self.line.is_none()
    }

    /// The line is tagged with `address`, whatever its state
    pub fn holds(&self, address: usize) -> bool {
        self.address() == Some(address)
    }

    /// The line is tagged with `address` and still usable
    pub fn is_valid_for(&self, address: usize) -> bool {
        self.holds(address) && self.state.is_valid()
    }

    /// Miss condition of the cost model: the line is tagged with another
    /// address (or nothing) and is Invalid
    pub fn is_miss(&self, address: usize) -> bool {
        !self.holds(address) && self.state == CacheState::Invalid
    }

    pub fn set_state(&mut self, state: CacheState) {
        assert!(
            self.protocol.allows(state),
            "state {} is not part of {}",
            state,
            self.protocol.kind()
        );
        assert!(
            self.line.is_some() || state == CacheState::Invalid,
            "a cold line can only be Invalid"
        );
        self.state = state;
    }

    /// Replace the line contents
    pub fn fill(&mut self, address: usize, value: i32, state: CacheState) {
        self.line = Some(Line { address, value });
        self.set_state(state);
    }

    /// Update the value of the line already held
    pub fn store(&mut self, value: i32) {
        match &mut self.line {
            Some(line) => line.value = value,
            None => panic!("store into a cold cache line"),
        }
    }
}
