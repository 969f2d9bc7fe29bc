//! Instruction representation

use std::fmt;

pub mod generator;

pub use generator::{InstructionSource, LocalizedSource, UniformSource};

/// Memory operation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    Read,
    Write,
}

/// One instruction of the replayed sequence
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Instruction {
    /// Index of the issuing processor
    pub processor: usize,
    pub op: Op,
    /// Word index in shared memory
    pub address: usize,
    /// Value to store; ignored by reads
    pub value: i32,
}

impl Instruction {
    pub fn read(processor: usize, address: usize) -> Self {
        Self { processor, op: Op::Read, address, value: 0 }
    }

    pub fn write(processor: usize, address: usize, value: i32) -> Self {
        Self { processor, op: Op::Write, address, value }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.op {
            Op::Read => {
                write!(f, "P{} reads address {}", self.processor, self.address)
            }
            Op::Write => write!(
                f,
                "P{} writes {} to address {}",
                self.processor, self.value, self.address
            ),
        }
    }
}
