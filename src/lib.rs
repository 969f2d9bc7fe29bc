pub mod bus;
pub mod cpu;
pub mod instruction;
pub mod memory;
pub mod metrics;
pub mod processor;
pub mod protocol;
pub mod report;
pub mod run_wrapper;

pub mod error;
