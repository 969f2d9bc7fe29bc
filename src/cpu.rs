//! Simulation driver: wires protocol, memory, bus and processors together
//! and replays an instruction sequence

use log::{info, trace};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::bus::Bus;
use crate::error::{SimulatorError, SimulatorResult};
use crate::instruction::generator::DEFAULT_LOCALITY;
use crate::instruction::{Instruction, InstructionSource, LocalizedSource, UniformSource};
use crate::memory::{SharedMemory, MEMORY_WORDS};
use crate::metrics::{CostModel, MetricsSnapshot};
use crate::protocol::{Protocol, ProtocolKind};

/// Number of processors on the bus
pub const NUM_PROCESSORS: usize = 4;

/// How generated instructions pick their addresses
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AccessPattern {
    #[default]
    Uniform,
    /// Most accesses reuse one hot address
    Localized,
}

/// Run policy
#[derive(Clone, Copy, Debug)]
pub struct SimPolicy {
    pub protocol: ProtocolKind,
    pub instruction_count: usize,
    /// Fixes memory contents and the generated instructions
    pub seed: Option<u64>,
    pub pattern: AccessPattern,
    pub costs: CostModel,
    pub verbose: bool,
    /// Record the miss rate after every instruction
    pub history: bool,
}

impl Default for SimPolicy {
    fn default() -> Self {
        Self {
            protocol: ProtocolKind::Mesi,
            instruction_count: 1000,
            seed: None,
            pattern: AccessPattern::Uniform,
            costs: CostModel::default(),
            verbose: false,
            history: false,
        }
    }
}

impl SimPolicy {
    pub fn validate(&self) -> SimulatorResult<()> {
        if self.instruction_count == 0 {
            return Err(SimulatorError::ConfigError(
                "the instruction count must be a positive integer".to_string(),
            ));
        }
        let costs = &self.costs;
        if costs.cache_access_cycles < costs.compute_cost
            || costs.memory_access_cycles < costs.compute_cost
        {
            return Err(SimulatorError::ConfigError(format!(
                "access costs must not be below the compute cost ({})",
                costs.compute_cost
            )));
        }
        Ok(())
    }
}

/// The simulated machine: one bus, its processors and the instruction
/// sequence to replay
pub struct CPU {
    policy: SimPolicy,
    rng: StdRng,
    bus: Bus,
    instructions: Vec<Instruction>,
    miss_rates: Vec<f64>,
}

impl CPU {
    /// Make a machine with random memory contents
    pub fn make(policy: SimPolicy) -> Self {
        let mut rng = match policy.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let memory = SharedMemory::random(&mut rng, MEMORY_WORDS);
        Self::assemble(policy, memory, rng)
    }

    /// Make a machine over the given memory
    pub fn with_memory(policy: SimPolicy, memory: SharedMemory) -> Self {
        let rng = match policy.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::assemble(policy, memory, rng)
    }

    fn assemble(policy: SimPolicy, memory: SharedMemory, rng: StdRng) -> Self {
        let protocol = Protocol::new(policy.protocol);
        let bus = Bus::make(protocol, memory, NUM_PROCESSORS, policy.costs);
        Self {
            policy,
            rng,
            bus,
            instructions: Vec::new(),
            miss_rates: Vec::new(),
        }
    }

    /// Generate `n` random instructions following the policy's access
    /// pattern, replacing any previous sequence
    pub fn generate_instructions(&mut self, n: usize) {
        let rng = StdRng::seed_from_u64(self.rng.gen());
        let words = self.bus.memory().len();
        self.instructions = match self.policy.pattern {
            AccessPattern::Uniform => {
                UniformSource::new(rng, NUM_PROCESSORS, words).generate(n)
            }
            AccessPattern::Localized => {
                LocalizedSource::new(rng, NUM_PROCESSORS, words, DEFAULT_LOCALITY)
                    .generate(n)
            }
        };
    }

    /// Take up to `n` instructions from any source
    pub fn load_instructions(&mut self, source: &mut impl InstructionSource, n: usize) {
        self.instructions = source.generate(n);
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Replay the sequence in order, each instruction fully resolved before
    /// the next one starts
    pub fn run_simulation(&mut self) {
        for instruction in &self.instructions {
            self.bus.instruction(*instruction);
            if self.policy.history {
                self.miss_rates.push(self.bus.metrics().miss_rate());
            }
            trace!("\n{}", self.bus);
        }

        let metrics = self.bus.metrics();
        info!(
            "{}: {} instructions, {} cycles, {} misses",
            self.policy.protocol,
            metrics.total_instructions,
            metrics.total_cycles,
            metrics.cache_misses
        );
    }

    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.bus.metrics_snapshot()
    }

    /// Miss rate after each replayed instruction; empty unless the policy
    /// asks for history
    pub fn miss_rate_history(&self) -> &[f64] {
        &self.miss_rates
    }

    pub fn protocol(&self) -> ProtocolKind {
        self.policy.protocol
    }

    pub fn policy(&self) -> &SimPolicy {
        &self.policy
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(protocol: ProtocolKind) -> SimPolicy {
        SimPolicy { protocol, seed: Some(11), ..Default::default() }
    }

    #[test]
    fn test_empty_run() {
        let mut cpu = CPU::make(policy(ProtocolKind::Mesi));
        cpu.generate_instructions(0);
        cpu.run_simulation();
        assert_eq!(cpu.metrics_snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_seeded_runs_repeat() {
        let run = || {
            let mut cpu = CPU::make(policy(ProtocolKind::Moesi));
            cpu.generate_instructions(300);
            cpu.run_simulation();
            (cpu.instructions().to_vec(), cpu.metrics_snapshot())
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_generated_counts() {
        let mut cpu = CPU::make(policy(ProtocolKind::Mesi));
        cpu.generate_instructions(250);
        cpu.run_simulation();
        let snapshot = cpu.metrics_snapshot();
        assert_eq!(snapshot.total_instructions, 250);
        assert_eq!(
            snapshot.total_instructions,
            snapshot.load_instructions + snapshot.store_instructions
        );
        assert!(snapshot.cache_misses <= snapshot.total_instructions);
        assert_eq!(snapshot.idle_cycles, snapshot.total_cycles - snapshot.compute_cycles);
        assert!(cpu.bus().verify_coherence().is_ok());
    }

    #[test]
    fn test_localized_pattern() {
        let mut cpu = CPU::make(SimPolicy {
            pattern: AccessPattern::Localized,
            ..policy(ProtocolKind::Mesi)
        });
        cpu.generate_instructions(100);
        assert_eq!(cpu.instructions().len(), 100);
    }

    #[test]
    fn test_history_tracks_every_instruction() {
        let mut cpu = CPU::with_memory(
            SimPolicy { history: true, ..policy(ProtocolKind::Mesi) },
            SharedMemory::make(vec![0; MEMORY_WORDS]),
        );
        let mut list = vec![
            Instruction::read(0, 0),
            Instruction::read(0, 0),
            Instruction::read(0, 0),
            Instruction::read(0, 0),
        ];
        cpu.load_instructions(&mut list, 4);
        cpu.run_simulation();
        assert_eq!(cpu.miss_rate_history(), &[1.0, 0.5, 1.0 / 3.0, 0.25]);
    }

    #[test]
    fn test_history_off_by_default() {
        let mut cpu = CPU::make(policy(ProtocolKind::Mesi));
        cpu.generate_instructions(10);
        cpu.run_simulation();
        assert!(cpu.miss_rate_history().is_empty());
    }

    #[test]
    fn test_validate() {
        assert!(SimPolicy::default().validate().is_ok());
        let zero = SimPolicy { instruction_count: 0, ..Default::default() };
        assert!(matches!(zero.validate(), Err(SimulatorError::ConfigError(_))));
        let cheap = SimPolicy {
            costs: CostModel { cache_access_cycles: 0, ..Default::default() },
            ..Default::default()
        };
        assert!(cheap.validate().is_err());
    }
}
