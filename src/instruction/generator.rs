//! Instruction sources: provided lists and random generators

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{Instruction, Op};
use crate::memory::VALUE_MAX;

/// Share of localized instructions that reuse the hot address
pub const DEFAULT_LOCALITY: f64 = 0.8;

/// Produces the instruction sequence of a run
pub trait InstructionSource {
    /// Produce up to `n` instructions, in replay order
    fn generate(&mut self, n: usize) -> Vec<Instruction>;
}

/// A provided list is replayed as given, front first
impl InstructionSource for Vec<Instruction> {
    fn generate(&mut self, n: usize) -> Vec<Instruction> {
        let n = n.min(self.len());
        self.drain(..n).collect()
    }
}

fn random_instruction(
    rng: &mut StdRng,
    processors: usize,
    address: usize,
) -> Instruction {
    let processor = rng.gen_range(0..processors);
    let op = if rng.gen_bool(0.5) { Op::Write } else { Op::Read };
    let value = rng.gen_range(0..=VALUE_MAX);
    Instruction { processor, op, address, value }
}

/// Processor, operation, address and value all drawn uniformly
#[derive(Debug)]
pub struct UniformSource {
    rng: StdRng,
    processors: usize,
    words: usize,
}

impl UniformSource {
    pub fn new(rng: StdRng, processors: usize, words: usize) -> Self {
        assert!(processors > 0 && words > 0);
        Self { rng, processors, words }
    }

    pub fn seeded(seed: u64, processors: usize, words: usize) -> Self {
        Self::new(StdRng::seed_from_u64(seed), processors, words)
    }
}

impl InstructionSource for UniformSource {
    fn generate(&mut self, n: usize) -> Vec<Instruction> {
        (0..n)
            .map(|_| {
                let address = self.rng.gen_range(0..self.words);
                random_instruction(&mut self.rng, self.processors, address)
            })
            .collect()
    }
}

/// Most instructions hit one hot address, the rest are spread uniformly
#[derive(Debug)]
pub struct LocalizedSource {
    rng: StdRng,
    processors: usize,
    words: usize,
    hot_address: usize,
    locality: f64,
}

impl LocalizedSource {
    pub fn new(
        mut rng: StdRng,
        processors: usize,
        words: usize,
        locality: f64,
    ) -> Self {
        assert!(processors > 0 && words > 0);
        assert!((0.0..=1.0).contains(&locality));
        let hot_address = rng.gen_range(0..words);
        Self { rng, processors, words, hot_address, locality }
    }

    pub fn seeded(seed: u64, processors: usize, words: usize) -> Self {
        Self::new(
            StdRng::seed_from_u64(seed),
            processors,
            words,
            DEFAULT_LOCALITY,
        )
    }

    pub fn hot_address(&self) -> usize {
        self.hot_address
    }
}

impl InstructionSource for LocalizedSource {
    fn generate(&mut self, n: usize) -> Vec<Instruction> {
        (0..n)
            .map(|_| {
                let address = if self.rng.gen_bool(self.locality) {
                    self.hot_address
                } else {
                    self.rng.gen_range(0..self.words)
                };
                random_instruction(&mut self.rng, self.processors, address)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_source_keeps_order() {
        let mut list = vec![
            Instruction::write(0, 1, 5),
            Instruction::read(1, 1),
            Instruction::read(2, 3),
        ];
        let first = list.generate(2);
        assert_eq!(first, vec![Instruction::write(0, 1, 5), Instruction::read(1, 1)]);
        // Asking for more than is left returns the remainder
        assert_eq!(list.generate(5), vec![Instruction::read(2, 3)]);
        assert!(list.generate(1).is_empty());
    }

    #[test]
    fn test_uniform_in_range() {
        let mut source = UniformSource::seeded(1, 4, 4);
        let instructions = source.generate(500);
        assert_eq!(instructions.len(), 500);
        for inst in &instructions {
            assert!(inst.processor < 4);
            assert!(inst.address < 4);
            assert!((0..=VALUE_MAX).contains(&inst.value));
        }
        assert!(instructions.iter().any(|i| i.op == Op::Read));
        assert!(instructions.iter().any(|i| i.op == Op::Write));
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let a = UniformSource::seeded(99, 4, 4).generate(50);
        let b = UniformSource::seeded(99, 4, 4).generate(50);
        assert_eq!(a, b);
    }

    #[test]
    fn test_localized_prefers_hot_address() {
        let mut source = LocalizedSource::seeded(3, 4, 4);
        let hot = source.hot_address();
        let instructions = source.generate(1000);
        let hot_count = instructions.iter().filter(|i| i.address == hot).count();
        // 80% reuse plus a quarter of the uniform remainder
        assert!(hot_count > 700, "hot address used {} times", hot_count);
    }
}
