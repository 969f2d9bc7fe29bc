//! Memory structure

pub mod cache;

use rand::Rng;

/// Number of words in shared memory
pub const MEMORY_WORDS: usize = 4;
/// Largest value a word or an instruction may carry
pub const VALUE_MAX: i32 = 1000;

/// Shared backing store with a clean/dirty flag per word.
/// A dirty word has a newer value sitting in some cache.
#[derive(Clone, Debug)]
pub struct SharedMemory {
    words: Vec<i32>,
    dirty: Vec<bool>,
}

impl SharedMemory {
    /// Make a memory holding the given words, all clean
    pub fn make(words: Vec<i32>) -> Self {
        assert!(!words.is_empty(), "shared memory must have at least one word");
        let dirty = vec![false; words.len()];
        Self { words, dirty }
    }

    /// Make a memory of `len` words with random contents in `0..=VALUE_MAX`
    pub fn random(rng: &mut impl Rng, len: usize) -> Self {
        Self::make((0..len).map(|_| rng.gen_range(0..=VALUE_MAX)).collect())
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    fn check(&self, address: usize) {
        assert!(
            address < self.words.len(),
            "address {} out of range (memory has {} words)",
            address,
            self.words.len()
        );
    }

    pub fn read(&self, address: usize) -> i32 {
        self.check(address);
        self.words[address]
    }

    pub fn is_dirty(&self, address: usize) -> bool {
        self.check(address);
        self.dirty[address]
    }

    pub fn mark_dirty(&mut self, address: usize) {
        self.check(address);
        self.dirty[address] = true;
    }

    /// Flush a cached value into memory; the word becomes clean
    pub fn write_back(&mut self, address: usize, value: i32) {
        self.check(address);
        self.words[address] = value;
        self.dirty[address] = false;
    }

    pub fn words(&self) -> &[i32] {
        &self.words
    }

    pub fn dirty_flags(&self) -> &[bool] {
        &self.dirty
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_write_back_clears_dirty() {
        let mut memory = SharedMemory::make(vec![1, 2, 3, 4]);
        assert!(!memory.is_dirty(2));

        memory.mark_dirty(2);
        assert!(memory.is_dirty(2));
        assert_eq!(memory.read(2), 3);

        memory.write_back(2, 42);
        assert!(!memory.is_dirty(2));
        assert_eq!(memory.read(2), 42);
    }

    #[test]
    fn test_random_contents_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let memory = SharedMemory::random(&mut rng, MEMORY_WORDS);
        assert_eq!(memory.len(), MEMORY_WORDS);
        assert!(memory.words().iter().all(|w| (0..=VALUE_MAX).contains(w)));
        assert!(memory.dirty_flags().iter().all(|d| !d));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_out_of_range_is_fatal() {
        let memory = SharedMemory::make(vec![0; MEMORY_WORDS]);
        memory.read(MEMORY_WORDS);
    }
}
