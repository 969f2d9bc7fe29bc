use coherence_lib::bus::Bus;
use coherence_lib::cpu::{AccessPattern, SimPolicy, CPU};
use coherence_lib::instruction::Instruction;
use coherence_lib::memory::SharedMemory;
use coherence_lib::metrics::CostModel;
use coherence_lib::protocol::{CacheState, Protocol, ProtocolKind};
use coherence_lib::run_wrapper::{run, run_comparison, run_instructions};

fn make_bus(kind: ProtocolKind) -> Bus {
    Bus::make(
        Protocol::new(kind),
        SharedMemory::make(vec![5, 6, 7, 8]),
        4,
        CostModel::default(),
    )
}

fn state_of(bus: &Bus, id: usize) -> CacheState {
    bus.processor(id).cache().state()
}

#[test]
fn test_random_runs_keep_counters_consistent() {
    for protocol in ProtocolKind::ALL {
        for pattern in [AccessPattern::Uniform, AccessPattern::Localized] {
            for seed in 0..8 {
                let policy = SimPolicy {
                    protocol,
                    pattern,
                    instruction_count: 500,
                    seed: Some(seed),
                    ..Default::default()
                };
                let cpu = run(policy).unwrap();
                let s = cpu.metrics_snapshot();
                assert_eq!(s.total_instructions, 500);
                assert_eq!(s.total_instructions, s.load_instructions + s.store_instructions);
                assert!(s.cache_misses <= s.total_instructions);
                assert_eq!(s.compute_cycles, 500);
                assert_eq!(s.idle_cycles, s.total_cycles - s.compute_cycles);
                assert!(cpu.bus().verify_coherence().is_ok());
            }
        }
    }
}

#[test]
fn test_no_owner_without_moesi() {
    let cpu = run(SimPolicy {
        instruction_count: 1000,
        seed: Some(3),
        ..Default::default()
    })
    .unwrap();
    for processor in cpu.bus().processors() {
        assert_ne!(processor.cache().state(), CacheState::Owned);
    }
}

#[test]
fn test_empty_run_reports_zero() {
    let cpu = run_instructions(SimPolicy::default(), Vec::new()).unwrap();
    let s = cpu.metrics_snapshot();
    assert_eq!(s.total_instructions, 0);
    assert_eq!(s.total_cycles, 0);
    assert_eq!(s.miss_rate, 0.0);
}

#[test]
fn test_write_then_read_returns_value() {
    for protocol in ProtocolKind::ALL {
        let mut bus = make_bus(protocol);
        bus.instruction(Instruction::write(2, 3, 900));
        let misses = bus.metrics().cache_misses;
        assert_eq!(bus.instruction(Instruction::read(2, 3)), Some(900));
        assert_eq!(bus.metrics().cache_misses, misses);
    }
}

#[test]
fn test_write_then_peer_read_flushes_once() {
    let mut bus = make_bus(ProtocolKind::Mesi);
    bus.instruction(Instruction::write(0, 1, 42));
    assert_eq!(state_of(&bus, 0), CacheState::Exclusive);
    assert_eq!(bus.metrics().cache_misses, 1);
    assert!(bus.memory().is_dirty(1));

    let costs = bus.costs();
    let before = bus.metrics().total_cycles;
    assert_eq!(bus.instruction(Instruction::read(1, 1)), Some(42));

    // miss penalty, one snoop and one flush
    assert_eq!(
        bus.metrics().total_cycles - before,
        costs.memory_access_cycles + costs.bus_cycles + costs.memory_access_cycles
    );
    assert_eq!(state_of(&bus, 0), CacheState::Shared);
    assert_eq!(state_of(&bus, 1), CacheState::Shared);
    assert_eq!(bus.memory().read(1), 42);
    assert!(!bus.memory().is_dirty(1));
}

#[test]
fn test_modified_writer_becomes_owner_under_moesi() {
    let mut bus = make_bus(ProtocolKind::Moesi);
    bus.instruction(Instruction::write(0, 2, 1));
    bus.instruction(Instruction::write(0, 2, 2));
    assert_eq!(state_of(&bus, 0), CacheState::Modified);

    assert_eq!(bus.instruction(Instruction::read(1, 2)), Some(2));
    assert_eq!(state_of(&bus, 0), CacheState::Owned);
    assert_eq!(state_of(&bus, 1), CacheState::Shared);
    assert!(!bus.memory().is_dirty(2));
    assert!(bus.verify_coherence().is_ok());
}

#[test]
fn test_clean_peer_read_does_not_flush() {
    let mut bus = make_bus(ProtocolKind::Mesi);
    bus.instruction(Instruction::read(0, 0));
    let before = bus.metrics().total_cycles;
    bus.instruction(Instruction::read(1, 0));
    let costs = bus.costs();
    assert_eq!(
        bus.metrics().total_cycles - before,
        costs.memory_access_cycles + costs.bus_cycles
    );
}

#[test]
fn test_repeated_reads_add_no_misses() {
    let mut bus = make_bus(ProtocolKind::Moesi);
    bus.instruction(Instruction::read(0, 2));
    let misses = bus.metrics().cache_misses;

    for _ in 0..10 {
        assert_eq!(bus.instruction(Instruction::read(0, 2)), Some(7));
        // Peers reading the same word or touching others do not matter
        bus.instruction(Instruction::read(3, 2));
        bus.instruction(Instruction::write(1, 0, 11));
    }
    let peer_misses = 2;
    assert_eq!(bus.metrics().cache_misses, misses + peer_misses);

    // A peer write invalidates the line. The refetch is not counted as a
    // miss because the line is still tagged with the address.
    bus.instruction(Instruction::write(2, 2, 13));
    let misses = bus.metrics().cache_misses;
    assert_eq!(bus.instruction(Instruction::read(0, 2)), Some(13));
    assert_eq!(bus.metrics().cache_misses, misses);
    assert_eq!(state_of(&bus, 0), CacheState::Shared);
}

#[test]
fn test_comparison_runs_are_independent() {
    let policy = SimPolicy { instruction_count: 300, seed: Some(8), ..Default::default() };
    let cpus = run_comparison(policy).unwrap();
    let again = run_comparison(policy).unwrap();
    for (a, b) in cpus.iter().zip(again.iter()) {
        assert_eq!(a.metrics_snapshot(), b.metrics_snapshot());
    }
}

#[test]
fn test_memory_only_changes_through_flushes() {
    let mut cpu = CPU::with_memory(
        SimPolicy { seed: Some(1), ..Default::default() },
        SharedMemory::make(vec![1, 2, 3, 4]),
    );
    let mut list = vec![Instruction::write(0, 0, 50), Instruction::write(0, 0, 60)];
    cpu.load_instructions(&mut list, 2);
    cpu.run_simulation();
    // Still cached, not yet written back
    assert_eq!(cpu.bus().memory().read(0), 1);
    assert!(cpu.bus().memory().is_dirty(0));
}
