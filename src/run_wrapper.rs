//! A simulator wrapper

use std::path::Path;

use env_logger::Env;
use log::{debug, info, warn};

use crate::cpu::{SimPolicy, CPU, NUM_PROCESSORS};
use crate::error::{SimulatorResult, TraceError};
use crate::instruction::{Instruction, Op};
use crate::memory::MEMORY_WORDS;
use crate::metrics::MetricsSnapshot;
use crate::protocol::ProtocolKind;

/// Set up logging for the binaries.
/// `COHERENCE_LOG` overrides the level chosen by the verbose flag.
pub fn init_logger(verbose: bool) {
    let env = Env::default()
        .filter_or("COHERENCE_LOG", if verbose { "debug" } else { "warn" })
        .write_style_or("COHERENCE_LOG_STYLE", "auto");
    // A second initialization is harmless
    if env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .try_init()
        .is_err()
    {
        debug!("Logger already initialized");
    }
}

/// Generate the policy's instructions, replay them and check the caches
pub fn run(policy: SimPolicy) -> SimulatorResult<CPU> {
    policy.validate()?;

    let mut cpu = CPU::make(policy);
    cpu.generate_instructions(policy.instruction_count);
    cpu.run_simulation();
    cpu.bus().verify_coherence()?;

    Ok(cpu)
}

/// Replay a given instruction list instead of a generated one
pub fn run_instructions(
    policy: SimPolicy,
    mut instructions: Vec<Instruction>,
) -> SimulatorResult<CPU> {
    policy.validate()?;

    let mut cpu = CPU::make(policy);
    let n = instructions.len();
    cpu.load_instructions(&mut instructions, n);
    cpu.run_simulation();
    cpu.bus().verify_coherence()?;

    Ok(cpu)
}

/// Run MESI and MOESI over the same memory contents and instructions
pub fn run_comparison(mut policy: SimPolicy) -> SimulatorResult<Vec<CPU>> {
    policy.validate()?;
    if policy.seed.is_none() {
        policy.seed = Some(rand::random());
    }
    info!("Comparing protocols with seed {:?}", policy.seed);

    ProtocolKind::ALL
        .iter()
        .map(|&protocol| run(SimPolicy { protocol, ..policy }))
        .collect()
}

/// Pair each run with its snapshot, for the report writers
pub fn snapshots(cpus: &[CPU]) -> Vec<(ProtocolKind, MetricsSnapshot)> {
    cpus.iter()
        .map(|cpu| (cpu.protocol(), cpu.metrics_snapshot()))
        .collect()
}

fn parse_error(path: &Path, line: usize, reason: String) -> TraceError {
    TraceError::ParseError { path: path.to_path_buf(), line, reason }
}

/// Fetch instructions from a trace file.
/// Each line reads `processor r address` or `processor w address value`;
/// blank lines and `#` comments are skipped.
pub fn fetch_instructions(
    trace_path: impl AsRef<Path>,
) -> SimulatorResult<Vec<Instruction>> {
    let path = trace_path.as_ref();
    let content = std::fs::read_to_string(path)
        .map_err(|e| TraceError::FileReadError(path.to_path_buf(), e))?;
    let mut instructions = Vec::new();

    for (line_num, line) in content.lines().enumerate() {
        let line_num = line_num + 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 3 || parts.len() > 4 {
            return Err(parse_error(
                path,
                line_num,
                "expected 'processor op address [value]'".to_string(),
            )
            .into());
        }

        let processor: usize = parts[0].parse().map_err(|_| {
            parse_error(path, line_num, format!("invalid processor '{}'", parts[0]))
        })?;
        if processor >= NUM_PROCESSORS {
            return Err(parse_error(
                path,
                line_num,
                format!("processor {} out of range 0..{}", processor, NUM_PROCESSORS),
            )
            .into());
        }

        let op = match parts[1] {
            "r" | "R" => Op::Read,
            "w" | "W" => Op::Write,
            other => {
                return Err(parse_error(
                    path,
                    line_num,
                    format!("invalid operation '{}': expected 'r' or 'w'", other),
                )
                .into())
            }
        };

        let address: usize = parts[2].parse().map_err(|_| {
            parse_error(path, line_num, format!("invalid address '{}'", parts[2]))
        })?;
        if address >= MEMORY_WORDS {
            return Err(parse_error(
                path,
                line_num,
                format!("address {} out of range 0..{}", address, MEMORY_WORDS),
            )
            .into());
        }

        let value = match (op, parts.get(3)) {
            (_, Some(raw)) => raw.parse().map_err(|_| {
                parse_error(path, line_num, format!("invalid value '{}'", raw))
            })?,
            (Op::Read, None) => 0,
            (Op::Write, None) => {
                return Err(parse_error(
                    path,
                    line_num,
                    "a write needs a value".to_string(),
                )
                .into())
            }
        };

        instructions.push(Instruction { processor, op, address, value });
    }

    if instructions.is_empty() {
        warn!("Trace '{}' holds no instructions", path.display());
    }
    Ok(instructions)
}

/// Run simulation on the given trace file
pub fn run_trace(
    policy: SimPolicy,
    trace_path: impl AsRef<Path>,
) -> SimulatorResult<CPU> {
    let instructions = fetch_instructions(trace_path)?;
    run_instructions(policy, instructions)
}
