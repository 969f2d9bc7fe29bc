use std::env;
use std::io::{self, Write};
use std::process;

use coherence_lib::cpu::{AccessPattern, SimPolicy, CPU};
use coherence_lib::error::{SimulatorError, SimulatorResult};
use coherence_lib::protocol::ProtocolKind;
use coherence_lib::run_wrapper;
use text_io::try_read;

const USAGE: &str = "\
Usage: sim [options]
  -p <MESI|MOESI>  coherence protocol (prompted when absent)
  -n <count>       number of generated instructions (prompted when absent)
  -s <seed>        seed for memory contents and instructions
  -t <trace>       replay a trace file instead of generating instructions
  -l               localized access pattern
  -c               run every protocol over the same instructions
  -v               verbose logging
  -h               print the miss rate after every instruction";

fn main() {
    if let Err(e) = run_cli() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn prompt(message: &str) -> SimulatorResult<String> {
    print!("{}", message);
    io::stdout().flush()?;
    let answer: String = try_read!("{}\n").map_err(|e| {
        SimulatorError::ConfigError(format!("failed to read input: {}", e))
    })?;
    Ok(answer.trim().to_string())
}

fn parse_count(raw: &str) -> SimulatorResult<usize> {
    match raw.trim().parse::<i64>() {
        Ok(n) if n > 0 => Ok(n as usize),
        _ => Err(SimulatorError::ConfigError(format!(
            "'{}' is not a positive instruction count",
            raw.trim()
        ))),
    }
}

fn next_value(args: &mut impl Iterator<Item = String>, flag: &str) -> SimulatorResult<String> {
    args.next().ok_or_else(|| {
        SimulatorError::ConfigError(format!("You should specify a value after {}", flag))
    })
}

fn report(cpu: &CPU) {
    println!("Protocol: {}", cpu.protocol());
    println!("{}", cpu.metrics_snapshot());
    for (i, rate) in cpu.miss_rate_history().iter().enumerate() {
        eprintln!("[HISTORY] {} {}: {:.4}", cpu.protocol(), i + 1, rate);
    }
}

fn run_cli() -> SimulatorResult<()> {
    let mut args = env::args().skip(1);
    let mut policy = SimPolicy::default();
    let mut protocol_arg: Option<String> = None;
    let mut count_arg: Option<String> = None;
    let mut trace_path: Option<String> = None;
    let mut compare = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-p" => protocol_arg = Some(next_value(&mut args, "-p")?),
            "-n" => count_arg = Some(next_value(&mut args, "-n")?),
            "-s" => {
                let raw = next_value(&mut args, "-s")?;
                let seed = raw.parse().map_err(|_| {
                    SimulatorError::ConfigError(format!("invalid seed '{}'", raw))
                })?;
                policy.seed = Some(seed);
            }
            "-t" => trace_path = Some(next_value(&mut args, "-t")?),
            "-l" => policy.pattern = AccessPattern::Localized,
            "-c" => compare = true,
            "-v" => policy.verbose = true,
            "-h" => policy.history = true,
            "--help" => {
                println!("{}", USAGE);
                return Ok(());
            }
            _ => {
                return Err(SimulatorError::ConfigError(format!(
                    "Unknown parameter: {}\n{}",
                    arg, USAGE
                )))
            }
        }
    }

    run_wrapper::init_logger(policy.verbose);

    if let Some(path) = trace_path {
        if !compare {
            let raw = match protocol_arg {
                Some(raw) => raw,
                None => prompt("Protocol (MESI/MOESI): ")?,
            };
            policy.protocol = ProtocolKind::parse_or_default(&raw);
        }
        let protocols: Vec<ProtocolKind> = if compare {
            ProtocolKind::ALL.to_vec()
        } else {
            vec![policy.protocol]
        };
        for protocol in protocols {
            let cpu = run_wrapper::run_trace(SimPolicy { protocol, ..policy }, &path)?;
            report(&cpu);
        }
        return Ok(());
    }

    let raw_count = match count_arg {
        Some(raw) => raw,
        None => prompt("Number of instructions: ")?,
    };
    policy.instruction_count = parse_count(&raw_count)?;

    if compare {
        for cpu in run_wrapper::run_comparison(policy)? {
            report(&cpu);
        }
        return Ok(());
    }

    let raw = match protocol_arg {
        Some(raw) => raw,
        None => prompt("Protocol (MESI/MOESI): ")?,
    };
    policy.protocol = ProtocolKind::parse_or_default(&raw);

    let cpu = run_wrapper::run(policy)?;
    report(&cpu);

    Ok(())
}
