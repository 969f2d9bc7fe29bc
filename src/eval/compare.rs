use std::fs;
use std::process;

use coherence_lib::cpu::SimPolicy;
use coherence_lib::error::{SimulatorError, SimulatorResult};
use coherence_lib::report::{write_comparison_csv, write_results};
use coherence_lib::run_wrapper::{init_logger, run_comparison, snapshots};

fn main() {
    if let Err(e) = run_eval() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run_eval() -> SimulatorResult<()> {
    init_logger(false);

    let param_tokens: Vec<String> = std::env::args().collect();
    let mut policy = SimPolicy::default();
    if let Some(raw) = param_tokens.get(1) {
        policy.instruction_count = raw.parse().map_err(|_| {
            SimulatorError::ConfigError(format!("invalid instruction count '{}'", raw))
        })?;
    }
    if let Some(raw) = param_tokens.get(2) {
        let seed = raw.parse().map_err(|_| {
            SimulatorError::ConfigError(format!("invalid seed '{}'", raw))
        })?;
        policy.seed = Some(seed);
    }

    let cpus = run_comparison(policy)?;
    let results = snapshots(&cpus);
    for (protocol, snapshot) in &results {
        eprintln!("{}:\n{}\n", protocol, snapshot);
    }

    fs::create_dir_all("eval")?;
    write_comparison_csv("eval/compare_eval.csv", &results)?;
    write_results("eval/results.txt", &results)?;
    eprintln!("Wrote eval/compare_eval.csv and eval/results.txt");

    Ok(())
}
