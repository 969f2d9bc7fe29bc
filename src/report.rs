//! Result files shared by the evaluation binaries.
//!
//! `compare-eval` writes one CSV row per protocol plus a `KEY VALUE`
//! results file; `chart-eval` reads the latter back.

use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use crate::error::{ResultsError, SimulatorResult};
use crate::metrics::MetricsSnapshot;
use crate::protocol::ProtocolKind;

pub const MISS_RATE_KEY: &str = "Miss_Rate";
pub const CACHE_MISSES_KEY: &str = "Cache_Misses";
pub const TOTAL_INSTRUCTIONS_KEY: &str = "Total_Instructions";

/// `Miss_Rate_MESI` and friends
pub fn result_key(metric: &str, protocol: ProtocolKind) -> String {
    format!("{}_{}", metric, protocol)
}

/// Write the per-protocol summary as `KEY VALUE` lines
pub fn write_results(
    path: impl AsRef<Path>,
    results: &[(ProtocolKind, MetricsSnapshot)],
) -> SimulatorResult<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b' ')
        .has_headers(false)
        .from_path(path)?;

    for (protocol, snapshot) in results {
        writer.write_record([
            result_key(MISS_RATE_KEY, *protocol),
            format!("{:.6}", snapshot.miss_rate),
        ])?;
        writer.write_record([
            result_key(CACHE_MISSES_KEY, *protocol),
            snapshot.cache_misses.to_string(),
        ])?;
        writer.write_record([
            result_key(TOTAL_INSTRUCTIONS_KEY, *protocol),
            snapshot.total_instructions.to_string(),
        ])?;
    }
    writer.flush()?;

    Ok(())
}

/// One row per protocol with every snapshot field
pub fn write_comparison_csv(
    path: impl AsRef<Path>,
    results: &[(ProtocolKind, MetricsSnapshot)],
) -> SimulatorResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        "Protocol",
        "Total cycles",
        "Compute cycles",
        "Idle cycles",
        "Load instructions",
        "Store instructions",
        "Total instructions",
        "Cache misses",
        "Miss rate",
    ])?;

    for (protocol, s) in results {
        writer.write_record([
            protocol.to_string(),
            s.total_cycles.to_string(),
            s.compute_cycles.to_string(),
            s.idle_cycles.to_string(),
            s.load_instructions.to_string(),
            s.store_instructions.to_string(),
            s.total_instructions.to_string(),
            s.cache_misses.to_string(),
            format!("{:.3}", s.miss_rate),
        ])?;
    }
    writer.flush()?;

    Ok(())
}

/// Values read back from a `KEY VALUE` results file
#[derive(Debug, Default, PartialEq)]
pub struct ResultsTable {
    values: BTreeMap<String, f64>,
}

impl ResultsTable {
    pub fn parse(content: &str) -> Result<Self, ResultsError> {
        let mut values = BTreeMap::new();
        for (line_num, line) in content.lines().enumerate() {
            let parts: Vec<&str> = line.split_whitespace().collect();
            match parts.as_slice() {
                [] => continue,
                [key, value] => {
                    let value: f64 = value.parse().map_err(|_| {
                        ResultsError::ParseError {
                            line: line_num + 1,
                            reason: format!("'{}' is not a number", value),
                        }
                    })?;
                    values.insert(key.to_string(), value);
                }
                _ => {
                    return Err(ResultsError::ParseError {
                        line: line_num + 1,
                        reason: "expected 'KEY VALUE'".to_string(),
                    })
                }
            }
        }
        Ok(Self { values })
    }

    pub fn get(&self, key: &str) -> Result<f64, ResultsError> {
        self.values
            .get(key)
            .copied()
            .ok_or_else(|| ResultsError::MissingKey(key.to_string()))
    }

    pub fn miss_rate(&self, protocol: ProtocolKind) -> Result<f64, ResultsError> {
        self.get(&result_key(MISS_RATE_KEY, protocol))
    }

    pub fn cache_misses(&self, protocol: ProtocolKind) -> Result<f64, ResultsError> {
        self.get(&result_key(CACHE_MISSES_KEY, protocol))
    }

    pub fn total_instructions(
        &self,
        protocol: ProtocolKind,
    ) -> Result<f64, ResultsError> {
        self.get(&result_key(TOTAL_INSTRUCTIONS_KEY, protocol))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

pub fn read_results(path: impl AsRef<Path>) -> Result<ResultsTable, ResultsError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ResultsError::NotFound(path.to_path_buf()),
        _ => ResultsError::FileReadError(path.to_path_buf(), e),
    })?;
    ResultsTable::parse(&content)
}
