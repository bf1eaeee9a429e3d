//! Per-sample summary of annotated GFF files.
//!
//! Every passing record contributes its read count to its feature type
//! (`ref_miRNA`, `isomiR`) and to each variant category it carries
//! (`iso_5p`, `iso_snp_seed`, ...). Counts are then summarized per
//! `(category, sample)` as a sum, a number of records and a mean.

use crate::gff::{GffReader, GffRecord};
use crate::types::{HashSet, HashSetExt};
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const STATS_TABLE: &str = "mirtop_stats.txt";
pub const STATS_LOG: &str = "mirtop_stats.log";

/// Categories every sample reports, zero when nothing contributed.
const DEFAULT_CATEGORIES: [&str; 2] = ["ref_miRNA_mean", "isomiR_sum"];

/// One count of one record in one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub category: String,
    pub sample: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatRow {
    pub category: String,
    pub sample: String,
    pub value: f64,
}

impl StatRow {
    fn new(category: String, sample: &str, value: f64) -> Self {
        Self { category, sample: sample.to_string(), value }
    }
}

/// Raw rows of one record: one for the feature type and one per variant
/// token, for every sample with a positive count.
pub fn classify_record(record: &GffRecord, samples: &[String]) -> Vec<RawRow> {
    let mut rows = Vec::new();
    let has_variants = record.variant.contains("iso");

    for (sample, &count) in samples.iter().zip(&record.expression) {
        if count == 0 {
            continue;
        }
        rows.push(RawRow { category: record.feature.clone(), sample: sample.clone(), count });
        if !has_variants {
            continue;
        }
        for tag in record.variant.split(',') {
            let token = tag.split(':').next().unwrap_or(tag).trim();
            if token.is_empty() {
                continue;
            }
            rows.push(RawRow { category: token.to_string(), sample: sample.clone(), count });
        }
    }
    rows
}

/// `_sum`, `_count` and `_mean` views of the raw rows, each sorted by
/// category then sample, followed by zero rows for [`DEFAULT_CATEGORIES`]
/// missing from a declared sample.
pub fn summarize(raw: &[RawRow], samples: &[String]) -> Vec<StatRow> {
    let mut groups: BTreeMap<(&str, &str), (u64, u64)> = BTreeMap::new();
    for row in raw {
        let entry = groups.entry((row.category.as_str(), row.sample.as_str())).or_default();
        entry.0 += row.count;
        entry.1 += 1;
    }

    let mut table = Vec::with_capacity(groups.len() * 3 + samples.len() * DEFAULT_CATEGORIES.len());
    for (&(category, sample), &(sum, _)) in &groups {
        table.push(StatRow::new(format!("{category}_sum"), sample, sum as f64));
    }
    for (&(category, sample), &(_, n)) in &groups {
        table.push(StatRow::new(format!("{category}_count"), sample, n as f64));
    }
    for (&(category, sample), &(sum, n)) in &groups {
        table.push(StatRow::new(format!("{category}_mean"), sample, sum as f64 / n as f64));
    }

    for sample in samples {
        for category in DEFAULT_CATEGORIES {
            let present = table.iter().any(|r| r.category == category && r.sample == *sample);
            if !present {
                table.push(StatRow::new(category.to_string(), sample, 0.0));
            }
        }
    }
    table
}

/// Whether a `Filter` value lets the record through.
pub fn passes(filter: &str) -> bool {
    filter.eq_ignore_ascii_case("pass")
}

/// Summary table of one annotated GFF file.
pub fn calc_stats(path: &Path) -> Result<Vec<StatRow>> {
    let reader = GffReader::from_path(path).with_context(|| format!("reading {}", path.display()))?;
    let samples = reader.samples().to_vec();

    let mut seen = HashSet::new();
    let mut raw = Vec::new();
    for record in reader {
        let record = record.with_context(|| format!("parsing {}", path.display()))?;
        if !passes(&record.filter) {
            continue;
        }
        if !seen.insert(record.key()) {
            continue;
        }
        raw.extend(classify_record(&record, &samples));
    }

    tracing::debug!(file = %path.display(), rows = raw.len(), unique = seen.len(), "stats: file scanned");
    Ok(summarize(&raw, &samples))
}

/// Whole values print without a fractional part.
fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < u64::MAX as f64 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

fn json_value(value: f64) -> serde_json::Value {
    if value.fract() == 0.0 && value >= 0.0 && value < u64::MAX as f64 {
        serde_json::Value::from(value as u64)
    } else {
        serde_json::Value::from(value)
    }
}

pub fn write_table<W: Write>(out: &mut W, table: &[StatRow]) -> std::io::Result<()> {
    writeln!(out, "# mirtop-rs stats version {}", env!("CARGO_PKG_VERSION"))?;
    writeln!(out, "category,sample,counts")?;
    for row in table {
        writeln!(out, "{},{},{}", row.category, row.sample, format_value(row.value))?;
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct StatsMeta {
    pub tool: &'static str,
    pub version: String,
    pub homepage: &'static str,
}

#[derive(Debug, Serialize)]
pub struct StatsLog {
    pub meta: StatsMeta,
    /// sample → category → value; later rows win on duplicates.
    pub metrics: BTreeMap<String, BTreeMap<String, serde_json::Value>>,
}

impl StatsLog {
    pub fn new(table: &[StatRow]) -> Self {
        let mut metrics: BTreeMap<String, BTreeMap<String, serde_json::Value>> = BTreeMap::new();
        for row in table {
            metrics
                .entry(row.sample.clone())
                .or_default()
                .insert(row.category.clone(), json_value(row.value));
        }
        Self {
            meta: StatsMeta {
                tool: env!("CARGO_PKG_NAME"),
                version: format!("v{}", env!("CARGO_PKG_VERSION")),
                homepage: env!("CARGO_PKG_HOMEPAGE"),
            },
            metrics,
        }
    }
}

/// Write the table and its JSON log into `out_dir`.
pub fn write_stats(out_dir: &Path, table: &[StatRow]) -> Result<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;

    let table_path = out_dir.join(STATS_TABLE);
    let mut out = BufWriter::new(
        File::create(&table_path).with_context(|| format!("creating {}", table_path.display()))?,
    );
    write_table(&mut out, table)?;
    out.flush()?;

    let log_path = out_dir.join(STATS_LOG);
    let mut out = BufWriter::new(
        File::create(&log_path).with_context(|| format!("creating {}", log_path.display()))?,
    );
    serde_json::to_writer(&mut out, &StatsLog::new(table))?;
    out.flush()?;

    Ok((table_path, log_path))
}
