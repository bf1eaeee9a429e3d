//! Merge annotated GFF files into one table.
//!
//! The sample axis is the union of the samples each file declares, in the
//! order they are first seen. Rows are identified by `(UID, Variant, Name)`:
//! the first row seen for a key keeps its descriptive columns and the
//! expression of later rows is added sample by sample. Inside a single file
//! only the first row for a key is used.

use crate::error::RecordError;
use crate::gff::{GffHeader, GffReader, GffRecord, RecordKey};
use crate::types::{HashMap, HashSet, HashSetExt};
use anyhow::{Context, Result};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedGff {
    pub header: GffHeader,
    pub records: Vec<GffRecord>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MergeStats {
    pub files: u64,
    pub records_read: u64,
    pub duplicates: u64,
    pub rows: u64,
}

#[derive(Debug, Default)]
pub struct Merger {
    samples: Vec<String>,
    sample_idx: HashMap<String, usize>,
    source: Option<String>,
    records: Vec<GffRecord>,
    by_key: HashMap<RecordKey, usize>,
    stats: MergeStats,
}

impl Merger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one file's rows; `header` declares the samples their expression
    /// vectors refer to. Nothing is added when a row's expression width does
    /// not match the header.
    pub fn add_file<I>(&mut self, header: &GffHeader, records: I) -> Result<(), RecordError>
    where
        I: IntoIterator<Item = GffRecord>,
    {
        let records: Vec<GffRecord> = records.into_iter().collect();
        for record in &records {
            record.check_width(header.samples.len())?;
        }

        self.stats.files += 1;
        if self.source.is_none() && !header.source.is_empty() {
            self.source = Some(header.source.clone());
        }
        let columns: Vec<usize> = header.samples.iter().map(|s| self.sample_column(s)).collect();

        let mut seen = HashSet::new();
        for mut record in records {
            self.stats.records_read += 1;
            let key = record.key();
            if !seen.insert(key.clone()) {
                self.stats.duplicates += 1;
                continue;
            }

            let expression = std::mem::take(&mut record.expression);
            let row = match self.by_key.get(&key) {
                Some(&row) => row,
                None => {
                    self.records.push(record);
                    self.by_key.insert(key, self.records.len() - 1);
                    self.records.len() - 1
                }
            };

            let target = &mut self.records[row].expression;
            for (count, &col) in expression.iter().zip(&columns) {
                if target.len() <= col {
                    target.resize(col + 1, 0);
                }
                target[col] += count;
            }
        }
        Ok(())
    }

    fn sample_column(&mut self, sample: &str) -> usize {
        if let Some(&idx) = self.sample_idx.get(sample) {
            return idx;
        }
        self.samples.push(sample.to_string());
        self.sample_idx.insert(sample.to_string(), self.samples.len() - 1);
        self.samples.len() - 1
    }

    pub fn finish(mut self) -> (MergedGff, MergeStats) {
        let width = self.samples.len();
        for record in &mut self.records {
            record.expression.resize(width, 0);
        }
        self.stats.rows = self.records.len() as u64;
        let header = GffHeader { source: self.source.unwrap_or_default(), samples: self.samples };
        (MergedGff { header, records: self.records }, self.stats)
    }
}

/// Merge annotated GFF files, in the order given.
pub fn merge_files(paths: &[PathBuf]) -> Result<(MergedGff, MergeStats)> {
    let mut merger = Merger::new();
    for path in paths {
        let reader =
            GffReader::from_path(path).with_context(|| format!("reading {}", path.display()))?;
        let header = reader.header().clone();
        let records = reader
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("parsing {}", path.display()))?;
        tracing::debug!(file = %path.display(), records = records.len(), "merge: file loaded");
        merger
            .add_file(&header, records)
            .with_context(|| format!("merging {}", path.display()))?;
    }
    let (merged, stats) = merger.finish();
    tracing::info!(
        files = stats.files,
        records = stats.records_read,
        duplicates = stats.duplicates,
        rows = stats.rows,
        samples = merged.header.samples.len(),
        "merge finished"
    );
    Ok((merged, stats))
}
