//! Expression matrix of an annotated GFF file.
//!
//! One tab-separated row per record: the UID, the read it decodes to, the
//! miRNA, the variant string, the variant columns (`iso_5p`, `iso_3p`,
//! `iso_add`, `iso_snp`) and one count column per `COLDATA` sample.

use crate::codec;
use crate::error::CodecError;
use crate::gff::{GffReader, GffRecord};
use crate::variant::{Variant, VariantParseError, parse_variants};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const COUNTS_TABLE: &str = "expression_counts.tsv";

const VARIANT_COLUMNS: [&str; 4] = ["iso_5p", "iso_3p", "iso_add", "iso_snp"];

/// Why a record has no row in the matrix.
#[derive(Debug, Error)]
pub enum CountsSkip {
    #[error("UID does not decode: {0}")]
    Uid(#[from] CodecError),

    #[error(transparent)]
    Variant(#[from] VariantParseError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountRow {
    pub uid: String,
    pub read: String,
    pub mirna: String,
    pub variant: String,
    /// Signed 5'/3' shifts, addition length, and 1 when any substitution
    /// is tagged.
    pub iso: [i64; 4],
    pub expression: Vec<u64>,
}

impl CountRow {
    pub fn from_record(record: &GffRecord) -> Result<Self, CountsSkip> {
        let read = codec::decode(&record.uid)?;
        let mut iso = [0i64; 4];
        for variant in parse_variants(&record.variant)? {
            match variant {
                Variant::FivePrime(n) => iso[0] = n,
                Variant::ThreePrime(n) => iso[1] = n,
                Variant::Addition(n) => iso[2] = n as i64,
                Variant::Snp { .. } => iso[3] = 1,
            }
        }
        Ok(Self {
            uid: record.uid.clone(),
            read,
            mirna: record.name.clone(),
            variant: record.variant.clone(),
            iso,
            expression: record.expression.clone(),
        })
    }

    fn write<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        write!(out, "{}\t{}\t{}\t{}", self.uid, self.read, self.mirna, self.variant)?;
        for value in self.iso {
            write!(out, "\t{value}")?;
        }
        for count in &self.expression {
            write!(out, "\t{count}")?;
        }
        writeln!(out)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CountsStats {
    pub records: u64,
    pub rows: u64,
    pub invalid_uid: u64,
    pub invalid_variant: u64,
}

/// Write the matrix of every record `reader` yields.
pub fn write_counts<R: BufRead, W: Write>(reader: GffReader<R>, out: &mut W) -> Result<CountsStats> {
    let mut header: Vec<&str> = vec!["UID", "Read", "miRNA", "Variant"];
    header.extend(VARIANT_COLUMNS);
    header.extend(reader.samples().iter().map(String::as_str));
    writeln!(out, "{}", header.join("\t"))?;

    let mut stats = CountsStats::default();
    for record in reader {
        let record = record?;
        stats.records += 1;
        match CountRow::from_record(&record) {
            Ok(row) => {
                row.write(out)?;
                stats.rows += 1;
            }
            Err(skip) => {
                tracing::debug!(uid = %record.uid, %skip, "counts: skipping record");
                match skip {
                    CountsSkip::Uid(_) => stats.invalid_uid += 1,
                    CountsSkip::Variant(_) => stats.invalid_variant += 1,
                }
            }
        }
    }
    Ok(stats)
}

/// Write [`COUNTS_TABLE`] for `gff` into `out_dir`.
pub fn convert_counts(gff: &Path, out_dir: &Path) -> Result<(PathBuf, CountsStats)> {
    let reader = GffReader::from_path(gff).with_context(|| format!("reading {}", gff.display()))?;
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;

    let out_path = out_dir.join(COUNTS_TABLE);
    let mut out = BufWriter::new(
        File::create(&out_path).with_context(|| format!("creating {}", out_path.display()))?,
    );
    let stats = write_counts(reader, &mut out).with_context(|| format!("parsing {}", gff.display()))?;
    out.flush()?;

    tracing::info!(
        output = %out_path.display(),
        rows = stats.rows,
        invalid_uid = stats.invalid_uid,
        invalid_variant = stats.invalid_variant,
        "counts written"
    );
    Ok((out_path, stats))
}
