use crate::error::ConfigError;
use crate::g2t::{G2TIndex, GenomicLocus, transcript_offset};
use anyhow::Result;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// A mature miRNA inside its precursor.
///
/// Coordinates are 0-based and inclusive on both ends: the mature sequence
/// is `precursor[start..=end]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mature {
    pub name: String,
    pub start: usize,
    pub end: usize,
}

impl Mature {
    pub fn len(&self) -> usize {
        self.end + 1 - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }
}

/// Matures of every precursor, in annotation order.
#[derive(Debug, Default, Clone)]
pub struct MatureTable {
    by_precursor: BTreeMap<String, Vec<Mature>>,
}

impl MatureTable {
    pub fn insert(&mut self, precursor: &str, mature: Mature) {
        self.by_precursor.entry(precursor.to_string()).or_default().push(mature);
    }

    pub fn get(&self, precursor: &str) -> &[Mature] {
        self.by_precursor.get(precursor).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.by_precursor.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_precursor.is_empty()
    }
}

/// One `miRNA_primary_transcript` or `miRNA` feature of a miRBase GFF3.
///
/// Coordinates are the 1-based inclusive genomic ones of the file.
#[derive(Debug, Clone)]
pub struct FeatureRow {
    pub id: String,
    pub name: String,
    /// `Derives_from` of a mature; empty for precursors.
    pub parent: String,
    pub chrom: String,
    pub start: u64,
    pub end: u64,
    pub strand: char,
}

#[derive(Debug, Default)]
pub struct MirnaAnnotation {
    /// Ontology name written to GFF output, e.g. `miRBasev21`.
    pub database: String,
    pub matures: MatureTable,
    pub loci: G2TIndex,
}

/// Load precursor/mature relationships from a miRBase GFF3.
pub fn load_mirbase(path: &Path) -> Result<MirnaAnnotation> {
    let database = guess_database(path)?;

    let reader = File::open(path)?;
    let mut reader = noodles::gff::io::Reader::new(BufReader::new(reader));

    let mut precursors: Vec<FeatureRow> = Vec::new();
    let mut matures: Vec<FeatureRow> = Vec::new();

    for result in reader.record_bufs() {
        let record = result?;

        let feature_type: &[u8] = record.ty().as_ref();
        let is_precursor = feature_type == b"miRNA_primary_transcript";
        if !is_precursor && feature_type != b"miRNA" {
            continue;
        }

        let attrs = record.attributes();
        let id = get_record_buf_attribute(attrs, b"ID").unwrap_or_default();
        let name = get_record_buf_attribute(attrs, b"Name").unwrap_or_else(|| id.clone());
        let parent = if is_precursor {
            String::new()
        } else {
            get_record_buf_attribute(attrs, b"Derives_from").unwrap_or_default()
        };

        let row = FeatureRow {
            id,
            name,
            parent,
            chrom: record.reference_sequence_name().to_string(),
            start: record.start().get() as u64,
            end: record.end().get() as u64,
            strand: strand_to_char(record.strand()),
        };
        if is_precursor {
            precursors.push(row);
        } else {
            matures.push(row);
        }
    }

    let (matures, loci) = build_annotation(&precursors, &matures)?;
    tracing::info!(
        database = %database,
        precursors = matures.len(),
        matures = loci.len(),
        "loaded miRNA annotation"
    );
    Ok(MirnaAnnotation { database, matures, loci })
}

/// Relate matures to their precursors.
///
/// Returns the mature coordinates inside each precursor and, per mature
/// name, the genomic loci of its precursors. Matures whose parent is not
/// annotated are skipped with a warning.
pub fn build_annotation(
    precursors: &[FeatureRow],
    matures: &[FeatureRow],
) -> Result<(MatureTable, G2TIndex), ConfigError> {
    let by_id: BTreeMap<&str, &FeatureRow> =
        precursors.iter().map(|p| (p.id.as_str(), p)).collect();

    let mut table = MatureTable::default();
    let mut loci = G2TIndex::new();

    for mature in matures {
        let Some(pre) = by_id.get(mature.parent.as_str()) else {
            tracing::warn!(mature = %mature.name, parent = %mature.parent, "precursor not annotated, skipping");
            continue;
        };

        // Both ends go through the same strand-aware offset; on the minus
        // strand the genomic end becomes the transcript start.
        let a = transcript_offset(&mature.name, mature.start, pre.start, pre.end, pre.strand)?;
        let b = transcript_offset(&mature.name, mature.end, pre.start, pre.end, pre.strand)?;
        table.insert(
            &pre.name,
            Mature { name: mature.name.clone(), start: a.min(b) as usize, end: a.max(b) as usize },
        );

        loci.insert(
            &mature.name,
            GenomicLocus {
                precursor: pre.name.clone(),
                chrom: pre.chrom.clone(),
                start: pre.start,
                end: pre.end,
                strand: pre.strand,
            },
        );
    }

    Ok((table, loci))
}

/// Ontology name from the header comments (`miRBase v21` → `miRBasev21`).
pub fn guess_database(path: &Path) -> Result<String> {
    let reader = BufReader::new(File::open(path)?);
    for line in reader.lines() {
        let line = line?;
        if !line.starts_with('#') {
            break;
        }
        if let Some(idx) = line.find("miRBase v") {
            let version: String = line[idx + "miRBase v".len()..]
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric() || *c == '.')
                .collect();
            return Ok(format!("miRBasev{version}"));
        }
    }
    Ok("miRBase".to_string())
}

fn get_record_buf_attribute(
    attrs: &noodles::gff::feature::record_buf::Attributes,
    key: &[u8],
) -> Option<String> {
    let value = attrs.get(key)?;
    value.iter().next().map(|v| v.to_string())
}

fn strand_to_char(strand: noodles::gff::feature::record::Strand) -> char {
    use noodles::gff::feature::record::Strand;
    match strand {
        Strand::Forward => '+',
        Strand::Reverse => '-',
        Strand::None => '.',
        Strand::Unknown => '?',
    }
}
