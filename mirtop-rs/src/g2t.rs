//! Genome-to-transcript coordinate mapping.
//!
//! Importers that report genomic loci (`chrom:start-end`) need the read start
//! expressed as an offset inside the precursor hairpin. The lookup table is
//! keyed by mature name and lists, for each precursor the mature derives
//! from, the precursor's genomic interval and strand.

use crate::error::ConfigError;
use crate::types::{HashMap, HashMapExt};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenomicLocus {
    pub precursor: String,
    pub chrom: String,
    pub start: u64,
    pub end: u64,
    /// Raw strand symbol from the annotation; validated when used.
    pub strand: char,
}

#[derive(Debug, Default)]
pub struct G2TIndex {
    by_mature: HashMap<String, Vec<GenomicLocus>>,
}

impl G2TIndex {
    pub fn new() -> Self {
        Self { by_mature: HashMap::new() }
    }

    pub fn insert(&mut self, mature: &str, locus: GenomicLocus) {
        let loci = self.by_mature.entry(mature.to_string()).or_default();
        if !loci.iter().any(|l| l.precursor == locus.precursor) {
            loci.push(locus);
        }
    }

    pub fn loci(&self, mature: &str) -> Option<&[GenomicLocus]> {
        self.by_mature.get(mature).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.by_mature.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_mature.is_empty()
    }
}

/// Chromosome labels match with or without a leading `chr`.
pub fn is_chrom(chrom: &str, annotated: &str) -> bool {
    fn bare(s: &str) -> &str {
        s.strip_prefix("chr").unwrap_or(s)
    }
    bare(chrom) == bare(annotated)
}

/// Boundaries are excluded: `start < pos < end`.
pub fn is_inside(pos: u64, start: u64, end: u64) -> bool {
    pos > start && pos < end
}

/// Offset of `pos` from the 5' end of an interval on `strand`.
pub fn transcript_offset(
    name: &str,
    pos: u64,
    start: u64,
    end: u64,
    strand: char,
) -> Result<u64, ConfigError> {
    match strand {
        '+' => Ok(pos.saturating_sub(start)),
        '-' => Ok(end.saturating_sub(pos)),
        other => Err(ConfigError::InvalidStrand { name: name.to_string(), strand: other }),
    }
}

/// Map a genomic position onto the first locus that contains it.
///
/// Returns the precursor name and the transcript-relative offset, `Ok(None)`
/// when no locus matches, and an error when the matching locus carries an
/// unusable strand.
pub fn genomic_to_transcript<'a>(
    loci: &'a [GenomicLocus],
    chrom: &str,
    pos: u64,
) -> Result<Option<(&'a str, u64)>, ConfigError> {
    for locus in loci {
        tracing::trace!(read = chrom, db = %locus.chrom, "g2t: chromosome check");
        if !is_chrom(chrom, &locus.chrom) {
            continue;
        }
        if !is_inside(pos, locus.start, locus.end) {
            continue;
        }
        let offset = transcript_offset(&locus.precursor, pos, locus.start, locus.end, locus.strand)?;
        return Ok(Some((locus.precursor.as_str(), offset)));
    }
    Ok(None)
}
