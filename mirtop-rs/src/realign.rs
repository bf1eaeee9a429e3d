//! Read / alignment model and realignment of a read at a candidate locus.

use crate::cigar::{Cigar, GAP, GappedAlignment, Substitution, cigar_correction};
use crate::error::SkipReason;
use crate::sw;
use crate::types::Expression;
use crate::variant::Variant;
use std::collections::BTreeMap;

/// Longest non-templated 3' addition.
pub const ADDITION_WINDOW: usize = 3;

/// Reference bases offered to the aligner beyond the read length, so reads
/// carrying a short deletion still fit the window.
pub const DELETION_SLACK: usize = 3;

/// One alignment of a read on a precursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Isomir {
    pub precursor: String,
    /// 0-based start on the precursor.
    pub start: usize,
    /// 0-based inclusive end of the templated part on the precursor.
    pub end: usize,
    /// Read length.
    pub length: usize,
    /// Canonical annotation CIGAR.
    pub cigar: String,
    pub subs: Vec<Substitution>,
    /// Non-templated 3' bases.
    pub add: String,
    /// Mature assigned by the classifier.
    pub mirna: Option<String>,
    pub variants: Vec<Variant>,
}

impl Isomir {
    /// Number of read bases aligned to the precursor.
    pub fn templated_len(&self) -> usize {
        self.length - self.add.len()
    }
}

/// A distinct read and everything known about where it aligns.
#[derive(Debug, Clone, Default)]
pub struct Hit {
    sequence: String,
    /// Per-sample counts.
    pub counts: Expression,
    /// Alignments per precursor.
    pub precursors: BTreeMap<String, Vec<Isomir>>,
}

impl Hit {
    pub fn new(sequence: &str, counts: Expression) -> Self {
        Self { sequence: sequence.to_string(), counts, precursors: BTreeMap::new() }
    }

    pub fn sequence(&self) -> &str {
        &self.sequence
    }

    pub fn add_isomir(&mut self, iso: Isomir) {
        let list = self.precursors.entry(iso.precursor.clone()).or_default();
        if !list.iter().any(|i| i.start == iso.start && i.cigar == iso.cigar) {
            list.push(iso);
        }
    }

    pub fn isomirs(&self) -> impl Iterator<Item = &Isomir> {
        self.precursors.values().flatten()
    }

    pub fn isomirs_mut(&mut self) -> impl Iterator<Item = &mut Isomir> {
        self.precursors.values_mut().flatten()
    }
}

/// Reads keyed by name; prost input uses the sequence itself as the name.
pub type Hits = BTreeMap<String, Hit>;

/// What an importer did with its input.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportStats {
    pub lines_read: u64,
    pub non_mirna: u64,
    pub empty_mirna: u64,
    pub ambiguous: u64,
    pub invalid_count: u64,
    pub non_chromosome: u64,
    pub outside_precursor: u64,
    pub unmapped: u64,
    pub antisense: u64,
    pub hits: u64,
}

impl ImportStats {
    pub fn skip(&mut self, reason: SkipReason) {
        let counter = match reason {
            SkipReason::TooFewColumns => &mut self.non_mirna,
            SkipReason::EmptyMirna => &mut self.empty_mirna,
            SkipReason::AmbiguousBase => &mut self.ambiguous,
            SkipReason::InvalidCount => &mut self.invalid_count,
            SkipReason::NonChromosome => &mut self.non_chromosome,
            SkipReason::OutsidePrecursor => &mut self.outside_precursor,
            SkipReason::Unmapped => &mut self.unmapped,
            SkipReason::Antisense => &mut self.antisense,
        };
        *counter += 1;
    }

    pub fn skipped(&self) -> u64 {
        self.non_mirna
            + self.empty_mirna
            + self.ambiguous
            + self.invalid_count
            + self.non_chromosome
            + self.outside_precursor
            + self.unmapped
            + self.antisense
    }

    pub fn log(&self, format: &str) {
        tracing::info!(
            format,
            lines = self.lines_read,
            non_mirna = self.non_mirna,
            non_chromosome = self.non_chromosome,
            outside_precursor = self.outside_precursor,
            unmapped = self.unmapped,
            antisense = self.antisense,
            skipped = self.skipped(),
            hits = self.hits,
            "import finished"
        );
    }
}

/// Realign `read` on precursor `name` (sequence `precursor`) starting at
/// `start` and describe the differences.
///
/// With a `cigar` (from an aligner) the alignment is rendered from it;
/// otherwise the read is aligned against the precursor from `start`, with
/// `DELETION_SLACK` extra reference bases. In both cases adjacent
/// insertion/deletion pairs are folded into substitutions first.
///
/// The 3' addition is the run of non-templated read bases that reaches the
/// read end, at most `ADDITION_WINDOW` long. Any other mismatch is a
/// substitution, so a mismatch followed by templated bases is never an
/// addition.
pub fn tune(
    read: &str,
    name: &str,
    precursor: &str,
    start: usize,
    cigar: Option<&Cigar>,
) -> Option<Isomir> {
    if start >= precursor.len() || read.is_empty() {
        return None;
    }

    let (aligned, start) = match cigar {
        Some(cigar) => (cigar_correction(cigar, read, &precursor[start..]), start),
        None => {
            let end = (start + read.len() + DELETION_SLACK).min(precursor.len());
            let result = sw::align(read.as_bytes(), &precursor.as_bytes()[start..end]);
            (result.aligned, start + result.ref_start)
        }
    };
    let aligned = aligned.merge_adjacent_indels();

    let columns = read_columns(&aligned);
    if columns.iter().filter(|c| c.read.is_some()).count() != read.len() {
        return None;
    }

    let window_start = read.len().saturating_sub(ADDITION_WINDOW);
    let mut add_from = read.len();
    for col in columns.iter().rev() {
        let Some(pos) = col.read else { continue };
        if pos < window_start || col.is_match() {
            break;
        }
        add_from = pos;
    }

    let mut subs = Vec::new();
    let mut ref_consumed = 0usize;
    for col in &columns {
        if let Some(pos) = col.read
            && pos >= add_from
        {
            break;
        }
        if col.reference != GAP {
            ref_consumed += 1;
        }
        if let Some(pos) = col.read
            && col.reference != GAP
            && col.observed != col.reference
        {
            subs.push(Substitution {
                position: pos,
                reference: col.reference as char,
                observed: col.observed as char,
            });
        }
    }
    if ref_consumed == 0 || start + ref_consumed > precursor.len() {
        return None;
    }

    Some(Isomir {
        precursor: name.to_string(),
        start,
        end: start + ref_consumed - 1,
        length: read.len(),
        cigar: aligned.make_cigar(),
        subs,
        add: read[add_from..].to_string(),
        mirna: None,
        variants: Vec::new(),
    })
}

struct Column {
    /// Read offset, `None` for a deletion column.
    read: Option<usize>,
    observed: u8,
    reference: u8,
}

impl Column {
    fn is_match(&self) -> bool {
        self.read.is_some() && self.reference != GAP && self.observed == self.reference
    }
}

fn read_columns(aligned: &GappedAlignment) -> Vec<Column> {
    let mut pos = 0usize;
    aligned
        .read
        .bytes()
        .zip(aligned.reference.bytes())
        .map(|(q, t)| {
            let read = if q == GAP {
                None
            } else {
                pos += 1;
                Some(pos - 1)
            };
            Column { read, observed: q, reference: t }
        })
        .collect()
}
