//! Error types.
//!
//! Fatal conditions (malformed reference data, missing sample declaration)
//! are `ConfigError`s and abort the affected file or run. Per-record
//! problems are `SkipReason`s: they are tallied and never interrupt a scan.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Malformed reference tables or input headers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{path} doesn't contain a COLDATA header")]
    MissingColdata { path: PathBuf },

    #[error("strand information is incorrect for {name}: '{strand}'")]
    InvalidStrand { name: String, strand: char },
}

/// Errors of the compact sequence codec.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("invalid nucleotide '{base}' at position {pos}")]
    InvalidBase { base: char, pos: usize },

    #[error("invalid identifier symbol '{0}'")]
    InvalidSymbol(char),

    #[error("malformed padding suffix in identifier '{0}'")]
    BadSuffix(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("malformed CIGAR string '{0}'")]
pub struct CigarError(pub String);

/// A GFF body line that cannot be turned into a record.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("expected 9 tab-separated columns, found {0}")]
    Columns(usize),

    #[error("missing attribute {0}")]
    MissingAttribute(&'static str),

    #[error("invalid {field} value '{value}'")]
    InvalidValue { field: &'static str, value: String },

    #[error("Expression has {found} counts but {samples} samples are declared")]
    ExpressionWidth { found: usize, samples: usize },
}

/// Why an importer dropped a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// Row has fewer columns than the importer needs.
    TooFewColumns,
    EmptyMirna,
    /// Read contains `N`.
    AmbiguousBase,
    InvalidCount,
    /// Locus has no chromosome range, or the range lies outside every
    /// annotated precursor of the miRNA.
    NonChromosome,
    /// Candidate alignment runs past the end of the precursor.
    OutsidePrecursor,
    Unmapped,
    /// Read aligned to the reverse strand of the precursor.
    Antisense,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SkipReason::TooFewColumns => "non miRNA in line",
            SkipReason::EmptyMirna => "empty miRNA name",
            SkipReason::AmbiguousBase => "N in sequence",
            SkipReason::InvalidCount => "invalid read count",
            SkipReason::NonChromosome => "non chromosome in GTF",
            SkipReason::OutsidePrecursor => "outside precursor",
            SkipReason::Unmapped => "unmapped",
            SkipReason::Antisense => "antisense alignment",
        };
        f.write_str(s)
    }
}
