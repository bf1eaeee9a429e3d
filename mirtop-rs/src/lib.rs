//! mirtop-rs: annotate miRNA and isomiR variants from small-RNA alignments.
//!
//! # Library usage
//!
//! ```no_run
//! use mirtop_rs::{AnnotateConfig, Precursors, annotate, load_mirbase, prost};
//! use std::path::Path;
//!
//! # fn main() -> anyhow::Result<()> {
//! let precursors = Precursors::load(Path::new("hairpin.fa"), Some("hsa"))?;
//! let annotation = load_mirbase(Path::new("hsa.gff3"))?;
//! let (mut hits, _import) = prost::read_file(Path::new("sample.prost"), &precursors, &annotation.loci)?;
//! annotate(&mut hits, &annotation.matures, &AnnotateConfig::default());
//! let _records = mirtop_rs::gff::create(&hits, &annotation.database, "Pass")?;
//! # Ok(())
//! # }
//! ```

// Internal modules, not part of the public API.
pub(crate) mod types;

// Public modules: stable API surface.
pub mod annotate;
pub mod annotation;
pub mod bam_input;
pub mod cigar;
pub mod codec;
pub mod counts;
pub mod error;
pub mod fasta;
pub mod g2t;
pub mod gff;
pub mod merge;
pub mod prost;
pub mod realign;
pub mod stats;
pub mod sw;
pub mod variant;

// Used by the binary.
#[doc(hidden)]
pub mod cli;
#[doc(hidden)]
pub mod pipeline;

// Flat re-exports for the most commonly used public types.
pub use annotate::{AnnotateConfig, annotate};
pub use annotation::{Mature, MatureTable, MirnaAnnotation, load_mirbase};
pub use error::{CodecError, ConfigError, SkipReason};
pub use fasta::Precursors;
pub use gff::{GffReader, GffRecord, GffWriter};
pub use realign::{Hit, Hits, ImportStats, Isomir};
pub use types::Expression;
pub use variant::Variant;
