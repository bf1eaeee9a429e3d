use crate::cigar::{Cigar, CigarOp, reverse_complement};
use crate::error::SkipReason;
use crate::fasta::Precursors;
use crate::realign::{Hit, Hits, ImportStats, tune};
use anyhow::{Context, Result};
use noodles::bam;
use noodles::sam::alignment::record::cigar::op::Kind as CigarKind;
use std::path::Path;

/// Read alignments against precursor hairpins and realign every mapped,
/// forward-strand record.
///
/// Hits are keyed by read name. A `_x<N>` suffix on the name carries the
/// collapsed read count; otherwise each record counts once.
pub fn read_bam(path: &Path, precursors: &Precursors) -> Result<(Hits, ImportStats)> {
    let mut reader = bam::io::reader::Builder
        .build_from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let header = reader.read_header()?;
    let ref_names: Vec<String> =
        header.reference_sequences().keys().map(|name| name.to_string()).collect();

    let mut hits = Hits::new();
    let mut stats = ImportStats::default();

    for result in reader.records() {
        let record = result?;
        stats.lines_read += 1;

        let flags = record.flags();
        if flags.is_unmapped() {
            stats.skip(SkipReason::Unmapped);
            continue;
        }

        let stored: String = record.sequence().iter().map(char::from).collect();
        let name = record.name().map(|n| n.to_string()).unwrap_or_else(|| stored.clone());

        if flags.is_reverse_complemented() {
            let original = reverse_complement(&stored);
            tracing::debug!(read = %name, sequence = %original, "bam: antisense alignment");
            stats.skip(SkipReason::Antisense);
            continue;
        }
        if stored.contains('N') {
            stats.skip(SkipReason::AmbiguousBase);
            continue;
        }

        let (Some(ref_id), Some(start)) = (
            record.reference_sequence_id().transpose()?,
            record.alignment_start().transpose()?,
        ) else {
            stats.skip(SkipReason::Unmapped);
            continue;
        };
        let Some(precursor) = ref_names.get(ref_id) else {
            stats.skip(SkipReason::Unmapped);
            continue;
        };
        let Some(precursor_seq) = precursors.get(precursor) else {
            stats.skip(SkipReason::OutsidePrecursor);
            continue;
        };

        let cigar = record_cigar(&record)?;
        let start = usize::from(start) - 1;
        let Some(iso) = tune(&stored, precursor, precursor_seq, start, Some(&cigar)) else {
            stats.skip(SkipReason::OutsidePrecursor);
            continue;
        };

        tracing::trace!(read = %name, precursor = %precursor, start = iso.start, cigar = %iso.cigar, "bam: aligned");
        hits.entry(name.clone())
            .or_insert_with(|| Hit::new(&stored, vec![collapsed_count(&name)]))
            .add_isomir(iso);
    }

    stats.hits = hits.len() as u64;
    stats.log("bam");
    Ok((hits, stats))
}

/// Soft clips become insertions so every read base stays in the alignment;
/// hard clips and padding carry no read bases.
fn record_cigar(record: &bam::Record) -> Result<Cigar> {
    let mut cigar = Cigar::default();
    for op in record.cigar().iter() {
        let op = op?;
        let len = op.len() as u32;
        match op.kind() {
            CigarKind::Match | CigarKind::SequenceMatch | CigarKind::SequenceMismatch => {
                cigar.add_operation(len, CigarOp::Match)
            }
            CigarKind::Insertion | CigarKind::SoftClip => cigar.add_operation(len, CigarOp::Ins),
            CigarKind::Deletion | CigarKind::Skip => cigar.add_operation(len, CigarOp::Del),
            CigarKind::HardClip | CigarKind::Pad => {}
        }
    }
    Ok(cigar)
}

/// `seq_x12` → 12. Names without a numeric suffix count once.
pub fn collapsed_count(name: &str) -> u64 {
    name.rsplit_once("_x")
        .and_then(|(_, n)| n.parse::<u64>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(1)
}
