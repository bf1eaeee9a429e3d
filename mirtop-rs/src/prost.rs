//! Importer for PROST tabular output.
//!
//! One header line, then one tab-separated row per read and miRNA:
//! column 0 is the read sequence, column 5 the genomic loci
//! (`chrom:start-end`, several separated by `;`), column 9 the read count and
//! column 11 the miRNA name. Genomic loci are mapped onto the precursors the
//! miRNA derives from and the read is realigned there.

use crate::error::SkipReason;
use crate::fasta::Precursors;
use crate::g2t::{G2TIndex, genomic_to_transcript};
use crate::realign::{Hit, Hits, ImportStats, tune};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

const MIN_COLUMNS: usize = 12;

pub fn read_file(path: &Path, precursors: &Precursors, index: &G2TIndex) -> Result<(Hits, ImportStats)> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    read_prost(BufReader::new(file), precursors, index)
        .with_context(|| format!("reading {}", path.display()))
}

pub fn read_prost<R: BufRead>(
    reader: R,
    precursors: &Precursors,
    index: &G2TIndex,
) -> Result<(Hits, ImportStats)> {
    let mut hits = Hits::new();
    let mut stats = ImportStats::default();

    for line in reader.lines().skip(1) {
        let line = line?;
        stats.lines_read += 1;
        if let Err(reason) = import_line(line.trim_end(), precursors, index, &mut hits)? {
            tracing::debug!(%reason, line = stats.lines_read, "prost: skipping");
            stats.skip(reason);
        }
    }

    stats.hits = hits.len() as u64;
    stats.log("prost");
    Ok((hits, stats))
}

/// Import one row. The outer error is fatal, the inner one a skip.
///
/// A row that gets past the column checks registers its read in `hits`
/// (first count wins); the row is still a skip when no locus realigns.
fn import_line(
    line: &str,
    precursors: &Precursors,
    index: &G2TIndex,
    hits: &mut Hits,
) -> Result<Result<(), SkipReason>> {
    let cols: Vec<&str> = line.split('\t').collect();
    if cols.len() < MIN_COLUMNS {
        return Ok(Err(SkipReason::TooFewColumns));
    }
    let sequence = cols[0];
    let mirna = cols[11].trim();
    if mirna.is_empty() {
        return Ok(Err(SkipReason::EmptyMirna));
    }
    if sequence.contains('N') {
        return Ok(Err(SkipReason::AmbiguousBase));
    }
    let Ok(count) = cols[9].trim().parse::<u64>() else {
        return Ok(Err(SkipReason::InvalidCount));
    };
    let Some(loci) = index.loci(mirna) else {
        return Ok(Err(SkipReason::NonChromosome));
    };

    // The read is a hit even when none of its loci realigns.
    let hit = hits
        .entry(sequence.to_string())
        .or_insert_with(|| Hit::new(sequence, vec![count]));

    let mut aligned = false;
    let mut failure = SkipReason::NonChromosome;
    for locus in cols[5].split(';') {
        let Some((chrom, start)) = parse_locus(locus) else {
            failure = SkipReason::NonChromosome;
            continue;
        };
        let Some((precursor, offset)) = genomic_to_transcript(loci, chrom, start)? else {
            failure = SkipReason::NonChromosome;
            continue;
        };
        let offset = offset as usize;

        let Some(seq) = precursors.get(precursor) else {
            failure = SkipReason::OutsidePrecursor;
            continue;
        };
        if seq.len() < offset + sequence.len() {
            failure = SkipReason::OutsidePrecursor;
            continue;
        }
        let Some(iso) = tune(sequence, precursor, seq, offset, None) else {
            failure = SkipReason::OutsidePrecursor;
            continue;
        };

        tracing::trace!(read = sequence, precursor, start = iso.start, cigar = %iso.cigar, "prost: aligned");
        hit.add_isomir(iso);
        aligned = true;
    }

    Ok(if aligned { Ok(()) } else { Err(failure) })
}

/// `chrom:start-end` → `(chrom, start)`.
fn parse_locus(locus: &str) -> Option<(&str, u64)> {
    let (chrom, range) = locus.trim().split_once(':')?;
    let (start, _end) = range.split_once('-')?;
    Some((chrom, start.parse().ok()?))
}
