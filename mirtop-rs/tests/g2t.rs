use mirtop_rs::annotation::{FeatureRow, build_annotation};
use mirtop_rs::error::ConfigError;
use mirtop_rs::g2t::{
    G2TIndex, GenomicLocus, genomic_to_transcript, is_chrom, is_inside, transcript_offset,
};

fn locus(precursor: &str, chrom: &str, start: u64, end: u64, strand: char) -> GenomicLocus {
    GenomicLocus { precursor: precursor.to_string(), chrom: chrom.to_string(), start, end, strand }
}

fn row(id: &str, name: &str, parent: &str, start: u64, end: u64, strand: char) -> FeatureRow {
    FeatureRow {
        id: id.to_string(),
        name: name.to_string(),
        parent: parent.to_string(),
        chrom: "chr9".to_string(),
        start,
        end,
        strand,
    }
}

#[test]
fn chromosome_names_ignore_chr_prefix() {
    assert!(is_chrom("9", "chr9"));
    assert!(is_chrom("chr9", "9"));
    assert!(is_chrom("chr9", "chr9"));
    assert!(!is_chrom("chr19", "chr9"));
}

#[test]
fn inside_excludes_boundaries() {
    assert!(is_inside(10, 5, 26));
    assert!(!is_inside(5, 5, 26));
    assert!(!is_inside(26, 5, 26));
}

#[test]
fn plus_strand_offset_counts_from_start() {
    let loci = [locus("mir-1", "chr1", 5, 26, '+')];
    assert_eq!(genomic_to_transcript(&loci, "chr1", 10).unwrap(), Some(("mir-1", 5)));
    assert_eq!(genomic_to_transcript(&loci, "1", 10).unwrap(), Some(("mir-1", 5)));
}

#[test]
fn minus_strand_offset_counts_from_end() {
    let loci = [locus("mir-1", "chr1", 5, 26, '-')];
    assert_eq!(genomic_to_transcript(&loci, "chr1", 10).unwrap(), Some(("mir-1", 16)));
}

#[test]
fn positions_on_boundary_or_other_chromosome_do_not_map() {
    let loci = [locus("mir-1", "chr1", 5, 26, '+')];
    assert_eq!(genomic_to_transcript(&loci, "chr1", 5).unwrap(), None);
    assert_eq!(genomic_to_transcript(&loci, "chr1", 26).unwrap(), None);
    assert_eq!(genomic_to_transcript(&loci, "chr2", 10).unwrap(), None);
}

#[test]
fn first_matching_locus_wins() {
    let loci = [
        locus("mir-1a", "chr2", 100, 180, '+'),
        locus("mir-1b", "chr1", 5, 26, '+'),
        locus("mir-1c", "chr1", 1, 40, '+'),
    ];
    assert_eq!(genomic_to_transcript(&loci, "chr1", 10).unwrap(), Some(("mir-1b", 5)));
}

#[test]
fn bad_strand_is_fatal() {
    let loci = [locus("mir-1", "chr1", 5, 26, '.')];
    let err = genomic_to_transcript(&loci, "chr1", 10).unwrap_err();
    assert_eq!(err, ConfigError::InvalidStrand { name: "mir-1".to_string(), strand: '.' });
    assert!(transcript_offset("x", 10, 5, 26, '?').is_err());
}

#[test]
fn index_lists_each_precursor_once() {
    let mut index = G2TIndex::new();
    index.insert("miR-1", locus("mir-1a", "chr1", 5, 26, '+'));
    index.insert("miR-1", locus("mir-1a", "chr1", 5, 26, '+'));
    index.insert("miR-1", locus("mir-1b", "chr3", 50, 126, '-'));
    assert_eq!(index.loci("miR-1").unwrap().len(), 2);
    assert!(index.loci("miR-2").is_none());
}

#[test]
fn annotation_places_matures_on_both_strands() {
    let precursors = [
        row("MI0000060", "hsa-let-7a-1", "", 96938239, 96938318, '+'),
        row("MI0000061", "hsa-let-7a-2", "", 1000, 1071, '-'),
    ];
    let matures = [
        row("MIMAT0000062", "hsa-let-7a-5p", "MI0000060", 96938244, 96938265, '+'),
        row("MIMAT0000062_1", "hsa-let-7a-5p", "MI0000061", 1050, 1071, '-'),
        row("MIMAT9", "orphan", "MI9", 1, 2, '+'),
    ];
    let (table, index) = build_annotation(&precursors, &matures).unwrap();

    let plus = &table.get("hsa-let-7a-1")[0];
    assert_eq!((plus.start, plus.end), (5, 26));
    assert_eq!(plus.len(), 22);

    let minus = &table.get("hsa-let-7a-2")[0];
    assert_eq!((minus.start, minus.end), (0, 21));

    assert!(table.get("MI9").is_empty());
    assert_eq!(index.loci("hsa-let-7a-5p").unwrap().len(), 2);
    assert!(index.loci("orphan").is_none());
}
