use crate::annotation::{Mature, MatureTable};
use crate::realign::{Hits, Isomir};
use crate::variant::classify;

#[derive(Debug, Clone)]
pub struct AnnotateConfig {
    /// Largest 5' or 3' shift, in bases, still attributed to a mature.
    pub max_offset: usize,
    /// Value written to the `Filter` attribute of every output record.
    pub filter: String,
}

impl Default for AnnotateConfig {
    fn default() -> Self {
        Self { max_offset: 4, filter: "Pass".to_string() }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AnnotateStats {
    pub isomirs: u64,
    pub assigned: u64,
    pub reference: u64,
}

/// Assign every alignment to a mature of its precursor and classify it.
///
/// The first mature (in annotation order) whose 5' and 3' ends are both
/// within `max_offset` of the alignment wins. Alignments that fit no mature
/// keep `mirna == None` and are not written out.
pub fn annotate(hits: &mut Hits, matures: &MatureTable, config: &AnnotateConfig) -> AnnotateStats {
    let mut stats = AnnotateStats::default();

    for hit in hits.values_mut() {
        for iso in hit.isomirs_mut() {
            stats.isomirs += 1;
            let Some(mature) = matures
                .get(&iso.precursor)
                .iter()
                .find(|m| fits(iso, m, config.max_offset))
            else {
                continue;
            };
            iso.variants = classify(iso, mature);
            iso.mirna = Some(mature.name.clone());
            stats.assigned += 1;
            if iso.variants.is_empty() {
                stats.reference += 1;
            }
        }
    }

    tracing::info!(
        isomirs = stats.isomirs,
        assigned = stats.assigned,
        reference = stats.reference,
        "annotation finished"
    );
    stats
}

fn fits(iso: &Isomir, mature: &Mature, max_offset: usize) -> bool {
    iso.start.abs_diff(mature.start) <= max_offset && iso.end.abs_diff(mature.end) <= max_offset
}
