//! isomiR variant tags.
//!
//! Variants are kept as a list of [`Variant`] values and only turned into
//! the comma/colon tag string (`iso_5p:+1,iso_3p:-1`) at the format
//! boundary.

use crate::annotation::Mature;
use crate::cigar::Substitution;
use crate::realign::Isomir;
use std::fmt;
use thiserror::Error;

/// Bases kept on each side of a mature by [`get_mature_sequence`].
pub const MATURE_FLANK: usize = 4;

/// Region of the mature a substitution falls in, by 1-based mature position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SnpRegion {
    /// Positions 2-7.
    Seed,
    /// Position 8.
    CentralOffset,
    /// Positions 9-12.
    Central,
    /// Positions 13-17.
    CentralSupp,
    Other,
}

impl SnpRegion {
    pub fn from_mature_position(pos: i64) -> Self {
        match pos {
            2..=7 => SnpRegion::Seed,
            8 => SnpRegion::CentralOffset,
            9..=12 => SnpRegion::Central,
            13..=17 => SnpRegion::CentralSupp,
            _ => SnpRegion::Other,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            SnpRegion::Seed => "iso_snp_seed",
            SnpRegion::CentralOffset => "iso_snp_central_offset",
            SnpRegion::Central => "iso_snp_central",
            SnpRegion::CentralSupp => "iso_snp_central_supp",
            SnpRegion::Other => "iso_snp",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        Some(match tag {
            "iso_snp_seed" => SnpRegion::Seed,
            "iso_snp_central_offset" => SnpRegion::CentralOffset,
            "iso_snp_central" => SnpRegion::Central,
            "iso_snp_central_supp" => SnpRegion::CentralSupp,
            "iso_snp" => SnpRegion::Other,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// 5' shift; positive when the read starts upstream of the mature.
    FivePrime(i64),
    /// 3' shift; positive when the read ends downstream of the mature.
    ThreePrime(i64),
    /// Number of non-templated 3' bases.
    Addition(usize),
    /// Internal substitution. The read offset is known when the variant was
    /// classified from an alignment, not when it was parsed from a tag.
    Snp { region: SnpRegion, position: Option<usize> },
}

impl Variant {
    fn rank(&self) -> u8 {
        match self {
            Variant::FivePrime(_) => 0,
            Variant::ThreePrime(_) => 1,
            Variant::Addition(_) => 2,
            Variant::Snp { .. } => 3,
        }
    }

    /// Category token, the part of the tag before `:`.
    pub fn token(&self) -> &'static str {
        match self {
            Variant::FivePrime(_) => "iso_5p",
            Variant::ThreePrime(_) => "iso_3p",
            Variant::Addition(_) => "iso_add",
            Variant::Snp { region, .. } => region.tag(),
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::FivePrime(n) | Variant::ThreePrime(n) => write!(f, "{}:{:+}", self.token(), n),
            Variant::Addition(n) => write!(f, "{}:{}", self.token(), n),
            Variant::Snp { region, .. } => f.write_str(region.tag()),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unrecognized variant tag '{0}'")]
pub struct VariantParseError(pub String);

/// Join variants in category order: 5', 3', addition, substitutions.
pub fn format_variants(variants: &[Variant]) -> String {
    let mut sorted: Vec<&Variant> = variants.iter().collect();
    sorted.sort_by_key(|v| v.rank());
    sorted.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(",")
}

/// Parse a tag string. Empty strings and `NA` are the reference miRNA.
pub fn parse_variants(s: &str) -> Result<Vec<Variant>, VariantParseError> {
    let s = s.trim();
    if s.is_empty() || s == "NA" {
        return Ok(Vec::new());
    }
    s.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(parse_tag)
        .collect()
}

fn parse_tag(tag: &str) -> Result<Variant, VariantParseError> {
    let err = || VariantParseError(tag.to_string());
    let (key, value) = match tag.split_once(':') {
        Some((k, v)) => (k, Some(v)),
        None => (tag, None),
    };
    let signed = |v: Option<&str>| -> Result<i64, VariantParseError> {
        v.ok_or_else(err)?.trim_start_matches('+').parse::<i64>().map_err(|_| err())
    };
    match key {
        "iso_5p" => Ok(Variant::FivePrime(signed(value)?)),
        "iso_3p" => Ok(Variant::ThreePrime(signed(value)?)),
        "iso_add" | "iso_add3p" => {
            let n = value.ok_or_else(err)?.trim_start_matches('+').parse::<usize>().map_err(|_| err())?;
            Ok(Variant::Addition(n))
        }
        other => SnpRegion::from_tag(other)
            .map(|region| Variant::Snp { region, position: None })
            .ok_or_else(err),
    }
}

/// Variants of an alignment relative to `mature`.
///
/// Substitutions on the first or last templated read base are not tagged:
/// at the ends they are indistinguishable from trimming.
pub fn classify(iso: &Isomir, mature: &Mature) -> Vec<Variant> {
    let mut variants = Vec::new();

    let t5 = mature.start as i64 - iso.start as i64;
    if t5 != 0 {
        variants.push(Variant::FivePrime(t5));
    }
    let t3 = iso.end as i64 - mature.end as i64;
    if t3 != 0 {
        variants.push(Variant::ThreePrime(t3));
    }
    if !iso.add.is_empty() {
        variants.push(Variant::Addition(iso.add.len()));
    }

    let last = iso.templated_len().saturating_sub(1);
    for sub in &iso.subs {
        if sub.position == 0 || sub.position >= last {
            continue;
        }
        let mature_pos = sub.position as i64 - t5 + 1;
        variants.push(Variant::Snp {
            region: SnpRegion::from_mature_position(mature_pos),
            position: Some(sub.position),
        });
    }

    variants
}

/// A mature with flanking precursor bases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatureContext {
    pub sequence: String,
    /// 0-based inclusive bounds of the mature inside `sequence`.
    pub start: usize,
    pub end: usize,
}

/// The mature sequence plus [`MATURE_FLANK`] bases each side, clamped to the
/// precursor.
pub fn get_mature_sequence(precursor: &str, mature: &Mature) -> MatureContext {
    let from = mature.start.saturating_sub(MATURE_FLANK);
    let to = (mature.end + MATURE_FLANK + 1).min(precursor.len());
    MatureContext {
        sequence: precursor.get(from..to).unwrap_or_default().to_string(),
        start: mature.start - from,
        end: mature.end - from,
    }
}

/// Deltas recomputed by [`align_from_variants`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantCheck {
    /// Mismatches of the templated part, read offsets.
    pub substitutions: Vec<Substitution>,
    pub addition: String,
}

/// Check that `claimed` tags explain `observed` against `mature`.
///
/// The expected read is placed from the 5'/3' shifts and the addition
/// length; it must have exactly the observed length, and the internal
/// mismatches must fall in the regions the substitution tags announce (one
/// tag per substitution, terminal bases excepted as in [`classify`]). Returns the
/// recomputed deltas when everything agrees and `None` otherwise.
pub fn align_from_variants(
    observed: &str,
    mature: &MatureContext,
    claimed: &str,
) -> Option<VariantCheck> {
    let variants = parse_variants(claimed).ok()?;

    let mut t5 = 0i64;
    let mut t3 = 0i64;
    let mut add = 0usize;
    let mut claimed_regions = Vec::new();
    for v in &variants {
        match *v {
            Variant::FivePrime(n) => t5 = n,
            Variant::ThreePrime(n) => t3 = n,
            Variant::Addition(n) => add = n,
            Variant::Snp { region, .. } => claimed_regions.push(region),
        }
    }

    let start = mature.start as i64 - t5;
    let end = mature.end as i64 + t3;
    if start < 0 || end < start || end as usize >= mature.sequence.len() {
        return None;
    }
    let (start, end) = (start as usize, end as usize);
    let templated = end - start + 1;
    if observed.len() != templated + add {
        return None;
    }

    let reference = &mature.sequence.as_bytes()[start..=end];
    let read = observed.as_bytes();
    let substitutions: Vec<Substitution> = (0..templated)
        .filter(|&k| !read[k].eq_ignore_ascii_case(&reference[k]))
        .map(|k| Substitution {
            position: k,
            reference: reference[k] as char,
            observed: read[k] as char,
        })
        .collect();

    let mut observed_regions: Vec<SnpRegion> = substitutions
        .iter()
        .filter(|s| s.position != 0 && s.position + 1 < templated)
        .map(|s| SnpRegion::from_mature_position(s.position as i64 - t5 + 1))
        .collect();
    observed_regions.sort_unstable();
    claimed_regions.sort_unstable();
    if observed_regions != claimed_regions {
        return None;
    }

    Some(VariantCheck { substitutions, addition: observed[templated..].to_string() })
}
