//! Annotated GFF (mirGFF3) records.
//!
//! A file starts with a `##` header block that declares the version, the
//! source ontology and, on the `## COLDATA:` line, the sample names that the
//! comma-separated `Expression` attribute of each body line refers to.

use crate::codec;
use crate::error::{CodecError, ConfigError, RecordError};
use crate::realign::Hits;
use crate::types::Expression;
use crate::variant::format_variants;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const GFF_VERSION: &str = "1.1";

/// Attributes written in this order; anything else goes to `extra`.
const KNOWN_ATTRIBUTES: [&str; 9] =
    ["UID", "Read", "Name", "Parent", "Variant", "Cigar", "Expression", "Filter", "Hits"];

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GffRecord {
    pub seqid: String,
    pub source: String,
    pub feature: String,
    pub start: u64,
    pub end: u64,
    pub score: String,
    pub strand: char,
    pub phase: String,

    pub uid: String,
    pub read: String,
    pub name: String,
    pub parent: String,
    /// Variant tags; `NA` for the reference miRNA, empty when absent.
    pub variant: String,
    pub cigar: String,
    pub expression: Expression,
    pub filter: String,
    pub hits: String,
    pub extra: Vec<(String, String)>,
}

/// `(UID, Variant, Name)`.
pub type RecordKey = (String, String, String);

impl GffRecord {
    /// Identity used by merge and stats deduplication.
    pub fn key(&self) -> RecordKey {
        (self.uid.clone(), self.variant.clone(), self.name.clone())
    }

    /// One count per declared sample.
    pub fn check_width(&self, samples: usize) -> Result<(), RecordError> {
        if self.expression.len() == samples {
            Ok(())
        } else {
            Err(RecordError::ExpressionWidth { found: self.expression.len(), samples })
        }
    }

    pub fn to_line(&self) -> String {
        let mut attrs: Vec<String> = Vec::with_capacity(KNOWN_ATTRIBUTES.len() + self.extra.len());
        let expression =
            self.expression.iter().map(u64::to_string).collect::<Vec<_>>().join(",");
        for (key, value) in [
            ("UID", self.uid.as_str()),
            ("Read", self.read.as_str()),
            ("Name", self.name.as_str()),
            ("Parent", self.parent.as_str()),
            ("Variant", self.variant.as_str()),
            ("Cigar", self.cigar.as_str()),
            ("Expression", expression.as_str()),
            ("Filter", self.filter.as_str()),
            ("Hits", self.hits.as_str()),
        ] {
            if !value.is_empty() {
                attrs.push(format!("{key}={value}"));
            }
        }
        for (key, value) in &self.extra {
            attrs.push(format!("{key}={value}"));
        }

        format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.seqid,
            self.source,
            self.feature,
            self.start,
            self.end,
            self.score,
            self.strand,
            self.phase,
            attrs.join("; ")
        )
    }
}

/// Parse one body line.
pub fn parse_line(line: &str) -> Result<GffRecord, RecordError> {
    let cols: Vec<&str> = line.trim_end_matches(['\n', '\r']).split('\t').collect();
    if cols.len() != 9 {
        return Err(RecordError::Columns(cols.len()));
    }

    let coord = |field: &'static str, value: &str| {
        value
            .trim()
            .parse::<u64>()
            .map_err(|_| RecordError::InvalidValue { field, value: value.to_string() })
    };

    let mut record = GffRecord {
        seqid: cols[0].to_string(),
        source: cols[1].to_string(),
        feature: cols[2].to_string(),
        start: coord("start", cols[3])?,
        end: coord("end", cols[4])?,
        score: cols[5].to_string(),
        strand: cols[6].chars().next().unwrap_or('.'),
        phase: cols[7].to_string(),
        ..Default::default()
    };

    let mut has_expression = false;
    for (key, value) in split_attributes(cols[8]) {
        match key {
            "UID" => record.uid = value.to_string(),
            "Read" => record.read = value.to_string(),
            "Name" => record.name = value.to_string(),
            "Parent" => record.parent = value.to_string(),
            "Variant" => record.variant = value.to_string(),
            "Cigar" => record.cigar = value.to_string(),
            "Expression" => {
                record.expression = parse_expression(value)?;
                has_expression = true;
            }
            "Filter" => record.filter = value.to_string(),
            "Hits" => record.hits = value.to_string(),
            _ => record.extra.push((key.to_string(), value.to_string())),
        }
    }

    if record.uid.is_empty() {
        return Err(RecordError::MissingAttribute("UID"));
    }
    if record.name.is_empty() {
        return Err(RecordError::MissingAttribute("Name"));
    }
    if !has_expression {
        return Err(RecordError::MissingAttribute("Expression"));
    }
    Ok(record)
}

/// `Key=value` pairs separated by `;`. `Key value` is accepted as well.
fn split_attributes(field: &str) -> impl Iterator<Item = (&str, &str)> {
    field.split(';').map(str::trim).filter(|a| !a.is_empty()).map(|attr| {
        let split = attr.split_once('=').or_else(|| attr.split_once(char::is_whitespace));
        match split {
            Some((k, v)) => (k.trim(), v.trim()),
            None => (attr, ""),
        }
    })
}

fn parse_expression(value: &str) -> Result<Expression, RecordError> {
    value
        .split(',')
        .map(|c| {
            c.trim().parse::<u64>().map_err(|_| RecordError::InvalidValue {
                field: "Expression",
                value: value.to_string(),
            })
        })
        .collect()
}

/// Header block of a mirGFF3 file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GffHeader {
    pub source: String,
    pub samples: Vec<String>,
}

impl GffHeader {
    pub fn write<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "## mirGFF3. VERSION {GFF_VERSION}")?;
        writeln!(out, "## source-ontology: {}", self.source)?;
        writeln!(out, "## COLDATA: {}", self.samples.join(","))
    }
}

#[derive(Debug, Error)]
pub enum GffReadError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("line {line}: {source}")]
    Record { line: usize, source: RecordError },
}

/// Streaming reader over a mirGFF3 file.
///
/// The header is consumed on construction; body lines are returned by the
/// iterator. `#` lines in the body are skipped. A record whose `Expression`
/// does not hold one count per `COLDATA` sample is an error.
pub struct GffReader<R> {
    inner: R,
    header: GffHeader,
    pending: Option<String>,
    line_no: usize,
}

impl GffReader<io::BufReader<std::fs::File>> {
    pub fn from_path(path: &Path) -> Result<Self, GffReadError> {
        let file = std::fs::File::open(path)?;
        Self::new(io::BufReader::new(file), path)
    }
}

impl<R: BufRead> GffReader<R> {
    /// `path` is only used to name the file in errors.
    pub fn new(mut inner: R, path: &Path) -> Result<Self, GffReadError> {
        let mut source = String::new();
        let mut samples: Option<Vec<String>> = None;
        let mut pending = None;
        let mut line_no = 0;

        let mut buf = String::new();
        loop {
            buf.clear();
            if inner.read_line(&mut buf)? == 0 {
                break;
            }
            line_no += 1;
            let line = buf.trim_end_matches(['\n', '\r']);
            if line.trim().is_empty() {
                continue;
            }
            if !line.starts_with('#') {
                pending = Some(line.to_string());
                break;
            }
            if let Some(rest) = line.strip_prefix("## COLDATA:") {
                samples = Some(
                    rest.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect(),
                );
            } else if let Some(rest) = line.strip_prefix("## source-ontology:") {
                source = rest.trim().to_string();
            }
        }

        let Some(samples) = samples else {
            return Err(ConfigError::MissingColdata { path: PathBuf::from(path) }.into());
        };
        Ok(Self { inner, header: GffHeader { source, samples }, pending, line_no })
    }

    pub fn header(&self) -> &GffHeader {
        &self.header
    }

    pub fn samples(&self) -> &[String] {
        &self.header.samples
    }

    fn next_line(&mut self) -> io::Result<Option<String>> {
        if let Some(line) = self.pending.take() {
            return Ok(Some(line));
        }
        let mut buf = String::new();
        loop {
            buf.clear();
            if self.inner.read_line(&mut buf)? == 0 {
                return Ok(None);
            }
            self.line_no += 1;
            let line = buf.trim_end_matches(['\n', '\r']);
            if line.starts_with('#') || line.trim().is_empty() {
                continue;
            }
            return Ok(Some(line.to_string()));
        }
    }
}

impl<R: BufRead> Iterator for GffReader<R> {
    type Item = Result<GffRecord, GffReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_line() {
            Ok(Some(line)) => {
                let samples = self.header.samples.len();
                let record = parse_line(&line).and_then(|record| {
                    record.check_width(samples)?;
                    Ok(record)
                });
                Some(record.map_err(|source| GffReadError::Record { line: self.line_no, source }))
            }
            Ok(None) => None,
            Err(e) => Some(Err(e.into())),
        }
    }
}

pub struct GffWriter<W: Write> {
    inner: W,
}

impl<W: Write> GffWriter<W> {
    pub fn new(mut inner: W, header: &GffHeader) -> io::Result<Self> {
        header.write(&mut inner)?;
        Ok(Self { inner })
    }

    pub fn write_record(&mut self, record: &GffRecord) -> io::Result<()> {
        writeln!(self.inner, "{}", record.to_line())
    }

    pub fn finish(mut self) -> io::Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

/// Turn annotated hits into GFF records, one per isomiR with an assigned
/// mature. Records come out grouped by read, in read order.
pub fn create(hits: &Hits, source: &str, filter: &str) -> Result<Vec<GffRecord>, CodecError> {
    let mut records = Vec::new();
    for hit in hits.values() {
        let uid = codec::encode(hit.sequence())?;
        let n_precursors = hit.precursors.len();
        for iso in hit.isomirs() {
            let Some(mirna) = &iso.mirna else {
                continue;
            };
            let (feature, variant) = if iso.variants.is_empty() {
                ("ref_miRNA", "NA".to_string())
            } else {
                ("isomiR", format_variants(&iso.variants))
            };
            records.push(GffRecord {
                seqid: iso.precursor.clone(),
                source: source.to_string(),
                feature: feature.to_string(),
                start: iso.start as u64 + 1,
                end: (iso.start + iso.length) as u64,
                score: ".".to_string(),
                strand: '+',
                phase: ".".to_string(),
                uid: uid.clone(),
                read: hit.sequence().to_string(),
                name: mirna.clone(),
                parent: iso.precursor.clone(),
                variant,
                cigar: iso.cigar.clone(),
                expression: hit.counts.clone(),
                filter: filter.to_string(),
                hits: n_precursors.to_string(),
                extra: Vec::new(),
            });
        }
    }
    Ok(records)
}
