use anyhow::Result;
use needletail::parse_fastx_file;
use std::collections::BTreeMap;
use std::path::Path;

/// Precursor hairpin sequences keyed by name.
///
/// Sequences are stored upper-case with `U` written as `T`, so reads and
/// references compare directly.
#[derive(Debug, Default, Clone)]
pub struct Precursors {
    seqs: BTreeMap<String, String>,
}

impl Precursors {
    /// Load a hairpin FASTA. When `species` is given only records whose name
    /// starts with it (e.g. `hsa`) are kept.
    pub fn load(path: &Path, species: Option<&str>) -> Result<Self> {
        let mut reader = parse_fastx_file(path)
            .map_err(|e| anyhow::anyhow!("failed to open FASTA {}: {}", path.display(), e))?;
        let mut precursors = Precursors::default();

        while let Some(result) = reader.next() {
            let record = result
                .map_err(|e| anyhow::anyhow!("failed to parse FASTA record: {}", e))?;
            let id = std::str::from_utf8(record.id()).unwrap_or("");
            let name = id.split_whitespace().next().unwrap_or("");
            if name.is_empty() {
                continue;
            }
            if let Some(sps) = species
                && !name.starts_with(sps)
            {
                continue;
            }
            precursors.insert(name, &String::from_utf8_lossy(&record.seq()));
        }

        tracing::info!(precursors = precursors.len(), "loaded precursor sequences");
        Ok(precursors)
    }

    pub fn insert(&mut self, name: &str, seq: &str) {
        let normalized: String = seq
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| match c.to_ascii_uppercase() {
                'U' => 'T',
                other => other,
            })
            .collect();
        self.seqs.insert(name.to_string(), normalized);
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.seqs.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.seqs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seqs.is_empty()
    }
}
