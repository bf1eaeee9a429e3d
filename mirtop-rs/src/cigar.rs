//! Alignment operations and the canonical CIGAR encoding used in annotations.
//!
//! Two representations coexist:
//! - [`Cigar`], a run-length list of `Match/Ins/Del` operations as produced by
//!   an aligner or read from a BAM record;
//! - the canonical annotation string built by [`make_cigar`], where a matching
//!   column is `M`, a mismatching column is written as the reference base, and
//!   gaps are `I` (extra read base) or `D` (missing read base). Runs longer than
//!   one are prefixed with their length, e.g. `3MA3M`.

use crate::error::CigarError;

pub const GAP: u8 = b'-';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CigarOp {
    /// Alignment column, match or mismatch.
    #[default]
    Match,
    /// Base present in the read only.
    Ins,
    /// Base present in the reference only.
    Del,
}

impl CigarOp {
    pub fn as_char(self) -> char {
        match self {
            CigarOp::Match => 'M',
            CigarOp::Ins => 'I',
            CigarOp::Del => 'D',
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cigar {
    pub ops: Vec<(u32, CigarOp)>,
}

impl Cigar {
    pub fn from_ops(ops: &[(u32, CigarOp)]) -> Self {
        let mut cigar = Cigar::default();
        for (len, op) in ops {
            cigar.add_operation(*len, *op);
        }
        cigar
    }

    pub fn add_operation(&mut self, len: u32, op: CigarOp) {
        if len == 0 {
            return;
        }
        if let Some((prev_len, prev_op)) = self.ops.last_mut()
            && *prev_op == op
        {
            *prev_len += len;
            return;
        }
        self.ops.push((len, op));
    }

    pub fn reverse(&mut self) {
        self.ops.reverse();
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Number of read bases consumed.
    pub fn query_len(&self) -> u32 {
        self.ops
            .iter()
            .filter(|(_, op)| *op != CigarOp::Del)
            .map(|(len, _)| *len)
            .sum()
    }

    /// Number of reference bases consumed.
    pub fn ref_len(&self) -> u32 {
        self.ops
            .iter()
            .filter(|(_, op)| *op != CigarOp::Ins)
            .map(|(len, _)| *len)
            .sum()
    }

    /// Collapse every insertion run that touches a deletion run into match
    /// columns. `3I3D` becomes `3M`; `2I3D` becomes `2M1D`.
    pub fn merge_indels(&self) -> Cigar {
        let mut result = Cigar::default();
        let mut i_count: u32 = 0;
        let mut d_count: u32 = 0;

        let flush = |out: &mut Cigar, i_count: &mut u32, d_count: &mut u32| {
            let overlap = (*i_count).min(*d_count);
            out.add_operation(overlap, CigarOp::Match);
            out.add_operation(*i_count - overlap, CigarOp::Ins);
            out.add_operation(*d_count - overlap, CigarOp::Del);
            *i_count = 0;
            *d_count = 0;
        };

        for &(len, op) in &self.ops {
            match op {
                CigarOp::Ins => i_count += len,
                CigarOp::Del => d_count += len,
                CigarOp::Match => {
                    flush(&mut result, &mut i_count, &mut d_count);
                    result.add_operation(len, op);
                }
            }
        }
        flush(&mut result, &mut i_count, &mut d_count);

        result
    }
}

impl std::fmt::Display for Cigar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.ops.is_empty() {
            return f.write_str("*");
        }
        for (len, op) in &self.ops {
            write!(f, "{}{}", len, op.as_char())?;
        }
        Ok(())
    }
}

/// A pairwise alignment rendered as two equal-length gapped strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GappedAlignment {
    pub read: String,
    pub reference: String,
}

impl GappedAlignment {
    /// Per-column operations, collapsed into runs.
    pub fn cigar(&self) -> Cigar {
        let mut cigar = Cigar::default();
        for (q, t) in self.read.bytes().zip(self.reference.bytes()) {
            let op = if t == GAP {
                CigarOp::Ins
            } else if q == GAP {
                CigarOp::Del
            } else {
                CigarOp::Match
            };
            cigar.add_operation(1, op);
        }
        cigar
    }

    /// Rewrite insertion columns that sit next to deletion columns into
    /// substitution columns, pairing them left to right within each indel
    /// block. The read and reference residues are preserved; only the gaps
    /// move. The resulting [`cigar`](Self::cigar) equals
    /// `Cigar::merge_indels` of the original one.
    pub fn merge_adjacent_indels(&self) -> GappedAlignment {
        let q = self.read.as_bytes();
        let t = self.reference.as_bytes();
        let n = q.len().min(t.len());

        let mut read = Vec::with_capacity(n);
        let mut reference = Vec::with_capacity(n);

        let mut k = 0;
        while k < n {
            if q[k] != GAP && t[k] != GAP {
                read.push(q[k]);
                reference.push(t[k]);
                k += 1;
                continue;
            }
            // Gather the whole indel block.
            let block_start = k;
            while k < n && (q[k] == GAP || t[k] == GAP) {
                k += 1;
            }
            let ins: Vec<u8> = (block_start..k)
                .filter(|&c| t[c] == GAP && q[c] != GAP)
                .map(|c| q[c])
                .collect();
            let del: Vec<u8> = (block_start..k)
                .filter(|&c| q[c] == GAP && t[c] != GAP)
                .map(|c| t[c])
                .collect();
            let overlap = ins.len().min(del.len());
            for c in 0..overlap {
                read.push(ins[c]);
                reference.push(del[c]);
            }
            for &b in &ins[overlap..] {
                read.push(b);
                reference.push(GAP);
            }
            for &b in &del[overlap..] {
                read.push(GAP);
                reference.push(b);
            }
        }

        GappedAlignment {
            read: String::from_utf8_lossy(&read).into_owned(),
            reference: String::from_utf8_lossy(&reference).into_owned(),
        }
    }

    /// Canonical annotation CIGAR of this alignment, see [`make_cigar`].
    pub fn make_cigar(&self) -> String {
        make_cigar(&self.read, &self.reference)
    }
}

/// Render the gapped read/reference pair described by `cigar`.
///
/// `M` consumes one base of each sequence, `I` consumes a `query` base and
/// gaps the target, `D` consumes a `target` base and gaps the query. Bases
/// beyond the end of either sequence are not invented: the rendering stops
/// at the shorter of what the CIGAR asks for and what is available.
pub fn cigar_correction(cigar: &Cigar, query: &str, target: &str) -> GappedAlignment {
    let q = query.as_bytes();
    let t = target.as_bytes();
    let mut q_pos = 0usize;
    let mut t_pos = 0usize;
    let mut read = Vec::with_capacity(q.len() + 4);
    let mut reference = Vec::with_capacity(q.len() + 4);

    for &(len, op) in &cigar.ops {
        let len = len as usize;
        match op {
            CigarOp::Match => {
                let take = len.min(q.len().saturating_sub(q_pos)).min(t.len().saturating_sub(t_pos));
                read.extend_from_slice(&q[q_pos..q_pos + take]);
                reference.extend_from_slice(&t[t_pos..t_pos + take]);
                q_pos += take;
                t_pos += take;
            }
            CigarOp::Ins => {
                let take = len.min(q.len().saturating_sub(q_pos));
                read.extend_from_slice(&q[q_pos..q_pos + take]);
                reference.extend(std::iter::repeat_n(GAP, take));
                q_pos += take;
            }
            CigarOp::Del => {
                let take = len.min(t.len().saturating_sub(t_pos));
                reference.extend_from_slice(&t[t_pos..t_pos + take]);
                read.extend(std::iter::repeat_n(GAP, take));
                t_pos += take;
            }
        }
    }

    GappedAlignment {
        read: String::from_utf8_lossy(&read).into_owned(),
        reference: String::from_utf8_lossy(&reference).into_owned(),
    }
}

/// Canonical annotation CIGAR for a gapped read/reference pair.
pub fn make_cigar(read_aln: &str, ref_aln: &str) -> String {
    let columns: String = read_aln
        .bytes()
        .zip(ref_aln.bytes())
        .map(|(q, t)| {
            if q == t {
                'M'
            } else if q == GAP {
                'D'
            } else if t == GAP {
                'I'
            } else {
                t as char
            }
        })
        .collect();
    compress_cigar(&columns)
}

/// Expand a canonical CIGAR into one operation character per column.
/// `3MA3M` becomes `MMMAMMM`.
pub fn expand_cigar(cigar: &str) -> Result<String, CigarError> {
    let mut out = String::with_capacity(cigar.len() * 2);
    let mut count: Option<usize> = None;

    for ch in cigar.chars() {
        if let Some(d) = ch.to_digit(10) {
            if count.is_none() && d == 0 {
                return Err(CigarError(cigar.to_string()));
            }
            count = Some(count.unwrap_or(0) * 10 + d as usize);
        } else if is_cigar_op(ch) {
            out.extend(std::iter::repeat_n(ch, count.take().unwrap_or(1)));
        } else {
            return Err(CigarError(cigar.to_string()));
        }
    }
    if count.is_some() {
        return Err(CigarError(cigar.to_string()));
    }

    Ok(out)
}

/// Group an expanded operation string into runs; inverse of [`expand_cigar`].
pub fn compress_cigar(expanded: &str) -> String {
    let mut out = String::with_capacity(expanded.len());
    let mut chars = expanded.chars().peekable();
    while let Some(ch) = chars.next() {
        let mut run = 1usize;
        while chars.peek() == Some(&ch) {
            chars.next();
            run += 1;
        }
        if run > 1 {
            out.push_str(&run.to_string());
        }
        out.push(ch);
    }
    out
}

fn is_cigar_op(ch: char) -> bool {
    matches!(ch, 'M' | 'I' | 'D' | 'A' | 'C' | 'G' | 'T' | 'N')
}

/// A mismatch between the read and the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Substitution {
    /// 0-based offset in the read.
    pub position: usize,
    pub reference: char,
    pub observed: char,
}

/// Substitutions encoded in a canonical CIGAR, left to right, given the
/// observed read sequence.
///
/// `cigar2snp("3MA3M", "AAATCCC")` yields a single substitution at read
/// offset 3 from reference `A` to observed `T`.
pub fn cigar2snp(cigar: &str, observed: &str) -> Result<Vec<Substitution>, CigarError> {
    let read = observed.as_bytes();
    let mut subs = Vec::new();
    let mut read_pos = 0usize;

    for op in expand_cigar(cigar)?.chars() {
        match op {
            'M' | 'I' => read_pos += 1,
            'D' => {}
            reference => {
                let observed = read
                    .get(read_pos)
                    .copied()
                    .ok_or_else(|| CigarError(cigar.to_string()))?;
                subs.push(Substitution {
                    position: read_pos,
                    reference,
                    observed: observed as char,
                });
                read_pos += 1;
            }
        }
    }

    Ok(subs)
}

/// Reverse complement over `ACGTN`; other characters are kept as they are.
pub fn reverse_complement(seq: &str) -> String {
    seq.chars()
        .rev()
        .map(|c| match c {
            'A' => 'T',
            'T' => 'A',
            'C' => 'G',
            'G' => 'C',
            'a' => 't',
            't' => 'a',
            'c' => 'g',
            'g' => 'c',
            other => other,
        })
        .collect()
}
