use crate::cigar::{Cigar, CigarOp, GAP, GappedAlignment};

const MATCH_SCORE: i32 = 2;
const MISMATCH_SCORE: i32 = -3;
const GAP_OPEN: i32 = -5;
const GAP_EXTEND: i32 = -2;

const NEG_INF: i32 = i32::MIN / 4;

// Traceback states.
const ST_DIAG: u8 = 0;
const ST_DEL: u8 = 1;
const ST_INS: u8 = 2;

#[derive(Debug, Clone)]
pub struct AlignmentResult {
    pub score: i32,
    pub cigar: Cigar,
    pub aligned: GappedAlignment,
    /// First reference base covered by the alignment (0-based).
    pub ref_start: usize,
    /// One past the last reference base covered.
    pub ref_end: usize,
    pub matches: u32,
    pub mismatches: u32,
    pub insertions: u32,
    pub deletions: u32,
}

impl AlignmentResult {
    pub fn accuracy(&self, read_len: usize) -> f64 {
        if read_len == 0 {
            0.0
        } else {
            self.matches as f64 / read_len as f64
        }
    }
}

/// Semi-global alignment of a read against a reference window.
///
/// The whole read must be aligned; reference bases before the first and
/// after the last aligned column are free. Gaps use affine costs so a single
/// longer gap is preferred over scattered ones, and a contiguous match run is
/// preferred over spreading mismatches.
pub fn align(read: &[u8], reference: &[u8]) -> AlignmentResult {
    let m = read.len();
    let n = reference.len();

    if m == 0 {
        return AlignmentResult {
            score: 0,
            cigar: Cigar::default(),
            aligned: GappedAlignment { read: String::new(), reference: String::new() },
            ref_start: 0,
            ref_end: 0,
            matches: 0,
            mismatches: 0,
            insertions: 0,
            deletions: 0,
        };
    }

    // diag: column ends in a match/mismatch; del: ends consuming reference only;
    // ins: ends consuming read only.
    let mut diag = vec![vec![NEG_INF; n + 1]; m + 1];
    let mut del = vec![vec![NEG_INF; n + 1]; m + 1];
    let mut ins = vec![vec![NEG_INF; n + 1]; m + 1];
    let mut tb_diag = vec![vec![ST_DIAG; n + 1]; m + 1];
    let mut tb_del = vec![vec![ST_DIAG; n + 1]; m + 1];
    let mut tb_ins = vec![vec![ST_DIAG; n + 1]; m + 1];

    // Leading reference bases are free.
    for cell in diag[0].iter_mut() {
        *cell = 0;
    }
    for i in 1..=m {
        ins[i][0] = GAP_OPEN + GAP_EXTEND * i as i32;
        tb_ins[i][0] = if i == 1 { ST_DIAG } else { ST_INS };
    }

    for i in 1..=m {
        for j in 1..=n {
            let s = if read[i - 1].eq_ignore_ascii_case(&reference[j - 1]) {
                MATCH_SCORE
            } else {
                MISMATCH_SCORE
            };
            let (best, state) = best_of(diag[i - 1][j - 1], del[i - 1][j - 1], ins[i - 1][j - 1]);
            diag[i][j] = best.saturating_add(s);
            tb_diag[i][j] = state;

            let (best, state) = best_of(
                diag[i][j - 1].saturating_add(GAP_OPEN + GAP_EXTEND),
                del[i][j - 1].saturating_add(GAP_EXTEND),
                ins[i][j - 1].saturating_add(GAP_OPEN + GAP_EXTEND),
            );
            del[i][j] = best;
            tb_del[i][j] = state;

            let (best, state) = best_of(
                diag[i - 1][j].saturating_add(GAP_OPEN + GAP_EXTEND),
                del[i - 1][j].saturating_add(GAP_OPEN + GAP_EXTEND),
                ins[i - 1][j].saturating_add(GAP_EXTEND),
            );
            ins[i][j] = best;
            tb_ins[i][j] = state;
        }
    }

    // Trailing reference bases are free: best cell of the last row that does
    // not end in a deletion.
    let mut max_score = NEG_INF;
    let mut max_j = 0usize;
    let mut max_state = ST_INS;
    for j in 0..=n {
        if diag[m][j] > max_score {
            max_score = diag[m][j];
            max_j = j;
            max_state = ST_DIAG;
        }
        if ins[m][j] > max_score {
            max_score = ins[m][j];
            max_j = j;
            max_state = ST_INS;
        }
    }

    let mut i = m;
    let mut j = max_j;
    let mut state = max_state;
    let mut read_aln: Vec<u8> = Vec::with_capacity(m + 4);
    let mut ref_aln: Vec<u8> = Vec::with_capacity(m + 4);
    let mut cigar = Cigar::default();
    let (mut matches, mut mismatches, mut insertions, mut deletions) = (0, 0, 0, 0);

    while i > 0 {
        match state {
            ST_DIAG => {
                read_aln.push(read[i - 1]);
                ref_aln.push(reference[j - 1]);
                cigar.add_operation(1, CigarOp::Match);
                if read[i - 1].eq_ignore_ascii_case(&reference[j - 1]) {
                    matches += 1;
                } else {
                    mismatches += 1;
                }
                state = tb_diag[i][j];
                i -= 1;
                j -= 1;
            }
            ST_DEL => {
                read_aln.push(GAP);
                ref_aln.push(reference[j - 1]);
                cigar.add_operation(1, CigarOp::Del);
                deletions += 1;
                state = tb_del[i][j];
                j -= 1;
            }
            _ => {
                read_aln.push(read[i - 1]);
                ref_aln.push(GAP);
                cigar.add_operation(1, CigarOp::Ins);
                insertions += 1;
                state = tb_ins[i][j];
                i -= 1;
            }
        }
    }

    read_aln.reverse();
    ref_aln.reverse();
    cigar.reverse();

    AlignmentResult {
        score: max_score,
        cigar,
        aligned: GappedAlignment {
            read: String::from_utf8_lossy(&read_aln).into_owned(),
            reference: String::from_utf8_lossy(&ref_aln).into_owned(),
        },
        ref_start: j,
        ref_end: max_j,
        matches,
        mismatches,
        insertions,
        deletions,
    }
}

/// Highest of the three predecessors; ties prefer the diagonal, then the
/// deletion state.
fn best_of(diag: i32, del: i32, ins: i32) -> (i32, u8) {
    let mut best = (diag, ST_DIAG);
    if del > best.0 {
        best = (del, ST_DEL);
    }
    if ins > best.0 {
        best = (ins, ST_INS);
    }
    best
}
