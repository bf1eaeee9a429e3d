//! Compact, reversible identifiers for read sequences.
//!
//! Every 3-mer over `ACGT` maps to one printable symbol. A sequence whose
//! length is not a multiple of three is padded with `A` and the number of
//! pad bases (`1` or `2`) is appended as a digit. Digits never appear in the
//! symbol table, so the suffix is unambiguous.
//!
//! The symbol table contains no whitespace, `#`, `;`, `,`, `=`, `.` or `:`,
//! so identifiers can be embedded in GFF attributes and variant strings.

use crate::error::CodecError;

const BASES: [u8; 4] = *b"ACGT";

/// Symbol for 3-mer `16 * b0 + 4 * b1 + b2`, bases indexed as in `BASES`.
pub const SYMBOLS: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz!$%&()*+-/@^";

const NO_SYMBOL: u8 = u8::MAX;

const DECODE: [u8; 128] = build_decode_table();

const fn build_decode_table() -> [u8; 128] {
    let mut table = [NO_SYMBOL; 128];
    let mut i = 0;
    while i < SYMBOLS.len() {
        table[SYMBOLS[i] as usize] = i as u8;
        i += 1;
    }
    table
}

fn base_index(base: u8) -> Option<u8> {
    match base {
        b'A' => Some(0),
        b'C' => Some(1),
        b'G' => Some(2),
        b'T' => Some(3),
        _ => None,
    }
}

/// Encode a nucleotide sequence into its compact identifier.
pub fn encode(seq: &str) -> Result<String, CodecError> {
    let bytes = seq.as_bytes();
    let mut out = String::with_capacity(bytes.len() / 3 + 2);

    for (chunk_idx, chunk) in bytes.chunks(3).enumerate() {
        let mut code = 0usize;
        for k in 0..3 {
            let idx = match chunk.get(k) {
                Some(&b) => base_index(b).ok_or(CodecError::InvalidBase {
                    base: b as char,
                    pos: chunk_idx * 3 + k,
                })?,
                None => 0,
            };
            code = code * 4 + idx as usize;
        }
        out.push(SYMBOLS[code] as char);
        if chunk.len() < 3 {
            let pad = 3 - chunk.len();
            out.push(char::from(b'0' + pad as u8));
        }
    }

    Ok(out)
}

/// Decode an identifier produced by [`encode`].
pub fn decode(uid: &str) -> Result<String, CodecError> {
    let bytes = uid.as_bytes();
    let (body, pad) = match bytes.last() {
        Some(&d) if d.is_ascii_digit() => {
            let pad = (d - b'0') as usize;
            if !(1..=2).contains(&pad) || bytes.len() < 2 {
                return Err(CodecError::BadSuffix(uid.to_string()));
            }
            (&bytes[..bytes.len() - 1], pad)
        }
        _ => (bytes, 0),
    };

    let mut seq = Vec::with_capacity(body.len() * 3);
    for &symbol in body {
        let code = DECODE
            .get(symbol as usize)
            .copied()
            .filter(|&c| c != NO_SYMBOL)
            .ok_or(CodecError::InvalidSymbol(symbol as char))?;
        seq.push(BASES[(code >> 4) as usize & 3]);
        seq.push(BASES[(code >> 2) as usize & 3]);
        seq.push(BASES[code as usize & 3]);
    }

    if pad > 0 {
        // Padding is always `A`; anything else is not a valid encoding.
        if seq[seq.len() - pad..].iter().any(|&b| b != b'A') {
            return Err(CodecError::BadSuffix(uid.to_string()));
        }
        seq.truncate(seq.len() - pad);
    }

    Ok(String::from_utf8(seq).unwrap_or_default())
}
