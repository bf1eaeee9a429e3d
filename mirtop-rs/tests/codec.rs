use mirtop_rs::codec::{SYMBOLS, decode, encode};
use mirtop_rs::error::CodecError;
use proptest::prelude::*;

#[test]
fn encodes_full_codons_without_suffix() {
    assert_eq!(encode("AAA").unwrap(), "A");
    assert_eq!(encode("TTT").unwrap(), "^");
    assert_eq!(encode("AAACCCTTTGGG").unwrap().len(), 4);
}

#[test]
fn pads_partial_codon_and_records_pad_length() {
    let uid = encode("AAACCCTTTGGGA").unwrap();
    assert_eq!(uid.len(), 6);
    assert!(uid.ends_with('2'));
    assert_eq!(decode(&uid).unwrap(), "AAACCCTTTGGGA");

    let uid = encode("ACGTA").unwrap();
    assert!(uid.ends_with('1'));
    assert_eq!(decode(&uid).unwrap(), "ACGTA");
}

#[test]
fn rejects_non_acgt() {
    assert_eq!(
        encode("ACGN").unwrap_err(),
        CodecError::InvalidBase { base: 'N', pos: 3 }
    );
}

#[test]
fn rejects_malformed_identifiers() {
    assert!(matches!(decode("A#"), Err(CodecError::InvalidSymbol('#'))));
    assert!(matches!(decode("A3"), Err(CodecError::BadSuffix(_))));
    assert!(matches!(decode("2"), Err(CodecError::BadSuffix(_))));
    // `B` is AAC: its last base cannot be padding.
    assert!(matches!(decode("B1"), Err(CodecError::BadSuffix(_))));
}

#[test]
fn symbols_are_safe_in_gff_attributes() {
    for &s in SYMBOLS.iter() {
        let c = s as char;
        assert!(!c.is_whitespace(), "{c:?}");
        assert!(!c.is_ascii_digit(), "{c:?}");
        assert!(!"#;,=.:".contains(c), "{c:?}");
    }
    let mut sorted = SYMBOLS.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(sorted.len(), 64);
}

proptest! {
    #[test]
    fn decode_inverts_encode(seq in "[ACGT]{0,60}") {
        let uid = encode(&seq).unwrap();
        prop_assert_eq!(decode(&uid).unwrap(), seq);
    }

    #[test]
    fn distinct_sequences_get_distinct_ids(a in "[ACGT]{1,30}", b in "[ACGT]{1,30}") {
        prop_assume!(a != b);
        prop_assert_ne!(encode(&a).unwrap(), encode(&b).unwrap());
    }
}
