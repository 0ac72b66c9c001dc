use fgk::{Decoder, Encoder, Term};
use proptest::prelude::*;

fn encode_terms(terms: &[Term]) -> Vec<u8> {
    let mut enc = Encoder::new(Vec::new());
    for t in terms {
        enc.encode_term(t).unwrap();
    }
    enc.finish().unwrap()
}

fn decode_all_terms(bytes: &[u8]) -> Vec<Term> {
    let mut dec = Decoder::new(bytes);
    let mut out = Vec::new();
    while let Some(t) = dec.decode_term().unwrap() {
        out.push(t);
    }
    out
}

/// A stream over a small alphabet, so that both the escape path and the
/// known-symbol path get plenty of traffic.
fn term_streams() -> impl Strategy<Value = Vec<Term>> {
    (
        prop::collection::vec(prop::collection::vec(any::<u8>(), 0..12), 1..8),
        prop::collection::vec(any::<prop::sample::Index>(), 0..120),
    )
        .prop_map(|(alphabet, picks)| {
            picks
                .into_iter()
                .map(|ix| Term::new(alphabet[ix.index(alphabet.len())].clone()))
                .collect()
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_term_roundtrip(stream in term_streams()) {
        let bytes = encode_terms(&stream);
        prop_assert_eq!(decode_all_terms(&bytes), stream);
    }

    #[test]
    fn prop_int_roundtrip(stream in prop::collection::vec(
        prop_oneof![
            (-8i64..8).boxed(),
            any::<i64>().boxed(),
        ],
        0..120,
    )) {
        let mut enc = Encoder::new(Vec::new());
        for &v in &stream {
            enc.encode_int(v).unwrap();
        }
        let bytes = enc.finish().unwrap();

        let mut dec = Decoder::new(bytes.as_slice());
        let mut out = Vec::new();
        while let Some(v) = dec.decode_int().unwrap() {
            out.push(v);
        }
        prop_assert_eq!(out, stream);
    }

    #[test]
    fn prop_encoding_is_bit_exact(stream in term_streams()) {
        prop_assert_eq!(encode_terms(&stream), encode_terms(&stream));
    }

    /// After every prefix the two engines hold structurally identical
    /// trees, every invariant holds, and the root weight counts the
    /// symbols processed so far.
    #[test]
    fn prop_synchrony_and_invariants(stream in term_streams()) {
        let bytes = encode_terms(&stream);

        let mut replay = Encoder::new(Vec::new());
        let mut dec = Decoder::new(bytes.as_slice());
        for (i, t) in stream.iter().enumerate() {
            replay.encode_term(t).unwrap();
            let got = dec.decode_term().unwrap();
            prop_assert_eq!(got.as_ref(), Some(t));

            prop_assert_eq!(replay.tree().dump(), dec.tree().dump());
            replay.tree().check_consistency().unwrap();
            dec.tree().check_consistency().unwrap();
            prop_assert_eq!(replay.tree().total_weight(), (i + 1) as u64);
            prop_assert_eq!(dec.tree().escape_weight(), 0);
        }
        prop_assert_eq!(dec.decode_term().unwrap(), None);
    }

    /// Leaf depths satisfy Kraft equality once the tree is past its
    /// bootstrap shape.
    #[test]
    fn prop_kraft_equality(stream in term_streams()) {
        let mut enc = Encoder::new(Vec::new());
        for t in &stream {
            enc.encode_term(t).unwrap();
        }
        let depths = enc.tree().leaf_depths();
        if !stream.is_empty() {
            let sum: f64 = depths.iter().map(|&d| (0.5f64).powi(d as i32)).sum();
            prop_assert!((sum - 1.0).abs() < 1e-9, "Kraft sum was {}", sum);
        }
    }
}

#[test]
fn empty_stream_roundtrips() {
    let bytes = encode_terms(&[]);
    assert_eq!(decode_all_terms(&bytes), Vec::<Term>::new());
}

#[test]
fn repeated_symbol_stays_near_the_entropy_bound() {
    let mut enc = Encoder::new(Vec::new());
    let term = Term::from("only");
    for _ in 0..1000 {
        enc.encode_term(&term).unwrap();
    }
    let bits = enc.bits_written();
    // one bit per occurrence after the first, plus the literal up front
    assert!(bits <= 2 * 1000, "degenerate stream took {bits} bits");

    let bytes = enc.finish().unwrap();
    assert_eq!(decode_all_terms(&bytes).len(), 1000);
}

#[test]
fn alternating_pair_converges_to_one_bit_each() {
    let mut enc = Encoder::new(Vec::new());
    let (a, b) = (Term::from("a"), Term::from("b"));
    for _ in 0..900 {
        enc.encode_term(&a).unwrap();
        enc.encode_term(&b).unwrap();
    }
    let warm = enc.bits_written();
    for _ in 0..100 {
        enc.encode_term(&a).unwrap();
        enc.encode_term(&b).unwrap();
    }
    let tail = enc.bits_written() - warm;
    // one of the pair shares its subtree with the escape leaf, so pairs
    // cost three bits, not two
    assert!(tail <= 320, "tail of the stream took {tail} bits for 200 symbols");

    let bytes = enc.finish().unwrap();
    assert_eq!(decode_all_terms(&bytes).len(), 2000);
}
