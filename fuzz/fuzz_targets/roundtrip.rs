#![no_main]
use fgk::{Decoder, Encoder, Term};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: Vec<Vec<u8>>| {
    if data.len() > 256 {
        return;
    }

    let terms: Vec<Term> = data.into_iter().map(Term::new).collect();

    let mut enc = Encoder::new(Vec::new());
    for t in &terms {
        enc.encode_term(t).unwrap();
    }
    let bytes = enc.finish().unwrap();

    let mut dec = Decoder::new(bytes.as_slice());
    let mut out = Vec::new();
    while let Some(t) = dec.decode_term().unwrap() {
        out.push(t);
    }

    assert_eq!(terms, out);
    dec.tree().check_consistency().unwrap();
});
