use fgk::{Decoder, Encoder, Term};

fn main() {
    let alphabet: Vec<Term> = (0..32)
        .map(|i| Term::new(format!("symbol({i},payload-{})", i * 7)))
        .collect();
    let input: Vec<&Term> = (0..10_000)
        .map(|i| &alphabet[(i * i) % alphabet.len()])
        .collect();

    for _ in 0..100 {
        let mut enc = Encoder::new(Vec::new());
        for t in &input {
            enc.encode_term(t).unwrap();
        }
        let bytes = enc.finish().unwrap();

        let mut dec = Decoder::new(bytes.as_slice());
        let mut count = 0usize;
        while dec.decode_term().unwrap().is_some() {
            count += 1;
        }
        assert_eq!(count, input.len());
    }
}
