//! Streaming encoder and decoder.
//!
//! Each side owns one code tree, one literal dictionary, and one bit
//! cursor; nothing is shared between instances and nothing suspends.
//! Feed symbols to an [`Encoder`] in the order you want them back from
//! the [`Decoder`]; the two trees apply the identical update after every
//! symbol, which is what keeps the wire free of code books.

use std::io::{Read, Write};

use log::debug;

use crate::bitstream::{BitReader, BitWriter};
use crate::error::{Error, Result};
use crate::literal::{LiteralReader, LiteralWriter};
use crate::symbol::{Domain, Symbol, Term};
use crate::tree::{Coded, CodeTree};

/// The encoding half of the codec.
///
/// Use [`Encoder::encode_term`] or [`Encoder::encode_int`] consistently
/// per stream and close with [`Encoder::finish`]; a stream without the
/// closing sentinel cannot be decoded to its end.
#[derive(Debug)]
pub struct Encoder<W: Write> {
    bits: BitWriter<W>,
    tree: CodeTree,
    literals: LiteralWriter,
}

impl<W: Write> Encoder<W> {
    /// A fresh engine writing into `sink`.
    pub fn new(sink: W) -> Self {
        debug!("encoder ready");
        Encoder {
            bits: BitWriter::new(sink),
            tree: CodeTree::new(),
            literals: LiteralWriter::new(),
        }
    }

    /// Encode one structured term.
    pub fn encode_term(&mut self, term: &Term) -> Result<Coded> {
        let symbol = Symbol::Term(term.clone());
        self.tree.encode(&symbol, &mut self.bits, &mut self.literals)
    }

    /// Encode one integer.
    pub fn encode_int(&mut self, value: i64) -> Result<Coded> {
        let symbol = Symbol::Int(value);
        self.tree.encode(&symbol, &mut self.bits, &mut self.literals)
    }

    /// Write the end-of-stream sentinel, flush the padded final byte,
    /// and hand the sink back.
    pub fn finish(mut self) -> Result<W> {
        self.tree.write_escape(&mut self.bits)?;
        self.literals.write_end(&mut self.bits)?;
        debug!(
            "stream closed: {} symbols, {} distinct, {} bits",
            self.tree.total_weight(),
            self.tree.distinct_symbols(),
            self.bits.bits_written()
        );
        self.bits.into_inner()
    }

    /// The model built so far; shape and weights mirror the decoder's
    /// after the same prefix.
    pub fn tree(&self) -> &CodeTree {
        &self.tree
    }

    /// Bits produced so far, the pending partial byte included.
    pub fn bits_written(&self) -> u64 {
        self.bits.bits_written()
    }
}

/// The decoding half of the codec.
#[derive(Debug)]
pub struct Decoder<R: Read> {
    bits: BitReader<R>,
    tree: CodeTree,
    literals: LiteralReader,
}

impl<R: Read> Decoder<R> {
    /// A fresh engine reading from `source`.
    pub fn new(source: R) -> Self {
        debug!("decoder ready");
        Decoder {
            bits: BitReader::new(source),
            tree: CodeTree::new(),
            literals: LiteralReader::new(),
        }
    }

    /// Decode the next structured term, `None` at end of stream.
    pub fn decode_term(&mut self) -> Result<Option<Term>> {
        match self
            .tree
            .decode(&mut self.bits, &mut self.literals, Domain::Term)?
        {
            None => Ok(None),
            Some(Symbol::Term(term)) => Ok(Some(term)),
            Some(Symbol::Int(_)) => Err(Error::DomainMismatch),
        }
    }

    /// Decode the next integer, `None` at end of stream.
    pub fn decode_int(&mut self) -> Result<Option<i64>> {
        match self
            .tree
            .decode(&mut self.bits, &mut self.literals, Domain::Int)?
        {
            None => Ok(None),
            Some(Symbol::Int(value)) => Ok(Some(value)),
            Some(Symbol::Term(_)) => Err(Error::DomainMismatch),
        }
    }

    /// The model rebuilt so far.
    pub fn tree(&self) -> &CodeTree {
        &self.tree
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_terms(names: &[&str]) -> Vec<u8> {
        let mut enc = Encoder::new(Vec::new());
        for name in names {
            enc.encode_term(&Term::from(*name)).unwrap();
        }
        enc.finish().unwrap()
    }

    fn decode_terms(bytes: &[u8]) -> Vec<String> {
        let mut dec = Decoder::new(bytes);
        let mut out = Vec::new();
        while let Some(term) = dec.decode_term().unwrap() {
            out.push(String::from_utf8_lossy(term.bytes()).into_owned());
        }
        out
    }

    #[test]
    fn empty_stream_is_one_sentinel_byte() {
        // path to the escape leaf is the single bit 0, the sentinel tag
        // is 1, and zero padding fills the rest of the byte
        let bytes = encode_terms(&[]);
        assert_eq!(bytes, vec![0b0100_0000]);
        assert_eq!(decode_terms(&bytes), Vec::<String>::new());
    }

    #[test]
    fn single_term_starts_with_the_escape_bit() {
        let bytes = encode_terms(&["A"]);
        // first bit 0 escapes, second bit 0 tags a payload
        assert_eq!(bytes[0] >> 6, 0b00);
        assert_eq!(decode_terms(&bytes), vec!["A".to_string()]);
    }

    #[test]
    fn repeated_term_costs_one_bit() {
        let mut enc = Encoder::new(Vec::new());
        enc.encode_term(&Term::from("A")).unwrap();
        let before = enc.bits_written();
        assert_eq!(enc.encode_term(&Term::from("A")).unwrap(), Coded::Known);
        assert_eq!(enc.bits_written() - before, 1);
        let bytes = enc.finish().unwrap();
        assert_eq!(decode_terms(&bytes), vec!["A".to_string(); 2]);
    }

    #[test]
    fn term_streams_roundtrip() {
        let stream = ["A", "B", "A", "B", "A", "C", "A", "", "B", "A"];
        let bytes = encode_terms(&stream);
        assert_eq!(decode_terms(&bytes), stream.to_vec());
    }

    #[test]
    fn int_streams_roundtrip_within_the_entropy_ballpark() {
        let stream = [1i64, 2, 1, 3, 1, 2];
        let mut enc = Encoder::new(Vec::new());
        for &v in &stream {
            enc.encode_int(v).unwrap();
        }
        let payload_bits = enc.bits_written();
        let bytes = enc.finish().unwrap();

        let mut dec = Decoder::new(bytes.as_slice());
        let mut out = Vec::new();
        while let Some(v) = dec.decode_int().unwrap() {
            out.push(v);
        }
        assert_eq!(out, stream);

        // entropy of the distribution is about 1.46 bits/symbol; allow
        // the three escapes their literal overhead on top
        let budget: u64 = 9 + 3 * (2 + 9);
        assert!(
            payload_bits <= budget,
            "expected a compact stream, got {payload_bits} bits"
        );
    }

    #[test]
    fn decoder_tree_mirrors_encoder_tree() {
        let stream = ["x", "y", "x", "z", "x", "y"];
        let bytes = encode_terms(&stream);

        let mut replay = Encoder::new(Vec::new());
        let mut dec = Decoder::new(bytes.as_slice());
        for name in stream {
            replay.encode_term(&Term::from(name)).unwrap();
            let got = dec.decode_term().unwrap().unwrap();
            assert_eq!(got.bytes(), name.as_bytes());
            assert_eq!(replay.tree().dump(), dec.tree().dump());
            dec.tree().check_consistency().unwrap();
        }
    }

    #[test]
    fn mismatched_domain_is_reported() {
        let mut enc = Encoder::new(Vec::new());
        enc.encode_int(42).unwrap();
        let bytes = enc.finish().unwrap();

        let mut dec = Decoder::new(bytes.as_slice());
        assert!(matches!(dec.decode_term(), Err(Error::DomainMismatch)));
    }

    #[test]
    fn truncated_stream_surfaces_exhaustion() {
        let bytes = encode_terms(&["alpha", "beta", "alpha"]);
        let cut = &bytes[..bytes.len() / 2];
        let mut dec = Decoder::new(cut);
        let mut result = Ok(None);
        for _ in 0..4 {
            result = dec.decode_term();
            if result.is_err() {
                break;
            }
        }
        assert!(matches!(result, Err(Error::Exhausted)));
    }
}
