//! # Adaptive Huffman coding (FGK)
//!
//! *Self-training entropy coding: no code book, no second pass.*
//!
//! ## Intuition First
//!
//! Static Huffman coding needs to see all the data before it can build a
//! tree, and then it has to ship that tree alongside the data. Imagine
//! instead that sender and receiver each grow the same tree as the
//! stream flows: after every symbol, both bump the same weight and make
//! the same small repair. Frequent symbols sink toward the root and
//! their codes shrink, rare ones drift away, and the wire never carries
//! a table because both sides always agree on what the tree looks like.
//!
//! Unknown symbols need one extra trick. A permanent *escape leaf*
//! encodes "what follows is spelled out verbatim"; after the literal,
//! both sides graft a new leaf at the escape's location and carry on.
//!
//! ## The Problem
//!
//! Before adaptive coding, streaming sources faced a trade-off:
//! - **Two-pass Huffman**: optimal tree, but the data must be buffered
//!   and the code book transmitted.
//! - **Fixed pre-agreed codes**: no header, but a model mismatch costs
//!   compression forever.
//!
//! ## Historical Context
//!
//! ```text
//! 1952  Huffman   Optimal prefix codes from known frequencies
//! 1973  Faller    First self-adapting code tree
//! 1978  Gallager  Sibling property: the invariant behind cheap repair
//! 1985  Knuth     FGK as a practical algorithm (this crate's shape)
//! 1987  Vitter    Algorithm Lambda: tighter bound on code length
//! ```
//!
//! ## Mathematical Formulation
//!
//! A binary code tree is a Huffman tree for its leaf weights iff it has
//! the *sibling property* (Gallager): nodes can be listed in order of
//! non-decreasing weight so that every node sits adjacent to its
//! sibling. After incrementing one leaf, the property is restored by
//! swapping the climbing node with the *leader* of its equal-weight
//! block before each increment, at amortised O(1) per symbol. Leaf
//! depths always satisfy Kraft equality, $\sum_\ell 2^{-d(\ell)} = 1$.
//!
//! ## Complexity Analysis
//!
//! - **Time**: amortised $O(\text{code length})$ per symbol; the leader
//!   query is $O(1)$ via the block index.
//! - **Space**: $O(\text{distinct symbols})$ nodes, plus the literal
//!   dictionary's window.
//!
//! ## Failure Modes
//!
//! 1. **Desynchronisation**: any reordering or loss on the wire makes
//!    the decoder's model diverge; framing is the container's job.
//! 2. **Cold start**: the first occurrence of every symbol pays for an
//!    escape code plus a full literal; streams with no repetition never
//!    earn that back.
//!
//! ## Implementation Notes
//!
//! This crate provides:
//! - **`Encoder`/`Decoder`**: the streaming pair over any `Write`/`Read`
//!   byte sink or source.
//! - Two symbol domains, opaque **terms** and **integers**, sharing one
//!   tree but with separate literal codecs; pick one per stream.
//! - First occurrences are dictionary-coded against a shared history
//!   window, so recurring fragments of term text compress too.
//!
//! ## References
//!
//! - Gallager, R. (1978). "Variations on a Theme by Huffman."
//! - Knuth, D. (1985). "Dynamic Huffman Coding."
//! - Vitter, J. (1987). "Design and Analysis of Dynamic Huffman Codes."

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bitstream;
pub mod codec;
pub mod error;
pub mod literal;
mod sibling;
pub mod symbol;
pub mod tree;

pub use bitstream::{BitReader, BitWriter};
pub use codec::{Decoder, Encoder};
pub use error::{Error, Result};
pub use literal::{LiteralReader, LiteralWriter};
pub use symbol::{Domain, Symbol, Term};
pub use tree::{Coded, CodeTree};
