//! Symbol identities shared by the code tree and the literal sub-coder.
//!
//! The engine never interprets symbol contents. A symbol is either an
//! opaque structured term or a plain integer; both kinds share one code
//! tree but travel through separate literal codecs.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::tree::NodeId;

/// An opaque structured term.
///
/// Terms are compared and hashed by content, so two terms built from the
/// same bytes are one symbol to the codec, the way hash-consed terms are
/// one identity to their allocator. Cloning is cheap.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Term(Arc<[u8]>);

impl Term {
    /// Build a term from its raw representation.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Term(bytes.into().into())
    }

    /// The raw representation transmitted on first occurrence.
    pub fn bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Term({:?})", String::from_utf8_lossy(&self.0))
    }
}

impl From<&str> for Term {
    fn from(s: &str) -> Self {
        Term::new(s.as_bytes().to_vec())
    }
}

impl AsRef<[u8]> for Term {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A symbol drawn from one of the two coding domains.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Symbol {
    /// An opaque structured term.
    Term(Term),
    /// A plain integer index.
    Int(i64),
}

/// Which literal codec variant a stream uses.
///
/// A stream is homogeneous per call site; the caller keeps encode and
/// decode variants matched.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Domain {
    /// Structured terms.
    Term,
    /// Integer indices.
    Int,
}

/// Mapping from symbol identity to the leaf that currently represents it.
///
/// The table is local state, never part of the coded stream. Its range is
/// exactly the set of non-escape leaves.
#[derive(Debug, Default)]
pub(crate) struct SymbolTable {
    map: HashMap<Symbol, NodeId>,
}

impl SymbolTable {
    pub(crate) fn lookup(&self, symbol: &Symbol) -> Option<NodeId> {
        self.map.get(symbol).copied()
    }

    /// Bind a symbol to a leaf, overwriting any previous binding.
    pub(crate) fn bind(&mut self, symbol: Symbol, leaf: NodeId) {
        self.map.insert(symbol, leaf);
    }

    pub(crate) fn len(&self) -> usize {
        self.map.len()
    }

    pub(crate) fn entries(&self) -> impl Iterator<Item = (&Symbol, NodeId)> + '_ {
        self.map.iter().map(|(s, &n)| (s, n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terms_compare_by_content() {
        let a = Term::new(b"f(x,y)".to_vec());
        let b = Term::from("f(x,y)");
        let c = Term::from("f(x,z)");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.bytes(), b"f(x,y)");
    }

    #[test]
    fn table_rebinds_on_second_insert() {
        let mut table = SymbolTable::default();
        let sym = Symbol::Int(7);
        table.bind(sym.clone(), NodeId::from_index(3));
        table.bind(sym.clone(), NodeId::from_index(5));
        assert_eq!(table.lookup(&sym), Some(NodeId::from_index(5)));
        assert_eq!(table.len(), 1);
    }
}
