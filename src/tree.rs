//! The adaptive prefix-code tree.
//!
//! A Huffman-shaped binary tree that re-balances itself after every
//! symbol so that frequent symbols drift toward short codes, without a
//! code book ever crossing the wire. Unknown symbols leave through a
//! permanent escape leaf and come back as literals; the decoder replays
//! the identical insertions and weight updates, so both trees stay
//! bit-for-bit in step.
//!
//! Nodes live in an arena and refer to each other through small handles;
//! parent, child, and sibling-order links never touch a lifetime. The
//! sibling ordering itself, with its equal-weight blocks and O(1) leader
//! query, lives in [`crate::sibling`].

use std::fmt::Write as _;
use std::io::{Read, Write};

use log::trace;

use crate::bitstream::{BitReader, BitWriter};
use crate::error::{Error, Result};
use crate::literal::{LiteralReader, LiteralWriter};
use crate::sibling::SiblingIndex;
use crate::symbol::{Domain, Symbol, SymbolTable};

/// Handle of a node in the tree arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub(crate) struct NodeId(u32);

impl NodeId {
    pub(crate) fn from_index(i: usize) -> Self {
        NodeId(i as u32)
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// What a node stands for.
#[derive(Debug)]
pub(crate) enum Payload {
    /// Interior node, two children, no symbol.
    Internal,
    /// The escape leaf. Its code announces a literal; its weight stays
    /// zero for the life of the engine.
    Escape,
    /// A leaf owning one symbol.
    Leaf(Symbol),
}

/// One tree node. Weight counts how many times the leaves below it have
/// been emitted.
#[derive(Debug)]
pub(crate) struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) low: Option<NodeId>,
    pub(crate) high: Option<NodeId>,
    pub(crate) weight: u64,
    pub(crate) payload: Payload,
}

impl Node {
    pub(crate) fn is_leaf(&self) -> bool {
        self.low.is_none() && self.high.is_none()
    }
}

/// Outcome of a single encode step.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Coded {
    /// The symbol already had a leaf; its code went out directly.
    Known,
    /// The symbol was escaped, sent as a literal, and admitted.
    New,
}

/// The adaptive code tree shared in shape by encoder and decoder.
///
/// Starts as a two-node tree, the root with the escape leaf in its low
/// slot and an empty high slot that the first insertion fills. From then
/// on the tree is binary-complete. Nodes are only ever added; teardown
/// releases everything at once.
#[derive(Debug)]
pub struct CodeTree {
    nodes: Vec<Node>,
    root: NodeId,
    escape: NodeId,
    table: SymbolTable,
    sibling: SiblingIndex,
    poisoned: bool,
}

impl CodeTree {
    /// The initial two-node tree. Both sides must start from this exact
    /// shape; no preamble is written.
    pub fn new() -> Self {
        let escape = NodeId(0);
        let root = NodeId(1);
        let nodes = vec![
            Node {
                parent: Some(root),
                low: None,
                high: None,
                weight: 0,
                payload: Payload::Escape,
            },
            Node {
                parent: None,
                low: Some(escape),
                high: None,
                weight: 0,
                payload: Payload::Internal,
            },
        ];
        let mut sibling = SiblingIndex::default();
        sibling.register_head(escape);
        sibling.insert_after(&nodes, escape, root);
        CodeTree {
            nodes,
            root,
            escape,
            table: SymbolTable::default(),
            sibling,
            poisoned: false,
        }
    }

    /// Encode one symbol.
    ///
    /// A known symbol costs exactly its current code; an unknown one
    /// costs the escape code plus its literal, and joins the tree. The
    /// weight update runs after either outcome.
    ///
    /// Bits reach the sink before the tree mutates, so an I/O failure
    /// mid-symbol leaves the two sides desynchronised; the surrounding
    /// framing decides what to do with the stream.
    pub fn encode<W: Write>(
        &mut self,
        symbol: &Symbol,
        bits: &mut BitWriter<W>,
        literals: &mut LiteralWriter,
    ) -> Result<Coded> {
        self.guard()?;
        let result = self.encode_inner(symbol, bits, literals);
        self.poison_on_invariant(result)
    }

    /// Decode one symbol, or `None` once the sentinel literal arrives.
    pub fn decode<R: Read>(
        &mut self,
        bits: &mut BitReader<R>,
        literals: &mut LiteralReader,
        domain: Domain,
    ) -> Result<Option<Symbol>> {
        self.guard()?;
        let result = self.decode_inner(bits, literals, domain);
        self.poison_on_invariant(result)
    }

    /// Emit the path to the escape leaf. The sentinel literal follows it
    /// when a stream ends.
    pub(crate) fn write_escape<W: Write>(&self, bits: &mut BitWriter<W>) -> Result<()> {
        self.guard()?;
        self.write_code(bits, self.escape)
    }

    fn encode_inner<W: Write>(
        &mut self,
        symbol: &Symbol,
        bits: &mut BitWriter<W>,
        literals: &mut LiteralWriter,
    ) -> Result<Coded> {
        if let Some(leaf) = self.table.lookup(symbol) {
            self.write_code(bits, leaf)?;
            self.update(leaf)?;
            Ok(Coded::Known)
        } else {
            self.write_code(bits, self.escape)?;
            literals.write_symbol(bits, symbol)?;
            let leaf = self.insert(symbol.clone())?;
            self.update(leaf)?;
            trace!(
                "admitted {:?}, {} distinct symbols",
                symbol,
                self.table.len()
            );
            Ok(Coded::New)
        }
    }

    fn decode_inner<R: Read>(
        &mut self,
        bits: &mut BitReader<R>,
        literals: &mut LiteralReader,
        domain: Domain,
    ) -> Result<Option<Symbol>> {
        let mut cur = self.root;
        loop {
            let (low, high, leaf) = {
                let node = &self.nodes[cur.index()];
                (node.low, node.high, node.is_leaf())
            };
            if leaf {
                break;
            }
            let next = if bits.read_bit()? { high } else { low };
            cur = next
                .ok_or_else(|| Error::Invariant("descent into an empty child slot".into()))?;
        }

        if matches!(self.nodes[cur.index()].payload, Payload::Escape) {
            match literals.read(bits, domain)? {
                None => Ok(None),
                Some(symbol) => {
                    let leaf = self.insert(symbol.clone())?;
                    self.update(leaf)?;
                    Ok(Some(symbol))
                }
            }
        } else {
            let symbol = match &self.nodes[cur.index()].payload {
                Payload::Leaf(s) => s.clone(),
                _ => return Err(Error::Invariant("reached a leaf without a symbol".into())),
            };
            self.update(cur)?;
            Ok(Some(symbol))
        }
    }

    /// Walk parent links to the root, then emit the path back down. One
    /// bit per interior node, 1 for the high slot, 0 for the low slot,
    /// most significant first and with no intermediate buffer.
    fn write_code<W: Write>(&self, bits: &mut BitWriter<W>, node: NodeId) -> Result<()> {
        if let Some(parent) = self.nodes[node.index()].parent {
            self.write_code(bits, parent)?;
            bits.write_bit(self.nodes[parent.index()].high == Some(node))?;
        }
        Ok(())
    }

    /// Admit a symbol at the escape leaf's location and hand back its new
    /// leaf. The caller runs the weight update.
    fn insert(&mut self, symbol: Symbol) -> Result<NodeId> {
        let parent = self.nodes[self.escape.index()]
            .parent
            .ok_or_else(|| Error::Invariant("escape leaf detached from the tree".into()))?;

        if self.nodes[parent.index()].high.is_none() {
            // bootstrap: the escape leaf is still the root's only child
            let leaf = self.alloc(Node {
                parent: Some(parent),
                low: None,
                high: None,
                weight: 0,
                payload: Payload::Leaf(symbol.clone()),
            });
            self.nodes[parent.index()].high = Some(leaf);
            self.sibling.insert_after(&self.nodes, self.escape, leaf);
            self.table.bind(symbol, leaf);
            return Ok(leaf);
        }

        // split: a fresh interior node takes the escape leaf's slot and
        // carries the escape leaf low, the new leaf high
        let interior = self.alloc(Node {
            parent: Some(parent),
            low: None,
            high: None,
            weight: self.nodes[self.escape.index()].weight,
            payload: Payload::Internal,
        });
        if self.nodes[parent.index()].low == Some(self.escape) {
            self.nodes[parent.index()].low = Some(interior);
        } else {
            self.nodes[parent.index()].high = Some(interior);
        }
        self.nodes[interior.index()].low = Some(self.escape);
        self.nodes[self.escape.index()].parent = Some(interior);

        let leaf = self.alloc(Node {
            parent: Some(interior),
            low: None,
            high: None,
            weight: 0,
            payload: Payload::Leaf(symbol.clone()),
        });
        self.nodes[interior.index()].high = Some(leaf);

        self.sibling.insert_after(&self.nodes, self.escape, interior);
        self.sibling.insert_after(&self.nodes, self.escape, leaf);
        self.table.bind(symbol, leaf);
        Ok(leaf)
    }

    /// Propagate a weight increment from `leaf` to the root, repairing
    /// the sibling property as it goes. Before each increment the node is
    /// swapped with the leader of its weight block, unless the leader is
    /// the node itself or the two are parent and child, which would knot
    /// the tree.
    fn update(&mut self, leaf: NodeId) -> Result<()> {
        let mut cursor = Some(leaf);
        while let Some(n) = cursor {
            let leader = self.sibling.leader(n);
            if leader != n
                && self.nodes[n.index()].parent != Some(leader)
                && self.nodes[leader.index()].parent != Some(n)
            {
                self.swap_subtrees(n, leader)?;
                self.sibling.swap(n, leader);
            }
            self.sibling.promote(&mut self.nodes, n)?;
            cursor = self.nodes[n.index()].parent;
        }
        Ok(())
    }

    /// Exchange two nodes, subtrees and all, as children of their
    /// parents. Also covers the degenerate case of two siblings.
    fn swap_subtrees(&mut self, a: NodeId, b: NodeId) -> Result<()> {
        let pa = self.nodes[a.index()]
            .parent
            .ok_or_else(|| Error::Invariant("swap reached the root".into()))?;
        let pb = self.nodes[b.index()]
            .parent
            .ok_or_else(|| Error::Invariant("swap reached the root".into()))?;

        let a_low = self.nodes[pa.index()].low == Some(a);
        let b_low = self.nodes[pb.index()].low == Some(b);
        if a_low {
            self.nodes[pa.index()].low = Some(b);
        } else {
            self.nodes[pa.index()].high = Some(b);
        }
        if b_low {
            self.nodes[pb.index()].low = Some(a);
        } else {
            self.nodes[pb.index()].high = Some(a);
        }
        self.nodes[a.index()].parent = Some(pb);
        self.nodes[b.index()].parent = Some(pa);
        Ok(())
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId::from_index(self.nodes.len());
        self.nodes.push(node);
        id
    }

    fn guard(&self) -> Result<()> {
        if self.poisoned {
            Err(Error::Invariant(
                "engine poisoned by an earlier violation".into(),
            ))
        } else {
            Ok(())
        }
    }

    fn poison_on_invariant<T>(&mut self, result: Result<T>) -> Result<T> {
        if matches!(result, Err(Error::Invariant(_))) {
            self.poisoned = true;
        }
        result
    }

    /// Total number of symbols processed, escapes included once each.
    pub fn total_weight(&self) -> u64 {
        self.nodes[self.root.index()].weight
    }

    /// How many distinct symbols currently own a leaf.
    pub fn distinct_symbols(&self) -> usize {
        self.table.len()
    }

    /// Current weight of a symbol's leaf, if it has one.
    pub fn symbol_weight(&self, symbol: &Symbol) -> Option<u64> {
        self.table
            .lookup(symbol)
            .map(|leaf| self.nodes[leaf.index()].weight)
    }

    /// Weight of the escape leaf. Stays zero; exposed so that callers
    /// can see it stay zero.
    pub fn escape_weight(&self) -> u64 {
        self.nodes[self.escape.index()].weight
    }

    /// Number of leaves, the escape leaf included.
    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Number of interior nodes, the root included.
    pub fn internal_count(&self) -> usize {
        self.nodes.iter().filter(|n| !n.is_leaf()).count()
    }

    /// Depth of every leaf, escape included, in arena order.
    pub fn leaf_depths(&self) -> Vec<usize> {
        (0..self.nodes.len())
            .filter(|&i| self.nodes[i].is_leaf())
            .map(|i| {
                let mut depth = 0;
                let mut n = NodeId::from_index(i);
                while let Some(p) = self.nodes[n.index()].parent {
                    depth += 1;
                    n = p;
                }
                depth
            })
            .collect()
    }

    /// Mean emitted code length in bits, weighted by how often each leaf
    /// fired. `None` before the first symbol.
    pub fn average_code_length(&self) -> Option<f64> {
        let total = self.total_weight();
        if total == 0 {
            return None;
        }
        let weighted: u64 = (0..self.nodes.len())
            .filter(|&i| self.nodes[i].is_leaf())
            .map(|i| {
                let mut depth = 0u64;
                let mut n = NodeId::from_index(i);
                while let Some(p) = self.nodes[n.index()].parent {
                    depth += 1;
                    n = p;
                }
                self.nodes[i].weight * depth
            })
            .sum();
        Some(weighted as f64 / total as f64)
    }

    /// Canonical one-line rendering of the tree, weights and symbols
    /// included. Two engines that have processed the same prefix render
    /// identically; handy for synchrony checks and debugging.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.dump_node(&mut out, Some(self.root));
        out
    }

    fn dump_node(&self, out: &mut String, n: Option<NodeId>) {
        let Some(id) = n else {
            out.push('-');
            return;
        };
        let node = &self.nodes[id.index()];
        match &node.payload {
            Payload::Internal => {
                let _ = write!(out, "({} ", node.weight);
                self.dump_node(out, node.low);
                out.push(' ');
                self.dump_node(out, node.high);
                out.push(')');
            }
            Payload::Escape => out.push_str("[esc]"),
            Payload::Leaf(s) => {
                let _ = write!(out, "[{:?}:{}]", s, node.weight);
            }
        }
    }

    /// Validate every structural invariant the engine relies on.
    ///
    /// Checks the tree shape, parent links, weight sums, the escape
    /// leaf, symbol-table consistency, and the sibling ordering. Runs in
    /// linear-ish time; meant for tests and debugging, not the hot path.
    pub fn check_consistency(&self) -> Result<()> {
        let fail = |msg: &str| Err(Error::Invariant(msg.into()));

        let esc = &self.nodes[self.escape.index()];
        if !matches!(esc.payload, Payload::Escape) || !esc.is_leaf() {
            return fail("escape handle does not point at an escape leaf");
        }
        if esc.weight != 0 {
            return fail("escape weight drifted from zero");
        }
        if self.nodes[self.root.index()].parent.is_some() {
            return fail("root has a parent");
        }

        let mut visited = vec![false; self.nodes.len()];
        let mut stack = vec![self.root];
        let mut escapes = 0usize;
        let mut bound_leaves = 0usize;
        while let Some(id) = stack.pop() {
            if visited[id.index()] {
                return fail("node reachable along two paths");
            }
            visited[id.index()] = true;
            let node = &self.nodes[id.index()];
            match (node.low, node.high) {
                (None, None) => match &node.payload {
                    Payload::Internal => return fail("childless interior node"),
                    Payload::Escape => escapes += 1,
                    Payload::Leaf(sym) => {
                        bound_leaves += 1;
                        if self.table.lookup(sym) != Some(id) {
                            return fail("leaf not bound to its symbol");
                        }
                    }
                },
                (Some(low), high) => {
                    if !matches!(node.payload, Payload::Internal) {
                        return fail("symbol payload on an interior node");
                    }
                    if high.is_none() && (id != self.root || self.nodes.len() != 2) {
                        return fail("interior node missing its high child");
                    }
                    let mut sum = self.nodes[low.index()].weight;
                    if self.nodes[low.index()].parent != Some(id) {
                        return fail("broken parent link");
                    }
                    stack.push(low);
                    if let Some(h) = high {
                        sum += self.nodes[h.index()].weight;
                        if self.nodes[h.index()].parent != Some(id) {
                            return fail("broken parent link");
                        }
                        stack.push(h);
                    }
                    if node.weight != sum {
                        return fail("weight is not the sum of its children");
                    }
                }
                (None, Some(_)) => return fail("high child without a low child"),
            }
        }
        if visited.iter().any(|&v| !v) {
            return fail("orphaned node");
        }
        if escapes != 1 {
            return fail("tree does not hold exactly one escape leaf");
        }
        if self.table.len() != bound_leaves {
            return fail("symbol table size disagrees with the leaf count");
        }
        for (_, leaf) in self.table.entries() {
            if !matches!(self.nodes[leaf.index()].payload, Payload::Leaf(_)) {
                return fail("symbol table entry points past the leaves");
            }
        }

        let order = self.sibling.order();
        if order.len() != self.nodes.len() || self.sibling.len() != self.nodes.len() {
            return fail("sibling order does not cover the tree");
        }
        if order.first() != Some(&self.escape) {
            return fail("escape leaf is not first in sibling order");
        }
        for pair in order.windows(2) {
            if self.nodes[pair[0].index()].weight > self.nodes[pair[1].index()].weight {
                return fail("sibling order is not sorted by weight");
            }
        }
        let mut seen = vec![false; self.nodes.len()];
        for &n in &order {
            if seen[n.index()] {
                return fail("node listed twice in sibling order");
            }
            seen[n.index()] = true;
        }
        Ok(())
    }
}

impl Default for CodeTree {
    fn default() -> Self {
        Self::new()
    }
}
