//! Sibling ordering of tree nodes, partitioned into equal-weight blocks.
//!
//! All live nodes sit on one doubly-linked chain whose weights are
//! non-decreasing at every quiescent point. Runs of equal weight are
//! tracked as explicit blocks so that the leader of a node's block, the
//! swap target during tree repair, is a single pointer chase. The chain
//! is always the concatenation of its blocks, and the block list itself
//! is ordered by strictly increasing weight.
//!
//! The escape leaf is registered first and stays at the head of the
//! chain for the life of the engine: its weight never leaves zero and
//! new nodes are inserted behind it, never in front.

use crate::error::{Error, Result};
use crate::tree::{Node, NodeId};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct BlockId(u32);

impl BlockId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// One maximal run of equal-weight nodes.
#[derive(Debug)]
struct Block {
    first: NodeId,
    last: NodeId,
    prev: Option<BlockId>,
    next: Option<BlockId>,
}

/// Per-node chain links and block membership.
#[derive(Debug)]
struct Entry {
    prev: Option<NodeId>,
    next: Option<NodeId>,
    block: BlockId,
}

/// Flat ordering of all tree nodes by non-decreasing weight.
#[derive(Debug, Default)]
pub(crate) struct SiblingIndex {
    entries: Vec<Entry>,
    blocks: Vec<Block>,
    spare: Vec<BlockId>,
    head: Option<NodeId>,
}

impl SiblingIndex {
    /// Register the very first node. Only the escape leaf goes through
    /// here; everything after it uses [`SiblingIndex::insert_after`].
    pub(crate) fn register_head(&mut self, n: NodeId) {
        debug_assert!(self.entries.is_empty());
        let block = self.acquire(Block {
            first: n,
            last: n,
            prev: None,
            next: None,
        });
        self.entries.push(Entry {
            prev: None,
            next: None,
            block,
        });
        self.head = Some(n);
    }

    /// Place a newly created node immediately after `existing`.
    ///
    /// The new node must carry the same weight as `existing`; it joins
    /// the existing node's block.
    pub(crate) fn insert_after(&mut self, nodes: &[Node], existing: NodeId, n: NodeId) {
        debug_assert_eq!(n.index(), self.entries.len(), "nodes register in arena order");
        debug_assert_eq!(
            nodes[existing.index()].weight,
            nodes[n.index()].weight,
            "creation inserts stay within one block"
        );
        let block = self.entry(existing).block;
        let next = self.entry(existing).next;
        self.entries.push(Entry {
            prev: Some(existing),
            next,
            block,
        });
        self.entry_mut(existing).next = Some(n);
        if let Some(x) = next {
            self.entry_mut(x).prev = Some(n);
        }
        if self.blk(block).last == existing {
            self.blk_mut(block).last = n;
        }
    }

    /// The last node of the block containing `n`.
    pub(crate) fn leader(&self, n: NodeId) -> NodeId {
        self.blk(self.entry(n).block).last
    }

    /// Exchange the positions of two nodes of one block.
    pub(crate) fn swap(&mut self, a: NodeId, b: NodeId) {
        if a == b {
            return;
        }
        let block = self.entry(a).block;
        debug_assert_eq!(block, self.entry(b).block, "swaps stay within one block");

        let (ap, an) = (self.entry(a).prev, self.entry(a).next);
        let (bp, bn) = (self.entry(b).prev, self.entry(b).next);
        if an == Some(b) {
            self.relink(ap, b, a, bn);
        } else if bn == Some(a) {
            self.relink(bp, a, b, an);
        } else {
            self.entry_mut(a).prev = bp;
            self.entry_mut(a).next = bn;
            self.entry_mut(b).prev = ap;
            self.entry_mut(b).next = an;
            if let Some(p) = ap {
                self.entry_mut(p).next = Some(b);
            }
            if let Some(x) = an {
                self.entry_mut(x).prev = Some(b);
            }
            if let Some(p) = bp {
                self.entry_mut(p).next = Some(a);
            }
            if let Some(x) = bn {
                self.entry_mut(x).prev = Some(a);
            }
        }

        let blk = self.blk_mut(block);
        if blk.first == a {
            blk.first = b;
        } else if blk.first == b {
            blk.first = a;
        }
        if blk.last == a {
            blk.last = b;
        } else if blk.last == b {
            blk.last = a;
        }
    }

    /// Bump the weight of `n` by one and restore the block structure.
    ///
    /// The node moves to the tail of its block (a no-op when it already
    /// is the leader, the common case after a swap), leaves it, and
    /// becomes the lowest-ranked member of the weight+1 block, which is
    /// created between the two neighbours when absent.
    pub(crate) fn promote(&mut self, nodes: &mut [Node], n: NodeId) -> Result<()> {
        let block = self.entry(n).block;
        let first = self.blk(block).first;
        let last = self.blk(block).last;

        if first == n && last == n {
            nodes[n.index()].weight += 1;
            if let Some(nb) = self.blk(block).next {
                if nodes[self.blk(nb).first.index()].weight == nodes[n.index()].weight {
                    // merge into the next block and retire this one
                    self.entry_mut(n).block = nb;
                    self.blk_mut(nb).first = n;
                    self.unlink_block(block);
                    self.release(block);
                }
            }
            return Ok(());
        }

        if first == n {
            let next = self
                .entry(n)
                .next
                .ok_or_else(|| Error::Invariant("sibling chain ends inside a block".into()))?;
            self.blk_mut(block).first = next;
        }
        if last == n {
            let prev = self
                .entry(n)
                .prev
                .ok_or_else(|| Error::Invariant("sibling chain starts inside a block".into()))?;
            self.blk_mut(block).last = prev;
        } else {
            self.unlink(n);
            self.link_after(last, n);
        }

        nodes[n.index()].weight += 1;
        let next_block = self.blk(block).next;
        let joins = next_block
            .filter(|&nb| nodes[self.blk(nb).first.index()].weight == nodes[n.index()].weight);
        match joins {
            Some(nb) => {
                self.entry_mut(n).block = nb;
                self.blk_mut(nb).first = n;
            }
            None => {
                let fresh = self.acquire(Block {
                    first: n,
                    last: n,
                    prev: Some(block),
                    next: next_block,
                });
                if let Some(nb) = next_block {
                    self.blk_mut(nb).prev = Some(fresh);
                }
                self.blk_mut(block).next = Some(fresh);
                self.entry_mut(n).block = fresh;
            }
        }
        Ok(())
    }

    /// All nodes in sibling order. Walks the chain; meant for invariant
    /// checks and tests, not for the hot path.
    pub(crate) fn order(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.entries.len());
        let mut cursor = self.head;
        while let Some(n) = cursor {
            out.push(n);
            cursor = self.entry(n).next;
        }
        out
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    fn relink(&mut self, before: Option<NodeId>, x: NodeId, y: NodeId, after: Option<NodeId>) {
        // before -> x -> y -> after
        self.entry_mut(x).prev = before;
        self.entry_mut(x).next = Some(y);
        self.entry_mut(y).prev = Some(x);
        self.entry_mut(y).next = after;
        if let Some(p) = before {
            self.entry_mut(p).next = Some(x);
        }
        if let Some(q) = after {
            self.entry_mut(q).prev = Some(y);
        }
    }

    fn unlink(&mut self, n: NodeId) {
        let prev = self.entry(n).prev;
        let next = self.entry(n).next;
        if let Some(p) = prev {
            self.entry_mut(p).next = next;
        } else {
            self.head = next;
        }
        if let Some(x) = next {
            self.entry_mut(x).prev = prev;
        }
        self.entry_mut(n).prev = None;
        self.entry_mut(n).next = None;
    }

    fn link_after(&mut self, at: NodeId, n: NodeId) {
        let next = self.entry(at).next;
        self.entry_mut(n).prev = Some(at);
        self.entry_mut(n).next = next;
        self.entry_mut(at).next = Some(n);
        if let Some(x) = next {
            self.entry_mut(x).prev = Some(n);
        }
    }

    fn unlink_block(&mut self, block: BlockId) {
        let prev = self.blk(block).prev;
        let next = self.blk(block).next;
        if let Some(p) = prev {
            self.blk_mut(p).next = next;
        }
        if let Some(x) = next {
            self.blk_mut(x).prev = prev;
        }
    }

    fn acquire(&mut self, block: Block) -> BlockId {
        match self.spare.pop() {
            Some(id) => {
                self.blocks[id.index()] = block;
                id
            }
            None => {
                self.blocks.push(block);
                BlockId(self.blocks.len() as u32 - 1)
            }
        }
    }

    fn release(&mut self, block: BlockId) {
        self.spare.push(block);
    }

    fn entry(&self, n: NodeId) -> &Entry {
        &self.entries[n.index()]
    }

    fn entry_mut(&mut self, n: NodeId) -> &mut Entry {
        &mut self.entries[n.index()]
    }

    fn blk(&self, b: BlockId) -> &Block {
        &self.blocks[b.index()]
    }

    fn blk_mut(&mut self, b: BlockId) -> &mut Block {
        &mut self.blocks[b.index()]
    }
}
