//! Distinct-subject enumeration.
//!
//! Instead of visiting every `SPO` key, the enumerator seeks straight past a
//! subject's run of keys using [`successor`], so the cost is one seek per
//! distinct subject.
//!
//! The successor of `s` is computed over the bare subject bytes, which also
//! skips any subject that extends `s` (`"ab"` after `"a"`), and enumeration
//! stops at a subject made only of `0xFF` bytes. The empty subject is
//! followed by a seek to `[0x01]`, the first key past its `0x00` run.

use crate::storage::engine::{KvCursor, KvEngine};
use crate::storage::graph::{Graph, GraphError};
use crate::types::{Index, Triple, Vertex};

/// Big-endian increment with carry.
///
/// Increments the last byte that is not `0xFF` and drops everything after
/// it. Returns `None` when every byte is `0xFF` (or `bytes` is empty).
#[must_use]
pub fn successor(bytes: &[u8]) -> Option<Vec<u8>> {
    let last = bytes.iter().rposition(|b| *b != u8::MAX)?;
    let mut next = bytes[..=last].to_vec();
    next[last] += 1;
    Some(next)
}

/// Yields each distinct subject of the `SPO` index once, in byte order.
#[derive(Debug)]
pub struct VertexIterator<C: KvCursor> {
    cursor: C,
    /// Next seek position; `None` once enumeration is over.
    at: Option<Vec<u8>>,
}

impl<C: KvCursor> VertexIterator<C> {
    fn new(cursor: C) -> Self {
        Self {
            cursor,
            at: Some(vec![Index::Spo.tag(), 0]),
        }
    }
}

impl<C: KvCursor> Iterator for VertexIterator<C> {
    type Item = Vertex;

    fn next(&mut self) -> Option<Self::Item> {
        let at = self.at.take()?;
        self.cursor.seek(&at);
        if !self.cursor.valid() {
            return None;
        }
        let (tag, key) = self.cursor.key().split_first()?;
        if *tag != Index::Spo.tag() {
            return None;
        }
        let subject = Triple::decode(key, self.cursor.value()).s;
        let next = if subject.is_empty() {
            Some(vec![0x01])
        } else {
            successor(&subject)
        };
        self.at = next.map(|next| Index::Spo.tagged(&next));
        Some(subject)
    }
}

impl<E: KvEngine> Graph<E> {
    /// Iterate over distinct subjects.
    pub fn vertices(&self) -> Result<VertexIterator<E::Cursor>, GraphError> {
        Ok(VertexIterator::new(self.engine().cursor()?))
    }

    /// Call `visitor` on at most `limit` distinct subjects, stopping early
    /// if it returns `false`.
    pub fn do_vertices<F>(&self, limit: usize, mut visitor: F) -> Result<(), GraphError>
    where
        F: FnMut(&[u8]) -> bool,
    {
        for vertex in self.vertices()?.take(limit) {
            if !visitor(&vertex) {
                break;
            }
        }
        Ok(())
    }
}
