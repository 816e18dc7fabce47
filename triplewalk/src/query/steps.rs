//! Traversal steps.
//!
//! A [`Stepper`] describes one hop of a walk: how to turn the current path's
//! last triple into a scan pattern, which index to scan, and how to orient
//! what it finds. Steps chain off each other with the builder methods and
//! are flattened into a forward pipeline when the walk starts.
//!
//! ```ignore
//! let walk = steps::out("p1")
//!     .out("p2")
//!     .inbound("p4")
//!     .out("p1")
//!     .has(|t| t.o == b"i")
//!     .walk(&graph, "a");
//! ```

use std::fmt;
use std::sync::Arc;

use crate::types::{Index, Triple};

/// Test applied by a filtering step to the path's last triple.
pub type Predicate = Arc<dyn Fn(&Triple) -> bool + Send + Sync>;

/// Side effect run with the path so far each time a step advances.
pub type Inspector = Arc<dyn Fn(&[Triple]) + Send + Sync>;

/// One traversal operator.
#[derive(Clone)]
pub struct Stepper {
    /// Permutation applied to the last triple to build the scan pattern.
    pub(crate) input: Index,
    /// Index scanned for matches.
    pub(crate) index: Index,
    /// Permutation applied to each match before it joins the path.
    pub(crate) output: Index,
    /// Fixed fields overlaid on the scan pattern. An empty `s` keeps the
    /// current vertex; `p` always replaces the pattern's predicate.
    pub(crate) pattern: Triple,
    pub(crate) has: Option<Predicate>,
    pub(crate) inspectors: Vec<Inspector>,
    previous: Option<Box<Stepper>>,
}

impl Stepper {
    fn scan(input: Index, index: Index, output: Index, predicate: Vec<u8>) -> Self {
        Self {
            input,
            index,
            output,
            pattern: Triple {
                p: predicate,
                ..Triple::default()
            },
            has: None,
            inspectors: Vec::new(),
            previous: None,
        }
    }

    fn filter(predicate: Predicate) -> Self {
        Self {
            has: Some(predicate),
            ..Self::scan(Index::Spo, Index::Spo, Index::Spo, Vec::new())
        }
    }

    fn then(self, mut next: Self) -> Self {
        next.previous = Some(Box::new(self));
        next
    }

    /// Follow outbound edges labelled `p`.
    #[must_use]
    pub fn out(self, p: impl Into<Vec<u8>>) -> Self {
        self.then(out(p))
    }

    /// Follow every outbound edge.
    #[must_use]
    pub fn all_out(self) -> Self {
        self.then(all_out())
    }

    /// Follow inbound edges labelled `p`.
    #[must_use]
    pub fn inbound(self, p: impl Into<Vec<u8>>) -> Self {
        self.then(inbound(p))
    }

    /// Follow every inbound edge.
    #[must_use]
    pub fn all_in(self) -> Self {
        self.then(all_in())
    }

    /// Keep only paths whose last triple satisfies `predicate`.
    #[must_use]
    pub fn has<F>(self, predicate: F) -> Self
    where
        F: Fn(&Triple) -> bool + Send + Sync + 'static,
    {
        self.then(has(predicate))
    }

    /// Run `f` with the path so far whenever this step advances.
    #[must_use]
    pub fn inspect<F>(mut self, f: F) -> Self
    where
        F: Fn(&[Triple]) + Send + Sync + 'static,
    {
        self.inspectors.push(Arc::new(f));
        self
    }

    /// Fix the leading field of this step's scan pattern instead of taking
    /// it from the path.
    #[must_use]
    pub fn with_subject(mut self, s: impl Into<Vec<u8>>) -> Self {
        self.pattern.s = s.into();
        self
    }

    /// True for steps that test the path instead of scanning.
    #[must_use]
    pub const fn is_filter(&self) -> bool {
        self.has.is_some()
    }

    /// The chain ending at this step, first step first.
    #[must_use]
    pub fn pipeline(self) -> Vec<Self> {
        let mut steps = Vec::new();
        let mut at = Some(self);
        while let Some(mut step) = at {
            at = step.previous.take().map(|previous| *previous);
            steps.push(step);
        }
        steps.reverse();
        steps
    }

    pub(crate) fn run_inspectors(&self, path: &[Triple]) {
        for inspector in &self.inspectors {
            inspector(path);
        }
    }
}

impl fmt::Debug for Stepper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stepper")
            .field("input", &self.input)
            .field("index", &self.index)
            .field("output", &self.output)
            .field("pattern", &self.pattern)
            .field("has", &self.has.is_some())
            .field("inspectors", &self.inspectors.len())
            .field("previous", &self.previous)
            .finish()
    }
}

/// Follow outbound edges labelled `p` from the current vertex.
///
/// Scans `SPO` with the current vertex as subject; matches join the path in
/// S, P, O orientation, so the next vertex is the object.
#[must_use]
pub fn out(p: impl Into<Vec<u8>>) -> Stepper {
    Stepper::scan(Index::Ops, Index::Spo, Index::Spo, p.into())
}

/// [`out`] with any predicate.
#[must_use]
pub fn all_out() -> Stepper {
    Stepper::scan(Index::Ops, Index::Spo, Index::Spo, Vec::new())
}

/// Follow inbound edges labelled `p` to the current vertex.
///
/// Scans `OPS`; matches join the path in O, P, S orientation, so the vertex
/// the edge came from sits in the object slot.
#[must_use]
pub fn inbound(p: impl Into<Vec<u8>>) -> Stepper {
    Stepper::scan(Index::Ops, Index::Ops, Index::Ops, p.into())
}

/// [`inbound`] with any predicate.
#[must_use]
pub fn all_in() -> Stepper {
    Stepper::scan(Index::Ops, Index::Ops, Index::Ops, Vec::new())
}

/// Keep only paths whose last triple satisfies `predicate`. Adds nothing to
/// the path.
#[must_use]
pub fn has<F>(predicate: F) -> Stepper
where
    F: Fn(&Triple) -> bool + Send + Sync + 'static,
{
    Stepper::filter(Arc::new(predicate))
}
