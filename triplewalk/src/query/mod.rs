//! Path queries over the triple store.
//!
//! A query is a pipeline of [`Stepper`]s walked from a start vertex. Each
//! step either scans an index for edges leaving (or entering) the current
//! vertex, or filters the path built so far. Results stream back as
//! [`Path`]s through a [`Walk`].
//!
//! # Example
//!
//! ```ignore
//! use triplewalk::query::steps::{all_out, out};
//!
//! // Everything one hop from "a".
//! let paths = walk(&graph, "a", vec![all_out()]).collect().await;
//!
//! // Builder form: a -p1-> ? -p2-> ?
//! let first_ten = out("p1").out("p2").walk(&graph, "a").collect_up_to(10).await;
//! ```

pub mod steps;
pub mod walk;

pub use steps::{Inspector, Predicate, Stepper};
pub use walk::{Path, Walk, WalkOutcome, walk};
