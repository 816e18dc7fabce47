//! Reading triples from text files into a [`Graph`](crate::storage::Graph).
//!
//! [`nquads`] parses the line format (an N-Quads subset where the fourth
//! term becomes the triple's value) and [`loader`] batches parsed triples
//! into the store.

pub mod loader;
pub mod nquads;

pub use loader::{
    DEFAULT_BATCH_SIZE, DEFAULT_REPORT_INTERVAL, LoadError, LoadOptions, LoadReport, load_file,
    load_reader,
};
pub use nquads::{ParseError, ParseOptions, QuadReader, ReadError, parse_line};
