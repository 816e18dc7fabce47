pub mod triple;

pub use triple::{Index, KEY_DELIMITER, Triple, Vertex};
