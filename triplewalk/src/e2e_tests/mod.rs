//! End-to-end scenarios over real stores.
//!
//! Each file covers one behavior of the full stack: loading, indexing,
//! walking, cancelling and recovering.

#![cfg(test)]

mod helpers;

mod test_all_out;
mod test_cancellation;
mod test_determinism;
mod test_five_step_walk;
mod test_load_and_walk;
mod test_recovery;
mod test_vertices;
