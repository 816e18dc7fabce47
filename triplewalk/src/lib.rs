// Life of a query:
// 1. Triples arrive (loader or direct writes) and are stored three times,
//    once per index permutation, in one atomic batch
// 2. A walk seeds a path with the start vertex
// 3. Each step scans one index with a prefix built from the path's last
//    triple, depth first, in key order
// 4. Complete paths stream to the consumer over a bounded channel
//
// System components:
//  - Ordered key/value engine (in-memory or log-backed)
//  - Index store and vertex enumerator
//  - Step pipeline and walk engine
//  - Loader and HTTP endpoint

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod config;
pub mod http;
pub mod ingest;
pub mod query;
pub mod storage;
pub mod types;

#[cfg(test)]
mod e2e_tests;
#[cfg(test)]
pub mod testing;
