//! Triples loaded from a file are walkable and durable.

use std::fs;

use crate::e2e_tests::helpers::*;
use crate::ingest::{LoadOptions, load_file};
use crate::query::steps;
use crate::storage::EngineOptions;

const SAMPLE_FILE: &str = r#"# sample graph
<a> <p1> <b> <src1> .
<a> <p1> <f> .
<a> <p5> "j" .
<b> <p2> <c> .
<g> <p4> <c> .
<g> <p1> <h> .
<g> <p1> <i> <src2> .
<g> <p1> "ignored"@fr .
<g> <p1> .
"#;

#[tokio::test]
async fn test_load_then_walk() {
    let store = TestStore::new();
    let file = tempfile::NamedTempFile::new().unwrap();
    fs::write(file.path(), SAMPLE_FILE).unwrap();

    let options = LoadOptions {
        batch_size: 3,
        ..LoadOptions::default()
    };
    let report = load_file(&store.graph, file.path(), &options).unwrap();
    assert_eq!(report.read, 7);
    assert_eq!(report.written, 7);
    assert_eq!(report.problems, 0);
    assert_eq!(store.graph.writes(), 21);

    let store = store.reopen(EngineOptions::default());
    let paths = steps::out("p1")
        .out("p2")
        .inbound("p4")
        .out("p1")
        .has(|t| t.o == b"i")
        .walk(&store.graph, "a")
        .collect()
        .await;

    assert_eq!(paths.len(), 1);
    assert_eq!(paths[0][0].v, b"src1");
    assert_eq!(paths[0][3].v, b"src2");
}
