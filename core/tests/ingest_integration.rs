use std::sync::Arc;

use tempfile::tempdir;
use tokio::fs;

use truthforge_core::{
    embedding::HashEmbedder,
    ingest::{Granularity, IngestError, ingest_file, ingest_text},
    store::DocumentStore,
};

const STANDARDS: &str = "\
[SECTOR: MEDICAL]
Patient records must be encrypted at rest and in transit.

Access to records is logged for six years.
[SECTOR: LAW]
Contracts above 10,000 EUR require two signatures.
[SECTOR: ENGINEERING]
Load-bearing beams must be tested at 150% of rated load.
";

fn store_in(dir: &std::path::Path) -> DocumentStore {
    DocumentStore::new(dir.join("vector_store.json"), Arc::new(HashEmbedder::new()))
}

#[tokio::test]
async fn ingests_file_into_store() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("standards.txt");
    fs::write(&source, STANDARDS).await.unwrap();
    let store = store_in(dir.path());

    let report = ingest_file(&source, &store, Granularity::Block).await.unwrap();

    assert_eq!(report.chunks_added, 3);
    assert_eq!(
        report.sources.iter().map(String::as_str).collect::<Vec<_>>(),
        ["ENGINEERING", "LAW", "MEDICAL"]
    );
    let entries = store.entries();
    assert_eq!(entries[0].source(), "MEDICAL");
    assert!(entries[0].text.ends_with("logged for six years."));

    let reopened = DocumentStore::open(store.path(), Arc::new(HashEmbedder::new()))
        .await
        .unwrap();
    assert_eq!(reopened.len(), 3);
}

#[tokio::test]
async fn paragraph_granularity_splits_blocks() {
    let dir = tempdir().unwrap();
    let store = store_in(dir.path());

    let report = ingest_text(STANDARDS, &store, Granularity::Paragraph).await.unwrap();

    assert_eq!(report.chunks_added, 4);
    assert_eq!(store.sources().get("MEDICAL"), Some(&2));
}

#[tokio::test]
async fn reingesting_appends_duplicates() {
    let dir = tempdir().unwrap();
    let store = store_in(dir.path());

    ingest_text(STANDARDS, &store, Granularity::Block).await.unwrap();
    ingest_text(STANDARDS, &store, Granularity::Block).await.unwrap();

    assert_eq!(store.len(), 6);
    assert_eq!(store.entries()[0].text, store.entries()[3].text);
}

#[tokio::test]
async fn missing_source_leaves_store_untouched() {
    let dir = tempdir().unwrap();
    let store = store_in(dir.path());

    let result = ingest_file(&dir.path().join("absent.txt"), &store, Granularity::Block).await;

    assert!(matches!(result, Err(IngestError::SourceMissing(_))));
    assert!(store.is_empty());
    assert!(!store.path().exists());
}

#[tokio::test]
async fn headers_only_file_adds_nothing() {
    let dir = tempdir().unwrap();
    let store = store_in(dir.path());

    let report = ingest_text("[SECTOR: A]\n[SECTOR: B]\n", &store, Granularity::Block)
        .await
        .unwrap();

    assert_eq!(report.chunks_added, 0);
    assert!(report.sources.is_empty());
    assert!(!store.path().exists());
}

#[tokio::test]
async fn ingested_rules_are_searchable() {
    let dir = tempdir().unwrap();
    let store = store_in(dir.path());
    ingest_text(STANDARDS, &store, Granularity::Block).await.unwrap();

    let results = store.search("how many signatures do contracts need", 1).await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].entry.source(), "LAW");
}
