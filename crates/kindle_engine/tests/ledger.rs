use std::fs;

use kindle_engine::{FileLedger, LedgerError, LedgerSettings, MemoryLedger, UrlLedger};
use tempfile::TempDir;

#[tokio::test]
async fn new_url_is_reported_unseen_exactly_once() {
    let temp = TempDir::new().unwrap();
    let ledger = FileLedger::new(temp.path(), true);

    assert!(!ledger.check_and_record("https://example.com/a").await.unwrap());
    assert!(ledger.check_and_record("https://example.com/a").await.unwrap());
    assert!(ledger.check_and_record("https://example.com/a").await.unwrap());
    assert!(!ledger.check_and_record("https://example.com/b").await.unwrap());
}

#[tokio::test]
async fn lookup_is_an_exact_match() {
    let ledger = MemoryLedger::with_urls(["https://example.com/a"]);

    assert!(ledger.seen("https://example.com/a").await.unwrap());
    assert!(!ledger.seen("https://example.com/a/").await.unwrap());
    assert!(!ledger.seen("HTTPS://EXAMPLE.COM/a").await.unwrap());
}

#[tokio::test]
async fn record_seen_does_not_check_for_duplicates() {
    let ledger = MemoryLedger::new();
    ledger.record_seen("https://example.com/a").await.unwrap();
    ledger.record_seen("https://example.com/a").await.unwrap();

    assert_eq!(ledger.records().len(), 2);
}

#[tokio::test]
async fn provisioning_creates_database_and_collection_once() {
    let temp = TempDir::new().unwrap();
    let ledger = FileLedger::new(temp.path(), true);
    assert!(!ledger.collection_path().exists());

    ledger.ensure_collection_exists().await.unwrap();
    assert!(ledger.collection_path().exists());
    assert!(ledger
        .collection_path()
        .starts_with(temp.path().join("kindle")));

    ledger.record_seen("https://example.com/a").await.unwrap();
    // Already present: must not wipe existing records.
    ledger.ensure_collection_exists().await.unwrap();
    assert!(ledger.seen("https://example.com/a").await.unwrap());
}

#[tokio::test]
async fn missing_collection_without_provisioning_is_an_error() {
    let temp = TempDir::new().unwrap();
    let ledger = FileLedger::new(temp.path(), false);

    ledger.ensure_collection_exists().await.unwrap();
    assert!(!ledger.collection_path().exists());

    let err = ledger.check_and_record("https://example.com").await.unwrap_err();
    assert!(matches!(err, LedgerError::CollectionMissing(_)));
}

#[tokio::test]
async fn records_survive_reopening_the_ledger() {
    let temp = TempDir::new().unwrap();
    {
        let ledger = FileLedger::new(temp.path(), true);
        ledger.check_and_record("https://example.com/kept").await.unwrap();
    }

    let reopened = FileLedger::from_settings(&LedgerSettings {
        create_database: false,
        connection: temp.path().to_string_lossy().into_owned(),
    })
    .unwrap();
    assert!(reopened.seen("https://example.com/kept").await.unwrap());

    let content = fs::read_to_string(reopened.collection_path()).unwrap();
    assert!(content.contains("https://example.com/kept"));
    assert!(content.contains("first_seen_utc"));
}

#[tokio::test]
async fn corrupt_collection_is_a_format_error() {
    let temp = TempDir::new().unwrap();
    let ledger = FileLedger::new(temp.path(), true);
    ledger.ensure_collection_exists().await.unwrap();
    fs::write(ledger.collection_path(), "not ron at all {").unwrap();

    let err = ledger.seen("https://example.com").await.unwrap_err();
    assert!(matches!(err, LedgerError::Format { .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_inserts_keep_every_record() {
    let temp = TempDir::new().unwrap();
    let ledger = std::sync::Arc::new(FileLedger::new(temp.path(), true));
    ledger.ensure_collection_exists().await.unwrap();

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let ledger = ledger.clone();
            tokio::spawn(async move {
                ledger
                    .record_seen(&format!("https://example.com/{i}"))
                    .await
                    .unwrap();
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    for i in 0..16 {
        assert!(ledger.seen(&format!("https://example.com/{i}")).await.unwrap());
    }
    let stored = fs::read_to_string(ledger.collection_path()).unwrap();
    assert_eq!(stored.matches("https://example.com/").count(), 16);
}
