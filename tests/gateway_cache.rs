use std::time::Duration;

use etymon::effect::RequestId;
use etymon::gateway::{AnalysisReply, AnalysisService, CacheStore, Gateway, JsonFileCache};
use etymon::test_utils::test_helpers::FakeProvider;
use tempfile::TempDir;

#[test]
fn test_persisted_cache_survives_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("etymon").join("cache.json");

    // First run: a miss goes to the provider and lands in the file.
    let provider = FakeProvider::new();
    let calls = provider.calls();
    let service = AnalysisService::spawn(Gateway::new(JsonFileCache::open(&path).unwrap(), provider));
    let pending = service.analyze(RequestId(1), "Run").unwrap();
    let reply = pending.wait(Duration::from_secs(5)).unwrap().unwrap();
    assert_eq!(reply, AnalysisReply::Success(FakeProvider::record_for("run")));
    drop(service);
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);

    // Second run: the record comes from disk even though the provider fails.
    let mut gateway = Gateway::new(
        JsonFileCache::open(&path).unwrap(),
        FakeProvider::failing("offline"),
    );
    assert_eq!(gateway.lookup("run").unwrap(), FakeProvider::record_for("run"));
    assert_eq!(gateway.provider().call_count(), 0);
    assert_eq!(gateway.cache().keys(), vec!["cache_ety_v2_run".to_string()]);
}

#[test]
fn test_removed_word_is_fetched_again() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cache.json");
    let mut gateway = Gateway::new(JsonFileCache::open(&path).unwrap(), FakeProvider::new());

    gateway.lookup("walk").unwrap();
    assert!(gateway.cache_mut().remove("cache_ety_v2_walk").unwrap());
    gateway.lookup("walk").unwrap();
    assert_eq!(gateway.provider().call_count(), 2);

    let reopened = JsonFileCache::open(&path).unwrap();
    assert_eq!(reopened.len(), 1);
}

#[test]
fn test_failures_reach_the_page_as_text() {
    let service = AnalysisService::spawn(Gateway::new(
        etymon::gateway::MemoryCache::new(),
        FakeProvider::failing("quota exceeded"),
    ));
    let pending = service.analyze(RequestId(7), "run").unwrap();
    let reply = pending.wait(Duration::from_secs(5)).unwrap().unwrap();
    assert_eq!(
        reply.into_result(),
        Err("API error: quota exceeded".to_string())
    );
}
