//! Integration tests for CacheRepository's search memoization
//!
//! Memoization is observed without instrumenting the adapter: writes that
//! bypass the repository (straight to the adapter) do not invalidate the
//! memo, so a repeated search returning stale rows proves the backend was
//! not hit again. Writes through the repository must invalidate, so the
//! same search then returns fresh rows.

use std::sync::Arc;
use std::time::Duration;

use mirrorlake_cache::{CacheRepository, StorePersistenceAdapter};
use mirrorlake_core::domain::{BucketRecord, NewProfile, ObjectRecord};
use mirrorlake_core::ports::IPersistenceAdapter;

// ============================================================================
// Test helpers
// ============================================================================

fn setup() -> CacheRepository {
    let adapter: Arc<dyn IPersistenceAdapter> = Arc::new(StorePersistenceAdapter::in_memory());
    CacheRepository::new(adapter)
}

async fn seed_profile(repo: &CacheRepository) -> i64 {
    let profile = NewProfile {
        name: "test".to_string(),
        access_key_id: "k".to_string(),
        secret_access_key: "s".to_string(),
        region: "us-east-1".to_string(),
        endpoint: None,
    };
    repo.save_profile(&profile).await.unwrap().id
}

// ============================================================================
// Memoization
// ============================================================================

#[tokio::test]
async fn test_repeated_search_is_served_from_memo() {
    let repo = setup();
    let profile_id = seed_profile(&repo).await;

    repo.replace_objects(profile_id, "media", &[ObjectRecord::new("cat.jpg")], None)
        .await
        .unwrap();

    let first = repo.search_objects(profile_id, "media", "cat").await.unwrap();
    assert_eq!(first.len(), 1);

    // Mutate behind the repository's back; the memo must not notice
    repo.adapter()
        .replace_objects(profile_id, "media", &[], None)
        .await
        .unwrap();

    let second = repo.search_objects(profile_id, "media", "cat").await.unwrap();
    assert_eq!(second.len(), 1, "second search within TTL must be memoized");
}

#[tokio::test]
async fn test_memo_key_is_case_insensitive() {
    let repo = setup();
    let profile_id = seed_profile(&repo).await;

    repo.replace_objects(profile_id, "media", &[ObjectRecord::new("Report.pdf")], None)
        .await
        .unwrap();

    repo.search_objects(profile_id, "media", "report").await.unwrap();
    assert_eq!(repo.memo_len(), 1);

    // Different casing of the same query shares the entry
    repo.search_objects(profile_id, "media", "REPORT").await.unwrap();
    assert_eq!(repo.memo_len(), 1);

    // A different query string is its own entry
    repo.search_objects(profile_id, "media", "pdf").await.unwrap();
    assert_eq!(repo.memo_len(), 2);
}

#[tokio::test]
async fn test_memo_expires_after_ttl() {
    let adapter: Arc<dyn IPersistenceAdapter> = Arc::new(StorePersistenceAdapter::in_memory());
    let repo = CacheRepository::with_ttl(adapter, Duration::from_millis(50));
    let profile_id = seed_profile(&repo).await;

    repo.replace_objects(profile_id, "media", &[ObjectRecord::new("cat.jpg")], None)
        .await
        .unwrap();
    assert_eq!(repo.search_objects(profile_id, "media", "cat").await.unwrap().len(), 1);

    // Stale write outside the repository becomes visible once the TTL lapses
    repo.adapter()
        .replace_objects(profile_id, "media", &[], None)
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(80)).await;

    let after = repo.search_objects(profile_id, "media", "cat").await.unwrap();
    assert!(after.is_empty(), "expired memo must re-query the backend");
}

// ============================================================================
// Proactive invalidation
// ============================================================================

#[tokio::test]
async fn test_object_write_invalidates_object_and_global_searches() {
    let repo = setup();
    let profile_id = seed_profile(&repo).await;

    repo.replace_objects(profile_id, "media", &[ObjectRecord::new("cat.jpg")], None)
        .await
        .unwrap();

    assert_eq!(repo.search_objects(profile_id, "media", "cat").await.unwrap().len(), 1);
    assert_eq!(repo.search_all_objects(profile_id, "cat").await.unwrap().len(), 1);

    // A write through the repository drops both memo entries
    repo.delete_object(profile_id, "media", "cat.jpg").await.unwrap();

    assert!(repo.search_objects(profile_id, "media", "cat").await.unwrap().is_empty());
    assert!(repo.search_all_objects(profile_id, "cat").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_object_write_leaves_other_buckets_memo_alone() {
    let repo = setup();
    let profile_id = seed_profile(&repo).await;

    repo.replace_objects(profile_id, "media", &[ObjectRecord::new("cat.jpg")], None)
        .await
        .unwrap();
    repo.replace_objects(profile_id, "logs", &[ObjectRecord::new("app.log")], None)
        .await
        .unwrap();

    repo.search_objects(profile_id, "media", "cat").await.unwrap();
    repo.search_objects(profile_id, "logs", "app").await.unwrap();
    assert_eq!(repo.memo_len(), 2);

    repo.save_object(profile_id, "media", &ObjectRecord::new("dog.jpg"), None)
        .await
        .unwrap();

    // The logs entry survived; only the media entry was dropped
    assert_eq!(repo.memo_len(), 1);
}

#[tokio::test]
async fn test_bucket_write_invalidates_bucket_searches_only() {
    let repo = setup();
    let profile_id = seed_profile(&repo).await;

    repo.replace_buckets(profile_id, &[BucketRecord::new("prod-media")])
        .await
        .unwrap();
    repo.replace_objects(profile_id, "prod-media", &[ObjectRecord::new("a.txt")], None)
        .await
        .unwrap();

    repo.search_buckets(profile_id, "prod").await.unwrap();
    repo.search_objects(profile_id, "prod-media", "a").await.unwrap();
    assert_eq!(repo.memo_len(), 2);

    repo.replace_buckets(
        profile_id,
        &[BucketRecord::new("prod-media"), BucketRecord::new("prod-logs")],
    )
    .await
    .unwrap();

    // Object search memo untouched, bucket search re-queries
    assert_eq!(repo.memo_len(), 1);
    let buckets = repo.search_buckets(profile_id, "prod").await.unwrap();
    assert_eq!(buckets.len(), 2);
}

#[tokio::test]
async fn test_delete_bucket_invalidates_both_kinds() {
    let repo = setup();
    let profile_id = seed_profile(&repo).await;

    repo.replace_buckets(profile_id, &[BucketRecord::new("media")])
        .await
        .unwrap();
    repo.replace_objects(profile_id, "media", &[ObjectRecord::new("cat.jpg")], None)
        .await
        .unwrap();

    repo.search_buckets(profile_id, "med").await.unwrap();
    repo.search_objects(profile_id, "media", "cat").await.unwrap();
    assert_eq!(repo.memo_len(), 2);

    repo.delete_bucket(profile_id, "media").await.unwrap();
    assert_eq!(repo.memo_len(), 0);

    assert!(repo.search_buckets(profile_id, "med").await.unwrap().is_empty());
    assert!(repo.search_objects(profile_id, "media", "cat").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_profile_drops_only_that_profiles_memos() {
    let repo = setup();
    let p1 = seed_profile(&repo).await;
    let p2 = seed_profile(&repo).await;

    repo.replace_objects(p1, "media", &[ObjectRecord::new("one.txt")], None)
        .await
        .unwrap();
    repo.replace_objects(p2, "media", &[ObjectRecord::new("two.txt")], None)
        .await
        .unwrap();

    repo.search_objects(p1, "media", "one").await.unwrap();
    repo.search_objects(p2, "media", "two").await.unwrap();
    assert_eq!(repo.memo_len(), 2);

    repo.delete_profile(p1).await.unwrap();
    assert_eq!(repo.memo_len(), 1);

    // The surviving profile still gets memoized results
    assert_eq!(repo.search_objects(p2, "media", "two").await.unwrap().len(), 1);
}

// ============================================================================
// Existence helpers
// ============================================================================

#[tokio::test]
async fn test_bucket_and_object_exists() {
    let repo = setup();
    let profile_id = seed_profile(&repo).await;

    repo.replace_buckets(profile_id, &[BucketRecord::new("media")])
        .await
        .unwrap();
    repo.replace_objects(profile_id, "media", &[ObjectRecord::new("cat.jpg")], None)
        .await
        .unwrap();

    assert!(repo.bucket_exists(profile_id, "media").await.unwrap());
    assert!(!repo.bucket_exists(profile_id, "nope").await.unwrap());

    assert!(repo.object_exists(profile_id, "media", "cat.jpg").await.unwrap());
    assert!(!repo.object_exists(profile_id, "media", "cat").await.unwrap());
}
