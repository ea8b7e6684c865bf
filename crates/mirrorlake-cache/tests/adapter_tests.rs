//! Integration tests for the persistence adapters
//!
//! Every test runs against both backends (SQLite and the JSON key-value
//! store), since the two must be indistinguishable through the
//! IPersistenceAdapter port. Each test builds fresh backends for
//! isolation.

use std::sync::Arc;

use mirrorlake_cache::{DatabasePool, SqlitePersistenceAdapter, StorePersistenceAdapter};
use mirrorlake_core::domain::{
    BucketRecord, NewProfile, ObjectRecord, Scope, SyncStatus,
};
use mirrorlake_core::ports::IPersistenceAdapter;

// ============================================================================
// Test helpers
// ============================================================================

/// Both adapter backends, fresh and empty, labeled for assertion messages
async fn backends() -> Vec<(&'static str, Arc<dyn IPersistenceAdapter>)> {
    let pool = DatabasePool::in_memory()
        .await
        .expect("Failed to create in-memory database");
    let sqlite = SqlitePersistenceAdapter::new(pool.pool().clone());
    let store = StorePersistenceAdapter::in_memory();
    vec![
        ("sqlite", Arc::new(sqlite) as Arc<dyn IPersistenceAdapter>),
        ("store", Arc::new(store) as Arc<dyn IPersistenceAdapter>),
    ]
}

fn new_profile(name: &str) -> NewProfile {
    NewProfile {
        name: name.to_string(),
        access_key_id: "AKIA123".to_string(),
        secret_access_key: "secret".to_string(),
        region: "us-east-1".to_string(),
        endpoint: Some("http://localhost:9000".to_string()),
    }
}

fn object(key: &str) -> ObjectRecord {
    let mut o = ObjectRecord::new(key);
    o.size = Some(1024);
    o.etag = Some(format!("\"etag-{key}\""));
    o
}

// ============================================================================
// Profile tests
// ============================================================================

#[tokio::test]
async fn test_save_and_get_profile() {
    for (backend, adapter) in backends().await {
        let saved = adapter.save_profile(&new_profile("minio")).await.unwrap();
        assert!(saved.id > 0, "{backend}: id must be assigned");

        let retrieved = adapter.get_profile(saved.id).await.unwrap();
        assert!(retrieved.is_some(), "{backend}");

        let retrieved = retrieved.unwrap();
        assert_eq!(retrieved.name, "minio");
        assert_eq!(retrieved.access_key_id, "AKIA123");
        assert_eq!(retrieved.region, "us-east-1");
        assert_eq!(retrieved.endpoint.as_deref(), Some("http://localhost:9000"));
    }
}

#[tokio::test]
async fn test_get_profile_not_found() {
    for (backend, adapter) in backends().await {
        let result = adapter.get_profile(9999).await.unwrap();
        assert!(result.is_none(), "{backend}");
    }
}

#[tokio::test]
async fn test_profile_ids_are_distinct() {
    for (backend, adapter) in backends().await {
        let a = adapter.save_profile(&new_profile("a")).await.unwrap();
        let b = adapter.save_profile(&new_profile("b")).await.unwrap();
        assert_ne!(a.id, b.id, "{backend}");

        let all = adapter.list_profiles().await.unwrap();
        assert_eq!(all.len(), 2, "{backend}");
    }
}

#[tokio::test]
async fn test_update_profile() {
    for (backend, adapter) in backends().await {
        let saved = adapter.save_profile(&new_profile("old")).await.unwrap();

        let mut update = new_profile("renamed");
        update.endpoint = None;
        let updated = adapter.update_profile(saved.id, &update).await.unwrap();
        assert!(updated.is_some(), "{backend}");

        let retrieved = adapter.get_profile(saved.id).await.unwrap().unwrap();
        assert_eq!(retrieved.name, "renamed", "{backend}");
        assert!(retrieved.endpoint.is_none(), "{backend}");
    }
}

#[tokio::test]
async fn test_update_missing_profile_returns_none() {
    for (backend, adapter) in backends().await {
        let result = adapter.update_profile(42, &new_profile("x")).await.unwrap();
        assert!(result.is_none(), "{backend}");
    }
}

#[tokio::test]
async fn test_delete_profile_cascades_all_cached_rows() {
    for (backend, adapter) in backends().await {
        let kept = adapter.save_profile(&new_profile("kept")).await.unwrap();
        let doomed = adapter.save_profile(&new_profile("doomed")).await.unwrap();

        for profile in [&kept, &doomed] {
            adapter
                .replace_buckets(profile.id, &[BucketRecord::new("media")])
                .await
                .unwrap();
            adapter
                .replace_objects(profile.id, "media", &[object("a.txt")], None)
                .await
                .unwrap();
            adapter
                .upsert_sync_metadata(&Scope::bucket(profile.id, "media"), SyncStatus::Completed, None)
                .await
                .unwrap();
        }

        adapter.delete_profile(doomed.id).await.unwrap();

        assert!(adapter.get_profile(doomed.id).await.unwrap().is_none(), "{backend}");
        assert!(adapter.list_buckets(doomed.id).await.unwrap().is_empty(), "{backend}");
        assert!(
            adapter.list_objects(doomed.id, "media", None).await.unwrap().is_empty(),
            "{backend}"
        );
        assert!(
            adapter.list_sync_metadata(doomed.id).await.unwrap().is_empty(),
            "{backend}"
        );

        // The other profile's cache is untouched
        assert_eq!(adapter.list_buckets(kept.id).await.unwrap().len(), 1, "{backend}");
        assert_eq!(
            adapter.list_objects(kept.id, "media", None).await.unwrap().len(),
            1,
            "{backend}"
        );
        assert_eq!(adapter.list_sync_metadata(kept.id).await.unwrap().len(), 1, "{backend}");
    }
}

// ============================================================================
// Bucket cache tests
// ============================================================================

#[tokio::test]
async fn test_replace_buckets_is_a_full_swap() {
    for (backend, adapter) in backends().await {
        let profile = adapter.save_profile(&new_profile("p")).await.unwrap();

        adapter
            .replace_buckets(
                profile.id,
                &[BucketRecord::new("alpha"), BucketRecord::new("beta")],
            )
            .await
            .unwrap();

        // Second listing no longer contains "alpha"
        adapter
            .replace_buckets(
                profile.id,
                &[BucketRecord::new("beta"), BucketRecord::new("gamma")],
            )
            .await
            .unwrap();

        let names: Vec<String> = adapter
            .list_buckets(profile.id)
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.name)
            .collect();
        assert_eq!(names, vec!["beta", "gamma"], "{backend}");
    }
}

#[tokio::test]
async fn test_replace_buckets_scoped_to_profile() {
    for (backend, adapter) in backends().await {
        let p1 = adapter.save_profile(&new_profile("one")).await.unwrap();
        let p2 = adapter.save_profile(&new_profile("two")).await.unwrap();

        adapter
            .replace_buckets(p1.id, &[BucketRecord::new("mine")])
            .await
            .unwrap();
        adapter
            .replace_buckets(p2.id, &[BucketRecord::new("yours")])
            .await
            .unwrap();

        let b1 = adapter.list_buckets(p1.id).await.unwrap();
        assert_eq!(b1.len(), 1, "{backend}");
        assert_eq!(b1[0].name, "mine", "{backend}");
    }
}

#[tokio::test]
async fn test_save_bucket_upserts() {
    for (backend, adapter) in backends().await {
        let profile = adapter.save_profile(&new_profile("p")).await.unwrap();

        let mut bucket = BucketRecord::new("media");
        adapter.save_bucket(profile.id, &bucket).await.unwrap();

        bucket.creation_date = Some(chrono::Utc::now());
        adapter.save_bucket(profile.id, &bucket).await.unwrap();

        let buckets = adapter.list_buckets(profile.id).await.unwrap();
        assert_eq!(buckets.len(), 1, "{backend}");
        assert!(buckets[0].creation_date.is_some(), "{backend}");
    }
}

#[tokio::test]
async fn test_delete_bucket_removes_its_objects() {
    for (backend, adapter) in backends().await {
        let profile = adapter.save_profile(&new_profile("p")).await.unwrap();

        adapter
            .replace_buckets(
                profile.id,
                &[BucketRecord::new("media"), BucketRecord::new("logs")],
            )
            .await
            .unwrap();
        adapter
            .replace_objects(profile.id, "media", &[object("photo.jpg")], None)
            .await
            .unwrap();
        adapter
            .replace_objects(profile.id, "logs", &[object("app.log")], None)
            .await
            .unwrap();

        adapter.delete_bucket(profile.id, "media").await.unwrap();

        assert_eq!(adapter.list_buckets(profile.id).await.unwrap().len(), 1, "{backend}");
        assert!(
            adapter.list_objects(profile.id, "media", None).await.unwrap().is_empty(),
            "{backend}"
        );
        assert_eq!(
            adapter.list_objects(profile.id, "logs", None).await.unwrap().len(),
            1,
            "{backend}"
        );
    }
}

#[tokio::test]
async fn test_clear_buckets_also_drops_objects() {
    for (backend, adapter) in backends().await {
        let profile = adapter.save_profile(&new_profile("p")).await.unwrap();

        adapter
            .replace_buckets(profile.id, &[BucketRecord::new("media")])
            .await
            .unwrap();
        adapter
            .replace_objects(profile.id, "media", &[object("a.txt")], None)
            .await
            .unwrap();

        adapter.clear_buckets(profile.id).await.unwrap();

        assert!(adapter.list_buckets(profile.id).await.unwrap().is_empty(), "{backend}");
        assert!(
            adapter.list_objects(profile.id, "media", None).await.unwrap().is_empty(),
            "{backend}"
        );
    }
}

// ============================================================================
// Object cache tests: scope isolation
// ============================================================================

#[tokio::test]
async fn test_root_and_prefix_scopes_are_distinct() {
    for (backend, adapter) in backends().await {
        let profile = adapter.save_profile(&new_profile("p")).await.unwrap();

        adapter
            .replace_objects(profile.id, "media", &[object("readme.md")], None)
            .await
            .unwrap();
        adapter
            .replace_objects(
                profile.id,
                "media",
                &[object("photos/cat.jpg"), object("photos/dog.jpg")],
                Some("photos/"),
            )
            .await
            .unwrap();

        let root = adapter.list_objects(profile.id, "media", None).await.unwrap();
        assert_eq!(root.len(), 1, "{backend}");
        assert_eq!(root[0].key, "readme.md", "{backend}");

        let photos = adapter
            .list_objects(profile.id, "media", Some("photos/"))
            .await
            .unwrap();
        assert_eq!(photos.len(), 2, "{backend}");
    }
}

#[tokio::test]
async fn test_replace_objects_touches_only_its_scope() {
    for (backend, adapter) in backends().await {
        let profile = adapter.save_profile(&new_profile("p")).await.unwrap();

        adapter
            .replace_objects(profile.id, "media", &[object("root.txt")], None)
            .await
            .unwrap();
        adapter
            .replace_objects(profile.id, "media", &[object("docs/a.pdf")], Some("docs/"))
            .await
            .unwrap();

        // Refresh only the docs/ scope
        adapter
            .replace_objects(profile.id, "media", &[object("docs/b.pdf")], Some("docs/"))
            .await
            .unwrap();

        let docs = adapter
            .list_objects(profile.id, "media", Some("docs/"))
            .await
            .unwrap();
        assert_eq!(docs.len(), 1, "{backend}");
        assert_eq!(docs[0].key, "docs/b.pdf", "{backend}");

        // Root scope survives the docs/ refresh
        let root = adapter.list_objects(profile.id, "media", None).await.unwrap();
        assert_eq!(root.len(), 1, "{backend}");
        assert_eq!(root[0].key, "root.txt", "{backend}");
    }
}

#[tokio::test]
async fn test_fresh_listing_wins_key_from_another_scope() {
    for (backend, adapter) in backends().await {
        let profile = adapter.save_profile(&new_profile("p")).await.unwrap();

        // The same key shows up in a root listing first, then in a
        // prefixed listing. Keys are unique per bucket, so the newer
        // scope owns the row.
        adapter
            .replace_objects(profile.id, "media", &[object("photos/cat.jpg")], None)
            .await
            .unwrap();
        adapter
            .replace_objects(
                profile.id,
                "media",
                &[object("photos/cat.jpg")],
                Some("photos/"),
            )
            .await
            .unwrap();

        let root = adapter.list_objects(profile.id, "media", None).await.unwrap();
        assert!(root.is_empty(), "{backend}");

        let photos = adapter
            .list_objects(profile.id, "media", Some("photos/"))
            .await
            .unwrap();
        assert_eq!(photos.len(), 1, "{backend}");
    }
}

#[tokio::test]
async fn test_clear_objects_is_scope_exact() {
    for (backend, adapter) in backends().await {
        let profile = adapter.save_profile(&new_profile("p")).await.unwrap();

        adapter
            .replace_objects(profile.id, "media", &[object("root.txt")], None)
            .await
            .unwrap();
        adapter
            .replace_objects(profile.id, "media", &[object("docs/a.pdf")], Some("docs/"))
            .await
            .unwrap();

        // Clearing the root scope leaves the named prefix alone
        adapter.clear_objects(profile.id, "media", None).await.unwrap();
        assert!(
            adapter.list_objects(profile.id, "media", None).await.unwrap().is_empty(),
            "{backend}"
        );
        assert_eq!(
            adapter.list_objects(profile.id, "media", Some("docs/")).await.unwrap().len(),
            1,
            "{backend}"
        );

        adapter
            .clear_objects(profile.id, "media", Some("docs/"))
            .await
            .unwrap();
        assert!(
            adapter.list_objects(profile.id, "media", Some("docs/")).await.unwrap().is_empty(),
            "{backend}"
        );
    }
}

#[tokio::test]
async fn test_delete_object() {
    for (backend, adapter) in backends().await {
        let profile = adapter.save_profile(&new_profile("p")).await.unwrap();

        adapter
            .replace_objects(
                profile.id,
                "media",
                &[object("keep.txt"), object("drop.txt")],
                None,
            )
            .await
            .unwrap();

        adapter.delete_object(profile.id, "media", "drop.txt").await.unwrap();

        let objects = adapter.list_objects(profile.id, "media", None).await.unwrap();
        assert_eq!(objects.len(), 1, "{backend}");
        assert_eq!(objects[0].key, "keep.txt", "{backend}");
    }
}

#[tokio::test]
async fn test_object_metadata_round_trips() {
    for (backend, adapter) in backends().await {
        let profile = adapter.save_profile(&new_profile("p")).await.unwrap();

        let mut o = ObjectRecord::new("report.pdf");
        o.last_modified = Some(chrono::Utc::now());
        o.size = Some(123_456);
        o.etag = Some("\"abc123\"".to_string());
        o.storage_class = Some("STANDARD".to_string());

        adapter.save_object(profile.id, "media", &o, None).await.unwrap();

        let objects = adapter.list_objects(profile.id, "media", None).await.unwrap();
        assert_eq!(objects.len(), 1, "{backend}");
        assert_eq!(objects[0].size, Some(123_456), "{backend}");
        assert_eq!(objects[0].etag.as_deref(), Some("\"abc123\""), "{backend}");
        assert_eq!(objects[0].storage_class.as_deref(), Some("STANDARD"), "{backend}");
        assert!(objects[0].last_modified.is_some(), "{backend}");
    }
}

// ============================================================================
// Sync metadata tests
// ============================================================================

#[tokio::test]
async fn test_sync_metadata_upsert_per_scope() {
    for (backend, adapter) in backends().await {
        let profile = adapter.save_profile(&new_profile("p")).await.unwrap();
        let bucket_scope = Scope::bucket(profile.id, "media");
        let prefix_scope = Scope::prefixed(profile.id, "media", "photos/");

        adapter
            .upsert_sync_metadata(&bucket_scope, SyncStatus::Syncing, None)
            .await
            .unwrap();
        adapter
            .upsert_sync_metadata(&bucket_scope, SyncStatus::Completed, None)
            .await
            .unwrap();
        adapter
            .upsert_sync_metadata(&prefix_scope, SyncStatus::Error, Some("listing failed"))
            .await
            .unwrap();

        let bucket_meta = adapter.get_sync_metadata(&bucket_scope).await.unwrap().unwrap();
        assert_eq!(bucket_meta.status, SyncStatus::Completed, "{backend}");
        assert!(bucket_meta.error_message.is_none(), "{backend}");
        assert!(bucket_meta.last_sync_at.is_some(), "{backend}");

        let prefix_meta = adapter.get_sync_metadata(&prefix_scope).await.unwrap().unwrap();
        assert_eq!(prefix_meta.status, SyncStatus::Error, "{backend}");
        assert_eq!(prefix_meta.error_message.as_deref(), Some("listing failed"), "{backend}");

        // Two scopes, two rows
        let all = adapter.list_sync_metadata(profile.id).await.unwrap();
        assert_eq!(all.len(), 2, "{backend}");
    }
}

#[tokio::test]
async fn test_sync_metadata_root_prefix_is_its_own_scope() {
    for (backend, adapter) in backends().await {
        let profile = adapter.save_profile(&new_profile("p")).await.unwrap();
        let root_scope = Scope::bucket(profile.id, "media");
        let named_scope = Scope::prefixed(profile.id, "media", "docs/");

        adapter
            .upsert_sync_metadata(&root_scope, SyncStatus::Completed, None)
            .await
            .unwrap();

        assert!(adapter.get_sync_metadata(&root_scope).await.unwrap().is_some(), "{backend}");
        assert!(adapter.get_sync_metadata(&named_scope).await.unwrap().is_none(), "{backend}");
    }
}

#[tokio::test]
async fn test_sync_metadata_missing_scope() {
    for (backend, adapter) in backends().await {
        let scope = Scope::bucket(1, "never-synced");
        assert!(adapter.get_sync_metadata(&scope).await.unwrap().is_none(), "{backend}");
    }
}

// ============================================================================
// Search tests
// ============================================================================

#[tokio::test]
async fn test_search_objects_case_insensitive_substring() {
    for (backend, adapter) in backends().await {
        let profile = adapter.save_profile(&new_profile("p")).await.unwrap();

        adapter
            .replace_objects(
                profile.id,
                "media",
                &[
                    object("Reports/Q1-Summary.pdf"),
                    object("reports/q2-summary.pdf"),
                    object("photos/cat.jpg"),
                ],
                None,
            )
            .await
            .unwrap();

        let hits = adapter.search_objects(profile.id, "media", "SUMMARY").await.unwrap();
        assert_eq!(hits.len(), 2, "{backend}");

        let hits = adapter.search_objects(profile.id, "media", "cat").await.unwrap();
        assert_eq!(hits.len(), 1, "{backend}");
        assert_eq!(hits[0].key, "photos/cat.jpg", "{backend}");
    }
}

#[tokio::test]
async fn test_search_objects_scoped_to_bucket_and_profile() {
    for (backend, adapter) in backends().await {
        let p1 = adapter.save_profile(&new_profile("one")).await.unwrap();
        let p2 = adapter.save_profile(&new_profile("two")).await.unwrap();

        adapter
            .replace_objects(p1.id, "media", &[object("shared.txt")], None)
            .await
            .unwrap();
        adapter
            .replace_objects(p1.id, "logs", &[object("shared.txt")], None)
            .await
            .unwrap();
        adapter
            .replace_objects(p2.id, "media", &[object("shared.txt")], None)
            .await
            .unwrap();

        let hits = adapter.search_objects(p1.id, "media", "shared").await.unwrap();
        assert_eq!(hits.len(), 1, "{backend}");
    }
}

#[tokio::test]
async fn test_search_all_objects_reports_bucket_names() {
    for (backend, adapter) in backends().await {
        let profile = adapter.save_profile(&new_profile("p")).await.unwrap();

        adapter
            .replace_objects(profile.id, "media", &[object("invoice-jan.pdf")], None)
            .await
            .unwrap();
        adapter
            .replace_objects(profile.id, "archive", &[object("invoice-dec.pdf")], None)
            .await
            .unwrap();

        let mut hits = adapter.search_all_objects(profile.id, "invoice").await.unwrap();
        hits.sort_by(|a, b| a.bucket_name.cmp(&b.bucket_name));
        assert_eq!(hits.len(), 2, "{backend}");
        assert_eq!(hits[0].bucket_name, "archive", "{backend}");
        assert_eq!(hits[1].bucket_name, "media", "{backend}");
    }
}

#[tokio::test]
async fn test_search_buckets() {
    for (backend, adapter) in backends().await {
        let profile = adapter.save_profile(&new_profile("p")).await.unwrap();

        adapter
            .replace_buckets(
                profile.id,
                &[
                    BucketRecord::new("prod-media"),
                    BucketRecord::new("prod-logs"),
                    BucketRecord::new("staging"),
                ],
            )
            .await
            .unwrap();

        let hits = adapter.search_buckets(profile.id, "PROD").await.unwrap();
        assert_eq!(hits.len(), 2, "{backend}");

        let hits = adapter.search_buckets(profile.id, "nothing").await.unwrap();
        assert!(hits.is_empty(), "{backend}");
    }
}

// ============================================================================
// Settings and stats
// ============================================================================

#[tokio::test]
async fn test_settings_set_get_remove() {
    for (backend, adapter) in backends().await {
        assert!(adapter.get_setting("theme").await.unwrap().is_none(), "{backend}");

        adapter.set_setting("theme", Some("dark")).await.unwrap();
        assert_eq!(adapter.get_setting("theme").await.unwrap().as_deref(), Some("dark"), "{backend}");

        adapter.set_setting("theme", Some("light")).await.unwrap();
        assert_eq!(adapter.get_setting("theme").await.unwrap().as_deref(), Some("light"), "{backend}");

        adapter.set_setting("theme", None).await.unwrap();
        assert!(adapter.get_setting("theme").await.unwrap().is_none(), "{backend}");
    }
}

#[tokio::test]
async fn test_stats_counts_rows() {
    for (backend, adapter) in backends().await {
        let profile = adapter.save_profile(&new_profile("p")).await.unwrap();
        adapter
            .replace_buckets(profile.id, &[BucketRecord::new("media")])
            .await
            .unwrap();
        adapter
            .replace_objects(profile.id, "media", &[object("a"), object("b")], None)
            .await
            .unwrap();
        adapter
            .upsert_sync_metadata(&Scope::profile(profile.id), SyncStatus::Completed, None)
            .await
            .unwrap();

        let stats = adapter.stats().await.unwrap();
        assert_eq!(stats.profiles, 1, "{backend}");
        assert_eq!(stats.buckets, 1, "{backend}");
        assert_eq!(stats.objects, 2, "{backend}");
        assert_eq!(stats.sync_metadata, 1, "{backend}");
    }
}
