#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Refresh/diff behaviour against a scripted device.

mod common;

use common::{engine, ScriptedChannel};
use droidsync_inventory::{InventoryError, DESCRIPTION_PLACEHOLDER};
use std::collections::HashSet;
use std::sync::Arc;

const A: (&str, &str) = ("/data/app/a/base.apk", "com.a");
const B: (&str, &str) = ("/data/app/b/base.apk", "com.b");

fn device_with_alpha_and_beta() -> Arc<ScriptedChannel> {
    let channel = ScriptedChannel::new();
    channel.set_listing(&[A, B]);
    channel.set_label(A.0, "Alpha");
    channel.set_label(B.0, "Beta");
    channel
}

#[tokio::test]
async fn test_first_refresh_discovers_and_labels() {
    let channel = device_with_alpha_and_beta();
    let engine = engine(&channel);

    let report = engine.refresh().await.unwrap();
    assert!(report.changed());
    assert_eq!(report.added.len(), 2);
    assert_eq!(report.generation, 1);

    let inventory = engine.snapshot();
    assert_eq!(inventory.len(), 2);

    let a = inventory.get("com.a").unwrap();
    assert_eq!(a.label().as_deref(), Some("Alpha"));
    assert!(a.is_enabled());
    assert_eq!(a.metadata().unwrap().description, "Alpha launcher");
    assert_eq!(a.to_string(), "Alpha (com.a)");

    let b = inventory.get("com.b").unwrap();
    assert_eq!(b.label().as_deref(), Some("Beta"));
    assert!(b.is_enabled());
    assert_eq!(b.metadata().unwrap().description, DESCRIPTION_PLACEHOLDER);
}

#[tokio::test]
async fn test_store_entry_without_description_gets_placeholder() {
    let channel = ScriptedChannel::new();
    channel.set_listing(&[("/data/app/s/base.apk", "com.sparse")]);
    let engine = engine(&channel);
    engine.refresh().await.unwrap();

    let view = engine.snapshot().get("com.sparse").unwrap().view();
    assert_eq!(view.description, DESCRIPTION_PLACEHOLDER);
    assert_eq!(view.removal, "Expert");
}

#[tokio::test]
async fn test_unchanged_listing_keeps_references() {
    let channel = device_with_alpha_and_beta();
    let engine = engine(&channel);
    engine.refresh().await.unwrap();

    let before = engine.snapshot();
    let a_before = Arc::clone(before.get("com.a").unwrap());
    let b_before = Arc::clone(before.get("com.b").unwrap());

    let report = engine.refresh().await.unwrap();
    assert!(!report.changed());
    assert_eq!(report.generation, 1);

    let after = engine.snapshot();
    assert!(Arc::ptr_eq(&before, &after));
    assert!(Arc::ptr_eq(&a_before, after.get("com.a").unwrap()));
    assert!(Arc::ptr_eq(&b_before, after.get("com.b").unwrap()));
}

#[tokio::test]
async fn test_disappearance_disables_and_retains() {
    let channel = device_with_alpha_and_beta();
    let engine = engine(&channel);
    engine.refresh().await.unwrap();
    let a_before = Arc::clone(engine.snapshot().get("com.a").unwrap());

    channel.set_listing(&[A]);
    let report = engine.refresh().await.unwrap();
    assert!(report.changed());
    assert_eq!(report.disabled, vec!["com.b".to_string()]);
    assert!(report.added.is_empty());

    let inventory = engine.snapshot();
    assert_eq!(inventory.len(), 2);
    assert!(!inventory.get("com.b").unwrap().is_enabled());
    assert_eq!(
        inventory.get("com.b").unwrap().label().as_deref(),
        Some("Beta")
    );

    let a = inventory.get("com.a").unwrap();
    assert!(Arc::ptr_eq(&a_before, a));
    assert!(a.is_enabled());
}

#[tokio::test]
async fn test_second_refresh_after_disappearance_is_idempotent() {
    let channel = device_with_alpha_and_beta();
    let engine = engine(&channel);
    engine.refresh().await.unwrap();

    channel.set_listing(&[A]);
    assert!(engine.refresh().await.unwrap().changed());

    let before = engine.snapshot();
    let report = engine.refresh().await.unwrap();
    assert!(!report.changed());
    assert!(Arc::ptr_eq(&before, &engine.snapshot()));
}

#[tokio::test]
async fn test_reappearance_restores_package() {
    let channel = device_with_alpha_and_beta();
    let engine = engine(&channel);
    engine.refresh().await.unwrap();

    channel.set_listing(&[A]);
    engine.refresh().await.unwrap();

    channel.set_listing(&[A, B]);
    let report = engine.refresh().await.unwrap();
    assert!(report.changed());
    assert_eq!(report.restored, vec!["com.b".to_string()]);
    assert!(engine.snapshot().get("com.b").unwrap().is_enabled());
}

#[tokio::test]
async fn test_known_packages_are_never_relabelled() {
    let channel = device_with_alpha_and_beta();
    let engine = engine(&channel);
    engine.refresh().await.unwrap();
    assert_eq!(channel.label_calls().len(), 2);

    channel.clear_calls();
    channel.set_listing(&[A, B, ("/data/app/c/base.apk", "com.c")]);
    channel.set_label("/data/app/c/base.apk", "Gamma");

    let report = engine.refresh().await.unwrap();
    assert_eq!(report.added, vec!["com.c".to_string()]);
    assert_eq!(channel.label_calls(), vec!["/data/app/c/base.apk".to_string()]);
}

#[tokio::test]
async fn test_failed_label_is_not_retried_by_refresh() {
    let channel = ScriptedChannel::new();
    channel.set_listing(&[A]);
    let engine = engine(&channel);

    engine.refresh().await.unwrap();
    let a = Arc::clone(engine.snapshot().get("com.a").unwrap());
    assert!(a.label().is_none());
    assert_eq!(a.to_string(), "com.a");
    assert!(a.metadata().is_some());

    channel.set_label(A.0, "Alpha");
    channel.set_listing(&[A, B]);
    channel.set_label(B.0, "Beta");
    channel.clear_calls();
    engine.refresh().await.unwrap();

    assert_eq!(channel.label_calls(), vec![B.0.to_string()]);
    assert!(a.label().is_none());
}

#[tokio::test]
async fn test_relabel_unresolved_fills_empty_labels() {
    let channel = ScriptedChannel::new();
    channel.set_listing(&[A, B]);
    channel.set_label(B.0, "Beta");
    let engine = engine(&channel);
    engine.refresh().await.unwrap();

    channel.set_label(A.0, "Alpha");
    channel.clear_calls();
    let submitted = engine.relabel_unresolved().await.unwrap();

    assert_eq!(submitted, 1);
    assert_eq!(channel.label_calls(), vec![A.0.to_string()]);
    let inventory = engine.snapshot();
    assert_eq!(
        inventory.get("com.a").unwrap().label().as_deref(),
        Some("Alpha")
    );
}

#[tokio::test]
async fn test_empty_extractor_output_leaves_label_empty() {
    let channel = ScriptedChannel::new();
    channel.set_listing(&[A]);
    channel.set_label(A.0, "   ");
    let engine = engine(&channel);

    engine.refresh().await.unwrap();
    assert!(!engine.snapshot().get("com.a").unwrap().has_label());
}

#[tokio::test]
async fn test_listing_failure_leaves_cache_untouched() {
    let channel = device_with_alpha_and_beta();
    let engine = engine(&channel);
    engine.refresh().await.unwrap();
    let before = engine.snapshot();

    channel.break_listing();
    let result = engine.refresh().await;
    assert!(matches!(result, Err(InventoryError::Listing(_))));

    let after = engine.snapshot();
    assert!(Arc::ptr_eq(&before, &after));
    assert!(after.iter().all(|package| package.is_enabled()));
}

#[tokio::test]
async fn test_listing_failure_on_first_cycle() {
    let channel = ScriptedChannel::new();
    let engine = engine(&channel);

    assert!(engine.refresh().await.is_err());
    assert!(engine.snapshot().is_empty());
    assert_eq!(engine.snapshot().generation(), 0);
}

#[tokio::test]
async fn test_malformed_lines_are_skipped() {
    let channel = ScriptedChannel::new();
    channel.set_raw_listing(
        "package:/data/app/a/base.apk=com.a\nWARNING: linker noise\npackage:/data/app/x/base.apk\npackage:/data/app/b/base.apk=com.b\n",
    );
    channel.set_label(A.0, "Alpha");
    channel.set_label(B.0, "Beta");
    let engine = engine(&channel);

    let report = engine.refresh().await.unwrap();
    assert_eq!(report.skipped_lines, 2);
    assert_eq!(report.added.len(), 2);
    assert_eq!(engine.snapshot().len(), 2);
}

#[tokio::test]
async fn test_duplicate_ids_yield_one_record() {
    let channel = ScriptedChannel::new();
    channel.set_listing(&[A, ("/data/app/a2/base.apk", "com.a"), B]);
    let engine = engine(&channel);

    engine.refresh().await.unwrap();
    let inventory = engine.snapshot();
    assert_eq!(inventory.len(), 2);
    assert_eq!(inventory.get("com.a").unwrap().path(), A.0);

    let ids: HashSet<&str> = inventory.iter().map(|package| package.id()).collect();
    assert_eq!(ids.len(), inventory.len());
}

#[tokio::test]
async fn test_path_is_refreshed_without_change() {
    let channel = device_with_alpha_and_beta();
    let engine = engine(&channel);
    engine.refresh().await.unwrap();

    channel.set_listing(&[("/data/app/a-updated/base.apk", "com.a"), B]);
    let report = engine.refresh().await.unwrap();

    assert!(!report.changed());
    let a = Arc::clone(engine.snapshot().get("com.a").unwrap());
    assert_eq!(a.path(), "/data/app/a-updated/base.apk");
    assert_eq!(a.label().as_deref(), Some("Alpha"));
}

#[tokio::test]
async fn test_subscribers_see_only_changed_generations() {
    let channel = device_with_alpha_and_beta();
    let engine = engine(&channel);
    let mut updates = engine.subscribe();

    engine.refresh().await.unwrap();
    assert!(updates.has_changed().unwrap());
    let published = updates.borrow_and_update().clone();
    assert_eq!(published.len(), 2);
    assert_eq!(published.views()[0].label, "Alpha");

    engine.refresh().await.unwrap();
    assert!(!updates.has_changed().unwrap());
}

#[tokio::test]
async fn test_uniqueness_across_many_cycles() {
    let channel = ScriptedChannel::new();
    let engine = engine(&channel);
    let all: Vec<(String, String)> = (0..12)
        .map(|i| (format!("/data/app/p{}/base.apk", i), format!("com.p{}", i)))
        .collect();

    for cycle in 0..6 {
        let listing: Vec<(&str, &str)> = all
            .iter()
            .enumerate()
            .filter(|(i, _)| (i + cycle) % 3 != 0)
            .map(|(_, (path, id))| (path.as_str(), id.as_str()))
            .collect();
        channel.set_listing(&listing);
        engine.refresh().await.unwrap();

        let inventory = engine.snapshot();
        let ids: HashSet<&str> = inventory.iter().map(|package| package.id()).collect();
        assert_eq!(ids.len(), inventory.len());
        for (_, id) in &listing {
            assert!(inventory.get(id).unwrap().is_enabled());
        }
    }

    assert_eq!(engine.snapshot().len(), 12);
}
