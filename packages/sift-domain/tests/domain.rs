use std::{sync::Arc, thread, time::Duration};

use sift_domain::{
	cache::KeyValueCache,
	cancel::CancelToken,
	text::{normalize_query, truncate_with_ellipsis},
};

#[test]
fn eviction_follows_access_order_not_insertion_order() {
	let cache = KeyValueCache::new(3, 0).expect("Failed to build cache.");

	cache.set("first".to_string(), 1);
	cache.set("second".to_string(), 2);
	cache.set("third".to_string(), 3);

	assert_eq!(cache.get("first"), Some(1));

	cache.set("fourth".to_string(), 4);

	assert_eq!(cache.size(), 3);
	assert_eq!(cache.get("second"), None);
	assert_eq!(cache.get("first"), Some(1));
	assert_eq!(cache.get("third"), Some(3));
	assert_eq!(cache.get("fourth"), Some(4));
}

#[test]
fn entries_expire_after_ttl() {
	let cache = KeyValueCache::new(4, 30).expect("Failed to build cache.");

	cache.set("k".to_string(), "v".to_string());

	assert_eq!(cache.get("k"), Some("v".to_string()));

	thread::sleep(Duration::from_millis(60));

	assert_eq!(cache.get("k"), None);
	assert_eq!(cache.size(), 0);
}

#[test]
fn zero_ttl_never_expires() {
	let cache = KeyValueCache::new(4, 0).expect("Failed to build cache.");

	cache.set("k".to_string(), 1);

	thread::sleep(Duration::from_millis(20));

	assert_eq!(cache.get("k"), Some(1));
}

#[test]
fn overflow_prunes_expired_entries_before_evicting_live_ones() {
	let cache = KeyValueCache::new(2, 30).expect("Failed to build cache.");

	cache.set("old-a".to_string(), 1);
	cache.set("old-b".to_string(), 2);

	thread::sleep(Duration::from_millis(60));

	cache.set("fresh".to_string(), 3);

	assert_eq!(cache.size(), 1);
	assert_eq!(cache.get("fresh"), Some(3));
}

#[test]
fn cache_is_shared_safely_across_threads() {
	let cache = Arc::new(KeyValueCache::new(64, 0).expect("Failed to build cache."));
	let handles: Vec<_> = (0..8)
		.map(|worker| {
			let cache = Arc::clone(&cache);

			thread::spawn(move || {
				for i in 0..100 {
					let key = format!("{worker}-{i}");

					cache.set(key.clone(), i);

					let _ = cache.get(&key);
				}
			})
		})
		.collect();

	for handle in handles {
		handle.join().expect("Worker thread panicked.");
	}

	assert_eq!(cache.size(), 64);
}

#[test]
fn normalized_queries_match_across_case_and_spacing() {
	assert_eq!(
		normalize_query("Newsletter   Sponsorships"),
		normalize_query(" newsletter sponsorships ")
	);
}

#[test]
fn descriptions_are_cut_to_prompt_length() {
	let description = "word ".repeat(100);
	let out = truncate_with_ellipsis(&description, 220);

	assert!(out.chars().count() <= 220);
	assert!(out.ends_with("..."));
	assert!(!out.ends_with(" ..."));
}

#[tokio::test]
async fn cancelled_token_stops_work_for_all_clones() {
	let token = CancelToken::new();
	let clone = token.clone();

	token.cancel();

	assert!(clone.is_cancelled());
	assert_eq!(clone.run(async { "done" }).await, None);

	clone.cancelled().await;
}
