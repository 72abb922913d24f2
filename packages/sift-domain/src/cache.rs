//! Bounded LRU cache with lazy TTL expiry, safe to share across request tasks.

use std::{
	borrow::Borrow,
	hash::Hash,
	sync::{Mutex, MutexGuard},
	time::{Duration, Instant},
};

use lru::LruCache;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
	#[error("Cache max_entries must be greater than zero.")]
	InvalidCapacity,
}

#[derive(Debug)]
struct CacheEntry<V> {
	value: V,
	expires_at: Option<Instant>,
}
impl<V> CacheEntry<V> {
	fn is_expired(&self, now: Instant) -> bool {
		self.expires_at.map(|at| now >= at).unwrap_or(false)
	}
}

/// Values are cloned out on read, so large payloads should be wrapped in `Arc`.
#[derive(Debug)]
pub struct KeyValueCache<K, V>
where
	K: Hash + Eq,
{
	max_entries: usize,
	ttl: Option<Duration>,
	entries: Mutex<LruCache<K, CacheEntry<V>>>,
}
impl<K, V> KeyValueCache<K, V>
where
	K: Hash + Eq + Clone,
	V: Clone,
{
	/// A `ttl_ms` of zero keeps entries until they are evicted.
	pub fn new(max_entries: usize, ttl_ms: u64) -> Result<Self, CacheError> {
		if max_entries == 0 {
			return Err(CacheError::InvalidCapacity);
		}

		let ttl = (ttl_ms > 0).then(|| Duration::from_millis(ttl_ms));

		Ok(Self { max_entries, ttl, entries: Mutex::new(LruCache::unbounded()) })
	}

	pub fn get<Q>(&self, key: &Q) -> Option<V>
	where
		K: Borrow<Q>,
		Q: Hash + Eq + ?Sized,
	{
		let now = Instant::now();
		let mut entries = self.lock();

		if entries.peek(key)?.is_expired(now) {
			entries.pop(key);

			return None;
		}

		entries.get(key).map(|entry| entry.value.clone())
	}

	pub fn set(&self, key: K, value: V) {
		let now = Instant::now();
		let expires_at = self.ttl.map(|ttl| now + ttl);
		let mut entries = self.lock();

		// Re-inserting must land at the most-recently-used end, so drop any stale slot first.
		entries.pop(&key);
		entries.put(key, CacheEntry { value, expires_at });

		if entries.len() <= self.max_entries {
			return;
		}

		let expired: Vec<K> = entries
			.iter()
			.filter(|(_, entry)| entry.is_expired(now))
			.map(|(key, _)| key.clone())
			.collect();

		for key in expired {
			entries.pop(&key);
		}

		while entries.len() > self.max_entries {
			if entries.pop_lru().is_none() {
				break;
			}
		}
	}

	pub fn delete<Q>(&self, key: &Q) -> bool
	where
		K: Borrow<Q>,
		Q: Hash + Eq + ?Sized,
	{
		self.lock().pop(key).is_some()
	}

	pub fn clear(&self) {
		self.lock().clear();
	}

	/// Includes entries that have expired but not yet been read or pruned.
	pub fn size(&self) -> usize {
		self.lock().len()
	}

	fn lock(&self) -> MutexGuard<'_, LruCache<K, CacheEntry<V>>> {
		self.entries.lock().unwrap_or_else(|err| err.into_inner())
	}
}
