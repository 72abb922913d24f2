pub mod embedding;
pub mod rerank;
pub mod retrieval;
pub mod search;

mod error;

pub use error::{Error, Result};
pub use rerank::{RankingFailure, Reranker};
pub use retrieval::{CandidateListing, SearchFilters, VectorRetriever};
pub use search::{RankedResult, SearchPhase, SearchRequest, SearchResponse};

use std::{future::Future, pin::Pin, sync::Arc};

use serde_json::Value;

use sift_config::{Config, EmbeddingProviderConfig, LlmProviderConfig};
use sift_domain::{cache::KeyValueCache, cancel::CancelToken};
use sift_providers::{chat, embedding as embedding_api};
use sift_storage::{
	db::Db,
	models::ListingMatch,
	queries::{self, NearestListingsQuery},
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
		cancel: &'a CancelToken,
	) -> BoxFuture<'a, sift_providers::Result<Vec<Vec<f32>>>>;
}

pub trait RankingProvider
where
	Self: Send + Sync,
{
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
		cancel: &'a CancelToken,
	) -> BoxFuture<'a, sift_providers::Result<Value>>;
}

/// Nearest-neighbor access to indexed listings.
pub trait ListingStore
where
	Self: Send + Sync,
{
	fn nearest<'a>(
		&'a self,
		query: NearestListingsQuery<'a>,
	) -> BoxFuture<'a, sift_storage::Result<Vec<ListingMatch>>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub ranker: Arc<dyn RankingProvider>,
}
impl Providers {
	pub fn new(embedding: Arc<dyn EmbeddingProvider>, ranker: Arc<dyn RankingProvider>) -> Self {
		Self { embedding, ranker }
	}
}
impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { embedding: provider.clone(), ranker: provider }
	}
}

pub struct PgListingStore {
	pub db: Db,
}
impl ListingStore for PgListingStore {
	fn nearest<'a>(
		&'a self,
		query: NearestListingsQuery<'a>,
	) -> BoxFuture<'a, sift_storage::Result<Vec<ListingMatch>>> {
		Box::pin(async move { queries::nearest_listings(&self.db, &query).await })
	}
}

/// Process-wide search service. Both caches live as long as the service and are shared by
/// every concurrent request.
pub struct SiftService {
	pub cfg: Config,
	pub store: Arc<dyn ListingStore>,
	pub providers: Providers,
	embedding_cache: KeyValueCache<String, Arc<Vec<f32>>>,
	response_cache: KeyValueCache<String, Arc<SearchResponse>>,
}
impl SiftService {
	pub fn new(cfg: Config, db: Db) -> Result<Self> {
		Self::with_parts(cfg, Arc::new(PgListingStore { db }), Providers::default())
	}

	pub fn with_parts(
		cfg: Config,
		store: Arc<dyn ListingStore>,
		providers: Providers,
	) -> Result<Self> {
		let embedding_cache =
			KeyValueCache::new(cfg.cache.embedding.max_entries, cfg.cache.embedding.ttl_ms)?;
		let response_cache =
			KeyValueCache::new(cfg.cache.response.max_entries, cfg.cache.response.ttl_ms)?;

		Ok(Self { cfg, store, providers, embedding_cache, response_cache })
	}

	/// `(embedding entries, response entries)`.
	pub fn cache_sizes(&self) -> (usize, usize) {
		(self.embedding_cache.size(), self.response_cache.size())
	}

	pub fn clear_caches(&self) {
		self.embedding_cache.clear();
		self.response_cache.clear();
	}
}

struct DefaultProviders;
impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
		cancel: &'a CancelToken,
	) -> BoxFuture<'a, sift_providers::Result<Vec<Vec<f32>>>> {
		Box::pin(embedding_api::embed(cfg, texts, cancel))
	}
}
impl RankingProvider for DefaultProviders {
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
		cancel: &'a CancelToken,
	) -> BoxFuture<'a, sift_providers::Result<Value>> {
		Box::pin(chat::complete_json(cfg, messages, cancel))
	}
}
