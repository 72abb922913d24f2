pub mod cache;

use std::{
	sync::{
		Arc,
		atomic::{AtomicU8, Ordering},
	},
	time::Duration,
};

use serde::{Deserialize, Serialize};

use sift_domain::{cancel::CancelToken, text};

use crate::{
	Error, Result, SiftService,
	embedding::EmbeddingClient,
	rerank::{RankingFailure, Reranker},
	retrieval::{CandidateListing, SearchFilters, VectorRetriever},
	search::cache::ResponseKeyInput,
};

/// Queries longer than this, after trimming, are rejected.
pub const MAX_QUERY_CHARS: usize = 500;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
	pub query: String,
	#[serde(default)]
	pub top_k: Option<u32>,
	#[serde(default)]
	pub filters: SearchFilters,
	#[serde(default)]
	pub skip_ranking: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchPhase {
	Retrieval,
	Ranked,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedResult {
	pub listing: CandidateListing,
	pub rank: u32,
	pub relevance_score: f32,
	pub explanation: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
	pub query: String,
	pub retrieval_count: u32,
	pub generation_failed: bool,
	pub phase: SearchPhase,
	pub results: Vec<RankedResult>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
enum Stage {
	Embedding = 0,
	Retrieval = 1,
	Ranking = 2,
}
impl Stage {
	fn as_str(self) -> &'static str {
		match self {
			Self::Embedding => "embedding",
			Self::Retrieval => "retrieval",
			Self::Ranking => "ranking",
		}
	}
}

/// Last stage the pipeline entered, readable from the deadline branch.
struct StageTracker(AtomicU8);
impl StageTracker {
	fn new() -> Self {
		Self(AtomicU8::new(Stage::Embedding as u8))
	}

	fn enter(&self, stage: Stage) {
		self.0.store(stage as u8, Ordering::Relaxed);
	}

	fn current(&self) -> Stage {
		match self.0.load(Ordering::Relaxed) {
			0 => Stage::Embedding,
			1 => Stage::Retrieval,
			_ => Stage::Ranking,
		}
	}
}

impl SiftService {
	/// Runs one search under the configured deadline.
	///
	/// A deadline hit cancels every in-flight call and fails with [`Error::RequestTimeout`],
	/// whichever stage was running. Ranking failures that are not cancellations degrade to
	/// similarity order instead of failing.
	pub async fn search(&self, req: SearchRequest) -> Result<SearchResponse> {
		validate_query(&req.query)?;

		let deadline_ms = self.cfg.search.deadline_ms;
		let cancel = CancelToken::new();
		let stage = StageTracker::new();

		tokio::select! {
			biased;
			result = self.run_pipeline(&req, &cancel, &stage) => result,
			_ = tokio::time::sleep(Duration::from_millis(deadline_ms)) => {
				cancel.cancel();

				tracing::warn!(
					deadline_ms,
					stage = stage.current().as_str(),
					"Search deadline elapsed. Cancelling in-flight calls."
				);

				Err(Error::RequestTimeout)
			}
		}
	}

	async fn run_pipeline(
		&self,
		req: &SearchRequest,
		cancel: &CancelToken,
		stage: &StageTracker,
	) -> Result<SearchResponse> {
		let search_cfg = &self.cfg.search;
		let top_k = req.top_k.unwrap_or(search_cfg.default_top_k).clamp(1, search_cfg.max_top_k);
		let filters = req.filters.normalized();
		let embedding = self.query_embedding(&req.query, cancel).await?;
		let cache_key = cache::response_cache_key(&ResponseKeyInput {
			embedding: &embedding,
			filters: &filters,
			top_k,
			similarity_threshold: search_cfg.similarity_threshold,
			skip_ranking: req.skip_ranking,
			embedding_model: &self.cfg.providers.embedding.model,
			ranking_model: &self.cfg.providers.llm_ranker.model,
		});

		if let Some(cached) = self.response_cache.get(&cache_key) {
			tracing::debug!("Search response cache hit.");

			let mut response = (*cached).clone();

			response.query = req.query.clone();

			return Ok(response);
		}

		stage.enter(Stage::Retrieval);

		let candidates =
			VectorRetriever::new(self.store.as_ref(), self.cfg.storage.index.ef_search)
				.retrieve(&embedding, &filters, search_cfg.similarity_threshold, top_k, cancel)
				.await?;
		let retrieval_count = candidates.len() as u32;
		let response = if candidates.is_empty() {
			SearchResponse {
				query: req.query.clone(),
				retrieval_count,
				generation_failed: false,
				phase: SearchPhase::Ranked,
				results: Vec::new(),
			}
		} else if req.skip_ranking {
			SearchResponse {
				query: req.query.clone(),
				retrieval_count,
				generation_failed: false,
				phase: SearchPhase::Retrieval,
				results: similarity_order(&candidates),
			}
		} else {
			stage.enter(Stage::Ranking);

			let reranker =
				Reranker::new(&self.cfg.providers.llm_ranker, self.providers.ranker.as_ref());

			match reranker.rank(&req.query, &candidates, cancel).await {
				Ok(results) => SearchResponse {
					query: req.query.clone(),
					retrieval_count,
					generation_failed: false,
					phase: SearchPhase::Ranked,
					results,
				},
				Err(RankingFailure::Cancelled) => return Err(Error::RequestTimeout),
				Err(failure) => {
					if matches!(failure, RankingFailure::Misconfigured { .. }) {
						tracing::error!(error = %failure, "Ranking provider is misconfigured.");
					} else {
						tracing::warn!(error = %failure, "Falling back to similarity order.");
					}

					SearchResponse {
						query: req.query.clone(),
						retrieval_count,
						generation_failed: true,
						phase: SearchPhase::Ranked,
						results: similarity_order(&candidates),
					}
				},
			}
		};

		self.response_cache.set(cache_key, Arc::new(response.clone()));

		Ok(response)
	}

	/// Embedding for `query`, shared by every query with the same normalized text.
	async fn query_embedding(&self, query: &str, cancel: &CancelToken) -> Result<Arc<Vec<f32>>> {
		let key = text::normalize_query(query);

		if let Some(hit) = self.embedding_cache.get(&key) {
			tracing::debug!("Query embedding cache hit.");

			return Ok(hit);
		}

		let client =
			EmbeddingClient::new(&self.cfg.providers.embedding, self.providers.embedding.as_ref());
		let vectors = client.embed(&[query.to_string()], cancel).await?;
		let Some(vec) = vectors.into_iter().next() else {
			return Err(Error::EmbeddingProvider {
				message: "Embedding provider returned no vectors.".to_string(),
			});
		};
		let vec = Arc::new(vec);

		self.embedding_cache.set(key, vec.clone());

		Ok(vec)
	}
}

fn validate_query(query: &str) -> Result<()> {
	let chars = query.trim().chars().count();

	if chars == 0 {
		return Err(Error::InvalidRequest { message: "query must be non-empty.".to_string() });
	}
	if chars > MAX_QUERY_CHARS {
		return Err(Error::InvalidRequest {
			message: format!("query must be at most {MAX_QUERY_CHARS} characters."),
		});
	}

	Ok(())
}

/// Candidates by descending similarity; ties keep retrieval order.
fn similarity_order(candidates: &[CandidateListing]) -> Vec<RankedResult> {
	let mut ordered: Vec<&CandidateListing> = candidates.iter().collect();

	ordered.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));

	ordered
		.into_iter()
		.enumerate()
		.map(|(idx, listing)| RankedResult {
			listing: listing.clone(),
			rank: idx as u32 + 1,
			relevance_score: listing.similarity,
			explanation: None,
		})
		.collect()
}
