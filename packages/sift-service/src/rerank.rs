pub mod grounding;
pub mod payload;
pub mod prompt;

use std::fmt;

use sift_config::LlmProviderConfig;
use sift_domain::cancel::CancelToken;

use crate::{RankingProvider, retrieval::CandidateListing, search::RankedResult};

/// Total LLM calls per ranking, including the retry.
pub const MAX_RANKING_ATTEMPTS: u32 = 2;

/// Why ranking produced no usable result. Only `Cancelled` is allowed to reach the caller as an
/// error; the other variants degrade to similarity order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RankingFailure {
	Cancelled,
	Misconfigured { message: String },
	Failed { message: String },
}
impl fmt::Display for RankingFailure {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Cancelled => f.write_str("Ranking was cancelled."),
			Self::Misconfigured { message } => write!(f, "Ranking provider misconfigured: {message}"),
			Self::Failed { message } => write!(f, "Ranking failed: {message}"),
		}
	}
}

pub struct Reranker<'a> {
	cfg: &'a LlmProviderConfig,
	provider: &'a dyn RankingProvider,
}
impl<'a> Reranker<'a> {
	pub fn new(cfg: &'a LlmProviderConfig, provider: &'a dyn RankingProvider) -> Self {
		Self { cfg, provider }
	}

	/// Ranks `candidates` for `query`. Every returned result references a candidate.
	pub async fn rank(
		&self,
		query: &str,
		candidates: &[CandidateListing],
		cancel: &CancelToken,
	) -> Result<Vec<RankedResult>, RankingFailure> {
		let messages = prompt::build_ranking_messages(query, candidates);
		let mut last_failure = RankingFailure::Failed { message: "No attempt was made.".to_string() };

		for attempt in 1..=MAX_RANKING_ATTEMPTS {
			match self.attempt(&messages, candidates, cancel).await {
				Ok(results) => return Ok(results),
				Err(failure @ (RankingFailure::Cancelled | RankingFailure::Misconfigured { .. })) =>
					return Err(failure),
				Err(failure) => {
					tracing::warn!(attempt, error = %failure, "LLM ranking attempt failed.");

					last_failure = failure;
				},
			}
		}

		Err(last_failure)
	}

	async fn attempt(
		&self,
		messages: &[serde_json::Value],
		candidates: &[CandidateListing],
		cancel: &CancelToken,
	) -> Result<Vec<RankedResult>, RankingFailure> {
		let Some(result) = cancel.run(self.provider.complete(self.cfg, messages, cancel)).await
		else {
			return Err(RankingFailure::Cancelled);
		};
		let payload = result.map_err(|err| match err {
			sift_providers::Error::Cancelled => RankingFailure::Cancelled,
			sift_providers::Error::MissingCredentials { provider_id } =>
				RankingFailure::Misconfigured {
					message: format!("Ranking provider {provider_id} has no API key configured."),
				},
			other => RankingFailure::Failed { message: other.to_string() },
		})?;
		let items = payload::parse_ranking_payload(&payload).ok_or_else(|| RankingFailure::Failed {
			message: "Ranking payload is not an object with a results array.".to_string(),
		})?;
		let results = grounding::ground(items, candidates);

		if results.is_empty() {
			return Err(RankingFailure::Failed {
				message: "Ranking payload referenced none of the retrieved listings.".to_string(),
			});
		}

		Ok(results)
	}
}
