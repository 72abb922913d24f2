use serde::{Deserialize, Serialize};
use serde_json::Value;

use sift_domain::{cancel::CancelToken, text};
use sift_storage::{
	models::ListingMatch,
	queries::{ListingFilters, NearestListingsQuery},
};

use crate::{Error, ListingStore, Result};

/// Descriptions shown to the ranking model are capped at this many characters, ellipsis included.
pub const PROMPT_DESCRIPTION_MAX_CHARS: usize = 220;

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
	#[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
	pub slot_type: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub category: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub available_only: Option<bool>,
}
impl SearchFilters {
	/// Trims values and drops blanks so `""` and an absent filter mean the same thing.
	pub fn normalized(&self) -> Self {
		fn clean(value: &Option<String>) -> Option<String> {
			value.as_deref().map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
		}

		Self {
			slot_type: clean(&self.slot_type),
			category: clean(&self.category),
			available_only: self.available_only.filter(|only| *only),
		}
	}

	fn as_listing_filters(&self) -> ListingFilters<'_> {
		ListingFilters {
			slot_type: self.slot_type.as_deref(),
			category: self.category.as_deref(),
			available_only: self.available_only.unwrap_or(false),
		}
	}
}

/// A listing returned by vector search, before or after ranking.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateListing {
	pub id: String,
	pub name: String,
	#[serde(rename = "type")]
	pub slot_type: String,
	pub category: Option<String>,
	pub description: Option<String>,
	pub price: f64,
	pub available: bool,
	pub sponsor_name: String,
	pub sponsor_verified: bool,
	pub engagement_count: i64,
	/// Cosine similarity to the query, in `[0, 1]`.
	pub similarity: f32,
}
impl CandidateListing {
	/// The subset of attributes the ranking model sees.
	pub fn prompt_view(&self) -> Value {
		let description = self
			.description
			.as_deref()
			.map(|d| text::truncate_with_ellipsis(d, PROMPT_DESCRIPTION_MAX_CHARS))
			.unwrap_or_default();

		serde_json::json!({
			"id": self.id,
			"name": self.name,
			"type": self.slot_type,
			"category": self.category,
			"price": self.price,
			"sponsorVerified": self.sponsor_verified,
			"description": description,
		})
	}
}
impl From<ListingMatch> for CandidateListing {
	fn from(row: ListingMatch) -> Self {
		Self {
			id: row.slot_id,
			name: row.name,
			slot_type: row.slot_type,
			category: row.category,
			description: row.description,
			price: row.price,
			available: row.is_available,
			sponsor_name: row.sponsor_name,
			sponsor_verified: row.sponsor_verified,
			engagement_count: row.engagement_count,
			similarity: clamp_similarity(row.similarity),
		}
	}
}

pub struct VectorRetriever<'a> {
	store: &'a dyn ListingStore,
	ef_search: u32,
}
impl<'a> VectorRetriever<'a> {
	pub fn new(store: &'a dyn ListingStore, ef_search: u32) -> Self {
		Self { store, ef_search }
	}

	/// Nearest listings by cosine similarity, descending, at or above `similarity_threshold`.
	pub async fn retrieve(
		&self,
		embedding: &[f32],
		filters: &SearchFilters,
		similarity_threshold: f32,
		top_k: u32,
		cancel: &CancelToken,
	) -> Result<Vec<CandidateListing>> {
		if !(0.0..=1.0).contains(&similarity_threshold) {
			return Err(Error::InvalidRequest {
				message: "similarity_threshold must be in the range 0.0-1.0.".to_string(),
			});
		}
		if !(1..=sift_config::TOP_K_CEILING).contains(&top_k) {
			return Err(Error::InvalidRequest {
				message: format!("top_k must be between 1 and {}.", sift_config::TOP_K_CEILING),
			});
		}

		let query = NearestListingsQuery {
			embedding,
			filters: filters.as_listing_filters(),
			similarity_threshold,
			limit: top_k,
			ef_search: self.ef_search,
		};
		let rows = cancel.run(self.store.nearest(query)).await.ok_or(Error::RequestTimeout)??;

		tracing::debug!(candidates = rows.len(), top_k, "Vector retrieval finished.");

		Ok(rows.into_iter().map(CandidateListing::from).collect())
	}
}

fn clamp_similarity(value: f32) -> f32 {
	if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}
