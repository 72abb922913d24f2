use std::collections::{HashMap, HashSet};

use crate::{rerank::payload::RankedItem, retrieval::CandidateListing, search::RankedResult};

/// Grounds model output in retrieval: unknown ids are dropped, items are ordered by the model's
/// rank, the first occurrence of each id wins, and ranks are renumbered `1..=N`.
pub fn ground(items: Vec<RankedItem>, candidates: &[CandidateListing]) -> Vec<RankedResult> {
	let by_id: HashMap<&str, &CandidateListing> =
		candidates.iter().map(|candidate| (candidate.id.as_str(), candidate)).collect();
	let mut known: Vec<RankedItem> =
		items.into_iter().filter(|item| by_id.contains_key(item.id.as_str())).collect();

	// Stable, so equal ranks keep emission order.
	known.sort_by(|a, b| a.rank.total_cmp(&b.rank));

	let mut seen = HashSet::new();
	let mut out = Vec::with_capacity(known.len());

	for item in known {
		if !seen.insert(item.id.clone()) {
			continue;
		}

		let Some(listing) = by_id.get(item.id.as_str()) else { continue };

		out.push(RankedResult {
			listing: (*listing).clone(),
			rank: (out.len() + 1) as u32,
			relevance_score: clamp_unit(item.score),
			explanation: Some(item.explanation),
		});
	}

	out
}

fn clamp_unit(value: f64) -> f32 {
	value.clamp(0.0, 1.0) as f32
}
