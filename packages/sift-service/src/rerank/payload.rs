use serde_json::Value;

/// One well-formed item from the ranking model, not yet checked against retrieval.
#[derive(Clone, Debug, PartialEq)]
pub struct RankedItem {
	pub id: String,
	pub rank: f64,
	pub score: f64,
	pub explanation: String,
}

/// `None` when the payload is not an object with a `results` array. Malformed items are dropped.
pub fn parse_ranking_payload(payload: &Value) -> Option<Vec<RankedItem>> {
	let results = payload.as_object()?.get("results")?.as_array()?;

	Some(results.iter().filter_map(parse_item).collect())
}

fn parse_item(item: &Value) -> Option<RankedItem> {
	let id = item.get("id")?.as_str()?;
	let rank = item.get("rank")?.as_f64().filter(|v| v.is_finite())?;
	let score = item.get("score")?.as_f64().filter(|v| v.is_finite())?;
	let explanation = item.get("explanation")?.as_str()?.trim();

	if explanation.is_empty() {
		return None;
	}

	Some(RankedItem { id: id.to_string(), rank, score, explanation: explanation.to_string() })
}
