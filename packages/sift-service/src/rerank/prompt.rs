use serde_json::Value;

use crate::retrieval::CandidateListing;

const SYSTEM_PROMPT: &str = "You rank marketplace listings for a search query. \
Rank only the listings provided; never invent listings, ids, or attributes. \
Every result id must exactly match one of the provided listing ids. \
Output must be valid JSON only and must match the provided schema exactly. \
Keep each explanation to one or two sentences grounded in the listing data.";

pub fn build_ranking_messages(query: &str, candidates: &[CandidateListing]) -> Vec<Value> {
	let schema = serde_json::json!({
		"results": [
			{ "id": "string", "rank": 1, "score": 0.0, "explanation": "string" }
		]
	});
	let schema_text = serde_json::to_string_pretty(&schema).unwrap_or_else(|_| {
		"{\"results\": [{\"id\": \"string\", \"rank\": 1, \"score\": 0.0, \"explanation\": \"string\"}]}"
			.to_string()
	});
	let listings: Vec<Value> = candidates.iter().map(CandidateListing::prompt_view).collect();
	let listings_text = serde_json::to_string(&listings).unwrap_or_else(|_| "[]".to_string());
	let user_prompt = format!(
		"Return JSON matching this exact schema:\n{schema_text}\nConstraints:\n- rank starts at 1, lower is better\n- score is relevance in the range 0.0-1.0\nQuery:\n{query}\nListings:\n{listings_text}"
	);

	vec![
		serde_json::json!({ "role": "system", "content": SYSTEM_PROMPT }),
		serde_json::json!({ "role": "user", "content": user_prompt }),
	]
}
