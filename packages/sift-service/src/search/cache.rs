use crate::retrieval::SearchFilters;

const RESPONSE_KEY_NAMESPACE: &[u8] = b"sift/search-response/v1";

/// Everything that can change a search response for a given query embedding.
pub struct ResponseKeyInput<'a> {
	pub embedding: &'a [f32],
	pub filters: &'a SearchFilters,
	pub top_k: u32,
	pub similarity_threshold: f32,
	pub skip_ranking: bool,
	pub embedding_model: &'a str,
	pub ranking_model: &'a str,
}

pub fn response_cache_key(input: &ResponseKeyInput<'_>) -> String {
	let mut hasher = blake3::Hasher::new();

	hasher.update(RESPONSE_KEY_NAMESPACE);
	hash_str(&mut hasher, input.embedding_model);
	hash_str(&mut hasher, input.ranking_model);
	hasher.update(&(input.embedding.len() as u64).to_le_bytes());

	for value in input.embedding {
		hasher.update(&value.to_le_bytes());
	}

	hash_optional(&mut hasher, input.filters.slot_type.as_deref());
	hash_optional(&mut hasher, input.filters.category.as_deref());
	hasher.update(&[u8::from(input.filters.available_only.unwrap_or(false))]);
	hasher.update(&input.top_k.to_le_bytes());
	hasher.update(&input.similarity_threshold.to_le_bytes());
	hasher.update(&[u8::from(input.skip_ranking)]);

	hasher.finalize().to_hex().to_string()
}

fn hash_str(hasher: &mut blake3::Hasher, value: &str) {
	hasher.update(&(value.len() as u64).to_le_bytes());
	hasher.update(value.as_bytes());
}

fn hash_optional(hasher: &mut blake3::Hasher, value: Option<&str>) {
	match value {
		Some(value) => {
			hasher.update(&[1]);
			hash_str(hasher, value);
		},
		None => {
			hasher.update(&[0]);
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn input(filters: &SearchFilters) -> ResponseKeyInput<'_> {
		ResponseKeyInput {
			embedding: &[0.1, 0.2, 0.3],
			filters,
			top_k: 5,
			similarity_threshold: 0.3,
			skip_ranking: false,
			embedding_model: "text-embedding-3-small",
			ranking_model: "gpt-4o-mini",
		}
	}

	fn key_with(edit: fn(&mut ResponseKeyInput<'_>)) -> String {
		let filters = SearchFilters::default();
		let mut input = input(&filters);

		edit(&mut input);

		response_cache_key(&input)
	}

	#[test]
	fn key_is_stable_for_identical_inputs() {
		assert_eq!(key_with(|_| {}), key_with(|_| {}));
	}

	#[test]
	fn key_changes_with_every_response_input() {
		let base = key_with(|_| {});
		let filters = SearchFilters { category: Some("tech".to_string()), ..Default::default() };

		assert_ne!(base, response_cache_key(&input(&filters)));
		assert_ne!(base, key_with(|input| input.embedding = &[0.1, 0.2, 0.4]));
		assert_ne!(base, key_with(|input| input.top_k = 6));
		assert_ne!(base, key_with(|input| input.similarity_threshold = 0.4));
		assert_ne!(base, key_with(|input| input.skip_ranking = true));
		assert_ne!(base, key_with(|input| input.ranking_model = "gpt-4o"));
	}

	#[test]
	fn type_and_category_values_do_not_collide() {
		let as_type = SearchFilters { slot_type: Some("tech".to_string()), ..Default::default() };
		let as_category = SearchFilters { category: Some("tech".to_string()), ..Default::default() };

		assert_ne!(response_cache_key(&input(&as_type)), response_cache_key(&input(&as_category)));
	}
}
