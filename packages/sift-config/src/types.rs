use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	pub search: Search,
	pub cache: Cache,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
	pub index: VectorIndex,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VectorIndex {
	pub vector_dim: u32,
	/// HNSW `ef_search` applied per query, scoped to the query's transaction.
	pub ef_search: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub llm_ranker: LlmProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	#[serde(default)]
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	#[serde(default)]
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Search {
	#[serde(default = "default_top_k")]
	pub default_top_k: u32,
	#[serde(default = "default_max_top_k")]
	pub max_top_k: u32,
	pub similarity_threshold: f32,
	/// End-to-end budget for one search call, covering every provider and storage round-trip.
	#[serde(default = "default_deadline_ms")]
	pub deadline_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Cache {
	pub embedding: CacheBounds,
	pub response: CacheBounds,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CacheBounds {
	pub max_entries: usize,
	/// Zero disables expiry.
	pub ttl_ms: u64,
}

fn default_top_k() -> u32 {
	5
}

fn default_max_top_k() -> u32 {
	20
}

fn default_deadline_ms() -> u64 {
	12_000
}
