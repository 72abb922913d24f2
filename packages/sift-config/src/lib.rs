mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Cache, CacheBounds, Config, EmbeddingProviderConfig, LlmProviderConfig, Postgres, Providers,
	Search, Service, Storage, VectorIndex,
};

use std::{env, fs, path::Path};

/// Hard ceiling on results per search; `search.max_top_k` may lower it but never raise it.
pub const TOP_K_CEILING: u32 = 20;

pub const ENV_PG_DSN: &str = "SIFT_PG_DSN";
pub const ENV_EMBEDDING_API_KEY: &str = "SIFT_EMBEDDING_API_KEY";
pub const ENV_LLM_API_KEY: &str = "SIFT_LLM_API_KEY";

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	apply_env_overrides(&mut cfg, |key| env::var(key).ok());

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

/// Secrets and the DSN may come from the environment so they stay out of the config file.
pub fn apply_env_overrides<F>(cfg: &mut Config, lookup: F)
where
	F: Fn(&str) -> Option<String>,
{
	let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

	if let Some(dsn) = lookup(ENV_PG_DSN) {
		cfg.storage.postgres.dsn = dsn;
	}
	if let Some(key) = lookup(ENV_EMBEDDING_API_KEY) {
		cfg.providers.embedding.api_key = key;
	}
	if let Some(key) = lookup(ENV_LLM_API_KEY) {
		cfg.providers.llm_ranker.api_key = key;
	}
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.service.log_level.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.log_level must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.storage.index.vector_dim == 0 {
		return Err(Error::Validation {
			message: "storage.index.vector_dim must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions != cfg.storage.index.vector_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match storage.index.vector_dim."
				.to_string(),
		});
	}
	if cfg.storage.index.ef_search == 0 {
		return Err(Error::Validation {
			message: "storage.index.ef_search must be greater than zero.".to_string(),
		});
	}

	for (label, timeout_ms) in [
		("providers.embedding.timeout_ms", cfg.providers.embedding.timeout_ms),
		("providers.llm_ranker.timeout_ms", cfg.providers.llm_ranker.timeout_ms),
	] {
		if timeout_ms == 0 {
			return Err(Error::Validation {
				message: format!("{label} must be greater than zero."),
			});
		}
	}

	let temperature = cfg.providers.llm_ranker.temperature;

	if !temperature.is_finite() || !(0.0..=2.0).contains(&temperature) {
		return Err(Error::Validation {
			message: "providers.llm_ranker.temperature must be in the range 0.0-2.0.".to_string(),
		});
	}
	if cfg.search.max_top_k == 0 || cfg.search.max_top_k > TOP_K_CEILING {
		return Err(Error::Validation {
			message: format!("search.max_top_k must be in the range 1-{TOP_K_CEILING}."),
		});
	}
	if cfg.search.default_top_k == 0 || cfg.search.default_top_k > cfg.search.max_top_k {
		return Err(Error::Validation {
			message: "search.default_top_k must be between 1 and search.max_top_k.".to_string(),
		});
	}

	let threshold = cfg.search.similarity_threshold;

	if !threshold.is_finite() {
		return Err(Error::Validation {
			message: "search.similarity_threshold must be a finite number.".to_string(),
		});
	}
	if !(0.0..=1.0).contains(&threshold) {
		return Err(Error::Validation {
			message: "search.similarity_threshold must be in the range 0.0-1.0.".to_string(),
		});
	}
	if cfg.search.deadline_ms == 0 {
		return Err(Error::Validation {
			message: "search.deadline_ms must be greater than zero.".to_string(),
		});
	}

	for (label, bounds) in
		[("cache.embedding", &cfg.cache.embedding), ("cache.response", &cfg.cache.response)]
	{
		if bounds.max_entries == 0 {
			return Err(Error::Validation {
				message: format!("{label}.max_entries must be greater than zero."),
			});
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	for key in [&mut cfg.providers.embedding.api_key, &mut cfg.providers.llm_ranker.api_key] {
		if key.trim().len() != key.len() {
			*key = key.trim().to_string();
		}
	}

	cfg.service.log_level = cfg.service.log_level.trim().to_string();
}
