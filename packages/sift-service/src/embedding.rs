use sift_config::EmbeddingProviderConfig;
use sift_domain::cancel::CancelToken;

use crate::{EmbeddingProvider, Error, Result};

/// Turns texts into vectors of the configured dimensionality.
pub struct EmbeddingClient<'a> {
	cfg: &'a EmbeddingProviderConfig,
	provider: &'a dyn EmbeddingProvider,
}
impl<'a> EmbeddingClient<'a> {
	pub fn new(cfg: &'a EmbeddingProviderConfig, provider: &'a dyn EmbeddingProvider) -> Self {
		Self { cfg, provider }
	}

	/// Returns one vector per input, in input order. An empty batch never reaches the provider.
	pub async fn embed(&self, texts: &[String], cancel: &CancelToken) -> Result<Vec<Vec<f32>>> {
		if texts.is_empty() {
			return Ok(Vec::new());
		}

		let vectors = cancel
			.run(self.provider.embed(self.cfg, texts, cancel))
			.await
			.ok_or(Error::RequestTimeout)?
			.map_err(wrap_provider_error)?;

		if vectors.len() != texts.len() {
			return Err(Error::EmbeddingProvider {
				message: format!(
					"Embedding provider returned {} vectors for {} inputs.",
					vectors.len(),
					texts.len()
				),
			});
		}

		let expected = self.cfg.dimensions as usize;

		if let Some(vec) = vectors.iter().find(|vec| vec.len() != expected) {
			return Err(Error::EmbeddingProvider {
				message: format!(
					"Embedding dimension mismatch. Expected {expected}, got {}.",
					vec.len()
				),
			});
		}

		Ok(vectors)
	}
}

fn wrap_provider_error(err: sift_providers::Error) -> Error {
	match err {
		sift_providers::Error::Cancelled => Error::RequestTimeout,
		sift_providers::Error::MissingCredentials { provider_id } => Error::ProviderMisconfigured {
			message: format!("Embedding provider {provider_id} has no API key configured."),
		},
		other => Error::EmbeddingProvider { message: other.to_string() },
	}
}
