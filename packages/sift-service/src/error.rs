pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Provider misconfigured: {message}")]
	ProviderMisconfigured { message: String },
	#[error("Embedding provider error: {message}")]
	EmbeddingProvider { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error("Search deadline elapsed before the request completed.")]
	RequestTimeout,
	#[error(transparent)]
	CacheConfig(#[from] sift_domain::cache::CacheError),
}

impl From<sift_storage::Error> for Error {
	fn from(err: sift_storage::Error) -> Self {
		match err {
			sift_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			sift_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			sift_storage::Error::NotFound(message) => Self::Storage { message },
		}
	}
}
