use std::{future::Future, sync::Arc};

use tokio::sync::watch;

/// Cooperative cancellation signal shared by every suspension point of one request.
///
/// Clones observe the same signal. Once fired, a token stays cancelled.
#[derive(Debug, Clone)]
pub struct CancelToken {
	tx: Arc<watch::Sender<bool>>,
}
impl CancelToken {
	pub fn new() -> Self {
		let (tx, _rx) = watch::channel(false);

		Self { tx: Arc::new(tx) }
	}

	pub fn cancel(&self) {
		self.tx.send_replace(true);
	}

	pub fn is_cancelled(&self) -> bool {
		*self.tx.borrow()
	}

	/// Resolves once the token fires; resolves immediately if it already has.
	pub async fn cancelled(&self) {
		let mut rx = self.tx.subscribe();

		loop {
			if *rx.borrow_and_update() {
				return;
			}
			if rx.changed().await.is_err() {
				return;
			}
		}
	}

	/// Drives `fut` until it completes or the token fires, whichever happens first.
	///
	/// Returns `None` when cancelled; `fut` is dropped at that point.
	pub async fn run<F>(&self, fut: F) -> Option<F::Output>
	where
		F: Future,
	{
		if self.is_cancelled() {
			return None;
		}

		tokio::select! {
			biased;
			_ = self.cancelled() => None,
			output = fut => Some(output),
		}
	}
}
impl Default for CancelToken {
	fn default() -> Self {
		Self::new()
	}
}
