use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum CancelReason {
	Parent,
	Deadline,
	Cancel,
}

impl Display for CancelReason {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Parent => write!(f, "Parent"),
			Self::Deadline => write!(f, "Deadline"),
			Self::Cancel => write!(f, "Cancel"),
		}
	}
}

struct Inner {
	token: CancellationToken,
	deadline: Option<Instant>,
	parent: Option<Context>,
	// Never sent on. The handler observes the channel closing once every clone is gone.
	_alive: mpsc::Sender<()>,
}

/// A cloneable cancellation scope handed to every long running task.
///
/// A context is done when its [`Handler`] cancels it, when its deadline
/// passes, or when its parent is done.
#[derive(Clone)]
pub struct Context(Arc<Inner>);

/// The owning side of a [`Context`].
///
/// Dropping the handler cancels the context.
pub struct Handler {
	token: CancellationToken,
	alive: mpsc::Receiver<()>,
}

impl Context {
	#[must_use]
	pub fn new() -> (Self, Handler) {
		Self::build(None, None)
	}

	#[must_use]
	pub fn with_deadline(deadline: Instant) -> (Self, Handler) {
		Self::build(None, Some(deadline))
	}

	#[must_use]
	pub fn with_timeout(timeout: Duration) -> (Self, Handler) {
		Self::build(None, Some(Instant::now() + timeout))
	}

	#[must_use]
	pub fn with_parent(parent: Context, deadline: Option<Instant>) -> (Self, Handler) {
		Self::build(Some(parent), deadline)
	}

	fn build(parent: Option<Context>, deadline: Option<Instant>) -> (Self, Handler) {
		let token = CancellationToken::new();
		let (alive_send, alive_recv) = mpsc::channel(1);

		(
			Self(Arc::new(Inner {
				token: token.clone(),
				deadline,
				parent,
				_alive: alive_send,
			})),
			Handler {
				token,
				alive: alive_recv,
			},
		)
	}

	pub fn done(&self) -> Pin<Box<dyn Future<Output = CancelReason> + Send + '_>> {
		Box::pin(async move {
			let parent = async {
				match &self.0.parent {
					Some(parent) => {
						parent.done().await;
					}
					None => std::future::pending::<()>().await,
				}
			};

			let deadline = async {
				match self.0.deadline {
					Some(deadline) => tokio::time::sleep_until(deadline).await,
					None => std::future::pending::<()>().await,
				}
			};

			tokio::select! {
				biased;
				_ = self.0.token.cancelled() => CancelReason::Cancel,
				_ = parent => CancelReason::Parent,
				_ = deadline => CancelReason::Deadline,
			}
		})
	}

	pub fn is_done(&self) -> bool {
		self.0.token.is_cancelled()
			|| self.0.deadline.map(|d| d <= Instant::now()).unwrap_or(false)
			|| self.0.parent.as_ref().map(Context::is_done).unwrap_or(false)
	}
}

impl Handler {
	/// Waits until every clone of the context has been dropped, without cancelling it.
	pub async fn done(&mut self) {
		self.alive.recv().await;
	}

	/// Cancels the context and waits for every clone of it to be dropped.
	pub async fn cancel(mut self) {
		self.token.cancel();
		self.alive.recv().await;
	}
}

impl Drop for Handler {
	fn drop(&mut self) {
		self.token.cancel();
	}
}

#[cfg(test)]
mod tests;
