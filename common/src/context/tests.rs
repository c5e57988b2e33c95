use std::time::Duration;

use super::*;
use crate::prelude::FutureTimeout;

#[tokio::test]
async fn cancel_wakes_every_clone() {
	let (ctx, handler) = Context::new();

	let tasks = (0..3)
		.map(|_| {
			let ctx = ctx.clone();
			tokio::spawn(async move { ctx.done().await })
		})
		.collect::<Vec<_>>();
	drop(ctx);

	handler
		.cancel()
		.timeout(Duration::from_millis(300))
		.await
		.expect("handler should observe every clone dropping");

	for task in tasks {
		let reason = task.await.expect("panic in task");
		assert_eq!(reason, CancelReason::Cancel);
	}
}

#[tokio::test]
async fn deadline_reports_deadline() {
	let (ctx, mut handler) = Context::with_timeout(Duration::from_millis(50));

	let reason = ctx.done().timeout(Duration::from_millis(300)).await.expect("deadline");
	assert_eq!(reason, CancelReason::Deadline);
	assert!(ctx.is_done());

	drop(ctx);
	handler.done().timeout(Duration::from_millis(300)).await.expect("dropped");
}

#[tokio::test]
async fn parent_cancellation_propagates() {
	let (parent, parent_handler) = Context::new();
	let (child, _child_handler) = Context::with_parent(parent, None);

	let task = tokio::spawn(async move { child.done().await });

	parent_handler
		.cancel()
		.timeout(Duration::from_millis(300))
		.await
		.expect("child should release the parent");

	let reason = task.await.expect("panic in task");
	assert_eq!(reason, CancelReason::Parent);
}

#[tokio::test]
async fn dropping_handler_cancels() {
	let (ctx, handler) = Context::new();
	assert!(!ctx.is_done());

	drop(handler);

	assert!(ctx.is_done());
	let reason = ctx.done().timeout(Duration::from_millis(100)).await.expect("cancelled");
	assert_eq!(reason, CancelReason::Cancel);
}
