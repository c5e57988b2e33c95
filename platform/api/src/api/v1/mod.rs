use std::sync::Arc;

use common::http::RouteError;
use common::make_response;
use hyper::{Body, Response, StatusCode};
use routerify::Router;
use serde::Serialize;
use serde_json::json;

use super::error::ApiError;
use crate::global::GlobalState;

pub mod auth;
pub mod exchanges;
pub mod health;
pub mod media;
pub mod notifications;
pub mod payments;
pub mod plans;
pub mod requests;
pub mod users;

/// Wraps `data` in the success envelope.
pub(crate) fn respond<T: Serialize>(status: StatusCode, data: T) -> Response<Body> {
	make_response!(
		status,
		json!({
			"success": true,
			"data": data,
		})
	)
}

pub fn routes(global: &Arc<GlobalState>) -> Router<Body, RouteError<ApiError>> {
	Router::builder()
		.scope("/health", health::routes(global))
		.scope("/auth", auth::routes(global))
		.scope("/users", users::routes(global))
		.scope("/plans", plans::routes(global))
		.scope("/media", media::routes(global))
		.scope("/requests", requests::routes(global))
		.scope("/exchanges", exchanges::routes(global))
		.scope("/notifications", notifications::routes(global))
		.scope("/payments", payments::routes(global))
		.build()
		.expect("failed to build router")
}
