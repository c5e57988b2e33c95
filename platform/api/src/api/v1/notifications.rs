use std::sync::Arc;

use common::http::RouteError;
use hyper::{Body, Request, Response, StatusCode};
use routerify::Router;
use serde_json::json;

use super::respond;
use crate::api::auth::RequestAuthExt;
use crate::api::error::{ApiError, Result};
use crate::api::ext::RequestExt;
use crate::global::GlobalState;
use crate::service::notifications;

async fn list(req: Request<Body>) -> Result<Response<Body>> {
	let global = req.global()?;
	let auth = req.auth()?;

	let unread_only = matches!(req.query_param("unread").as_deref(), Some("true" | "1"));
	let limit = match req.query_param("limit") {
		Some(raw) => Some(
			raw.parse::<i64>()
				.map_err(|_| RouteError::from((StatusCode::BAD_REQUEST, "limit must be a number")))?,
		),
		None => None,
	};

	let notifications = notifications::list(&global, auth.user_id(), unread_only, limit).await?;

	Ok(respond(StatusCode::OK, notifications))
}

async fn unread_count(req: Request<Body>) -> Result<Response<Body>> {
	let global = req.global()?;
	let auth = req.auth()?;

	let count = notifications::unread_count(&global, auth.user_id()).await?;

	Ok(respond(StatusCode::OK, json!({ "unread": count })))
}

async fn mark_read(req: Request<Body>) -> Result<Response<Body>> {
	let global = req.global()?;
	let auth = req.auth()?;
	let id = req.id_param("id")?;

	notifications::mark_read(&global, auth.user_id(), id).await?;

	Ok(respond(StatusCode::OK, json!({ "read": id })))
}

async fn mark_all_read(req: Request<Body>) -> Result<Response<Body>> {
	let global = req.global()?;
	let auth = req.auth()?;

	let updated = notifications::mark_all_read(&global, auth.user_id()).await?;

	Ok(respond(StatusCode::OK, json!({ "updated": updated })))
}

pub fn routes(_: &Arc<GlobalState>) -> Router<Body, RouteError<ApiError>> {
	Router::builder()
		.get("/", list)
		.get("/unread-count", unread_count)
		.post("/read-all", mark_all_read)
		.post("/:id/read", mark_read)
		.build()
		.expect("failed to build router")
}
