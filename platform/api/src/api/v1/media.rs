use std::sync::Arc;

use chrono::Utc;
use common::http::RouteError;
use hyper::{Body, Request, Response, StatusCode};
use routerify::Router;
use serde_json::json;

use super::respond;
use crate::api::auth::RequestAuthExt;
use crate::api::error::{ApiError, Result};
use crate::api::ext::{json_body, RequestExt};
use crate::database::MediaKind;
use crate::global::GlobalState;
use crate::service::media;

#[derive(Debug, serde::Deserialize)]
struct UploadRequest {
	url: String,
	kind: MediaKind,
}

async fn list(req: Request<Body>) -> Result<Response<Body>> {
	let global = req.global()?;
	let auth = req.auth()?;

	let items = media::list(&global, auth.user_id()).await?;

	Ok(respond(StatusCode::OK, items))
}

async fn upload(mut req: Request<Body>) -> Result<Response<Body>> {
	let global = req.global()?;
	let auth = req.auth()?;
	let input: UploadRequest = json_body(&mut req).await?;

	let item = media::upload(&global, auth.user_id(), input.url, input.kind, Utc::now()).await?;

	Ok(respond(StatusCode::CREATED, item))
}

async fn delete(req: Request<Body>) -> Result<Response<Body>> {
	let global = req.global()?;
	let auth = req.auth()?;
	let id = req.id_param("id")?;

	media::delete(&global, auth.user_id(), id).await?;

	Ok(respond(StatusCode::OK, json!({ "deleted": id })))
}

pub fn routes(_: &Arc<GlobalState>) -> Router<Body, RouteError<ApiError>> {
	Router::builder()
		.get("/", list)
		.post("/", upload)
		.delete("/:id", delete)
		.build()
		.expect("failed to build router")
}
