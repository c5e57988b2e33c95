use std::sync::Arc;

use chrono::Utc;
use common::http::RouteError;
use hyper::{Body, Request, Response, StatusCode};
use routerify::Router;

use super::respond;
use crate::api::auth::RequestAuthExt;
use crate::api::error::{ApiError, Result};
use crate::api::ext::{json_body, RequestExt};
use crate::global::GlobalState;
use crate::service::exchanges;

#[derive(Debug, serde::Deserialize)]
struct ProofRequest {
	url: String,
}

#[derive(Debug, serde::Deserialize)]
struct RatingRequest {
	stars: i32,
	#[serde(default)]
	comment: Option<String>,
}

async fn list(req: Request<Body>) -> Result<Response<Body>> {
	let global = req.global()?;
	let auth = req.auth()?;

	let exchanges = exchanges::list(&global, auth.user_id(), Utc::now()).await?;

	Ok(respond(StatusCode::OK, exchanges))
}

async fn get(req: Request<Body>) -> Result<Response<Body>> {
	let global = req.global()?;
	let auth = req.auth()?;
	let id = req.id_param("id")?;

	let exchange = exchanges::get(&global, auth.user_id(), id, Utc::now()).await?;

	Ok(respond(StatusCode::OK, exchange))
}

async fn proof(mut req: Request<Body>) -> Result<Response<Body>> {
	let global = req.global()?;
	let auth = req.auth()?;
	let id = req.id_param("id")?;
	let input: ProofRequest = json_body(&mut req).await?;

	let exchange = exchanges::submit_proof(&global, auth.user_id(), id, input.url, Utc::now()).await?;

	Ok(respond(StatusCode::OK, exchange))
}

async fn rate(mut req: Request<Body>) -> Result<Response<Body>> {
	let global = req.global()?;
	let auth = req.auth()?;
	let id = req.id_param("id")?;
	let input: RatingRequest = json_body(&mut req).await?;

	let rating = exchanges::rate(&global, auth.user_id(), id, input.stars, input.comment, Utc::now()).await?;

	Ok(respond(StatusCode::CREATED, rating))
}

pub fn routes(_: &Arc<GlobalState>) -> Router<Body, RouteError<ApiError>> {
	Router::builder()
		.get("/", list)
		.get("/:id", get)
		.post("/:id/proof", proof)
		.post("/:id/rating", rate)
		.build()
		.expect("failed to build router")
}
