use std::sync::Arc;

use chrono::Utc;
use common::http::RouteError;
use hyper::{Body, Request, Response, StatusCode};
use routerify::prelude::RequestExt as _;
use routerify::Router;

use super::respond;
use crate::api::auth::RequestAuthExt;
use crate::api::error::{ApiError, Result};
use crate::api::ext::{json_body, optional_json_body, RequestExt};
use crate::global::GlobalState;
use crate::service::payments::{self, CallbackInput, NewPayment};

async fn initiate(mut req: Request<Body>) -> Result<Response<Body>> {
	let global = req.global()?;
	let auth = req.auth()?;
	let input: NewPayment = json_body(&mut req).await?;

	let payment = payments::initiate(&global, auth.user_id(), input, Utc::now()).await?;

	Ok(respond(StatusCode::CREATED, payment))
}

/// Called by the gateway, authenticated by the signature rather than a session.
async fn callback(mut req: Request<Body>) -> Result<Response<Body>> {
	let global = req.global()?;
	let input: CallbackInput = optional_json_body(&mut req).await?;

	let payment = payments::callback(&global, input, Utc::now()).await?;

	Ok(respond(StatusCode::OK, payment))
}

async fn list(req: Request<Body>) -> Result<Response<Body>> {
	let global = req.global()?;
	let auth = req.auth()?;

	let payments = payments::list(&global, auth.user_id()).await?;

	Ok(respond(StatusCode::OK, payments))
}

async fn refund(req: Request<Body>) -> Result<Response<Body>> {
	let global = req.global()?;
	let auth = req.auth()?;
	let order_id = req
		.param("order_id")
		.cloned()
		.ok_or_else(|| RouteError::from((StatusCode::BAD_REQUEST, "missing order id")))?;

	let payment = payments::refund(&global, auth.user_id(), &order_id, Utc::now()).await?;

	Ok(respond(StatusCode::OK, payment))
}

pub fn routes(_: &Arc<GlobalState>) -> Router<Body, RouteError<ApiError>> {
	Router::builder()
		.post("/", initiate)
		.get("/", list)
		.post("/callback", callback)
		.post("/:order_id/refund", refund)
		.build()
		.expect("failed to build router")
}
