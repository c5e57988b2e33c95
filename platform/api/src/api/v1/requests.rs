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
use crate::global::GlobalState;
use crate::service::requests::{self, AcceptRequest, Mailbox, NewRequest};

async fn create(mut req: Request<Body>) -> Result<Response<Body>> {
	let global = req.global()?;
	let auth = req.auth()?;
	let input: NewRequest = json_body(&mut req).await?;

	let request = requests::create(&global, auth.user_id(), input, Utc::now()).await?;

	Ok(respond(StatusCode::CREATED, request))
}

async fn list(req: Request<Body>) -> Result<Response<Body>> {
	let global = req.global()?;
	let auth = req.auth()?;

	let mailbox = match req.query_param("box").as_deref() {
		None | Some("received") => Mailbox::Received,
		Some("sent") => Mailbox::Sent,
		Some(_) => return Err((StatusCode::BAD_REQUEST, "box must be sent or received").into()),
	};

	let requests = requests::list(&global, auth.user_id(), mailbox, Utc::now()).await?;

	Ok(respond(StatusCode::OK, requests))
}

async fn get(req: Request<Body>) -> Result<Response<Body>> {
	let global = req.global()?;
	let auth = req.auth()?;
	let id = req.id_param("id")?;

	let request = requests::get(&global, auth.user_id(), id, Utc::now()).await?;

	Ok(respond(StatusCode::OK, request))
}

async fn accept(mut req: Request<Body>) -> Result<Response<Body>> {
	let global = req.global()?;
	let auth = req.auth()?;
	let id = req.id_param("id")?;
	let input: AcceptRequest = json_body(&mut req).await?;

	let (request, exchange) = requests::accept(&global, auth.user_id(), id, input.media_id, Utc::now()).await?;

	Ok(respond(
		StatusCode::OK,
		json!({
			"request": request,
			"exchange": exchange,
		}),
	))
}

async fn reject(req: Request<Body>) -> Result<Response<Body>> {
	let global = req.global()?;
	let auth = req.auth()?;
	let id = req.id_param("id")?;

	let request = requests::reject(&global, auth.user_id(), id, Utc::now()).await?;

	Ok(respond(StatusCode::OK, request))
}

pub fn routes(_: &Arc<GlobalState>) -> Router<Body, RouteError<ApiError>> {
	Router::builder()
		.post("/", create)
		.get("/", list)
		.get("/:id", get)
		.post("/:id/accept", accept)
		.post("/:id/reject", reject)
		.build()
		.expect("failed to build router")
}
