use std::sync::Arc;

use chrono::Utc;
use common::http::ext::OptionExt;
use common::http::RouteError;
use hyper::{Body, Request, Response, StatusCode};
use routerify::Router;
use serde_json::json;

use super::respond;
use super::users::OwnProfile;
use crate::api::auth::RequestAuthExt;
use crate::api::error::{ApiError, Result};
use crate::api::ext::{json_body, RequestExt};
use crate::api::jwt::AuthJwtPayload;
use crate::global::GlobalState;
use crate::lifecycle::NewUser;
use crate::service::users;

#[derive(Debug, serde::Deserialize)]
struct LoginRequest {
	username: String,
	password: String,
}

async fn register(mut req: Request<Body>) -> Result<Response<Body>> {
	let global = req.global()?;
	let input: NewUser = json_body(&mut req).await?;
	let now = Utc::now();

	let user = users::register(&global, input, now).await?;

	Ok(respond(StatusCode::CREATED, OwnProfile::new(&user, Vec::new(), now)))
}

async fn login(mut req: Request<Body>) -> Result<Response<Body>> {
	let global = req.global()?;
	let input: LoginRequest = json_body(&mut req).await?;
	let now = Utc::now();

	let (user, session) = users::login(&global, &input.username, &input.password, now).await?;
	let strikes = users::strikes(&global, user.id).await?;

	let token = AuthJwtPayload::from(&session)
		.serialize(&global.config().jwt)
		.map_err_route("failed to sign token")?;

	Ok(respond(
		StatusCode::OK,
		json!({
			"token": token,
			"expires_at": session.expires_at,
			"user": OwnProfile::new(&user, strikes, now),
		}),
	))
}

async fn logout(req: Request<Body>) -> Result<Response<Body>> {
	let global = req.global()?;
	let auth = req.auth()?;

	users::logout(&global, auth.session.id, Utc::now()).await?;

	Ok(respond(StatusCode::OK, json!({ "logged_out": true })))
}

pub fn routes(_: &Arc<GlobalState>) -> Router<Body, RouteError<ApiError>> {
	Router::builder()
		.post("/register", register)
		.post("/login", login)
		.post("/logout", logout)
		.build()
		.expect("failed to build router")
}
