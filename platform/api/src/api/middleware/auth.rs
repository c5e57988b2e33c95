use std::sync::Arc;

use chrono::Utc;
use common::http::RouteError;
use hyper::http::header;
use hyper::Body;
use routerify::prelude::RequestExt;
use routerify::Middleware;

use crate::api::auth::{AuthData, AuthError};
use crate::api::error::ApiError;
use crate::api::ext::RequestExt as _;
use crate::api::jwt::AuthJwtPayload;
use crate::global::GlobalState;
use crate::service;

pub fn auth_middleware(_: &Arc<GlobalState>) -> Middleware<Body, RouteError<ApiError>> {
	Middleware::pre(|req| async move {
		let Some(token) = req.headers().get(header::AUTHORIZATION) else {
			// No Authorization header
			return Ok(req);
		};

		let global = req.global()?;
		let now = Utc::now();

		let token = token
			.to_str()
			.map_err(|_| AuthError::HeaderToStr)?
			.strip_prefix("Bearer ") // Tokens will start with "Bearer " so we need to remove that
			.ok_or(AuthError::NotBearerToken)?;

		let jwt = AuthJwtPayload::verify(&global.config().jwt, token, now).ok_or(AuthError::InvalidToken)?;

		let session = service::users::authenticate(&global, jwt.session_id, now)
			.await?
			.filter(|session| session.user_id == jwt.user_id)
			.ok_or(AuthError::SessionExpired)?;

		// Banned accounts keep their sessions but may not use them.
		service::load_active_user(&global, session.user_id).await?;

		req.set_context(AuthData { session });

		Ok(req)
	})
}
