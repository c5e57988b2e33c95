use std::sync::Arc;
use std::time::Duration;

use common::http::RouteError;
use hyper::header::HeaderValue;
use hyper::http::header;
use hyper::Body;
use routerify::Middleware;

use crate::api::error::ApiError;
use crate::global::GlobalState;

pub fn cors_middleware(global: &Arc<GlobalState>) -> Middleware<Body, RouteError<ApiError>> {
	let allowed_origin =
		HeaderValue::from_str(&global.config().api.allowed_origin).unwrap_or_else(|_| HeaderValue::from_static("*"));

	Middleware::post(move |mut resp| {
		let allowed_origin = allowed_origin.clone();
		async move {
			let headers = resp.headers_mut();
			headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, allowed_origin);
			headers.insert(
				header::ACCESS_CONTROL_ALLOW_METHODS,
				HeaderValue::from_static("GET, POST, DELETE, OPTIONS"),
			);
			headers.insert(
				header::ACCESS_CONTROL_ALLOW_HEADERS,
				HeaderValue::from_static("Content-Type, Authorization"),
			);
			headers.insert(
				header::ACCESS_CONTROL_MAX_AGE,
				HeaderValue::from(Duration::from_secs(86400).as_secs()),
			);

			Ok(resp)
		}
	})
}
