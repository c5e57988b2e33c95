use std::str::FromStr;
use std::sync::Arc;

use common::http::ext::{RequestGlobalExt, ResultExt};
use http_body::{LengthLimitError, Limited};
use hyper::body::Bytes;
use hyper::{header, Body, Request, StatusCode};
use routerify::prelude::RequestExt as _;
use serde::de::DeserializeOwned;

use super::error::Result;
use crate::database::Ulid;
use crate::global::GlobalState;

/// Bodies above this size are refused before parsing.
const MAX_BODY_SIZE: usize = 64 * 1024;

pub trait RequestExt {
	fn global(&self) -> Result<Arc<GlobalState>>;

	/// Parses the path parameter `name` as an id.
	fn id_param(&self, name: &str) -> Result<Ulid>;

	/// Looks up `name` in the query string.
	fn query_param(&self, name: &str) -> Option<String>;
}

impl RequestExt for Request<Body> {
	fn global(&self) -> Result<Arc<GlobalState>> {
		self.get_global()
	}

	fn id_param(&self, name: &str) -> Result<Ulid> {
		let Some(raw) = self.param(name) else {
			return Err((StatusCode::BAD_REQUEST, format!("missing path parameter {name}")).into());
		};

		Ulid::from_str(raw).map_ignore_err_route((StatusCode::BAD_REQUEST, format!("invalid {name}")))
	}

	fn query_param(&self, name: &str) -> Option<String> {
		url::form_urlencoded::parse(self.uri().query()?.as_bytes())
			.find_map(|(key, value)| if key == name { Some(value.into_owned()) } else { None })
	}
}

/// Reads at most [`MAX_BODY_SIZE`] bytes of the body.
async fn read_body(req: &mut Request<Body>) -> Result<Bytes> {
	let declared = req
		.headers()
		.get(header::CONTENT_LENGTH)
		.and_then(|value| value.to_str().ok())
		.and_then(|value| value.parse::<u64>().ok());

	if declared.is_some_and(|len| len > MAX_BODY_SIZE as u64) {
		return Err((StatusCode::PAYLOAD_TOO_LARGE, "request body too large").into());
	}

	let body = std::mem::take(req.body_mut());
	match hyper::body::to_bytes(Limited::new(body, MAX_BODY_SIZE)).await {
		Ok(bytes) => Ok(bytes),
		Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => {
			Err((StatusCode::PAYLOAD_TOO_LARGE, "request body too large").into())
		}
		Err(_) => Err((StatusCode::BAD_REQUEST, "failed to read request body").into()),
	}
}

/// Reads the body and deserializes it as JSON.
pub async fn json_body<T: DeserializeOwned>(req: &mut Request<Body>) -> Result<T> {
	let body = read_body(req).await?;

	match serde_json::from_slice(&body) {
		Ok(value) => Ok(value),
		Err(err) => Err((StatusCode::BAD_REQUEST, format!("invalid request body: {err}"), err).into()),
	}
}

/// Like [`json_body`], but an empty body yields `T::default()`.
pub async fn optional_json_body<T: DeserializeOwned + Default>(req: &mut Request<Body>) -> Result<T> {
	let body = read_body(req).await?;

	if body.iter().all(u8::is_ascii_whitespace) {
		return Ok(T::default());
	}

	match serde_json::from_slice(&body) {
		Ok(value) => Ok(value),
		Err(err) => Err((StatusCode::BAD_REQUEST, format!("invalid request body: {err}"), err).into()),
	}
}
