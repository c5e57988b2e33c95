use hyper::StatusCode;

use crate::http::{default_code, RouteError, ShouldLog};

#[derive(Debug, thiserror::Error)]
#[error("boom")]
struct Boom;

async fn body_json(res: hyper::Response<hyper::Body>) -> serde_json::Value {
	let bytes = hyper::body::to_bytes(res.into_body()).await.expect("failed to read body");
	serde_json::from_slice(&bytes).expect("body is json")
}

#[tokio::test]
async fn status_tuple_uses_default_code() {
	let err: RouteError<Boom> = (StatusCode::NOT_FOUND, "no such exchange").into();

	assert_eq!(err.code(), "not_found");
	assert_eq!(err.should_log(), ShouldLog::No);

	let res = err.response();
	assert_eq!(res.status(), StatusCode::NOT_FOUND);

	let body = body_json(res).await;
	assert_eq!(body["success"], false);
	assert_eq!(body["code"], "not_found");
	assert_eq!(body["message"], "no such exchange");
}

#[tokio::test]
async fn explicit_code_and_source() {
	let err = RouteError::<Boom>::new(StatusCode::TOO_MANY_REQUESTS, "quota_exceeded", "daily limit reached")
		.with_source(Some(Boom));

	assert_eq!(err.should_log(), ShouldLog::Debug);
	assert_eq!(err.to_string(), "quota_exceeded: boom");

	let body = body_json(err.response()).await;
	assert_eq!(body["code"], "quota_exceeded");
}

#[test]
fn server_errors_always_log() {
	let err: RouteError<Boom> = "database went away".into();
	assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
	assert_eq!(err.should_log(), ShouldLog::Yes);
	assert_eq!(default_code(StatusCode::BAD_GATEWAY), "internal");
}
