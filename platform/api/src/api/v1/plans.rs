use std::sync::Arc;

use common::http::RouteError;
use hyper::{Body, Request, Response, StatusCode};
use routerify::Router;
use serde_json::json;

use super::respond;
use crate::api::error::{ApiError, Result};
use crate::api::ext::RequestExt;
use crate::database::{BillingPeriod, Plan};
use crate::global::GlobalState;

async fn catalogue(req: Request<Body>) -> Result<Response<Body>> {
	let global = req.global()?;
	let payment = &global.config().payment;

	let plans = Plan::ALL
		.into_iter()
		.map(|plan| {
			let prices = match plan {
				Plan::Basic => json!(null),
				Plan::Pro => json!({
					"MONTHLY": payment.price(BillingPeriod::Monthly),
					"YEARLY": payment.price(BillingPeriod::Yearly),
				}),
			};

			json!({
				"plan": plan,
				"daily_limit": plan.daily_limit(),
				"media_kinds": plan.allowed_kinds(),
				"currency": payment.currency,
				"prices": prices,
			})
		})
		.collect::<Vec<_>>();

	Ok(respond(StatusCode::OK, plans))
}

pub fn routes(_: &Arc<GlobalState>) -> Router<Body, RouteError<ApiError>> {
	Router::builder().get("/", catalogue).build().expect("failed to build router")
}
