use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::http::RouteError;
use hyper::{Body, Request, Response, StatusCode};
use routerify::Router;

use super::respond;
use crate::api::auth::RequestAuthExt;
use crate::api::error::{ApiError, Result};
use crate::api::ext::RequestExt;
use crate::database::{AccountType, Plan, Strike, Ulid, User};
use crate::global::GlobalState;
use crate::lifecycle::QuotaKind;
use crate::service::{exchanges, users};

/// What anybody may see about a user.
#[derive(Debug, serde::Serialize)]
pub struct PublicProfile {
	pub id: Ulid,
	pub username: String,
	pub follower_count: i64,
	pub account_type: AccountType,
	pub plan: Plan,
	pub rating: f64,
	pub rating_count: i64,
	pub strike_count: i32,
	pub banned: bool,
	pub created_at: DateTime<Utc>,
}

impl PublicProfile {
	pub fn new(user: &User, now: DateTime<Utc>) -> Self {
		Self {
			id: user.id,
			username: user.username.clone(),
			follower_count: user.follower_count,
			account_type: user.account_type,
			plan: user.effective_plan(now),
			rating: user.rating(),
			rating_count: user.rating_count,
			strike_count: user.strike_count,
			banned: user.banned,
			created_at: user.created_at,
		}
	}
}

#[derive(Debug, serde::Serialize)]
pub struct Quota {
	pub daily_limit: i32,
	pub sent_today: i32,
	pub accepted_today: i32,
	pub remaining_requests: i32,
	pub remaining_accepts: i32,
}

/// The caller's own view of their account.
#[derive(Debug, serde::Serialize)]
pub struct OwnProfile {
	#[serde(flatten)]
	pub profile: PublicProfile,
	pub social_id: String,
	pub plan_expires_at: Option<DateTime<Utc>>,
	pub quota: Quota,
	pub strikes: Vec<Strike>,
}

impl OwnProfile {
	pub fn new(user: &User, strikes: Vec<Strike>, now: DateTime<Utc>) -> Self {
		let today = now.date_naive();

		Self {
			profile: PublicProfile::new(user, now),
			social_id: user.social_id.clone(),
			plan_expires_at: user.plan_expires_at,
			quota: Quota {
				daily_limit: user.daily_limit(now),
				sent_today: user.used_today(QuotaKind::Send, today),
				accepted_today: user.used_today(QuotaKind::Accept, today),
				remaining_requests: user.remaining_requests(now),
				remaining_accepts: user.remaining(QuotaKind::Accept, now),
			},
			strikes,
		}
	}
}

async fn me(req: Request<Body>) -> Result<Response<Body>> {
	let global = req.global()?;
	let auth = req.auth()?;
	let now = Utc::now();

	let user = users::profile(&global, auth.user_id()).await?;
	let strikes = users::strikes(&global, user.id).await?;

	Ok(respond(StatusCode::OK, OwnProfile::new(&user, strikes, now)))
}

async fn my_strikes(req: Request<Body>) -> Result<Response<Body>> {
	let global = req.global()?;
	let auth = req.auth()?;

	let strikes = users::strikes(&global, auth.user_id()).await?;

	Ok(respond(StatusCode::OK, strikes))
}

async fn profile(req: Request<Body>) -> Result<Response<Body>> {
	let global = req.global()?;
	req.auth()?;
	let id = req.id_param("id")?;

	let user = users::profile(&global, id).await?;

	Ok(respond(StatusCode::OK, PublicProfile::new(&user, Utc::now())))
}

async fn ratings(req: Request<Body>) -> Result<Response<Body>> {
	let global = req.global()?;
	req.auth()?;
	let id = req.id_param("id")?;

	let ratings = exchanges::ratings(&global, id).await?;

	Ok(respond(StatusCode::OK, ratings))
}

pub fn routes(_: &Arc<GlobalState>) -> Router<Body, RouteError<ApiError>> {
	Router::builder()
		.get("/me", me)
		.get("/me/strikes", my_strikes)
		.get("/:id", profile)
		.get("/:id/ratings", ratings)
		.build()
		.expect("failed to build router")
}
