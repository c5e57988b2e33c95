use chrono::{DateTime, Utc};

use super::notifications::{notify, Notice};
use super::{load_active_user, load_user};
use crate::database::{Exchange, ExchangeStatus, NotificationKind, Rating, Side, Ulid, MAX_STRIKES};
use crate::error::{ExchangeError, Result};
use crate::global::GlobalState;
use crate::store::IssuedStrike;

const MISSED_DEADLINE: &str = "Did not post the shoutout before the exchange deadline";

async fn load(global: &GlobalState, id: Ulid) -> Result<Exchange> {
	global.store().exchange_by_id(id).await?.ok_or(ExchangeError::ExchangeNotFound)
}

/// Expires an overdue exchange and issues its strikes.
///
/// Returns `None` if the exchange was not overdue or somebody else settled it first.
pub(crate) async fn settle(global: &GlobalState, mut exchange: Exchange, now: DateTime<Utc>) -> Result<Option<Vec<IssuedStrike>>> {
	let Some(sides) = exchange.settle(now) else {
		return Ok(None);
	};

	let offenders = sides.iter().map(|side| exchange.participant(*side)).collect::<Vec<_>>();

	let Some(issued) = global
		.store()
		.settle_exchange(&exchange, &offenders, MISSED_DEADLINE, now)
		.await?
	else {
		return Ok(None);
	};

	tracing::info!(
		exchange_id = %exchange.id,
		offenders = offenders.len(),
		strikes = issued.len(),
		"exchange expired"
	);

	for side in Side::BOTH {
		let message = match exchange.has_posted(side) {
			true => "Your exchange expired because your partner did not post in time",
			false => "Your exchange expired before you posted your shoutout",
		};

		notify(
			global,
			exchange.participant(side),
			Notice::new(NotificationKind::ExchangeExpired, "Exchange expired", message)
				.from_user(exchange.counterpart(side))
				.about(exchange.id),
			now,
		)
		.await;
	}

	for strike in &issued {
		announce_strike(global, strike, now).await;
	}

	Ok(Some(issued))
}

async fn announce_strike(global: &GlobalState, issued: &IssuedStrike, now: DateTime<Utc>) {
	let user_id = issued.user.id;
	let number = issued.strike.strike_number;

	tracing::info!(%user_id, strike = number, banned = issued.banned, "strike issued");

	notify(
		global,
		user_id,
		Notice::new(
			NotificationKind::StrikeAdded,
			"Strike received",
			format!("You received strike {number} of {MAX_STRIKES} for missing an exchange deadline"),
		)
		.about(issued.strike.id),
		now,
	)
	.await;

	if number == MAX_STRIKES - 1 {
		notify(
			global,
			user_id,
			Notice::new(
				NotificationKind::StrikeWarning,
				"Final warning",
				"One more missed exchange will permanently ban your account",
			),
			now,
		)
		.await;
	}

	if issued.banned {
		tracing::warn!(%user_id, "account banned after reaching the strike limit");

		notify(
			global,
			user_id,
			Notice::new(
				NotificationKind::AccountBanned,
				"Account banned",
				format!("Your account was banned after {MAX_STRIKES} strikes"),
			),
			now,
		)
		.await;
	}
}

/// Settles `exchange` first if it is overdue.
pub(crate) async fn refresh(global: &GlobalState, exchange: Exchange, now: DateTime<Utc>) -> Result<Exchange> {
	if !exchange.is_overdue(now) {
		return Ok(exchange);
	}

	let id = exchange.id;
	settle(global, exchange, now).await?;
	load(global, id).await
}

pub async fn get(global: &GlobalState, actor_id: Ulid, id: Ulid, now: DateTime<Utc>) -> Result<Exchange> {
	let exchange = load(global, id).await?;

	if exchange.side_of(actor_id).is_none() {
		return Err(ExchangeError::ExchangeNotFound);
	}

	refresh(global, exchange, now).await
}

pub async fn list(global: &GlobalState, actor_id: Ulid, now: DateTime<Utc>) -> Result<Vec<Exchange>> {
	let exchanges = global.store().exchanges_for_user(actor_id).await?;

	let mut refreshed = Vec::with_capacity(exchanges.len());
	for exchange in exchanges {
		refreshed.push(refresh(global, exchange, now).await?);
	}

	Ok(refreshed)
}

pub async fn submit_proof(global: &GlobalState, actor_id: Ulid, id: Ulid, url: String, now: DateTime<Utc>) -> Result<Exchange> {
	let actor = load_active_user(global, actor_id).await?;
	let mut exchange = get(global, actor_id, id, now).await?;

	let side = exchange.submit_proof(actor_id, url.clone(), now)?;

	let Some(exchange) = global.store().record_proof(id, side, &url, now).await? else {
		// Lost a race with another proof or the deadline.
		let current = load(global, id).await?;
		return Err(match current.status {
			_ if current.has_posted(side) => ExchangeError::AlreadyPosted,
			ExchangeStatus::Expired => ExchangeError::ExchangeExpired,
			ExchangeStatus::Pending if current.is_overdue(now) => ExchangeError::ExchangeExpired,
			status => ExchangeError::ExchangeNotPending(status),
		});
	};

	tracing::info!(exchange_id = %exchange.id, user_id = %actor_id, ?side, "proof posted");

	let counterpart = exchange.counterpart(side);

	notify(
		global,
		counterpart,
		Notice::new(
			NotificationKind::ProofPosted,
			"Shoutout posted",
			format!("{} posted their shoutout", actor.username),
		)
		.from_user(actor_id)
		.about(exchange.id),
		now,
	)
	.await;

	if exchange.status == ExchangeStatus::Completed {
		tracing::info!(exchange_id = %exchange.id, "exchange completed");

		for side in Side::BOTH {
			notify(
				global,
				exchange.participant(side),
				Notice::new(
					NotificationKind::ExchangeCompleted,
					"Exchange completed",
					"Both shoutouts are live. Rate your partner to help the community",
				)
				.from_user(exchange.counterpart(side))
				.about(exchange.id),
				now,
			)
			.await;
		}
	}

	Ok(exchange)
}

pub async fn rate(
	global: &GlobalState,
	actor_id: Ulid,
	id: Ulid,
	stars: i32,
	comment: Option<String>,
	now: DateTime<Utc>,
) -> Result<Rating> {
	let actor = load_active_user(global, actor_id).await?;
	let exchange = get(global, actor_id, id, now).await?;

	let rating = Rating::submit(&exchange, actor_id, stars, comment, now)?;

	if !global.store().insert_rating(&rating).await? {
		return Err(ExchangeError::AlreadyRated);
	}

	tracing::info!(exchange_id = %exchange.id, rater_id = %actor_id, rated_id = %rating.rated_id, stars, "rating submitted");

	if rating.is_low() {
		notify(
			global,
			rating.rated_id,
			Notice::new(
				NotificationKind::LowRating,
				"Low rating received",
				format!("{} rated your exchange {} out of 5", actor.username, rating.stars),
			)
			.from_user(actor_id)
			.about(exchange.id),
			now,
		)
		.await;
	}

	Ok(rating)
}

/// Sends the expiring soon reminder for `exchange` to every side that has not posted yet.
pub(crate) async fn remind(global: &GlobalState, exchange: &Exchange, now: DateTime<Utc>) -> Result<bool> {
	if !global.store().mark_reminded(exchange.id).await? {
		return Ok(false);
	}

	let hours_left = (exchange.expires_at - now).num_hours().max(1);

	for side in exchange.missing_sides() {
		let partner = load_user(global, exchange.counterpart(side)).await?;

		notify(
			global,
			exchange.participant(side),
			Notice::new(
				NotificationKind::ExpiringSoon,
				"Exchange expiring soon",
				format!(
					"Your exchange with {} expires in {} hours. Please post now!",
					partner.username, hours_left
				),
			)
			.from_user(partner.id)
			.about(exchange.id),
			now,
		)
		.await;
	}

	tracing::debug!(exchange_id = %exchange.id, hours_left, "reminder sent");

	Ok(true)
}

pub async fn ratings(global: &GlobalState, user_id: Ulid) -> Result<Vec<Rating>> {
	load_user(global, user_id).await?;
	Ok(global.store().ratings_for_user(user_id).await?)
}
