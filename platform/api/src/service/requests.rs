use chrono::{DateTime, Utc};

use super::notifications::{notify, Notice};
use super::{load_active_user, load_user};
use crate::database::{Exchange, NotificationKind, RequestStatus, ShoutoutRequest, Ulid};
use crate::error::{ExchangeError, Result};
use crate::global::GlobalState;
use crate::store::AcceptOutcome;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct NewRequest {
	pub receiver_id: Ulid,
	pub media_id: Ulid,
	#[serde(default)]
	pub message: Option<String>,
}

/// The media the receiver offers back when accepting.
#[derive(Debug, Clone, Copy, serde::Deserialize)]
pub struct AcceptRequest {
	pub media_id: Ulid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mailbox {
	Sent,
	Received,
}

pub async fn create(global: &GlobalState, sender_id: Ulid, input: NewRequest, now: DateTime<Utc>) -> Result<ShoutoutRequest> {
	let mut sender = load_active_user(global, sender_id).await?;
	let receiver = load_user(global, input.receiver_id).await?;
	let media = global
		.store()
		.media_by_id(input.media_id)
		.await?
		.ok_or(ExchangeError::MediaNotFound)?;

	let request = ShoutoutRequest::open(
		&mut sender,
		&receiver,
		&media,
		input.message,
		now,
		global.config().exchange.request_ttl(),
	)?;

	let limit = sender.daily_limit(now);
	if !global.store().create_request(&request, now, limit).await? {
		return Err(ExchangeError::QuotaExceeded { limit });
	}

	tracing::info!(
		request_id = %request.id,
		sender_id = %request.sender_id,
		receiver_id = %request.receiver_id,
		kind = ?request.media_kind,
		"request sent"
	);

	notify(
		global,
		receiver.id,
		Notice::new(
			NotificationKind::RequestReceived,
			"New shoutout request",
			format!("{} wants to exchange shoutouts with you", sender.username),
		)
		.from_user(sender.id)
		.about(request.id),
		now,
	)
	.await;

	Ok(request)
}

/// Expires `request` if it is overdue.
pub(crate) async fn refresh(global: &GlobalState, mut request: ShoutoutRequest, now: DateTime<Utc>) -> Result<ShoutoutRequest> {
	if !request.is_overdue(now) {
		return Ok(request);
	}

	if global
		.store()
		.transition_request(request.id, RequestStatus::Pending, RequestStatus::Expired, now)
		.await?
	{
		request.expire(now);
		announce_expiry(global, &request, now).await;
		return Ok(request);
	}

	load(global, request.id).await
}

pub(crate) async fn announce_expiry(global: &GlobalState, request: &ShoutoutRequest, now: DateTime<Utc>) {
	tracing::info!(request_id = %request.id, "request expired unanswered");

	notify(
		global,
		request.sender_id,
		Notice::new(
			NotificationKind::RequestExpired,
			"Request expired",
			"Your shoutout request expired before it was answered",
		)
		.from_user(request.receiver_id)
		.about(request.id),
		now,
	)
	.await;
}

async fn load(global: &GlobalState, id: Ulid) -> Result<ShoutoutRequest> {
	global.store().request_by_id(id).await?.ok_or(ExchangeError::RequestNotFound)
}

pub async fn get(global: &GlobalState, actor_id: Ulid, id: Ulid, now: DateTime<Utc>) -> Result<ShoutoutRequest> {
	let request = load(global, id).await?;

	if !request.involves(actor_id) {
		return Err(ExchangeError::RequestNotFound);
	}

	refresh(global, request, now).await
}

pub async fn list(global: &GlobalState, actor_id: Ulid, mailbox: Mailbox, now: DateTime<Utc>) -> Result<Vec<ShoutoutRequest>> {
	let requests = match mailbox {
		Mailbox::Sent => global.store().requests_sent(actor_id).await?,
		Mailbox::Received => global.store().requests_received(actor_id).await?,
	};

	let mut refreshed = Vec::with_capacity(requests.len());
	for request in requests {
		refreshed.push(refresh(global, request, now).await?);
	}

	Ok(refreshed)
}

/// Error for a request another caller answered between our read and our write.
async fn lost_race(global: &GlobalState, id: Ulid) -> ExchangeError {
	match load(global, id).await {
		Ok(request) if request.status == RequestStatus::Expired => ExchangeError::RequestExpired,
		Ok(request) => ExchangeError::RequestNotPending(request.status),
		Err(err) => err,
	}
}

/// Accepts a request, offering the acceptor's `media_id` in return.
pub async fn accept(
	global: &GlobalState,
	actor_id: Ulid,
	id: Ulid,
	media_id: Ulid,
	now: DateTime<Utc>,
) -> Result<(ShoutoutRequest, Exchange)> {
	let mut request = get(global, actor_id, id, now).await?;
	let mut receiver = load_active_user(global, actor_id).await?;
	let sender = load_user(global, request.sender_id).await?;
	let media = global.store().media_by_id(media_id).await?.ok_or(ExchangeError::MediaNotFound)?;

	let exchange = request.accept(&mut receiver, &sender, &media, now, global.config().exchange.exchange_window())?;

	let limit = receiver.daily_limit(now);
	match global.store().accept_request(&request, &exchange, now, limit).await? {
		AcceptOutcome::Accepted => {}
		AcceptOutcome::NotPending => return Err(lost_race(global, id).await),
		AcceptOutcome::QuotaExceeded => return Err(ExchangeError::QuotaExceeded { limit }),
	}

	tracing::info!(
		request_id = %request.id,
		exchange_id = %exchange.id,
		expires_at = %exchange.expires_at,
		"request accepted"
	);

	notify(
		global,
		sender.id,
		Notice::new(
			NotificationKind::RequestAccepted,
			"Request accepted",
			format!(
				"{} accepted your shoutout request. Post your shoutout within {} hours",
				receiver.username,
				global.config().exchange.exchange_window().num_hours()
			),
		)
		.from_user(receiver.id)
		.about(exchange.id),
		now,
	)
	.await;

	Ok((request, exchange))
}

pub async fn reject(global: &GlobalState, actor_id: Ulid, id: Ulid, now: DateTime<Utc>) -> Result<ShoutoutRequest> {
	let mut request = get(global, actor_id, id, now).await?;
	let actor = load_active_user(global, actor_id).await?;

	request.reject(&actor, now)?;

	if !global
		.store()
		.transition_request(request.id, RequestStatus::Pending, RequestStatus::Rejected, now)
		.await?
	{
		return Err(lost_race(global, id).await);
	}

	tracing::info!(request_id = %request.id, "request rejected");

	notify(
		global,
		request.sender_id,
		Notice::new(
			NotificationKind::RequestRejected,
			"Request declined",
			format!("{} declined your shoutout request", actor.username),
		)
		.from_user(actor.id)
		.about(request.id),
		now,
	)
	.await;

	Ok(request)
}
