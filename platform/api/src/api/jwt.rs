use chrono::{DateTime, TimeZone, Utc};
use hmac::{Hmac, Mac};
use jwt::{Claims, Header, RegisteredClaims, SignWithKey, Token, VerifyWithKey};
use sha2::Sha256;

use crate::config::JwtConfig;
use crate::database::{Session, Ulid};

/// The claims of a bearer token. One token per session, the session id is the `jti`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthJwtPayload {
	pub user_id: Ulid,
	pub session_id: Ulid,
	pub expiration: Option<DateTime<Utc>>,
	pub issued_at: DateTime<Utc>,
}

fn timestamp(value: Option<u64>) -> Option<DateTime<Utc>> {
	Utc.timestamp_opt(i64::try_from(value?).ok()?, 0).single()
}

impl AuthJwtPayload {
	fn to_claims(&self) -> Claims {
		Claims::new(RegisteredClaims {
			issuer: None,
			subject: Some(self.user_id.to_string()),
			audience: None,
			expiration: self.expiration.map(|x| x.timestamp() as u64),
			not_before: None,
			issued_at: Some(self.issued_at.timestamp() as u64),
			json_web_token_id: Some(self.session_id.to_string()),
		})
	}

	fn from_claims(claims: &Claims) -> Option<Self> {
		Some(Self {
			user_id: claims.registered.subject.as_deref()?.parse().ok()?,
			session_id: claims.registered.json_web_token_id.as_deref()?.parse().ok()?,
			expiration: timestamp(claims.registered.expiration),
			issued_at: timestamp(claims.registered.issued_at)?,
		})
	}

	pub fn serialize(&self, config: &JwtConfig) -> Option<String> {
		let key = Hmac::<Sha256>::new_from_slice(config.secret.as_bytes()).ok()?;
		let mut claims = self.to_claims();

		claims.registered.issuer = Some(config.issuer.clone());

		claims.sign_with_key(&key).ok()
	}

	pub fn verify(config: &JwtConfig, token: &str, now: DateTime<Utc>) -> Option<Self> {
		let key = Hmac::<Sha256>::new_from_slice(config.secret.as_bytes()).ok()?;
		let token: Token<Header, Claims, _> = token.verify_with_key(&key).ok()?;

		let claims = token.claims();

		if claims.registered.issuer.as_ref() != Some(&config.issuer) {
			return None;
		}

		let payload = Self::from_claims(claims)?;

		if payload.issued_at > now {
			return None;
		}

		if payload.expiration.is_some_and(|exp| exp < now) {
			return None;
		}

		Some(payload)
	}
}

impl From<&Session> for AuthJwtPayload {
	fn from(session: &Session) -> Self {
		AuthJwtPayload {
			user_id: session.user_id,
			session_id: session.id,
			expiration: Some(session.expires_at),
			issued_at: session.last_used_at,
		}
	}
}
