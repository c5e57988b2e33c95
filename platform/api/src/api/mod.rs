use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use common::http::RouteError;
use common::make_response;
use common::prelude::FutureTimeout;
use hyper::server::conn::Http;
use hyper::{Body, StatusCode};
use routerify::{RequestServiceBuilder, Router};
use serde_json::json;
use tokio::net::TcpSocket;
use tokio::select;

use self::error::ApiError;
use crate::global::GlobalState;

mod auth;
mod error;
mod ext;
mod jwt;
mod middleware;
pub mod v1;

pub fn routes(global: &Arc<GlobalState>) -> Router<Body, RouteError<ApiError>> {
	let weak = Arc::downgrade(global);
	Router::builder()
		.data(weak)
		.err_handler_with_info(common::http::error_handler::<ApiError>)
		// The CORS middleware adds the CORS headers to the response
		.middleware(middleware::cors::cors_middleware(global))
		// The auth middleware resolves a bearer token into the request context.
		// Requests without a token pass through, handlers that need a user ask for it.
		.middleware(middleware::auth::auth_middleware(global))
		.scope("/v1", v1::routes(global))
		.any(|_| async move {
			Ok(make_response!(
				StatusCode::NOT_FOUND,
				json!({
					"success": false,
					"code": "not_found",
					"message": "route not found",
				})
			))
		})
		.build()
		.expect("failed to build router")
}

pub async fn run(global: Arc<GlobalState>) -> anyhow::Result<()> {
	let config = &global.config().api;
	tracing::info!("API listening on {}", config.bind_address);
	let socket = if config.bind_address.is_ipv6() {
		TcpSocket::new_v6()?
	} else {
		TcpSocket::new_v4()?
	};

	socket.set_reuseaddr(true)?;
	socket.set_reuseport(true)?;
	socket.bind(config.bind_address)?;
	let listener = socket.listen(1024)?;

	let tls_acceptor = if let Some(tls) = &config.tls {
		tracing::info!("TLS enabled");
		let cert = tokio::fs::read(&tls.cert).await.context("failed to read api ssl cert")?;
		let key = tokio::fs::read(&tls.key).await.context("failed to read api ssl private key")?;

		let key = rustls::PrivateKey(
			rustls_pemfile::pkcs8_private_keys(&mut io::BufReader::new(io::Cursor::new(key)))?
				.into_iter()
				.next()
				.context("no private key found in api ssl private key file")?,
		);

		let certs = rustls_pemfile::certs(&mut io::BufReader::new(io::Cursor::new(cert)))?
			.into_iter()
			.map(rustls::Certificate)
			.collect();

		Some(Arc::new(tokio_rustls::TlsAcceptor::from(Arc::new(
			rustls::ServerConfig::builder()
				.with_safe_defaults()
				.with_no_client_auth()
				.with_single_cert(certs, key)?,
		))))
	} else {
		None
	};

	// The router only holds a Weak reference to the global state, so an open
	// keep-alive connection does not keep the process alive during shutdown.
	let request_service = RequestServiceBuilder::new(routes(&global)).expect("failed to build request service");

	loop {
		select! {
			_ = global.ctx().done() => {
				return Ok(());
			},
			r = listener.accept() => {
				let (socket, addr) = r?;

				let tls_acceptor = tls_acceptor.clone();
				let service = request_service.build(addr);

				tracing::debug!("Accepted connection from {}", addr);

				tokio::spawn(async move {
					if let Some(tls_acceptor) = tls_acceptor {
						let Ok(Ok(socket)) = tls_acceptor.accept(socket).timeout(Duration::from_secs(5)).await else {
							return;
						};
						tracing::debug!("TLS handshake complete");
						Http::new().serve_connection(
							socket,
							service,
						).with_upgrades().await.ok();
					} else {
						Http::new().serve_connection(
							socket,
							service,
						).with_upgrades().await.ok();
					}
				});
			},
		}
	}
}
