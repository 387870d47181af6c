//! Lark token broker server binary.

// std
use std::sync::Arc;
// crates.io
use clap::Parser;
use tokio::net::TcpListener;
// self
use lark_token_broker::{
	config::Config,
	obs,
	server::{self, AppState},
};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	obs::init_subscriber()?;

	let config = Config::parse();

	tracing::debug!(?config, "configuration loaded");

	let broker = Arc::new(config.build_broker()?);
	let redirect_uri = config.redirect_uri().transpose()?;

	if redirect_uri.is_none() {
		tracing::warn!("BASE_URL is unset; redirect URIs will be derived from the Host header");
	}

	let state = AppState::new(broker, config.api_key.trim(), redirect_uri);
	let listener = TcpListener::bind(config.socket_addr()).await?;

	server::serve(listener, state).await?;

	Ok(())
}
