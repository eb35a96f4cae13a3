//! Process-wide `tracing` subscriber setup.
//!
//! Filter comes from `RUST_LOG`, then `LOG_LEVEL`, then `info`. Output is JSON
//! lines when `RUST_ENV` is `prod`/`production`, human-readable otherwise.

use std::env;

use tracing_subscriber::EnvFilter;

pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        EnvFilter::try_new(level.to_ascii_lowercase()).unwrap_or_else(|_| EnvFilter::new("info"))
    });
    let production = matches!(env::var("RUST_ENV").as_deref(), Ok("prod" | "production"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    // A subscriber may already be installed (tests, embedding applications).
    let _ = if production { builder.json().try_init() } else { builder.try_init() };
}
