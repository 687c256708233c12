// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{net::SocketAddr, path::PathBuf};

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use onboarding_server::{
    api::router,
    config::{
        env_optional, env_or_default, DATABASE_FILE, DATA_DIR_ENV, DEFAULT_DATA_DIR,
        WEBHOOK_SECRET_ENV,
    },
    custody::CustodyClient,
    state::AppState,
    storage::OnboardingDb,
    wallets::matrix_from_env,
};

#[tokio::main]
async fn main() {
    init_tracing();

    let data_dir = env_or_default(DATA_DIR_ENV, DEFAULT_DATA_DIR);
    let db_path = PathBuf::from(&data_dir).join(DATABASE_FILE);
    let db = OnboardingDb::open(&db_path).expect("Failed to open onboarding database");
    info!(path = %db_path.display(), "onboarding database opened");

    let matrix = matrix_from_env();
    info!(pairs = matrix.len(), "wallet matrix selected");

    let mut state = AppState::new(db, matrix);

    if CustodyClient::is_configured() {
        let custody = CustodyClient::from_env().expect("Failed to build custody client");
        state = state.with_custody(custody);
    } else {
        info!("custody configuration incomplete, wallet provisioning disabled");
    }

    match env_optional(WEBHOOK_SECRET_ENV) {
        Some(secret) => state = state.with_webhook_secret(secret.into_bytes()),
        None => warn!("{WEBHOOK_SECRET_ENV} not set, identity webhook will reject all signals"),
    }

    let app = router(state);

    let host = env_or_default("HOST", "0.0.0.0");
    let port: u16 = env_or_default("PORT", "8080").parse().unwrap_or(8080);
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .expect("Failed to parse bind address");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    info!("onboarding server listening on http://{addr} (docs at /docs)");

    axum::serve(listener, app).await.expect("Server failed");
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if env_or_default("LOG_FORMAT", "pretty") == "json" {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
