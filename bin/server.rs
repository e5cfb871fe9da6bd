// AgriCred Scoring Service - Web Server
// REST API with Axum

use agricred_score::api::{cors_layer, router, AppState};
use agricred_score::{
    open_reconciler, BrevoEmailSender, CodeStore, EmailSender, InMemoryCodeStore, LogEmailSender,
    ServiceConfig, VerificationManager,
};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("🌾 AgriCred Scoring Service - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = ServiceConfig::from_env()?;

    // Record store + model
    let reconciler = open_reconciler(&config)?;
    println!("✓ Database opened: {:?}", config.db_path);
    println!("✓ Model loaded:    {:?}", config.model_path);

    // Email delivery
    let sender: Arc<dyn EmailSender> = match &config.email_api_key {
        Some(key) => Arc::new(BrevoEmailSender::new(key.clone(), config.email_sender.clone())),
        None => {
            tracing::warn!("EMAIL_API not set, verification codes will only be logged");
            Arc::new(LogEmailSender)
        }
    };
    let verification = VerificationManager::new(
        Arc::new(InMemoryCodeStore::new()),
        sender,
        chrono::Duration::seconds(config.code_ttl_secs),
    )
    .with_strict_delivery(config.email_strict);
    let verification = Arc::new(verification);

    // Expired codes are rejected on verify; this only bounds memory
    let sweeper = verification.clone();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(std::time::Duration::from_secs(60));
        loop {
            tick.tick().await;
            let purged = sweeper.codes().purge_expired(chrono::Utc::now());
            if purged > 0 {
                tracing::debug!(purged, "expired verification codes removed");
            }
        }
    });

    // Create shared state
    let state = AppState {
        reconciler: Arc::new(reconciler),
        verification,
        login_failure: config.login_failure,
    };

    let app = router(state).layer(cors_layer(&config.cors_origin)?);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    println!("\n🚀 Server running on http://{}", config.bind_addr);
    println!("   CORS origin: {}", config.cors_origin);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .await
        .context("Server stopped unexpectedly")?;

    Ok(())
}
