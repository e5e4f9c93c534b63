//! Live detection feed viewer.
//!
//! Connects to a SafeFace backend, authenticates with a session token, and
//! prints detection alerts and system notifications as they arrive. After a
//! while it demonstrates a manual reconnect.
//!
//! Run with tracing enabled:
//! ```sh
//! RUST_LOG=debug SAFEFACE_WS=ws://localhost:8000/ws/live SAFEFACE_TOKEN=... \
//!     cargo run --example live_feed --features tracing
//! ```

use std::sync::Arc;
use std::time::Duration;

use safeface_client::{
    Config, ConnectionManager, EventHandlers, MemoryTokenStore, ServerEvent, Severity, TokenStore,
};
use secrecy::SecretString;
use tokio::time::sleep;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let endpoint = std::env::var("SAFEFACE_WS")
        .unwrap_or_else(|_| "ws://localhost:8000/ws/live".to_owned());

    let store = Arc::new(MemoryTokenStore::new());
    if let Ok(token) = std::env::var("SAFEFACE_TOKEN") {
        store.set_token(SecretString::from(token));
    }

    let handlers = EventHandlers::new()
        .on_open(|| info!("connected to live feed"))
        .on_close(|| warn!("live feed closed"))
        .on_error(|e| warn!(error = %e, "live feed error"))
        .on_message(|payload| match ServerEvent::parse(payload) {
            Ok(ServerEvent::DetectionAlert(alert)) => {
                let who = alert.person_name.as_deref().unwrap_or("unknown face");
                info!(
                    camera = %alert.camera_name,
                    confidence = alert.confidence,
                    at = %alert.timestamp,
                    "detection: {who}"
                );
            }
            Ok(ServerEvent::Notification(notification)) => match notification.level {
                Severity::Error | Severity::Warning => warn!("{}", notification.message),
                Severity::Info | Severity::Success => info!("{}", notification.message),
                _ => info!("{}", notification.message),
            },
            Ok(_) => info!(payload, "unrecognized event type"),
            Err(e) => warn!(error = %e, payload, "unparseable payload"),
        });

    let manager = ConnectionManager::new(
        Some(endpoint),
        Config::default(),
        handlers,
        Some(store as Arc<dyn TokenStore>),
    )?;

    manager.connect();

    sleep(Duration::from_secs(30)).await;
    info!(state = ?manager.connection_state(), "forcing a manual reconnect");
    manager.reconnect();

    tokio::signal::ctrl_c().await?;
    manager.disconnect();
    Ok(())
}
