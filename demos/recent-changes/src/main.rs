//! Recent changes demo binary
//!
//! Follows the `recentchange` stream and logs one line per edit. Reads its
//! settings from `EVENTSTREAMS_*` environment variables; set
//! `EVENTSTREAMS_SINCE` to resume from an earlier position.
//!
//! Stops on Ctrl+C and prints the position to resume from.

use eventstreams_client::EventStreamsClient;
use eventstreams_events::{RecentChangeEvent, RECENT_CHANGE};
use std::future::Future;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "recent_changes=info,eventstreams_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut client = EventStreamsClient::from_env()?;
    if let Ok(since) = std::env::var("EVENTSTREAMS_SINCE") {
        client = client.with_since(since);
    }

    info!(base_url = %client.config().base_url, "Following {RECENT_CHANGE}");

    let shutdown = wait_for_shutdown(tokio::signal::ctrl_c());

    client
        .subscribe_until(
            RECENT_CHANGE,
            |event: RecentChangeEvent| {
                info!(
                    wiki = %event.wiki,
                    kind = %event.kind,
                    user = %event.user,
                    bot = event.bot,
                    "{}",
                    event.title
                );
            },
            shutdown,
        )
        .await?;

    if let Some(position) = client.last_position() {
        println!("Resume with EVENTSTREAMS_SINCE={position}");
    }

    Ok(())
}

/// Resolve once `signal` fires. If the signal handler cannot be installed,
/// never resolve, so the subscription keeps running.
async fn wait_for_shutdown(signal: impl Future<Output = std::io::Result<()>>) {
    if let Err(e) = signal.await {
        warn!(error = %e, "Ctrl+C handler unavailable, running until the stream ends");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_signal_resolves_shutdown() {
        let shutdown = wait_for_shutdown(async { Ok(()) });
        assert!(
            tokio::time::timeout(Duration::from_millis(100), shutdown)
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_failed_signal_handler_never_shuts_down() {
        let shutdown = wait_for_shutdown(async {
            Err(std::io::Error::other("signal driver unavailable"))
        });
        assert!(
            tokio::time::timeout(Duration::from_millis(50), shutdown)
                .await
                .is_err()
        );
    }
}
