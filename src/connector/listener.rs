//! Broker queue loop for message-driven connectors.

use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::MessageConnector;

/// How often an idle listener re-checks the stop signal.
pub const DEFAULT_LISTEN_TICK: Duration = Duration::from_secs(1);

/// Dispatch inbound messages one at a time until the stop signal is raised
/// or the queue closes. Returns how many messages were dispatched.
///
/// The stop signal is checked before each receive. A message already taken
/// off the queue is always dispatched; messages still queued when the stop
/// signal is observed are left unconsumed.
pub async fn listen<C>(connector: &C, mut inbox: mpsc::Receiver<Value>, tick: Duration) -> usize
where
    C: MessageConnector + ?Sized,
{
    let stop = connector.context().stop.clone();
    let mut dispatched = 0;

    loop {
        if stop.is_raised() {
            info!("Stop signal raised, leaving the broker queue");
            break;
        }

        tokio::select! {
            message = inbox.recv() => {
                let Some(message) = message else {
                    info!("Broker queue closed");
                    break;
                };
                let outcome = connector.process_broker_message(message).await;
                dispatched += 1;
                debug!("Message {} handled: {:?}", dispatched, outcome);
            }
            _ = tokio::time::sleep(tick) => {}
        }
    }

    dispatched
}
