use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::api::AppState;
use crate::distribution::{DistributionState, PublishEvent};

pub async fn websocket_handler(ws: WebSocketUpgrade, State(app): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app))
}

async fn handle_socket(mut socket: WebSocket, app: AppState) {
    // Subscribe before the replay so nothing published in between is lost.
    let mut rx = app.state.subscribe();
    debug!(subscribers = app.state.subscriber_count(), "WebSocket client connected");

    if !send_all(&mut socket, snapshot_frames(&app.state)).await {
        return;
    }

    loop {
        tokio::select! {
            received = rx.recv() => {
                let Some(frames) = frames_for(received, &app.state) else {
                    break;
                };
                if !send_all(&mut socket, frames).await {
                    break;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    // client traffic is ignored; axum answers pings itself
                    Some(Ok(_)) => {}
                }
            }
        }
    }
    debug!("WebSocket client disconnected");
}

async fn send_all(socket: &mut WebSocket, frames: Vec<String>) -> bool {
    for frame in frames {
        if socket.send(Message::Text(frame)).await.is_err() {
            return false;
        }
    }
    true
}

/// Current prices then current opportunities.
fn snapshot_frames(state: &DistributionState) -> Vec<String> {
    PublishEvent::replay(&state.current()).iter().filter_map(encode).collect()
}

/// Frames to forward for one broadcast receive, or `None` once the channel is closed.
/// A lagged receiver gets the full current state instead of the events it missed.
fn frames_for(received: Result<PublishEvent, RecvError>, state: &DistributionState) -> Option<Vec<String>> {
    match received {
        Ok(event) => Some(encode(&event).into_iter().collect()),
        Err(RecvError::Lagged(skipped)) => {
            warn!(skipped, "WebSocket subscriber lagged; resending current state");
            Some(snapshot_frames(state))
        }
        Err(RecvError::Closed) => None,
    }
}

fn encode(event: &PublishEvent) -> Option<String> {
    event
        .to_json()
        .map_err(|e| warn!(error = %e, "Failed to serialize ws event"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::{PriceObservation, SnapshotSet, SymbolSnapshot};
    use chrono::Utc;
    use serde_json::Value;

    fn parse(frame: &str) -> Value {
        serde_json::from_str(frame).unwrap()
    }

    fn publish_btc(state: &DistributionState, cycle: u64) {
        let mut btc = SymbolSnapshot::new("BTCUSDT");
        btc.upsert(PriceObservation::new("ExA", "BTCUSDT", 100.0, Utc::now()).unwrap());
        state.publish(cycle, SnapshotSet::from([("BTCUSDT".to_string(), btc)]), vec![], vec![], Utc::now());
    }

    #[test]
    fn test_connect_replays_prices_then_arbitrage() {
        let state = DistributionState::new(16);
        publish_btc(&state, 1);

        let frames = snapshot_frames(&state);
        assert_eq!(frames.len(), 2);
        let prices = parse(&frames[0]);
        assert_eq!(prices["type"], "prices");
        assert_eq!(prices["data"]["BTCUSDT"]["observations"][0]["exchange"], "ExA");
        let arb = parse(&frames[1]);
        assert_eq!(arb["type"], "arbitrage");
        assert_eq!(arb["data"], Value::Array(vec![]));
    }

    #[tokio::test]
    async fn test_lagged_subscriber_is_resynced() {
        let state = DistributionState::new(2);
        let mut rx = state.subscribe();
        for cycle in 1..=5 {
            publish_btc(&state, cycle);
        }

        let received = rx.recv().await;
        assert!(matches!(received, Err(RecvError::Lagged(_))));
        let frames = frames_for(received, &state).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(parse(&frames[0])["type"], "prices");
        assert_eq!(parse(&frames[1])["type"], "arbitrage");
    }

    #[test]
    fn test_closed_channel_ends_stream() {
        let state = DistributionState::new(4);
        assert!(frames_for(Err(RecvError::Closed), &state).is_none());
    }

    #[test]
    fn test_event_forwarded_as_one_frame() {
        let state = DistributionState::new(4);
        let event = PublishEvent::OpportunitiesUpdated(std::sync::Arc::new(vec![]));
        let frames = frames_for(Ok(event), &state).unwrap();
        assert_eq!(frames, vec![r#"{"type":"arbitrage","data":[]}"#.to_string()]);
    }
}
