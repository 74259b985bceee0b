use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use acua_types::api::Session;
use acua_types::events::{GatewayCommand, GatewayEvent, Topic};

use crate::dispatcher::Dispatcher;

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Handle a WebSocket whose bearer token was already checked at the HTTP
/// upgrade.
pub async fn handle_connection(socket: WebSocket, dispatcher: Dispatcher, session: Session) {
    let (mut sender, receiver) = socket.split();
    let user_id = session.user_id;

    info!("{} ({}) connected to gateway", session.display_name, user_id);

    let ready = GatewayEvent::Ready {
        user_id,
        display_name: session.display_name.clone(),
    };
    if send_event(&mut sender, &ready).await.is_err() {
        return;
    }

    let (conn_id, user_rx) = dispatcher.register_user_channel(user_id).await;

    run_connection_loop(sender, receiver, &dispatcher, user_rx).await;

    dispatcher.unregister_user_channel(user_id, conn_id).await;
    info!("{} ({}) disconnected from gateway", session.display_name, user_id);
}

async fn run_connection_loop(
    mut sender: SplitSink<WebSocket, Message>,
    mut receiver: SplitStream<WebSocket>,
    dispatcher: &Dispatcher,
    mut user_rx: mpsc::UnboundedReceiver<GatewayEvent>,
) {
    // Nothing is watched until the client subscribes
    let mut subscription = dispatcher.subscribe(Vec::<Topic>::new());
    let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<GatewayCommand>();

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_recv = pong_received.clone();

    // Read commands from client; subscription changes are applied by the
    // send loop, which owns the subscription.
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<GatewayCommand>(text.as_str()) {
                    Ok(cmd) => {
                        if cmd_tx.send(cmd).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("bad gateway command: {} -- raw: {}", e, truncate(text.as_str(), 200));
                    }
                },
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.tick().await;
    let mut missed_heartbeats: u8 = 0;

    loop {
        tokio::select! {
            event = subscription.recv() => {
                let Some(event) = event else { break };
                if send_event(&mut sender, &event).await.is_err() {
                    break;
                }
            }
            event = user_rx.recv() => {
                // None: a newer connection for this user took over
                let Some(event) = event else { break };
                if send_event(&mut sender, &event).await.is_err() {
                    break;
                }
            }
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(GatewayCommand::Subscribe { topics }) => {
                        subscription.add(topics);
                        debug!("now watching {} topics", subscription.topics().len());
                    }
                    Some(GatewayCommand::Unsubscribe { topics }) => {
                        subscription.remove(topics);
                        debug!("now watching {} topics", subscription.topics().len());
                    }
                    None => break,
                }
            }
            _ = heartbeat.tick() => {
                if pong_received.swap(false, Ordering::Acquire) {
                    missed_heartbeats = 0;
                } else {
                    missed_heartbeats += 1;
                    if missed_heartbeats >= 2 {
                        warn!("Heartbeat timeout (missed {} pongs), dropping connection", missed_heartbeats);
                        break;
                    }
                }
                if sender.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
            }
            _ = &mut recv_task => break,
        }
    }

    recv_task.abort();
}

async fn send_event(
    sender: &mut SplitSink<WebSocket, Message>,
    event: &GatewayEvent,
) -> Result<(), axum::Error> {
    let text = match serde_json::to_string(event) {
        Ok(text) => text,
        Err(e) => {
            error!("Failed to encode gateway event: {}", e);
            return Ok(());
        }
    };
    sender.send(Message::Text(text.into())).await
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
