use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tracing::warn;

use shared::protocol::{
    ClientGameMessage, MovementIntent, ServerGameMessage, LATEST_PROTOCOL_VERSION,
};
use shared::PlayerId;

use crate::error::ServerError;
use crate::room::{InputEvent, Room};
use crate::state::AppState;

pub async fn handle_game_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path((room_id, player_id)): Path<(String, PlayerId)>,
) -> Response {
    let room = match state.get_room(&room_id).await {
        Some(room) => room,
        None => return ServerError::NotFound(format!("no room {room_id}")).into_response(),
    };

    if !room.is_running().await {
        return ServerError::NotFound("room has not started its game yet".to_string())
            .into_response();
    }

    if !room.roster.read().await.contains_key(&player_id) {
        return ServerError::Authorization("player is not in this room's roster".to_string())
            .into_response();
    }

    ws.on_upgrade(move |socket| async move {
        let result = run_game_session(socket, Arc::clone(&room), player_id).await;
        if let Err(err) = result {
            warn!(room_id = %room.room_id, player_id, error = %err, "game session ended with an error");
        }
    })
}

/// Bridges one player's game socket to the room's tick task: forwards
/// decoded movement/throw intents upstream, relays broadcast tick frames
/// downstream. Runs until the socket closes or the room's channels do.
async fn run_game_session(
    socket: WebSocket,
    room: Arc<Room>,
    player_id: PlayerId,
) -> Result<(), axum::Error> {
    let (mut sink, mut stream) = socket.split();

    let (players_order, balls_order, initial_state, mut broadcast_rx, input_tx) = {
        let game = room.game.read().await;
        let handle = game
            .as_ref()
            .expect("room is Running, so its GameHandle is present");
        (
            handle.players_order.clone(),
            handle.balls_order.clone(),
            handle.snapshot.read().await.clone(),
            handle.broadcast_tx.subscribe(),
            handle.input_tx.clone(),
        )
    };

    let initial = ServerGameMessage::InitialState {
        protocol_version: LATEST_PROTOCOL_VERSION,
        player_id,
        state: initial_state,
        players_order,
        balls_order,
        config: room.config.clone(),
    };
    let initial_json = serde_json::to_string(&initial).expect("ServerGameMessage always serializes");
    sink.send(Message::Text(initial_json)).await?;

    loop {
        tokio::select! {
            incoming = stream.next() => {
                let Some(incoming) = incoming else { break };
                match incoming {
                    Ok(Message::Binary(bytes)) => match MovementIntent::decode(&bytes) {
                        Ok(intent) => {
                            let _ = input_tx.send(InputEvent::Movement {
                                player_id,
                                direction: intent.direction,
                            });
                        }
                        Err(err) => warn!(player_id, error = %err, "dropping malformed movement frame"),
                    },
                    Ok(Message::Text(text)) => match serde_json::from_str::<ClientGameMessage>(&text) {
                        Ok(ClientGameMessage::Throw) => {
                            let _ = input_tx.send(InputEvent::Throw { player_id });
                        }
                        Err(err) => warn!(player_id, error = %err, "dropping malformed game message"),
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(_) => break,
                }
            }
            frame = broadcast_rx.recv() => {
                match frame {
                    Ok(bytes) => {
                        if sink.send(Message::Binary(bytes)).await.is_err() {
                            break;
                        }
                    }
                    // A lagging receiver just means this client missed a tick or
                    // two; the next frame resynchronizes it.
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    // Pause rather than remove: spec.md §5 keeps the room alive and lets the
    // same player_id reconnect later to resume control.
    let _ = input_tx.send(InputEvent::Disconnect { player_id });
    Ok(())
}
