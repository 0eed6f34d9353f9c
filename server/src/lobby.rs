use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tracing::{info, warn};

use shared::protocol::{ClientLobbyMessage, RoomSummary, ServerLobbyMessage};
use shared::PlayerId;

use crate::room::Room;
use crate::state::AppState;

/// Rooms are sized to whatever roster the creator assembles; there is no
/// hard room-size cap in spec.md, so `max_players` in `rooms_list` just
/// reports the current headcount as both fields.
pub async fn handle_lobby_ws(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| async move {
        if let Err(err) = run_lobby_session(socket, state).await {
            warn!(error = %err, "lobby session ended with an error");
        }
    })
}

async fn run_lobby_session(
    socket: WebSocket,
    state: AppState,
) -> Result<(), axum::Error> {
    let (mut sink, mut stream) = socket.split();
    let mut joined: Option<(Arc<Room>, PlayerId)> = None;
    let mut lobby_rx: Option<broadcast::Receiver<ServerLobbyMessage>> = None;

    loop {
        let next_broadcast = async {
            match lobby_rx.as_mut() {
                Some(rx) => rx.recv().await.ok(),
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            incoming = stream.next() => {
                let Some(incoming) = incoming else { break };
                let text = match incoming {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Close(_)) => break,
                    Ok(_) => continue,
                    Err(_) => break,
                };

                let client_msg: ClientLobbyMessage = match serde_json::from_str(&text) {
                    Ok(msg) => msg,
                    Err(err) => {
                        let reply = ServerLobbyMessage::JoinFailed {
                            error: format!("malformed lobby message: {err}"),
                        };
                        send_json(&mut sink, &reply).await?;
                        continue;
                    }
                };

                handle_client_message(client_msg, &state, &mut joined, &mut lobby_rx, &mut sink).await?;
            }
            broadcast_msg = next_broadcast => {
                if let Some(msg) = broadcast_msg {
                    send_json(&mut sink, &msg).await?;
                }
            }
        }
    }

    Ok(())
}

async fn handle_client_message(
    client_msg: ClientLobbyMessage,
    state: &AppState,
    joined: &mut Option<(Arc<Room>, PlayerId)>,
    lobby_rx: &mut Option<broadcast::Receiver<ServerLobbyMessage>>,
    sink: &mut (impl futures_util::Sink<Message, Error = axum::Error> + Unpin),
) -> Result<(), axum::Error> {
    match client_msg {
        ClientLobbyMessage::CreateRoom { player_name } => {
            let (room, player_id) = state.create_room(player_name).await;
            info!(room_id = %room.room_id, player_id, "room created");
            let players = room.roster_snapshot().await;
            send_json(
                sink,
                &ServerLobbyMessage::RoomCreated {
                    room_id: room.room_id.clone(),
                    player_id,
                    players,
                },
            )
            .await?;
            *lobby_rx = Some(room.lobby_tx.subscribe());
            *joined = Some((room, player_id));
        }

        ClientLobbyMessage::JoinRoom { room_id, player_name } => match state.get_room(&room_id).await {
            Some(room) => match room.join(player_name).await {
                Ok((player_id, players)) => {
                    send_json(
                        sink,
                        &ServerLobbyMessage::JoinSuccessful {
                            room_id: room.room_id.clone(),
                            player_id,
                            players: players.clone(),
                        },
                    )
                    .await?;
                    let _ = room
                        .lobby_tx
                        .send(ServerLobbyMessage::PlayersUpdated { players });
                    *lobby_rx = Some(room.lobby_tx.subscribe());
                    *joined = Some((room, player_id));
                }
                Err(error) => {
                    send_json(sink, &ServerLobbyMessage::JoinFailed { error }).await?;
                }
            },
            None => {
                send_json(
                    sink,
                    &ServerLobbyMessage::JoinFailed {
                        error: format!("no room with id {room_id}"),
                    },
                )
                .await?;
            }
        },

        ClientLobbyMessage::ListRooms => {
            let rooms = state
                .list_rooms()
                .await
                .into_iter()
                .map(|(room_id, player_count, is_running)| RoomSummary {
                    room_id,
                    player_count,
                    max_players: player_count,
                    is_running,
                })
                .collect();
            send_json(sink, &ServerLobbyMessage::RoomsList { rooms }).await?;
        }

        ClientLobbyMessage::UpdatePlayer { team, role } => match joined {
            Some((room, player_id)) => match room.update_player(*player_id, team, role).await {
                Ok(players) => {
                    let _ = room
                        .lobby_tx
                        .send(ServerLobbyMessage::PlayersUpdated { players });
                }
                Err(error) => {
                    send_json(sink, &ServerLobbyMessage::JoinFailed { error }).await?;
                }
            },
            None => {
                send_json(
                    sink,
                    &ServerLobbyMessage::JoinFailed {
                        error: "not in a room yet".to_string(),
                    },
                )
                .await?;
            }
        },

        ClientLobbyMessage::StartGame => match joined {
            Some((room, player_id)) => match room.start(*player_id).await {
                Ok(()) => {
                    let reply = ServerLobbyMessage::StartSuccessful {
                        room_id: room.room_id.clone(),
                        player_id: *player_id,
                    };
                    let _ = room.lobby_tx.send(reply.clone());
                    send_json(sink, &reply).await?;
                }
                Err(error) => {
                    send_json(sink, &ServerLobbyMessage::JoinFailed { error }).await?;
                }
            },
            None => {
                send_json(
                    sink,
                    &ServerLobbyMessage::JoinFailed {
                        error: "not in a room yet".to_string(),
                    },
                )
                .await?;
            }
        },
    }

    Ok(())
}

async fn send_json(
    sink: &mut (impl futures_util::Sink<Message, Error = axum::Error> + Unpin),
    msg: &ServerLobbyMessage,
) -> Result<(), axum::Error> {
    let text = serde_json::to_string(msg).expect("ServerLobbyMessage always serializes");
    sink.send(Message::Text(text)).await
}
