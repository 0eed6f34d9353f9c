//! Wire formats: JSON lobby/control messages and the binary movement-intent
//! and game-state frames.
//!
//! Game-state broadcasts are versioned so a client built against an older
//! protocol can still parse frames from a newer server by declaring the
//! version it understands at connect time (see `GameStateCodec`).

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::entities::{BallId, PlayerId, Role, Team};
use crate::error::ProtocolError;
use crate::halffloat::{f32_to_half_bits, half_bits_to_f32};
use crate::state::GameState;
use crate::vector::Vector2;

pub const PROTOCOL_VERSION_1: u8 = 1;
pub const PROTOCOL_VERSION_2: u8 = 2;
pub const PROTOCOL_VERSION_3: u8 = 3;
pub const LATEST_PROTOCOL_VERSION: u8 = PROTOCOL_VERSION_3;

// ---------------------------------------------------------------------
// Lobby protocol (`/ws/lobby`), JSON only.
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterEntry {
    pub player_id: PlayerId,
    pub name: String,
    pub team: Team,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSummary {
    pub room_id: String,
    pub player_count: usize,
    pub max_players: usize,
    pub is_running: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientLobbyMessage {
    CreateRoom { player_name: String },
    JoinRoom { room_id: String, player_name: String },
    ListRooms,
    UpdatePlayer { team: Team, role: Role },
    StartGame,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerLobbyMessage {
    RoomCreated {
        room_id: String,
        player_id: PlayerId,
        players: Vec<RosterEntry>,
    },
    JoinSuccessful {
        room_id: String,
        player_id: PlayerId,
        players: Vec<RosterEntry>,
    },
    JoinFailed {
        error: String,
    },
    RoomsList {
        rooms: Vec<RoomSummary>,
    },
    PlayersUpdated {
        players: Vec<RosterEntry>,
    },
    StartSuccessful {
        room_id: String,
        player_id: PlayerId,
    },
}

// ---------------------------------------------------------------------
// Game protocol (`/ws/game/{room_id}/{player_id}`).
// ---------------------------------------------------------------------

/// The only JSON message a game socket sends upstream: a throw request.
/// Movement is sent as a binary frame instead (see below) since it goes out
/// every tick and JSON framing overhead would dominate at 20Hz.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientGameMessage {
    Throw,
}

/// The first frame sent on a freshly-opened game socket: the full state the
/// new connection needs to render before incremental binary frames start
/// arriving. `players_order`/`balls_order` give the insertion order the
/// binary frames rely on for matching a decoded entry back to its ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerGameMessage {
    InitialState {
        protocol_version: u8,
        player_id: PlayerId,
        state: GameState,
        players_order: Vec<PlayerId>,
        balls_order: Vec<BallId>,
        config: Config,
    },
}

/// The 4-byte binary movement-intent frame a client sends every tick: two
/// half-floats, dx and dy, a raw (pre-normalization) direction vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementIntent {
    pub direction: Vector2,
}

impl MovementIntent {
    pub const WIRE_LEN: usize = 4;

    pub fn encode(&self) -> [u8; Self::WIRE_LEN] {
        let dx = f32_to_half_bits(self.direction.x);
        let dy = f32_to_half_bits(self.direction.y);
        let mut buf = [0u8; Self::WIRE_LEN];
        buf[0..2].copy_from_slice(&dx.to_le_bytes());
        buf[2..4].copy_from_slice(&dy.to_le_bytes());
        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < Self::WIRE_LEN {
            return Err(ProtocolError::Truncated {
                expected: Self::WIRE_LEN,
                actual: bytes.len(),
            });
        }
        let dx = u16::from_le_bytes([bytes[0], bytes[1]]);
        let dy = u16::from_le_bytes([bytes[2], bytes[3]]);
        Ok(MovementIntent {
            direction: Vector2::new(half_bits_to_f32(dx), half_bits_to_f32(dy)),
        })
    }
}

fn possession_code(possession: Option<Team>) -> u8 {
    match possession {
        None => 0,
        Some(Team::Zero) => 1,
        Some(Team::One) => 2,
    }
}

fn possession_from_code(code: u8) -> Result<Option<Team>, ProtocolError> {
    match code {
        0 => Ok(None),
        1 => Ok(Some(Team::Zero)),
        2 => Ok(Some(Team::One)),
        other => Err(ProtocolError::InvalidTeamCode(other)),
    }
}

fn push_half(buf: &mut Vec<u8>, value: f32) {
    buf.extend_from_slice(&f32_to_half_bits(value).to_le_bytes());
}

fn read_half(bytes: &[u8], offset: &mut usize) -> Result<f32, ProtocolError> {
    if bytes.len() < *offset + 2 {
        return Err(ProtocolError::Truncated {
            expected: *offset + 2,
            actual: bytes.len(),
        });
    }
    let bits = u16::from_le_bytes([bytes[*offset], bytes[*offset + 1]]);
    *offset += 2;
    Ok(half_bits_to_f32(bits))
}

fn read_u8(bytes: &[u8], offset: &mut usize) -> Result<u8, ProtocolError> {
    let byte = *bytes.get(*offset).ok_or(ProtocolError::Truncated {
        expected: *offset + 1,
        actual: bytes.len(),
    })?;
    *offset += 1;
    Ok(byte)
}

const KNOCKED_OUT_BIT: u8 = 0b01;
const HAS_BALL_BIT: u8 = 0b10;

/// Encodes and applies the per-tick binary game-state broadcast.
///
/// Layout, all integers little-endian:
/// `version(u8) player_count(u8) ball_count(u8) game_time(half)
/// score0(u8) score1(u8) [player]* [ball]*
/// [trailing, version >= 2: delay_bin(u8) possession_code(u8)]`.
///
/// No player or ball carries an ID on the wire: entries are positional,
/// matched against the `players_order`/`balls_order` arrays a client
/// received once in the room's `initial_state` message. Hoops, names,
/// teams and roles are likewise never sent; they don't change mid-match.
///
/// Each `player` entry (9 bytes) is `x(half) y(half) vx(half) vy(half)
/// flags(u8)` — bit0 `is_knocked_out`, bit1 `has_ball`.
///
/// Each `ball` entry is `x(half) y(half) vx(half) vy(half) holder_flag(u8)
/// is_dead_flag(u8) [version >= 3: possession_code(u8)]` — `holder_flag` is
/// 0 (free) or 1 (held), not a specific holder; version >= 2 omits the
/// per-ball `possession_code` and appends one trailing copy instead.
pub struct GameStateCodec;

impl GameStateCodec {
    pub fn encode(state: &GameState, version: u8) -> Result<Vec<u8>, ProtocolError> {
        if !matches!(
            version,
            PROTOCOL_VERSION_1 | PROTOCOL_VERSION_2 | PROTOCOL_VERSION_3
        ) {
            return Err(ProtocolError::UnsupportedVersion(version));
        }

        let mut buf = Vec::with_capacity(8 + state.players.len() * 9 + state.balls.len() * 11);
        buf.push(version);
        buf.push(state.players.len() as u8);
        buf.push(state.balls.len() as u8);
        push_half(&mut buf, state.game_time);
        buf.push(state.score.0 as u8);
        buf.push(state.score.1 as u8);

        for player in state.players.values() {
            push_half(&mut buf, player.position.x);
            push_half(&mut buf, player.position.y);
            push_half(&mut buf, player.velocity.x);
            push_half(&mut buf, player.velocity.y);
            let mut flags = 0u8;
            if player.is_knocked_out {
                flags |= KNOCKED_OUT_BIT;
            }
            if state.player_has_ball(player.id) {
                flags |= HAS_BALL_BIT;
            }
            buf.push(flags);
        }

        for ball in state.balls.values() {
            push_half(&mut buf, ball.position.x);
            push_half(&mut buf, ball.position.y);
            push_half(&mut buf, ball.velocity.x);
            push_half(&mut buf, ball.velocity.y);
            buf.push(ball.holder_id.is_some() as u8);
            buf.push(ball.is_dead as u8);
            if version >= PROTOCOL_VERSION_3 {
                buf.push(possession_code(ball.possession_team));
            }
        }

        if version >= PROTOCOL_VERSION_2 {
            buf.push(state.delay_bin);
            buf.push(possession_code(state.possession));
        }

        Ok(buf)
    }

    /// Applies an incremental binary frame onto an already-initialized
    /// `GameState`: positions, velocities, knockout/held flags, score,
    /// game_time and (version >= 2) delay_bin/possession. IDs, names,
    /// teams, roles and hoops in `target` are left untouched, since the
    /// wire frame never carries them — a real client fills those once
    /// from `initial_state` and keeps applying frames on top.
    ///
    /// `players_order`/`balls_order` must be the same arrays the client
    /// received in `initial_state`; frames are matched to entries
    /// positionally, in that order.
    ///
    /// A ball's `holder_flag` only says whether it's held, not by whom.
    /// When held, this assigns it to the next player (in `players_order`)
    /// whose `has_ball` bit hasn't already been claimed by an
    /// earlier-decoded ball this frame — exact for the common case of at
    /// most one held ball per player, the only case the wire format can
    /// disambiguate.
    pub fn decode_into(
        target: &mut GameState,
        bytes: &[u8],
        players_order: &[PlayerId],
        balls_order: &[BallId],
    ) -> Result<(), ProtocolError> {
        let mut offset = 0;
        let version = read_u8(bytes, &mut offset)?;
        if !matches!(
            version,
            PROTOCOL_VERSION_1 | PROTOCOL_VERSION_2 | PROTOCOL_VERSION_3
        ) {
            return Err(ProtocolError::UnsupportedVersion(version));
        }

        let player_count = read_u8(bytes, &mut offset)? as usize;
        let ball_count = read_u8(bytes, &mut offset)? as usize;
        if player_count != players_order.len() {
            return Err(ProtocolError::OrderMismatch {
                wire: player_count,
                known: players_order.len(),
            });
        }
        if ball_count != balls_order.len() {
            return Err(ProtocolError::OrderMismatch {
                wire: ball_count,
                known: balls_order.len(),
            });
        }

        target.game_time = read_half(bytes, &mut offset)?;
        let score0 = read_u8(bytes, &mut offset)?;
        let score1 = read_u8(bytes, &mut offset)?;
        target.score = (score0 as u32, score1 as u32);

        let mut unclaimed_holders: Vec<PlayerId> = Vec::new();
        for &player_id in players_order {
            let x = read_half(bytes, &mut offset)?;
            let y = read_half(bytes, &mut offset)?;
            let vx = read_half(bytes, &mut offset)?;
            let vy = read_half(bytes, &mut offset)?;
            let flags = read_u8(bytes, &mut offset)?;
            let is_knocked_out = flags & KNOCKED_OUT_BIT != 0;
            let has_ball = flags & HAS_BALL_BIT != 0;

            if let Some(player) = target.players.get_mut(&player_id) {
                player.position = Vector2::new(x, y);
                player.velocity = Vector2::new(vx, vy);
                player.is_knocked_out = is_knocked_out;
            }
            if has_ball {
                unclaimed_holders.push(player_id);
            }
        }
        let mut unclaimed_holders = unclaimed_holders.into_iter();

        for &ball_id in balls_order {
            let x = read_half(bytes, &mut offset)?;
            let y = read_half(bytes, &mut offset)?;
            let vx = read_half(bytes, &mut offset)?;
            let vy = read_half(bytes, &mut offset)?;
            let held = read_u8(bytes, &mut offset)? != 0;
            let is_dead = read_u8(bytes, &mut offset)? != 0;
            let possession_team = if version >= PROTOCOL_VERSION_3 {
                Some(possession_from_code(read_u8(bytes, &mut offset)?)?)
            } else {
                None
            };

            if let Some(ball) = target.balls.get_mut(&ball_id) {
                ball.position = Vector2::new(x, y);
                ball.velocity = Vector2::new(vx, vy);
                ball.is_dead = is_dead;
                ball.holder_id = if held { unclaimed_holders.next() } else { None };
                if let Some(possession_team) = possession_team {
                    ball.possession_team = possession_team;
                }
            }
        }

        if version >= PROTOCOL_VERSION_2 {
            target.delay_bin = read_u8(bytes, &mut offset)?;
            target.possession = possession_from_code(read_u8(bytes, &mut offset)?)?;
        }

        Ok(())
    }
}
