use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use shared::protocol::{GameStateCodec, RosterEntry, ServerLobbyMessage, LATEST_PROTOCOL_VERSION};
use shared::{BallId, Config, GameLogic, GameState, PlayerId, PlayerInput, Role, Team, TickInputs, Vector2};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomPhase {
    Lobby,
    Running,
}

/// A single input event posted by a game socket onto the room's tick task.
/// Movement is coalesced to the latest per player per tick; throws are
/// queued and applied in arrival order (spec.md §5). `Disconnect` pauses a
/// player in place rather than tearing the room down.
pub enum InputEvent {
    Movement { player_id: PlayerId, direction: Vector2 },
    Throw { player_id: PlayerId },
    Disconnect { player_id: PlayerId },
}

/// Handle to a room's live simulation, created on `start_game` and dropped
/// (aborting the tick task) on room teardown.
pub struct GameHandle {
    pub input_tx: mpsc::UnboundedSender<InputEvent>,
    pub broadcast_tx: broadcast::Sender<Vec<u8>>,
    pub snapshot: Arc<RwLock<GameState>>,
    pub players_order: Vec<PlayerId>,
    pub balls_order: Vec<BallId>,
    tick_handle: JoinHandle<()>,
}

impl Drop for GameHandle {
    fn drop(&mut self) {
        self.tick_handle.abort();
    }
}

/// One lobby room: a pending roster before `start_game`, a live simulation
/// after. Guarded internally by per-field locks rather than one big mutex
/// so a lobby broadcast never blocks a tick in flight.
pub struct Room {
    pub room_id: String,
    pub creator_player_id: PlayerId,
    pub config: Config,
    next_player_id: AtomicU32,
    pub roster: RwLock<IndexMap<PlayerId, RosterEntry>>,
    pub phase: RwLock<RoomPhase>,
    pub lobby_tx: broadcast::Sender<ServerLobbyMessage>,
    pub game: RwLock<Option<GameHandle>>,
}

impl Room {
    pub fn new(room_id: String, config: Config, creator_name: String) -> (Arc<Room>, PlayerId) {
        let creator_id: PlayerId = 1;
        let mut roster = IndexMap::new();
        roster.insert(
            creator_id,
            RosterEntry {
                player_id: creator_id,
                name: creator_name,
                team: Team::Zero,
                role: Role::Chaser,
            },
        );
        let (lobby_tx, _) = broadcast::channel(32);
        let room = Arc::new(Room {
            room_id,
            creator_player_id: creator_id,
            config,
            next_player_id: AtomicU32::new(creator_id + 1),
            roster: RwLock::new(roster),
            phase: RwLock::new(RoomPhase::Lobby),
            lobby_tx,
            game: RwLock::new(None),
        });
        (room, creator_id)
    }

    pub async fn join(&self, name: String) -> Result<(PlayerId, Vec<RosterEntry>), String> {
        if *self.phase.read().await != RoomPhase::Lobby {
            return Err("room already started".to_string());
        }
        let mut roster = self.roster.write().await;
        let player_id = self.next_player_id.fetch_add(1, Ordering::SeqCst);
        let (team, role) = Self::balance(&roster);
        roster.insert(
            player_id,
            RosterEntry { player_id, name, team, role },
        );
        let snapshot = roster.values().cloned().collect();
        Ok((player_id, snapshot))
    }

    /// Assigns the smaller-headcount team, defaulting to chaser; a later
    /// `update_player` call may reassign either.
    fn balance(roster: &IndexMap<PlayerId, RosterEntry>) -> (Team, Role) {
        let zero_count = roster.values().filter(|p| p.team == Team::Zero).count();
        let one_count = roster.values().filter(|p| p.team == Team::One).count();
        let team = if zero_count <= one_count { Team::Zero } else { Team::One };
        (team, Role::Chaser)
    }

    pub async fn roster_snapshot(&self) -> Vec<RosterEntry> {
        self.roster.read().await.values().cloned().collect()
    }

    pub async fn update_player(
        &self,
        player_id: PlayerId,
        team: Team,
        role: Role,
    ) -> Result<Vec<RosterEntry>, String> {
        let mut roster = self.roster.write().await;
        let entry = roster
            .get_mut(&player_id)
            .ok_or_else(|| "player not in this room".to_string())?;
        entry.team = team;
        entry.role = role;
        Ok(roster.values().cloned().collect())
    }

    pub async fn start(self: &Arc<Self>, requester: PlayerId) -> Result<(), String> {
        if requester != self.creator_player_id {
            return Err("only the room creator may start the game".to_string());
        }

        let mut phase = self.phase.write().await;
        if *phase != RoomPhase::Lobby {
            return Err("room already started".to_string());
        }

        let roster_rows: Vec<(PlayerId, String, Team, Role)> = self
            .roster
            .read()
            .await
            .values()
            .map(|p| (p.player_id, p.name.clone(), p.team, p.role))
            .collect();

        let mut state = GameState::new(&self.config, &roster_rows);
        GameLogic::kickoff(&mut state, &self.config);

        let players_order = state.players.keys().copied().collect::<Vec<_>>();
        let balls_order = state.balls.keys().copied().collect::<Vec<_>>();

        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (broadcast_tx, _) = broadcast::channel(64);
        let snapshot = Arc::new(RwLock::new(state.clone()));

        let tick_handle = spawn_tick_task(
            Arc::clone(self),
            state,
            input_rx,
            broadcast_tx.clone(),
            Arc::clone(&snapshot),
        );

        *self.game.write().await = Some(GameHandle {
            input_tx,
            broadcast_tx,
            snapshot,
            players_order,
            balls_order,
            tick_handle,
        });
        *phase = RoomPhase::Running;
        info!(room_id = %self.room_id, "room started");
        Ok(())
    }

    pub async fn is_running(&self) -> bool {
        *self.phase.read().await == RoomPhase::Running
    }

    pub async fn player_count(&self) -> usize {
        self.roster.read().await.len()
    }
}

/// Runs the fixed-cadence physics loop for one room. Owns `state` exclusively
/// (spec.md §5's "sole writer" rule); every other task only enqueues
/// `InputEvent`s or reads the published `snapshot`.
fn spawn_tick_task(
    room: Arc<Room>,
    mut state: GameState,
    mut input_rx: mpsc::UnboundedReceiver<InputEvent>,
    broadcast_tx: broadcast::Sender<Vec<u8>>,
    snapshot: Arc<RwLock<GameState>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let dt = room.config.dt();
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs_f32(dt));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let mut inputs: TickInputs = HashMap::new();
            while let Ok(event) = input_rx.try_recv() {
                match event {
                    InputEvent::Movement { player_id, direction } => {
                        inputs
                            .entry(player_id)
                            .or_insert_with(PlayerInput::default)
                            .movement = direction;
                    }
                    InputEvent::Throw { player_id } => {
                        inputs
                            .entry(player_id)
                            .or_insert_with(PlayerInput::default)
                            .throw = true;
                    }
                    InputEvent::Disconnect { player_id } => {
                        if let Some(player) = state.players.get_mut(&player_id) {
                            player.is_knocked_out = true;
                            player.knockout_timer = room.config.knockout_duration;
                        }
                    }
                }
            }

            GameLogic::step(&mut state, &room.config, dt, &inputs);

            if let Err(err) = state.check_invariants(&room.config) {
                tracing::error!(room_id = %room.room_id, error = %err, "invariant violation, tearing down room tick task");
                break;
            }

            match GameStateCodec::encode(&state, LATEST_PROTOCOL_VERSION) {
                // A send error just means there are no subscribers right now;
                // the next tick's broadcast resynchronizes any new joiner.
                Ok(bytes) => {
                    let _ = broadcast_tx.send(bytes);
                }
                Err(err) => {
                    warn!(room_id = %room.room_id, error = %err, "failed to encode tick frame");
                }
            }

            *snapshot.write().await = state.clone();
        }
    })
}
