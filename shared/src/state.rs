use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::entities::{Ball, BallType, Hoop, Player, PlayerId, Role, Team};
use crate::vector::Vector2;

/// Volleyball (quaffle) crossing a sideline starts an inbounding sequence;
/// only the non-possessing team may collect the ball until the grace period
/// elapses (spec.md §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum InboundState {
    InPlay,
    Inbounding {
        team: Team,
        side_y: f32,
        triggered_at: f32,
    },
}

/// The authoritative state of one room's match. Mutated exclusively by
/// `GameLogic::step` (spec.md §5); every other component only reads it or
/// enqueues intents for the next tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub players: IndexMap<PlayerId, Player>,
    pub balls: IndexMap<u32, Ball>,
    pub hoops: Vec<Hoop>,
    pub score: (u32, u32),
    pub game_time: f32,
    pub delay_bin: u8,
    /// Which team most recently held or scored with the volleyball.
    /// Mirrors spec.md §3's `possession_code`; authoritative over the
    /// volleyball's own `possession_team` field, which `GameLogic` keeps in
    /// sync for wire-format purposes.
    pub possession: Option<Team>,
    pub inbound: InboundState,
    /// Seconds the volleyball has been continuously held by
    /// `delay_tracking_team` inside the central band this delay-of-game
    /// window. Not wire-exposed.
    #[serde(skip)]
    pub delay_timer: f32,
    #[serde(skip)]
    pub delay_tracking_team: Option<Team>,
}

impl GameState {
    /// Builds the entity set for a fresh room: the roster's players (at the
    /// origin; `GameLogic::kickoff` positions them), hoops fixed by
    /// `config`, one volleyball, and two dodgeballs.
    pub fn new(config: &Config, roster: &[(PlayerId, String, Team, Role)]) -> Self {
        let mut players = IndexMap::new();
        for (id, name, team, role) in roster {
            players.insert(
                *id,
                Player::new(*id, name.clone(), *team, *role, Vector2::ZERO),
            );
        }

        let mut balls = IndexMap::new();
        balls.insert(0, Ball::new(0, BallType::Volleyball, Vector2::ZERO));
        balls.insert(1, Ball::new(1, BallType::Dodgeball, Vector2::ZERO));
        balls.insert(2, Ball::new(2, BallType::Dodgeball, Vector2::ZERO));

        let hoops = vec![
            Hoop {
                id: 0,
                team: Team::Zero,
                position: Vector2::new(config.hoop_offset, config.pitch_width / 2.0),
                radius: config.hoop_radius,
                thickness: config.hoop_thickness,
            },
            Hoop {
                id: 1,
                team: Team::One,
                position: Vector2::new(
                    config.pitch_length - config.hoop_offset,
                    config.pitch_width / 2.0,
                ),
                radius: config.hoop_radius,
                thickness: config.hoop_thickness,
            },
        ];

        Self {
            players,
            balls,
            hoops,
            score: (0, 0),
            game_time: 0.0,
            delay_bin: 0,
            possession: None,
            inbound: InboundState::InPlay,
            delay_timer: 0.0,
            delay_tracking_team: None,
        }
    }

    pub fn volleyball_id(&self) -> u32 {
        self.balls
            .values()
            .find(|b| b.ball_type == BallType::Volleyball)
            .map(|b| b.id)
            .expect("a room always has exactly one volleyball")
    }

    pub fn volleyball(&self) -> &Ball {
        &self.balls[&self.volleyball_id()]
    }

    pub fn volleyball_mut(&mut self) -> &mut Ball {
        let id = self.volleyball_id();
        self.balls.get_mut(&id).expect("volleyball id is stable")
    }

    /// True iff some ball's `holder_id` equals `player_id` (spec.md §3
    /// invariant 2, derived rather than stored to rule out drift).
    pub fn player_has_ball(&self, player_id: PlayerId) -> bool {
        self.balls.values().any(|b| b.holder_id == Some(player_id))
    }

    pub fn ball_held_by(&self, player_id: PlayerId) -> Option<u32> {
        self.balls
            .values()
            .find(|b| b.holder_id == Some(player_id))
            .map(|b| b.id)
    }

    /// A keeper standing inside their own keeper zone is immune to beats
    /// (spec.md §3, §4.1 phase G).
    pub fn player_is_immune(&self, player_id: PlayerId, config: &Config) -> bool {
        let Some(player) = self.players.get(&player_id) else {
            return false;
        };
        if player.role != Role::Keeper {
            return false;
        }
        match player.team {
            Team::Zero => player.position.x <= config.keeper_zone_x,
            Team::One => player.position.x >= config.pitch_length - config.keeper_zone_x,
        }
    }

    pub fn own_hoop(&self, team: Team) -> &Hoop {
        self.hoops
            .iter()
            .find(|h| h.team == team)
            .expect("both teams have a hoop")
    }

    /// Checks the invariants of spec.md §3/§8. Returns the first violation
    /// found, if any.
    pub fn check_invariants(&self, config: &Config) -> Result<(), String> {
        for ball in self.balls.values() {
            if let Some(holder_id) = ball.holder_id {
                let holder = self
                    .players
                    .get(&holder_id)
                    .ok_or_else(|| format!("ball {} held by unknown player {holder_id}", ball.id))?;
                if holder.position.distance(ball.position) > 1e-3 {
                    return Err(format!(
                        "ball {} position drifted from holder {holder_id}",
                        ball.id
                    ));
                }
            }
        }

        for (id, player) in &self.players {
            let expected_has_ball = self.player_has_ball(*id);
            let at_most_one = self
                .balls
                .values()
                .filter(|b| b.holder_id == Some(*id))
                .count();
            if at_most_one > 1 {
                return Err(format!("player {id} holds more than one ball"));
            }
            let _ = expected_has_ball; // derived property always holds by construction

            if player.position.x < 0.0
                || player.position.x > config.pitch_length
                || player.position.y < 0.0
                || player.position.y > config.pitch_width
            {
                return Err(format!("player {id} out of pitch bounds"));
            }
        }

        Ok(())
    }
}
