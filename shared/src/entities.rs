use serde::{Deserialize, Serialize};

use crate::vector::Vector2;

pub type PlayerId = u32;
pub type BallId = u32;
pub type HoopId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    Zero,
    One,
}

impl Team {
    pub fn opposite(self) -> Team {
        match self {
            Team::Zero => Team::One,
            Team::One => Team::Zero,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Team::Zero => 0,
            Team::One => 1,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Team::Zero => 1,
            Team::One => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Team> {
        match code {
            1 => Some(Team::Zero),
            2 => Some(Team::One),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Keeper,
    Chaser,
    Beater,
    Seeker,
}

impl Role {
    pub fn code(self) -> u8 {
        match self {
            Role::Keeper => 0,
            Role::Chaser => 1,
            Role::Beater => 2,
            Role::Seeker => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Role> {
        match code {
            0 => Some(Role::Keeper),
            1 => Some(Role::Chaser),
            2 => Some(Role::Beater),
            3 => Some(Role::Seeker),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BallType {
    Volleyball,
    Dodgeball,
}

impl BallType {
    pub fn code(self) -> u8 {
        match self {
            BallType::Volleyball => 0,
            BallType::Dodgeball => 1,
        }
    }

    pub fn from_code(code: u8) -> Option<BallType> {
        match code {
            0 => Some(BallType::Volleyball),
            1 => Some(BallType::Dodgeball),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub team: Team,
    pub role: Role,
    pub position: Vector2,
    pub velocity: Vector2,
    pub desired_direction: Vector2,
    pub is_knocked_out: bool,
    pub knockout_timer: f32,
    /// Buffered throw intents arriving this tick, consumed in phase D.
    #[serde(skip)]
    pub pending_throws: u32,
}

impl Player {
    pub fn new(id: PlayerId, name: String, team: Team, role: Role, position: Vector2) -> Self {
        Self {
            id,
            name,
            team,
            role,
            position,
            velocity: Vector2::ZERO,
            desired_direction: Vector2::ZERO,
            is_knocked_out: false,
            knockout_timer: 0.0,
            pending_throws: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ball {
    pub id: BallId,
    pub ball_type: BallType,
    pub position: Vector2,
    pub velocity: Vector2,
    pub holder_id: Option<PlayerId>,
    pub is_dead: bool,
    pub last_thrower_id: Option<PlayerId>,
    pub possession_team: Option<Team>,
    /// Position at the start of the current tick, used to detect goal-plane
    /// and sideline crossings. Not part of the wire format.
    #[serde(skip)]
    pub prev_position: Vector2,
    /// `game_time` a keeper last threw this ball from inside their own zone,
    /// used to void self-own goals (spec.md §4.1 phase H). Not wire-exposed.
    #[serde(skip)]
    pub self_own_touch_time: Option<f32>,
}

impl Ball {
    pub fn new(id: BallId, ball_type: BallType, position: Vector2) -> Self {
        Self {
            id,
            ball_type,
            position,
            velocity: Vector2::ZERO,
            holder_id: None,
            is_dead: false,
            last_thrower_id: None,
            possession_team: None,
            prev_position: position,
            self_own_touch_time: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hoop {
    pub id: HoopId,
    pub team: Team,
    pub position: Vector2,
    pub radius: f32,
    pub thickness: f32,
}
