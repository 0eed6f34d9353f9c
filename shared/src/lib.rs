pub mod config;
pub mod entities;
pub mod error;
pub mod halffloat;
pub mod logic;
pub mod protocol;
pub mod state;
pub mod vector;

pub use config::Config;
pub use entities::{Ball, BallId, BallType, Hoop, HoopId, Player, PlayerId, Role, Team};
pub use error::ProtocolError;
pub use logic::{GameLogic, PlayerInput, TickInputs};
pub use state::{GameState, InboundState};
pub use vector::Vector2;
