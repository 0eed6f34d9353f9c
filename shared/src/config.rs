use serde::{Deserialize, Serialize};

use crate::entities::Role;

/// Launch-time constants shared by every room. One `Config` is built at
/// process start (see `server`'s CLI flags) and handed by reference to every
/// room's tick task; it never changes after that.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub pitch_length: f32,
    pub pitch_width: f32,
    pub keeper_zone_x: f32,

    pub hoop_radius: f32,
    pub hoop_thickness: f32,
    pub hoop_offset: f32,

    pub player_radius: f32,
    pub volleyball_radius: f32,
    pub dodgeball_radius: f32,

    pub tick_hz: u32,

    /// Base speed before per-role multiplier, meters/second.
    pub base_speed: f32,
    pub keeper_speed_factor: f32,
    pub chaser_speed_factor: f32,
    pub beater_speed_factor: f32,
    pub seeker_speed_factor: f32,

    pub accel_factor: f32,

    pub volleyball_throw_speed: f32,
    pub dodgeball_throw_speed: f32,

    pub knockout_duration: f32,
    pub delay_cap: u8,
    pub wall_restitution: f32,
    pub drag: f32,

    pub goaltending_radius: f32,
    pub self_own_grace_period: f32,
    pub inbounding_grace_period: f32,
}

impl Config {
    pub fn dt(&self) -> f32 {
        1.0 / self.tick_hz as f32
    }

    pub fn max_speed(&self, role: Role) -> f32 {
        let factor = match role {
            Role::Keeper => self.keeper_speed_factor,
            Role::Chaser => self.chaser_speed_factor,
            Role::Beater => self.beater_speed_factor,
            Role::Seeker => self.seeker_speed_factor,
        };
        self.base_speed * factor
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pitch_length: 60.0,
            pitch_width: 33.0,
            keeper_zone_x: 12.0,

            hoop_radius: 0.75,
            hoop_thickness: 0.3,
            hoop_offset: 3.0,

            player_radius: 0.4,
            volleyball_radius: 0.2,
            dodgeball_radius: 0.15,

            tick_hz: 20,

            base_speed: 6.0,
            keeper_speed_factor: 0.85,
            chaser_speed_factor: 1.0,
            beater_speed_factor: 1.0,
            seeker_speed_factor: 1.15,

            accel_factor: 8.0,

            volleyball_throw_speed: 14.0,
            dodgeball_throw_speed: 18.0,

            knockout_duration: 5.0,
            delay_cap: 8,
            wall_restitution: 0.8,
            drag: 0.6,

            goaltending_radius: 4.0,
            self_own_grace_period: 0.2,
            inbounding_grace_period: 5.0,
        }
    }
}
