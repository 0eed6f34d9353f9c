//! Per-tick rules: phases A-L of spec.md §4.1, run in order by `GameLogic::step`.

use std::collections::HashMap;

use crate::config::Config;
use crate::entities::{BallType, PlayerId, Role, Team};
use crate::state::{GameState, InboundState};
use crate::vector::Vector2;

/// One player's intent for the tick: the coalesced movement vector (already
/// the raw dx/dy from the last input received this tick, normalized in
/// phase A) and whether a throw was requested. Throws are never coalesced
/// upstream, but since a player can hold at most one ball, a second throw
/// intent in the same tick is a no-op once the first has released it.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlayerInput {
    pub movement: Vector2,
    pub throw: bool,
}

pub type TickInputs = HashMap<PlayerId, PlayerInput>;

pub struct GameLogic;

impl GameLogic {
    /// Advances `state` by one fixed timestep. Phases run in the order
    /// documented in spec.md §4.1; each reads the state the previous phase
    /// produced.
    pub fn step(state: &mut GameState, config: &Config, dt: f32, inputs: &TickInputs) {
        for ball in state.balls.values_mut() {
            ball.prev_position = ball.position;
        }

        Self::phase_a_apply_inputs(state, inputs);
        Self::phase_b_player_kinematics(state, config, dt);
        Self::phase_c_held_balls_follow(state);
        Self::phase_d_throws(state, config, inputs);
        Self::phase_e_free_ball_kinematics(state, config, dt);
        Self::phase_f_pickup(state, config);
        Self::phase_g_dodgeball_hits(state, config);
        Self::phase_h_goal_detection(state, config);
        Self::phase_i_player_collisions(state, config);
        Self::phase_j_delay_of_game(state, config, dt);
        Self::phase_l_time(state, dt);
    }

    fn phase_a_apply_inputs(state: &mut GameState, inputs: &TickInputs) {
        for (id, player) in state.players.iter_mut() {
            if player.is_knocked_out {
                continue;
            }
            if let Some(input) = inputs.get(id) {
                player.desired_direction = input.movement.normalize();
                player.pending_throws = if input.throw { 1 } else { 0 };
            } else {
                player.pending_throws = 0;
            }
        }
    }

    fn phase_b_player_kinematics(state: &mut GameState, config: &Config, dt: f32) {
        for player in state.players.values_mut() {
            let target_velocity = player.desired_direction.scale(config.max_speed(player.role));
            player.velocity = player
                .velocity
                .lerp(target_velocity, config.accel_factor * dt);

            if player.is_knocked_out {
                player.velocity = Vector2::ZERO;
                player.knockout_timer = (player.knockout_timer - dt).max(0.0);
                if player.knockout_timer <= 0.0 {
                    player.is_knocked_out = false;
                }
            }

            let mut next = player.position.add(player.velocity.scale(dt));
            let clamped = next.clamp(
                Vector2::ZERO,
                Vector2::new(config.pitch_length, config.pitch_width),
            );
            if clamped.x != next.x {
                player.velocity.x = 0.0;
            }
            if clamped.y != next.y {
                player.velocity.y = 0.0;
            }
            next = clamped;
            player.position = next;
        }
    }

    fn phase_c_held_balls_follow(state: &mut GameState) {
        let positions: HashMap<PlayerId, (Vector2, Vector2)> = state
            .players
            .values()
            .map(|p| (p.id, (p.position, p.velocity)))
            .collect();
        for ball in state.balls.values_mut() {
            if let Some(holder_id) = ball.holder_id {
                if let Some((pos, vel)) = positions.get(&holder_id) {
                    ball.position = *pos;
                    ball.velocity = *vel;
                }
            }
        }
    }

    fn phase_d_throws(state: &mut GameState, config: &Config, inputs: &TickInputs) {
        let _ = inputs; // throws are read off Player::pending_throws, set in phase A
        let thrower_ids: Vec<PlayerId> = state
            .players
            .values()
            .filter(|p| p.pending_throws > 0)
            .map(|p| p.id)
            .collect();

        for player_id in thrower_ids {
            let Some(ball_id) = state.ball_held_by(player_id) else {
                continue; // throw from a player not holding a ball is dropped
            };
            let (direction, team, position) = {
                let player = &state.players[&player_id];
                (player.desired_direction, player.team, player.position)
            };

            let throw_speed = {
                let ball = &state.balls[&ball_id];
                match ball.ball_type {
                    BallType::Volleyball => config.volleyball_throw_speed,
                    BallType::Dodgeball => config.dodgeball_throw_speed,
                }
            };
            let radius_sum = config.player_radius
                + match state.balls[&ball_id].ball_type {
                    BallType::Volleyball => config.volleyball_radius,
                    BallType::Dodgeball => config.dodgeball_radius,
                };
            let self_own = state.players[&player_id].role == Role::Keeper
                && state.player_is_immune(player_id, config);
            let is_volleyball = state.balls[&ball_id].ball_type == BallType::Volleyball;
            let game_time = state.game_time;

            let ball = state.balls.get_mut(&ball_id).expect("looked up above");
            ball.holder_id = None;
            ball.velocity = direction.scale(throw_speed);
            ball.last_thrower_id = Some(player_id);
            ball.position = position.add(direction.scale(radius_sum + 1e-3));

            if is_volleyball {
                if self_own {
                    ball.self_own_touch_time = Some(game_time);
                }
                ball.possession_team = Some(team);
                state.possession = Some(team);
                state.delay_bin = 0;
            }
        }
    }

    fn phase_e_free_ball_kinematics(state: &mut GameState, config: &Config, dt: f32) {
        let width = config.pitch_width;
        let length = config.pitch_length;
        let mut trigger_inbound = false;

        for ball in state.balls.values_mut() {
            if ball.holder_id.is_some() {
                continue;
            }
            ball.position = ball.position.add(ball.velocity.scale(dt));
            ball.velocity = ball.velocity.scale((1.0 - config.drag * dt).max(0.0));

            match ball.ball_type {
                BallType::Dodgeball => {
                    reflect_axis(&mut ball.position.x, &mut ball.velocity.x, 0.0, length, config.wall_restitution);
                    reflect_axis(&mut ball.position.y, &mut ball.velocity.y, 0.0, width, config.wall_restitution);
                }
                BallType::Volleyball => {
                    reflect_axis(&mut ball.position.x, &mut ball.velocity.x, 0.0, length, config.wall_restitution);
                    if ball.position.y < 0.0 || ball.position.y > width {
                        trigger_inbound = true;
                        ball.position.y = ball.position.y.clamp(0.0, width);
                        ball.velocity = Vector2::ZERO;
                    }
                }
            }
        }

        if trigger_inbound && matches!(state.inbound, InboundState::InPlay) {
            let last_thrower_team = state
                .volleyball()
                .last_thrower_id
                .and_then(|id| state.players.get(&id))
                .map(|p| p.team);
            let inbounding_team = state
                .possession
                .or(last_thrower_team)
                .map(Team::opposite)
                .unwrap_or(Team::Zero);
            let side_y = state.volleyball().position.y;
            let triggered_at = state.game_time;
            state.inbound = InboundState::Inbounding {
                team: inbounding_team,
                side_y,
                triggered_at,
            };
        }
    }

    fn phase_f_pickup(state: &mut GameState, config: &Config) {
        let (restricted_team, grace_expired) = match state.inbound {
            InboundState::Inbounding {
                team, triggered_at, ..
            } => (
                Some(team),
                state.game_time - triggered_at >= config.inbounding_grace_period,
            ),
            InboundState::InPlay => (None, true),
        };

        let ball_ids: Vec<u32> = state.balls.keys().copied().collect();
        for ball_id in ball_ids {
            let (ball_type, position, is_dead, is_free) = {
                let ball = &state.balls[&ball_id];
                (ball.ball_type, ball.position, ball.is_dead, ball.holder_id.is_none())
            };
            if !is_free || is_dead {
                continue;
            }
            let pickup_radius = config.player_radius
                + match ball_type {
                    BallType::Volleyball => config.volleyball_radius,
                    BallType::Dodgeball => config.dodgeball_radius,
                };

            let player_ids: Vec<PlayerId> = state.players.keys().copied().collect();
            for player_id in player_ids {
                let player = &state.players[&player_id];
                if player.is_knocked_out || state.player_has_ball(player_id) {
                    continue;
                }
                if ball_type == BallType::Volleyball {
                    if let Some(team) = restricted_team {
                        if !grace_expired && player.team != team {
                            continue;
                        }
                    }
                    if is_goaltending_blocked(state, config, player_id) {
                        continue;
                    }
                }
                if player.position.distance(position) > pickup_radius {
                    continue;
                }

                let team = player.team;
                let ball = state.balls.get_mut(&ball_id).expect("looked up above");
                ball.holder_id = Some(player_id);
                if ball.ball_type == BallType::Volleyball {
                    state.possession = Some(team);
                    state.delay_bin = 0;
                    state.inbound = InboundState::InPlay;
                }
                break; // one holder per ball per tick
            }
        }
    }

    fn phase_g_dodgeball_hits(state: &mut GameState, config: &Config) {
        // Revive dead dodgeballs touched by a beater of either team.
        let ball_ids: Vec<u32> = state.balls.keys().copied().collect();
        for ball_id in &ball_ids {
            let (ball_type, is_dead, position) = {
                let ball = &state.balls[ball_id];
                (ball.ball_type, ball.is_dead, ball.position)
            };
            if ball_type != BallType::Dodgeball || !is_dead {
                continue;
            }
            for player in state.players.values() {
                if player.role != Role::Beater || player.is_knocked_out {
                    continue;
                }
                if player.position.distance(position) <= config.player_radius + config.dodgeball_radius {
                    let ball = state.balls.get_mut(ball_id).expect("looked up above");
                    ball.is_dead = false;
                    ball.holder_id = None;
                    ball.last_thrower_id = Some(player.id);
                    break;
                }
            }
        }

        // Live dodgeballs stop dead on the first opposing player they touch;
        // an immune keeper stops the ball without being knocked out.
        for ball_id in ball_ids {
            let (ball_type, is_dead, is_free, last_thrower_id, position) = {
                let ball = &state.balls[&ball_id];
                (ball.ball_type, ball.is_dead, ball.holder_id.is_none(), ball.last_thrower_id, ball.position)
            };
            let (Some(thrower_id), false, true, BallType::Dodgeball) =
                (last_thrower_id, is_dead, is_free, ball_type)
            else {
                continue;
            };
            let Some(thrower_team) = state.players.get(&thrower_id).map(|p| p.team) else {
                continue;
            };

            let target_ids: Vec<PlayerId> = state
                .players
                .values()
                .filter(|p| p.id != thrower_id && p.team != thrower_team)
                .map(|p| p.id)
                .collect();

            let hit_radius = config.player_radius + config.dodgeball_radius;
            let hit_target = target_ids
                .into_iter()
                .find(|&target_id| state.players[&target_id].position.distance(position) <= hit_radius);

            let Some(target_id) = hit_target else {
                continue;
            };

            if !state.player_is_immune(target_id, config) {
                let held_volleyball = state
                    .ball_held_by(target_id)
                    .filter(|id| state.balls[id].ball_type == BallType::Volleyball);
                let target_velocity_half = state.players[&target_id].velocity.scale(0.5);
                let target_position = state.players[&target_id].position;

                let target = state
                    .players
                    .get_mut(&target_id)
                    .expect("looked up above");
                target.is_knocked_out = true;
                target.knockout_timer = config.knockout_duration;
                target.velocity = Vector2::ZERO;

                if let Some(vb_id) = held_volleyball {
                    let vb = state.balls.get_mut(&vb_id).expect("volleyball id valid");
                    vb.holder_id = None;
                    vb.position = target_position;
                    vb.velocity = target_velocity_half;
                    // possession_team remains unchanged: the holding team keeps possession.
                }
            }

            let beaten = state.balls.get_mut(&ball_id).expect("ball id valid");
            beaten.is_dead = true;
            beaten.velocity = Vector2::ZERO;
        }
    }

    fn phase_h_goal_detection(state: &mut GameState, config: &Config) {
        let vb_id = state.volleyball_id();
        let (is_free, prev, curr, last_thrower_id) = {
            let vb = &state.balls[&vb_id];
            (vb.holder_id.is_none(), vb.prev_position, vb.position, vb.last_thrower_id)
        };
        if !is_free {
            return;
        }

        let Some(possession) = state.possession else {
            return;
        };

        for hoop in state.hoops.clone() {
            if hoop.team == possession {
                continue; // scoring requires crossing the OPPONENT's hoop
            }
            if !segment_crosses_hoop(prev, curr, &hoop, config.hoop_thickness) {
                continue;
            }

            let self_own_touch_time = state.balls[&vb_id].self_own_touch_time;
            let void_for_self_own = self_own_touch_time
                .map(|t| state.game_time - t <= config.self_own_grace_period)
                .unwrap_or(false);
            if void_for_self_own {
                continue;
            }
            let _ = last_thrower_id;

            match possession {
                Team::Zero => state.score.0 += 1,
                Team::One => state.score.1 += 1,
            }
            Self::kickoff(state, config);
            return; // at most one goal per tick
        }
    }

    fn phase_i_player_collisions(state: &mut GameState, config: &Config) {
        let ids: Vec<PlayerId> = state.players.keys().copied().collect();
        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                let (id1, id2) = (ids[i], ids[j]);
                let (pos1, pos2, vel1, vel2, ko1, ko2) = {
                    let p1 = &state.players[&id1];
                    let p2 = &state.players[&id2];
                    (
                        p1.position,
                        p2.position,
                        p1.velocity,
                        p2.velocity,
                        p1.is_knocked_out,
                        p2.is_knocked_out,
                    )
                };

                let diff = pos2.sub(pos1);
                let distance = diff.magnitude();
                let min_distance = 2.0 * config.player_radius;
                if distance >= min_distance || distance < EPSILON_DISTANCE {
                    continue;
                }
                let normal = diff.scale(1.0 / distance);
                let overlap = min_distance - distance;

                if ko1 && ko2 {
                    continue; // two static obstacles never separate
                }

                if !ko1 && !ko2 {
                    let push = overlap / 2.0;
                    let p1 = state.players.get_mut(&id1).unwrap();
                    p1.position = p1.position.sub(normal.scale(push));
                    let p2 = state.players.get_mut(&id2).unwrap();
                    p2.position = p2.position.add(normal.scale(push));

                    let rel = vel2.sub(vel1).dot(normal);
                    let p1 = state.players.get_mut(&id1).unwrap();
                    p1.velocity = p1.velocity.add(normal.scale(rel));
                    let p2 = state.players.get_mut(&id2).unwrap();
                    p2.velocity = p2.velocity.sub(normal.scale(rel));
                } else if ko1 {
                    let p2 = state.players.get_mut(&id2).unwrap();
                    p2.position = p2.position.add(normal.scale(overlap));
                } else {
                    let p1 = state.players.get_mut(&id1).unwrap();
                    p1.position = p1.position.sub(normal.scale(overlap));
                }
            }
        }
    }

    fn phase_j_delay_of_game(state: &mut GameState, config: &Config, dt: f32) {
        let (prev_x, curr_x, holder_id) = {
            let vb = state.volleyball();
            (vb.prev_position.x, vb.position.x, vb.holder_id)
        };
        let half = config.pitch_length / 2.0;
        let crossed_half_line = (prev_x - half).signum() != (curr_x - half).signum();
        if crossed_half_line {
            state.delay_bin = 0;
            state.delay_timer = 0.0;
            state.delay_tracking_team = None;
        }

        let holder_team = holder_id
            .and_then(|id| state.players.get(&id))
            .map(|p| (p.team, p.position.x));

        let Some((team, x)) = holder_team else {
            state.delay_timer = 0.0;
            state.delay_tracking_team = None;
            return;
        };

        let in_band = x >= config.keeper_zone_x && x <= config.pitch_length - config.keeper_zone_x;
        if !in_band {
            state.delay_timer = 0.0;
            state.delay_tracking_team = None;
            return;
        }

        if state.delay_tracking_team != Some(team) {
            state.delay_tracking_team = Some(team);
            state.delay_timer = 0.0;
        }
        state.delay_timer += dt;

        while state.delay_timer >= 1.0 {
            state.delay_timer -= 1.0;
            state.delay_bin += 1;
            if state.delay_bin >= config.delay_cap {
                let turnover_team = team.opposite();
                let vb_id = state.volleyball_id();
                let vb = state.balls.get_mut(&vb_id).unwrap();
                vb.holder_id = None;
                state.possession = Some(turnover_team);
                state.delay_bin = 0;
                state.delay_timer = 0.0;
                state.delay_tracking_team = None;
                break;
            }
        }
    }

    fn phase_l_time(state: &mut GameState, dt: f32) {
        state.game_time += dt;
    }

    /// Arranges both teams for kickoff: keeper at their own hoop, chasers in
    /// a triangle ahead of them, beaters flanking, seeker at the rear. Also
    /// resets the volleyball, dodgeballs, and delay-of-game bookkeeping.
    /// Called at room start and after every goal (spec.md §4.5).
    pub fn kickoff(state: &mut GameState, config: &Config) {
        for team in [Team::Zero, Team::One] {
            let own_hoop_x = state.own_hoop(team).position.x;
            let forward = if team == Team::Zero { 1.0 } else { -1.0 };
            let mid_y = config.pitch_width / 2.0;

            let mut chaser_idx = 0u32;
            let mut beater_idx = 0u32;
            let player_ids: Vec<PlayerId> = state
                .players
                .values()
                .filter(|p| p.team == team)
                .map(|p| p.id)
                .collect();

            for id in player_ids {
                let player = state.players.get_mut(&id).unwrap();
                player.velocity = Vector2::ZERO;
                player.desired_direction = Vector2::ZERO;
                player.is_knocked_out = false;
                player.knockout_timer = 0.0;
                player.pending_throws = 0;

                player.position = match player.role {
                    Role::Keeper => Vector2::new(own_hoop_x, mid_y),
                    Role::Chaser => {
                        let lane = [-3.0, 0.0, 3.0][chaser_idx as usize % 3];
                        chaser_idx += 1;
                        Vector2::new(own_hoop_x + forward * 8.0, mid_y + lane)
                    }
                    Role::Beater => {
                        let lane = if beater_idx % 2 == 0 { -5.0 } else { 5.0 };
                        beater_idx += 1;
                        Vector2::new(own_hoop_x + forward * 6.0, mid_y + lane)
                    }
                    Role::Seeker => Vector2::new(own_hoop_x + forward * 2.0, mid_y),
                };
            }
        }

        let center = Vector2::new(config.pitch_length / 2.0, config.pitch_width / 2.0);
        for ball in state.balls.values_mut() {
            ball.velocity = Vector2::ZERO;
            ball.holder_id = None;
            ball.prev_position = ball.position;
            match ball.ball_type {
                BallType::Volleyball => {
                    ball.position = center;
                    ball.last_thrower_id = None;
                    ball.self_own_touch_time = None;
                    ball.possession_team = None;
                }
                BallType::Dodgeball => {
                    ball.is_dead = false;
                }
            }
        }

        // Two dodgeballs, symmetrically placed per spec.md §4.5.
        let dodgeball_ids: Vec<u32> = state
            .balls
            .values()
            .filter(|b| b.ball_type == BallType::Dodgeball)
            .map(|b| b.id)
            .collect();
        let spots = [
            Vector2::new(config.keeper_zone_x, config.pitch_width / 4.0),
            Vector2::new(
                config.pitch_length - config.keeper_zone_x,
                3.0 * config.pitch_width / 4.0,
            ),
        ];
        for (id, spot) in dodgeball_ids.into_iter().zip(spots) {
            if let Some(ball) = state.balls.get_mut(&id) {
                ball.position = spot;
                ball.prev_position = spot;
            }
        }

        state.delay_bin = 0;
        state.delay_timer = 0.0;
        state.delay_tracking_team = None;
        state.possession = None;
        state.inbound = InboundState::InPlay;
    }
}

const EPSILON_DISTANCE: f32 = 1e-6;

fn reflect_axis(position: &mut f32, velocity: &mut f32, min: f32, max: f32, restitution: f32) {
    if *position < min {
        *position = min;
        *velocity = -*velocity * restitution;
    } else if *position > max {
        *position = max;
        *velocity = -*velocity * restitution;
    }
}

/// True if the segment from `prev` to `curr` crosses the hoop's plane (the
/// x-coordinate band of width `thickness` centered on the hoop) within
/// `hoop.radius` of the hoop's vertical center.
fn segment_crosses_hoop(
    prev: Vector2,
    curr: Vector2,
    hoop: &crate::entities::Hoop,
    thickness: f32,
) -> bool {
    let half_thickness = thickness / 2.0;
    let plane_x = hoop.position.x;
    let dx = curr.x - prev.x;
    if dx.abs() < EPSILON_DISTANCE {
        return false;
    }
    let entered_band = (prev.x - plane_x).abs() > half_thickness || (curr.x - plane_x).abs() <= half_thickness;
    let crossed = (prev.x - plane_x).signum() != (curr.x - plane_x).signum();
    if !crossed && !entered_band {
        return false;
    }
    let t = ((plane_x - prev.x) / dx).clamp(0.0, 1.0);
    let y_at_plane = prev.y + (curr.y - prev.y) * t;
    (y_at_plane - hoop.position.y).abs() <= hoop.radius
}

fn is_goaltending_blocked(state: &GameState, config: &Config, player_id: PlayerId) -> bool {
    let Some(player) = state.players.get(&player_id) else {
        return false;
    };
    if player.role != Role::Chaser {
        return false;
    }
    let own_hoop = state.own_hoop(player.team);
    player.position.distance(own_hoop.position) <= config.goaltending_radius
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config::default()
    }

    fn build_state(config: &Config) -> GameState {
        let roster = vec![
            (1, "k0".to_string(), Team::Zero, Role::Keeper),
            (2, "c0".to_string(), Team::Zero, Role::Chaser),
            (3, "b0".to_string(), Team::Zero, Role::Beater),
            (4, "s0".to_string(), Team::Zero, Role::Seeker),
            (5, "k1".to_string(), Team::One, Role::Keeper),
            (6, "c1".to_string(), Team::One, Role::Chaser),
            (7, "b1".to_string(), Team::One, Role::Beater),
            (8, "s1".to_string(), Team::One, Role::Seeker),
        ];
        let mut state = GameState::new(config, &roster);
        GameLogic::kickoff(&mut state, config);
        state
    }

    #[test]
    fn kickoff_places_volleyball_at_center() {
        let config = test_config();
        let state = build_state(&config);
        let expected = Vector2::new(config.pitch_length / 2.0, config.pitch_width / 2.0);
        assert_eq!(state.volleyball().position, expected);
        assert!(state.possession.is_none());
        assert_eq!(state.delay_bin, 0);
    }

    #[test]
    fn throw_releases_ball_and_sets_possession() {
        let config = test_config();
        let mut state = build_state(&config);
        let vb_id = state.volleyball_id();
        state.balls.get_mut(&vb_id).unwrap().holder_id = Some(2);
        state.players.get_mut(&2).unwrap().position = Vector2::new(30.0, 16.5);
        state.players.get_mut(&2).unwrap().desired_direction = Vector2::new(1.0, 0.0);

        let mut inputs = TickInputs::new();
        inputs.insert(2, PlayerInput { movement: Vector2::new(1.0, 0.0), throw: true });
        GameLogic::step(&mut state, &config, config.dt(), &inputs);

        let vb = state.volleyball();
        assert!(vb.holder_id.is_none());
        assert!(vb.velocity.x > 0.0);
        assert_eq!(state.possession, Some(Team::Zero));
    }

    #[test]
    fn second_throw_in_same_tick_is_dropped() {
        let config = test_config();
        let mut state = build_state(&config);
        let vb_id = state.volleyball_id();
        state.balls.get_mut(&vb_id).unwrap().holder_id = Some(2);

        let mut inputs = TickInputs::new();
        inputs.insert(2, PlayerInput { movement: Vector2::new(1.0, 0.0), throw: true });
        GameLogic::step(&mut state, &config, config.dt(), &inputs);
        let velocity_after_first = state.volleyball().velocity;

        // A second throw this "logical tick" would be a fresh step() call in
        // practice; simulate same-tick idempotence by re-running phase D
        // directly against the now-ball-less player, which must be a no-op.
        GameLogic::step(&mut state, &config, config.dt(), &inputs);
        assert_eq!(state.volleyball().velocity.x > 0.0, velocity_after_first.x > 0.0);
    }

    #[test]
    fn knockout_releases_held_volleyball_with_half_velocity() {
        let config = test_config();
        let mut state = build_state(&config);

        let vb_id = state.volleyball_id();
        state.balls.get_mut(&vb_id).unwrap().holder_id = Some(2);
        state.players.get_mut(&2).unwrap().position = Vector2::new(30.0, 16.5);
        state.players.get_mut(&2).unwrap().velocity = Vector2::new(2.0, 0.0);
        state.possession = Some(Team::Zero);

        let db_id = state
            .balls
            .values()
            .find(|b| b.ball_type == BallType::Dodgeball)
            .unwrap()
            .id;
        let db = state.balls.get_mut(&db_id).unwrap();
        db.position = Vector2::new(30.0, 16.5);
        db.holder_id = None;
        db.is_dead = false;
        db.last_thrower_id = Some(7); // beater on team one

        GameLogic::step(&mut state, &config, config.dt(), &TickInputs::new());

        let chaser = &state.players[&2];
        assert!(chaser.is_knocked_out);
        let vb = state.volleyball();
        assert!(vb.holder_id.is_none());
        // Half of whatever the holder's velocity was at the moment of the beat
        // (after this tick's own kinematics phase has already run).
        assert!(vb.velocity.x > 0.0 && vb.velocity.x < 2.0);
        assert_eq!(state.possession, Some(Team::Zero));
        let beat_ball = &state.balls[&db_id];
        assert!(beat_ball.is_dead);
        assert_eq!(beat_ball.velocity, Vector2::ZERO);
    }

    #[test]
    fn keeper_in_own_zone_is_immune_to_beats() {
        let config = test_config();
        let mut state = build_state(&config);
        state.players.get_mut(&1).unwrap().position = Vector2::new(5.0, 16.5);

        let db_id = state
            .balls
            .values()
            .find(|b| b.ball_type == BallType::Dodgeball)
            .unwrap()
            .id;
        let db = state.balls.get_mut(&db_id).unwrap();
        db.position = Vector2::new(5.0, 16.5);
        db.last_thrower_id = Some(7);

        GameLogic::step(&mut state, &config, config.dt(), &TickInputs::new());

        assert!(!state.players[&1].is_knocked_out);
        let db = &state.balls[&db_id];
        assert!(db.is_dead);
        assert_eq!(db.velocity, Vector2::ZERO);
    }

    #[test]
    fn delay_of_game_turns_ball_over_after_cap_seconds() {
        let config = test_config();
        let mut state = build_state(&config);
        let vb_id = state.volleyball_id();
        state.balls.get_mut(&vb_id).unwrap().holder_id = Some(2);
        state.players.get_mut(&2).unwrap().position = Vector2::new(30.0, 16.5);
        state.possession = Some(Team::Zero);

        for _ in 0..((config.delay_cap as f32 / config.dt()) as u32 + 5) {
            // keep the holder inside the central band every tick
            state.players.get_mut(&2).unwrap().position = Vector2::new(30.0, 16.5);
            state.players.get_mut(&2).unwrap().velocity = Vector2::ZERO;
            GameLogic::step(&mut state, &config, config.dt(), &TickInputs::new());
            if state.possession == Some(Team::One) {
                break;
            }
        }

        assert_eq!(state.possession, Some(Team::One));
        assert_eq!(state.delay_bin, 0);
    }

    #[test]
    fn inbounding_restricts_pickup_to_non_possessing_team() {
        let config = test_config();
        let mut state = build_state(&config);
        state.possession = Some(Team::Zero);
        state.inbound = InboundState::Inbounding {
            team: Team::One,
            side_y: config.pitch_width,
            triggered_at: 0.0,
        };
        let vb_id = state.volleyball_id();
        {
            let vb = state.balls.get_mut(&vb_id).unwrap();
            vb.position = Vector2::new(30.0, config.pitch_width);
            vb.velocity = Vector2::ZERO;
        }
        // Team zero chaser right next to the ball should NOT be able to pick it up.
        state.players.get_mut(&2).unwrap().position = Vector2::new(30.0, config.pitch_width);

        GameLogic::step(&mut state, &config, config.dt(), &TickInputs::new());
        assert!(state.volleyball().holder_id.is_none());

        // Team one chaser touching it clears the restriction.
        state.players.get_mut(&6).unwrap().position = Vector2::new(30.0, config.pitch_width);
        GameLogic::step(&mut state, &config, config.dt(), &TickInputs::new());
        assert_eq!(state.volleyball().holder_id, Some(6));
    }

    #[test]
    fn dead_dodgeball_revives_when_touched_by_beater() {
        let config = test_config();
        let mut state = build_state(&config);
        let db_id = state
            .balls
            .values()
            .find(|b| b.ball_type == BallType::Dodgeball)
            .unwrap()
            .id;
        {
            let db = state.balls.get_mut(&db_id).unwrap();
            db.is_dead = true;
            db.position = Vector2::new(10.0, 10.0);
        }
        state.players.get_mut(&3).unwrap().position = Vector2::new(10.0, 10.0);

        GameLogic::step(&mut state, &config, config.dt(), &TickInputs::new());

        let db = &state.balls[&db_id];
        assert!(!db.is_dead);
        assert_eq!(db.holder_id, None);
        assert_eq!(db.last_thrower_id, Some(3));
    }

    #[test]
    fn goal_resets_kickoff_and_increments_score() {
        let config = test_config();
        let mut state = build_state(&config);
        let opponent_hoop = state.own_hoop(Team::One).position;
        let vb_id = state.volleyball_id();
        {
            // Positioned and moving fast enough that phase E's kinematics
            // carries it across the hoop plane within this single tick.
            let vb = state.balls.get_mut(&vb_id).unwrap();
            vb.position = Vector2::new(opponent_hoop.x - 0.5, opponent_hoop.y);
            vb.holder_id = None;
            vb.velocity = Vector2::new(20.0, 0.0);
        }
        state.possession = Some(Team::Zero);

        GameLogic::step(&mut state, &config, config.dt(), &TickInputs::new());

        assert_eq!(state.score, (1, 0));
        assert_eq!(
            state.volleyball().position,
            Vector2::new(config.pitch_length / 2.0, config.pitch_width / 2.0)
        );
        assert_eq!(state.delay_bin, 0);
    }

    #[test]
    fn self_own_goal_is_voided() {
        let config = test_config();
        let mut state = build_state(&config);
        // Keeper 1 (team zero) throws the volleyball from inside their own zone.
        let own_hoop = state.own_hoop(Team::Zero).position;
        let vb_id = state.volleyball_id();
        state.balls.get_mut(&vb_id).unwrap().holder_id = Some(1);
        state.players.get_mut(&1).unwrap().position = Vector2::new(3.0, own_hoop.y);
        state.players.get_mut(&1).unwrap().desired_direction = Vector2::new(-1.0, 0.0);

        let mut inputs = TickInputs::new();
        inputs.insert(1, PlayerInput { movement: Vector2::new(-1.0, 0.0), throw: true });
        GameLogic::step(&mut state, &config, config.dt(), &inputs);

        // Drive the ball back across the keeper's own hoop plane this tick.
        {
            let vb = state.balls.get_mut(&vb_id).unwrap();
            vb.position = Vector2::new(own_hoop.x + 0.5, own_hoop.y);
            vb.velocity = Vector2::new(-20.0, 0.0);
        }
        state.possession = Some(Team::Zero);

        let before = state.score;
        GameLogic::step(&mut state, &config, config.dt(), &TickInputs::new());
        assert_eq!(state.score, before);
    }

    #[test]
    fn player_collision_separates_and_exchanges_velocity() {
        let config = test_config();
        let mut state = build_state(&config);
        state.players.get_mut(&2).unwrap().position = Vector2::new(30.0, 16.5);
        state.players.get_mut(&6).unwrap().position =
            Vector2::new(30.0 + config.player_radius, 16.5);
        state.players.get_mut(&2).unwrap().velocity = Vector2::new(1.0, 0.0);
        state.players.get_mut(&6).unwrap().velocity = Vector2::new(-1.0, 0.0);

        GameLogic::step(&mut state, &config, config.dt(), &TickInputs::new());

        let distance = state.players[&2].position.distance(state.players[&6].position);
        assert!(distance >= 2.0 * config.player_radius - 1e-3);
    }

    #[test]
    fn invariants_hold_after_a_tick_with_no_input() {
        let config = test_config();
        let mut state = build_state(&config);
        GameLogic::step(&mut state, &config, config.dt(), &TickInputs::new());
        assert!(state.check_invariants(&config).is_ok());
    }
}
