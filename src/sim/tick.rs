//! Fixed timestep simulation tick
//!
//! Advances the whole race by one step: countdown, per-car physics and
//! collisions, checkpoint gates, car contacts, ranking and race end.

use super::collision::{CarBody, collide_with_track, resolve_car_pair};
use super::physics::{self, CarState, ControlInput, SurfaceContact};
use super::race::{
    CheckpointEvent, RaceStatus, advance_checkpoint, check_finish, finalize_results, mark_unfinished_dnf,
    update_live_positions,
};
use super::state::{GameEvent, GameState, Player};
use super::track::Track;
use crate::settings::Settings;

/// Advance the game state by one fixed timestep
pub fn tick(state: &mut GameState) -> Vec<GameEvent> {
    let mut events = Vec::new();

    state.tick += 1;
    state.clock = state.tick as f64 / state.settings.game.tick_rate.max(1) as f64;
    let dt = state.dt();
    let clock = state.clock;

    let GameState {
        track,
        settings,
        players,
        race_info,
        ..
    } = state;

    if race_info.advance_countdown(dt, clock) {
        log::info!("Race started at t={:.3}", clock);
        events.push(GameEvent::RaceStarted { start_time: clock });
    }

    if race_info.status != RaceStatus::Racing {
        return events;
    }

    let elapsed = race_info.elapsed(clock);
    let total_checkpoints = track.total_checkpoints();

    for i in 0..players.len() {
        if players[i].progress.dnf {
            continue;
        }
        let prev = players[i].car.position;
        drive(&mut players[i], track, settings, dt);

        let player = &mut players[i];
        let curr = player.car.position;
        if let Some((index, split_time)) = advance_checkpoint(&mut player.progress, track, prev, curr, elapsed) {
            log::debug!("{} crossed checkpoint {} at {:.3}s", player.id, index, split_time);
            events.push(GameEvent::Checkpoint(CheckpointEvent {
                player_id: player.id.clone(),
                checkpoint_index: index,
                split_time,
            }));
        }

        if let Some(position) = check_finish(players, i, total_checkpoints, clock) {
            race_info.record_finish(clock, settings.game.finish_grace_period);
            let player_id = players[i].id.clone();
            log::info!("{} finished P{} at t={:.3}", player_id, position, clock);
            events.push(GameEvent::PlayerFinished {
                player_id,
                position,
                finish_time: clock,
            });
        }
    }

    resolve_car_contacts(players, settings);
    update_live_positions(players, track);

    let race_over = if race_info.advance_grace(dt, clock) {
        for player_id in mark_unfinished_dnf(players) {
            log::info!("{} did not finish", player_id);
            events.push(GameEvent::PlayerDnf { player_id });
        }
        true
    } else {
        players.iter().all(|p| p.progress.is_done())
    };
    if race_over {
        end_race(state, &mut events);
    }

    events
}

/// Physics and track collision for one car
fn drive(player: &mut Player, track: &Track, settings: &Settings, dt: f32) {
    // Finished cars coast to a stop
    let input = if player.progress.is_finished {
        ControlInput::default()
    } else {
        player.input
    };
    let (surface, on_track) = track.surface_info(player.car.position);
    let contact = SurfaceContact {
        surface,
        off_track: !on_track,
    };
    let moved = physics::step(&player.car, &input, contact, dt, settings);
    let (resolved, _) = collide_with_track(&moved, track, &settings.physics);
    player.car = resolved;
}

/// Pairwise contacts between cars still on course, in id order
fn resolve_car_contacts(players: &mut [Player], settings: &Settings) {
    for i in 0..players.len() {
        for j in (i + 1)..players.len() {
            if !players[i].progress.can_progress() || !players[j].progress.can_progress() {
                continue;
            }
            let a = CarBody {
                state: players[i].car,
                weight: players[i].weight,
            };
            let b = CarBody {
                state: players[j].car,
                weight: players[j].weight,
            };
            if let Some((sa, sb)) = resolve_car_pair(a, b, &settings.physics) {
                players[i].car = within_speed_cap(sa, settings);
                players[j].car = within_speed_cap(sb, settings);
            }
        }
    }
}

/// A contact impulse must not push a car past its own cap
fn within_speed_cap(mut car: CarState, settings: &Settings) -> CarState {
    let cap = physics::max_speed(&settings.physics, &settings.car, car.nitro_active, car.is_off_track);
    car.velocity = car.velocity.clamp_length_max(cap);
    car
}

fn end_race(state: &mut GameState, events: &mut Vec<GameEvent>) {
    let results = finalize_results(&mut state.players, &state.settings.race);
    state.race_info.finish(state.clock);
    log::info!(
        "Race finished: {} classified, {} DNF",
        results.iter().filter(|r| !r.dnf).count(),
        results.iter().filter(|r| r.dnf).count()
    );
    events.push(GameEvent::RaceEnded { results });
}
