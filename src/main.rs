//! Stage Rally headless demo
//!
//! Runs an authoritative race with autopilot drivers, broadcasts snapshots
//! at a lower rate over a simulated jittery link, and renders the client's
//! interpolated view into the log.
//!
//! Usage: `stage-rally [track.json] [settings.json]`

use std::error::Error;
use std::path::Path;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use stage_rally::sim::{ControlInput, GameEvent, GameState, Player, RaceStatus, Track, tick};
use stage_rally::sync::{SnapshotBuffer, snapshot_feed};
use stage_rally::{GameLoop, Settings, shortest_angle_delta};

const SAMPLE_STAGE: &str = include_str!("../demos/sample_stage.json");
const DRIVERS: [&str; 3] = ["amber", "blue", "crimson"];
/// Server broadcasts every Nth tick (20 Hz at 60 Hz)
const BROADCAST_EVERY: u64 = 3;
const RENDER_FRAME_MS: f64 = 1000.0 / 50.0;
const BASE_LATENCY_MS: f64 = 60.0;
const MAX_JITTER_MS: f64 = 40.0;
const PACKET_LOSS: f64 = 0.05;
/// Give up on a stuck race after this much simulated time
const RACE_TIMEOUT_MS: f64 = 240_000.0;

/// Follows the sampled centerline
struct Autopilot {
    waypoints: Vec<Vec2>,
    next: usize,
    /// Steering dead zone in radians; varies per driver
    slack: f32,
}

impl Autopilot {
    fn new(track: &Track, slack: f32) -> Self {
        let mut waypoints: Vec<Vec2> = Vec::new();
        for point in track.segments.iter().flat_map(|s| s.samples()) {
            if waypoints.last().is_none_or(|last| last.distance(point) > 1.0) {
                waypoints.push(point);
            }
        }
        Self {
            waypoints,
            next: 0,
            slack,
        }
    }

    fn drive(&mut self, player: &Player, rng: &mut Pcg32) -> ControlInput {
        let car = &player.car;
        while self
            .waypoints
            .get(self.next)
            .is_some_and(|w| w.distance(car.position) < 60.0)
        {
            self.next += 1;
        }
        let Some(target) = self.waypoints.get(self.next).copied() else {
            // Past the last waypoint: keep going straight
            return ControlInput {
                accelerate: true,
                ..Default::default()
            };
        };

        let to_target = target - car.position;
        let error = shortest_angle_delta(car.heading, to_target.y.atan2(to_target.x));
        let speed = car.speed();
        ControlInput {
            accelerate: error.abs() < 0.9 || speed < 80.0,
            brake: error.abs() > 0.6 && speed > 150.0,
            turn_left: error < -self.slack,
            turn_right: error > self.slack,
            nitro: error.abs() < 0.05 && speed > 150.0 && rng.random_bool(0.01),
        }
    }
}

/// A snapshot in flight
struct Packet {
    deliver_at: f64,
    snapshot: stage_rally::sim::StateSnapshot,
}

fn load_track(path: Option<&str>) -> Result<Track, Box<dyn Error>> {
    let track = match path {
        Some(path) => {
            log::info!("Loading track from {path}");
            Track::load_from_path(path)?
        }
        None => Track::from_json_str(SAMPLE_STAGE)?,
    };
    Ok(track)
}

fn run() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let track = load_track(args.first().map(String::as_str))?;
    if let Some(finish) = track.finish_checkpoint() {
        log::info!(
            "Stage: {} segments, {} checkpoints, flag at ({:.0}, {:.0})",
            track.segments.len(),
            track.total_checkpoints(),
            finish.position.x,
            finish.position.y
        );
    }
    let settings = Settings::load_or_default(args.get(1).map(Path::new));

    let mut rng = Pcg32::seed_from_u64(0x5eed_2026);
    let mut server = GameState::new(track.clone(), settings.clone());
    let mut pilots = Vec::new();
    for (i, id) in DRIVERS.iter().enumerate() {
        server.add_player(*id)?;
        pilots.push((id.to_string(), Autopilot::new(&track, 0.04 + 0.03 * i as f32)));
    }
    server.start_race()?;

    let mut server_loop = GameLoop::from_config(&settings.game);
    let (link, feed) = snapshot_feed();
    let mut view = SnapshotBuffer::from_config(&settings.game);
    let mut in_flight: Vec<Packet> = Vec::new();
    let mut dropped = 0u32;

    let mut now = 0.0;
    let mut last_report = 0.0;
    let mut ended_at = None;
    server_loop.advance(now);

    while now < RACE_TIMEOUT_MS {
        now += RENDER_FRAME_MS;

        for _ in 0..server_loop.advance(now) {
            if server.status() == RaceStatus::Racing {
                for (id, pilot) in &mut pilots {
                    let input = match server.player(id) {
                        Some(player) => pilot.drive(player, &mut rng),
                        None => continue,
                    };
                    server.set_input(id, input);
                }
            }
            for event in tick(&mut server) {
                report(&event);
                if matches!(event, GameEvent::RaceEnded { .. }) {
                    ended_at = Some(now);
                }
            }
            if server.tick % BROADCAST_EVERY == 0 {
                if rng.random_bool(PACKET_LOSS) {
                    dropped += 1;
                } else {
                    in_flight.push(Packet {
                        deliver_at: now + BASE_LATENCY_MS + rng.random_range(0.0..MAX_JITTER_MS),
                        snapshot: server.snapshot(),
                    });
                }
            }
        }

        // Network delivery, possibly out of order
        let (arrived, pending): (Vec<Packet>, Vec<Packet>) =
            in_flight.into_iter().partition(|p| p.deliver_at <= now);
        in_flight = pending;
        for packet in arrived {
            link.send(packet.deliver_at, packet.snapshot);
        }
        feed.drain_into(&mut view);

        if now - last_report >= 2000.0 {
            last_report = now;
            match view.sample(now) {
                Some(shown) => {
                    let leader = shown
                        .players
                        .iter()
                        .find(|p| p.position == Some(1))
                        .map_or("-", |p| p.player_id.as_str());
                    log::info!(
                        "t={:>5.1}s view tick {} ({}), leader {}, {} buffered",
                        now / 1000.0,
                        shown.tick,
                        shown.status().as_str(),
                        leader,
                        view.len()
                    );
                }
                None => log::info!("t={:>5.1}s waiting for first snapshot", now / 1000.0),
            }
            if let Some(lead) = server.race_view(DRIVERS[0]) {
                log::debug!(
                    "{}: P{}/{} checkpoint {}/{}",
                    DRIVERS[0],
                    lead.current_position.map_or_else(|| "-".to_string(), |p| p.to_string()),
                    lead.total_players,
                    lead.current_checkpoint,
                    lead.total_checkpoints
                );
            }
        }

        // Let the view catch up with the final state before stopping
        if ended_at.is_some_and(|t| now - t > 1000.0) {
            break;
        }
    }

    if ended_at.is_none() {
        log::warn!("Race did not finish within {:.0}s", RACE_TIMEOUT_MS / 1000.0);
    }
    log::info!("{} snapshots lost in transit", dropped);

    println!("\nFinal classification");
    for result in server.results() {
        match result.position {
            Some(pos) => println!(
                "  P{pos} {:<8} {:>7.3}s  {:>2} pts",
                result.player_id,
                result.finish_time.unwrap_or_default(),
                result.points
            ),
            None => println!("  DNF {:<8}", result.player_id),
        }
    }
    Ok(())
}

fn report(event: &GameEvent) {
    match event {
        GameEvent::RaceStarted { start_time } => log::info!("Lights out at {:.2}s", start_time),
        GameEvent::Checkpoint(cp) => log::info!(
            "{} through checkpoint {} ({:.3}s)",
            cp.player_id,
            cp.checkpoint_index,
            cp.split_time
        ),
        GameEvent::PlayerFinished {
            player_id,
            position,
            finish_time,
        } => log::info!("{player_id} finishes P{position} at {finish_time:.3}s"),
        GameEvent::PlayerDnf { player_id } => log::info!("{player_id} did not finish"),
        GameEvent::RaceEnded { results } => log::info!("Race over, {} classified", results.len()),
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Stage Rally (headless) starting...");

    if let Err(e) = run() {
        log::error!("{e}");
        std::process::exit(1);
    }
}
