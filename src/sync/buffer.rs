//! Fixed-capacity snapshot ring buffer and its producer feed
//!
//! The network side only ever appends through a [`SnapshotSender`]; the
//! render side drains the [`SnapshotFeed`] into a [`SnapshotBuffer`] and
//! samples it. Buffered snapshots are shared behind `Arc` and never
//! mutated, so a reader always sees a complete tick.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};

use super::interpolate::{extrapolate, interpolate};
use crate::settings::GameConfig;
use crate::sim::StateSnapshot;

/// A snapshot stamped with its local receipt time
#[derive(Debug, Clone, PartialEq)]
pub struct BufferedSnapshot {
    /// Receipt time in milliseconds on the render clock
    pub received_at: f64,
    pub snapshot: StateSnapshot,
}

/// Recent snapshots ordered by receipt time, oldest first
#[derive(Debug, Clone)]
pub struct SnapshotBuffer {
    entries: VecDeque<Arc<BufferedSnapshot>>,
    capacity: usize,
    render_delay_ms: f64,
    max_extrapolation_ms: f64,
}

impl SnapshotBuffer {
    pub fn new(capacity: usize, render_delay_ms: f64, max_extrapolation_ms: f64) -> Self {
        let capacity = capacity.max(2);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            render_delay_ms: render_delay_ms.max(0.0),
            max_extrapolation_ms: max_extrapolation_ms.max(0.0),
        }
    }

    pub fn from_config(game: &GameConfig) -> Self {
        Self::new(
            game.snapshot_buffer_capacity,
            game.render_delay_ms,
            game.max_extrapolation_ms,
        )
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stamp and store a snapshot
    pub fn push(&mut self, received_at: f64, snapshot: StateSnapshot) {
        self.push_shared(Arc::new(BufferedSnapshot {
            received_at,
            snapshot,
        }));
    }

    /// Store an already shared snapshot, evicting the oldest when full
    pub fn push_shared(&mut self, entry: Arc<BufferedSnapshot>) {
        if !entry.received_at.is_finite() {
            log::warn!("Dropping snapshot for tick {} with bad timestamp", entry.snapshot.tick);
            return;
        }
        // Late arrivals slot in by receipt time; equal stamps keep arrival order
        let at = self
            .entries
            .iter()
            .rposition(|e| e.received_at <= entry.received_at)
            .map_or(0, |i| i + 1);
        self.entries.insert(at, entry);

        while self.entries.len() > self.capacity {
            if let Some(evicted) = self.entries.pop_front() {
                log::trace!("Evicted snapshot for tick {}", evicted.snapshot.tick);
            }
        }
    }

    pub fn oldest(&self) -> Option<&Arc<BufferedSnapshot>> {
        self.entries.front()
    }

    pub fn newest(&self) -> Option<&Arc<BufferedSnapshot>> {
        self.entries.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<BufferedSnapshot>> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Presentation state for render time `now` (ms)
    ///
    /// Renders `render_delay_ms` behind `now`. Returns `None` only when the
    /// buffer is empty.
    pub fn sample(&self, now: f64) -> Option<StateSnapshot> {
        let render_time = now - self.render_delay_ms;
        let oldest = self.entries.front()?;
        let newest = self.entries.back()?;

        if self.entries.len() == 1 || render_time <= oldest.received_at {
            return Some(oldest.snapshot.clone());
        }
        if render_time >= newest.received_at {
            let ahead = render_time - newest.received_at;
            if ahead > self.max_extrapolation_ms {
                log::trace!("No fresh snapshot for {:.0} ms, holding", ahead);
            }
            return Some(extrapolate(&newest.snapshot, ahead, self.max_extrapolation_ms));
        }

        // First entry strictly newer than render_time; its predecessor brackets it
        let upper = self
            .entries
            .iter()
            .position(|e| e.received_at > render_time)?;
        let newer = &self.entries[upper];
        let older = &self.entries[upper.checked_sub(1)?];
        let span = newer.received_at - older.received_at;
        let alpha = if span > 0.0 {
            ((render_time - older.received_at) / span) as f32
        } else {
            1.0
        };
        Some(interpolate(&older.snapshot, &newer.snapshot, alpha))
    }
}

/// Producer half of the snapshot feed; cheap to clone
#[derive(Debug, Clone)]
pub struct SnapshotSender {
    tx: Sender<Arc<BufferedSnapshot>>,
}

impl SnapshotSender {
    /// Queue a snapshot; returns false once the feed has been dropped
    pub fn send(&self, received_at: f64, snapshot: StateSnapshot) -> bool {
        self.tx
            .send(Arc::new(BufferedSnapshot {
                received_at,
                snapshot,
            }))
            .is_ok()
    }
}

/// Consumer half of the snapshot feed, owned by the render loop
#[derive(Debug)]
pub struct SnapshotFeed {
    rx: Receiver<Arc<BufferedSnapshot>>,
}

impl SnapshotFeed {
    /// Move every pending snapshot into `buffer` without blocking
    pub fn drain_into(&self, buffer: &mut SnapshotBuffer) -> usize {
        let mut moved = 0;
        for entry in self.rx.try_iter() {
            buffer.push_shared(entry);
            moved += 1;
        }
        moved
    }
}

/// Create a connected producer/consumer pair
pub fn snapshot_feed() -> (SnapshotSender, SnapshotFeed) {
    let (tx, rx) = mpsc::channel();
    (SnapshotSender { tx }, SnapshotFeed { rx })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{CarState, PlayerSnapshot, RaceInfo};
    use glam::Vec2;

    fn snap(tick: u64, x: f32, vx: f32) -> StateSnapshot {
        let mut car = CarState::new(Vec2::new(x, 0.0), 0.0, 0);
        car.velocity = Vec2::new(vx, 0.0);
        StateSnapshot {
            tick,
            race_info: RaceInfo::default(),
            players: vec![PlayerSnapshot {
                player_id: "a".into(),
                car,
                current_checkpoint: 0,
                split_times: Vec::new(),
                is_finished: false,
                finish_time: None,
                position: None,
                points: 0,
                dnf: false,
            }],
        }
    }

    fn x_of(s: &StateSnapshot) -> f32 {
        s.players[0].car.position.x
    }

    #[test]
    fn test_empty_buffer_renders_nothing() {
        let buffer = SnapshotBuffer::new(8, 100.0, 100.0);
        assert!(buffer.sample(1000.0).is_none());
    }

    #[test]
    fn test_single_snapshot_is_returned() {
        let mut buffer = SnapshotBuffer::new(8, 100.0, 100.0);
        buffer.push(500.0, snap(1, 3.0, 50.0));
        assert_eq!(x_of(&buffer.sample(10_000.0).unwrap()), 3.0);
    }

    #[test]
    fn test_eviction_keeps_newest() {
        let mut buffer = SnapshotBuffer::new(3, 100.0, 100.0);
        for i in 0..5 {
            buffer.push(i as f64 * 50.0, snap(i, 0.0, 0.0));
        }
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.oldest().unwrap().snapshot.tick, 2);
        assert_eq!(buffer.newest().unwrap().snapshot.tick, 4);
    }

    #[test]
    fn test_late_arrival_is_ordered() {
        let mut buffer = SnapshotBuffer::new(8, 0.0, 0.0);
        buffer.push(100.0, snap(1, 0.0, 0.0));
        buffer.push(300.0, snap(3, 0.0, 0.0));
        buffer.push(200.0, snap(2, 0.0, 0.0));
        let ticks: Vec<u64> = buffer.iter().map(|e| e.snapshot.tick).collect();
        assert_eq!(ticks, vec![1, 2, 3]);
    }

    #[test]
    fn test_sample_brackets_render_time() {
        let mut buffer = SnapshotBuffer::new(8, 100.0, 100.0);
        buffer.push(1000.0, snap(1, 0.0, 0.0));
        buffer.push(1050.0, snap(2, 10.0, 0.0));
        buffer.push(1100.0, snap(3, 20.0, 0.0));
        // render_time 1075 sits halfway between the last two
        assert!((x_of(&buffer.sample(1175.0).unwrap()) - 15.0).abs() < 1e-4);
        // Older than anything buffered: oldest, no backward projection
        assert_eq!(x_of(&buffer.sample(1000.0).unwrap()), 0.0);
    }

    #[test]
    fn test_sample_extrapolates_then_freezes() {
        let mut buffer = SnapshotBuffer::new(8, 100.0, 100.0);
        buffer.push(1000.0, snap(1, 0.0, 100.0));
        buffer.push(1050.0, snap(2, 5.0, 100.0));
        // 50 ms past the newest snapshot
        assert!((x_of(&buffer.sample(1200.0).unwrap()) - 10.0).abs() < 1e-4);
        let capped = buffer.sample(1250.0).unwrap();
        assert!((x_of(&capped) - 15.0).abs() < 1e-4);
        assert_eq!(buffer.sample(5000.0).unwrap(), capped);
    }

    #[test]
    fn test_buffered_snapshots_are_shared_not_copied() {
        let (tx, feed) = snapshot_feed();
        let mut buffer = SnapshotBuffer::new(8, 100.0, 100.0);
        let remote = tx.clone();
        assert!(tx.send(10.0, snap(1, 0.0, 0.0)));
        assert!(remote.send(20.0, snap(2, 0.0, 0.0)));
        assert_eq!(feed.drain_into(&mut buffer), 2);
        assert_eq!(feed.drain_into(&mut buffer), 0);

        let copy = buffer.clone();
        assert!(Arc::ptr_eq(buffer.newest().unwrap(), copy.newest().unwrap()));

        drop(feed);
        assert!(!tx.send(30.0, snap(3, 0.0, 0.0)));
    }
}
