//! State synchronizer
//!
//! Buffers timestamped snapshots from the local simulation or the network
//! and turns them into a smooth presentation state slightly behind real time.

pub mod buffer;
pub mod interpolate;

pub use buffer::{BufferedSnapshot, SnapshotBuffer, SnapshotFeed, SnapshotSender, snapshot_feed};
pub use interpolate::{extrapolate, interpolate, interpolate_car};
