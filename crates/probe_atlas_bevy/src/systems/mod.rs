//! Probe systems, run once per frame after transform propagation.

pub mod draw;
pub mod lifecycle;

pub use draw::draw_probes;
pub use lifecycle::{release_removed_probes, sync_probe_transforms};
