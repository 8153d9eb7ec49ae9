//! Probe records and the per-frame draw drivers.
//!
//! # Module Structure
//!
//! - [`cube`]: cube face table and face cameras
//! - [`record`]: `Probe` and `ProbeKind`
//! - [`driver`]: `ProbeDriver` state machine, renderer boundary

pub mod cube;
pub mod driver;
pub mod record;

// Re-exports
pub use cube::{CubeFace, FaceCamera, Projection, CUBE_DIRS, CUBE_UP};
pub use driver::{CapturePass, ConvolveSource, DrawReport, IrradianceTarget, ProbeDriver, ProbeState, SceneRenderer};
pub use record::{Probe, ProbeKind};
