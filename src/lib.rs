pub mod algorithms;
pub mod config;
pub mod editor;
pub mod engine;
pub mod fitting;
pub mod logging;
pub mod record;
pub mod state;
pub mod volume;

pub use algorithms::{CenterOfMassMode, HotspotPolicy, HotspotRequest};
pub use config::Config;
pub use editor::ProjectionEditor;
pub use engine::{AlignmentCommand, AlignmentEngine, AlignmentPassReport};
pub use record::AlignmentRecord;
pub use state::{HotspotPositions, ShiftState, SineParams, MAX_HOTSPOT_GROUPS};
pub use volume::{roll2d, ProjectionVolume};

pub type Result<T> = anyhow::Result<T>;
