pub mod center_of_mass;
pub mod cross_correlation;
pub mod fft2d;
pub mod hotspot;
pub mod phase_correlation;

pub use center_of_mass::{CenterOfMassMode, CenterOfMassResult};
pub use hotspot::{HotspotPolicy, HotspotRequest, HotspotResult};
