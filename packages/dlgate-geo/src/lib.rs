pub mod classifier;
pub mod coords;

pub use classifier::{
    DetectionMethod, RegionClassifier, RegionSignals, RegionVerdict, IP_API_URL,
};
pub use coords::is_coordinate_in_mainland;
