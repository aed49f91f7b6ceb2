//! Extension discovery: locating candidate packs, tracking the winning
//! version of each, and binding their declarations to extension points.

mod candidate;
mod compat;
mod manager;
mod points;
mod tracker;

pub use candidate::CandidatePack;
pub use compat::{
    can_load_target, classic_standard_floor, ensure_runner_can_load, CLASSIC_CURRENT_MAJOR,
};
pub use manager::{DiscoveryState, ExtensionManager};
pub use points::{
    Capability, ExtensionHost, ExtensionNode, ExtensionObject, ExtensionPoint, PointDecl,
};
pub use tracker::CandidateTracker;
