#![forbid(unsafe_code)]

pub mod detector;
pub mod error;
pub mod registry;
pub mod tracking_service;

pub use sop_core::Clock;

pub use detector::{
    DetectorInput, DetectorStats, Frame, ZoneDetector, join_detector, run_detector, spawn_detector,
};
pub use error::{DetectorError, TrackingError};
pub use registry::{NextStep, SessionListing, SessionRegistry, SessionSnapshot};
pub use tracking_service::{OpenedSession, TrackingService};
