#![forbid(unsafe_code)]

pub mod adherence;
pub mod dwell;
pub mod error;
pub mod geometry;
pub mod model;
pub mod pose;
pub mod sequencer;
pub mod session;
pub mod time;

pub use adherence::{AdherenceOutcome, AdherenceReport};
pub use error::SessionError;
pub use sequencer::{EnterOutcome, SessionStatus, StepSequencer};
pub use session::{IgnoreReason, Session, SignalOutcome};
pub use time::Clock;
