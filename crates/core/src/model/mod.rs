mod event;
mod ids;
mod settings;
mod step;
mod zone;

pub use ids::{EnvironmentId, ParseIdError, ProcessId, SessionId, ZoneId};

pub use event::{StepEvent, ZoneSignal};
pub use settings::{
    DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_HAND_OFFSET_PX, DetectorSettings, DetectorSettingsDraft,
    SettingsError,
};
pub use step::{Process, Step, StepError, order_steps};
pub use zone::{Rect, Rgb, Zone, ZoneError, ZoneIndex};
