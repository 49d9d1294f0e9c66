pub mod device;
pub mod phase;
pub mod stimulus;
pub mod transform;
pub mod trial;

pub use device::{AbortSignal, DeviceError, PointingDevice, Screen};
pub use phase::TrialPhase;
pub use stimulus::{Rgba, TargetPose, TargetStyle};
pub use transform::{Point, Polar};
pub use trial::{
    DeviceSample, JoystickTrace, MovementFlags, MovementZone, TrialKind, TrialRecord,
};
