#![warn(missing_docs)]
#![doc = "Motion primitives and mission sequencing for a line-trace robot."]
#![doc = ""]
#![doc = "Builds on `tracer-kinematics`: a [`DriveController`] owns the per-tick control state,"]
#![doc = "[`Primitive`]s run single motions to completion and a [`Sequencer`] walks a declarative"]
#![doc = "[`MissionTable`] one tick at a time."]

pub mod drive;
pub mod error;
pub mod gate;
pub mod mission;
pub mod primitive;
pub mod sample;

pub use drive::{DriveConfig, DriveController};
pub use error::{MissionError, MotionError};
pub use gate::{MajorityVote, StraightnessDetector, StraightnessSettings};
pub use mission::{Action, Guard, MissionTable, PhaseSpec, Sequencer, SequencerStatus, Transition};
pub use primitive::{MotionStatus, Primitive, PrimitiveSpec};
pub use sample::{ColorThreshold, Rgb, SensorSample};
