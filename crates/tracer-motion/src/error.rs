//! This module defines the error types used by the `tracer-motion` crate.

#![warn(missing_docs)]

use thiserror::Error;
use tracer_kinematics::KinematicsError;

/// Error type for motion primitives.
///
/// A primitive that reports one of these has not issued any motion command.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MotionError {
    /// The primitive was invoked with parameters whose signs do not agree,
    /// e.g. a negative distance with positive power.
    #[error("argument out of range @ {primitive}: {reason}")]
    ContractViolation {
        /// Name of the rejecting primitive.
        primitive: &'static str,
        /// What was inconsistent.
        reason: &'static str,
    },
}

/// Error type for mission tables and the sequencer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MissionError {
    /// The table has no phases.
    #[error("mission `{0}` has no phases")]
    Empty(String),
    /// Two phases share a name.
    #[error("duplicate phase `{0}`")]
    DuplicatePhase(String),
    /// A transition or the initial phase names a phase that does not exist.
    #[error("unknown phase `{0}`")]
    UnknownPhase(String),
    /// A gate is configured with a window that can never fill.
    #[error("invalid gate in phase `{phase}`: {reason}")]
    InvalidGate {
        /// Phase holding the gate.
        phase: String,
        /// What is wrong with it.
        reason: &'static str,
    },
    /// The drive parameters were rejected.
    #[error(transparent)]
    Kinematics(#[from] KinematicsError),
}
