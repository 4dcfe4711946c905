#![warn(missing_docs)]

//! Error types for the kinematics library.
//!
//! This module defines the errors returned when a controller or estimator is
//! constructed with physically meaningless parameters.

use core::fmt;

/// Errors that can occur when setting up odometry or control parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum KinematicsError {
    /// Error for invalid wheel diameter.
    /// This variant is returned when a wheel diameter is provided that is not positive.
    InvalidWheelDiameter(&'static str),
    /// Error for invalid tread width.
    /// This variant is returned when the distance between the wheels is not positive.
    InvalidTread(&'static str),
    /// Error for an invalid encoder conversion factor.
    InvalidTickConversion(&'static str),
    /// Error for invalid sample period.
    /// This variant is returned when a PID controller is given a non-positive period.
    InvalidSamplePeriod(&'static str),
}

impl core::fmt::Display for KinematicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KinematicsError::InvalidWheelDiameter(msg) => write!(f, "Invalid wheel diameter: {}", msg),
            KinematicsError::InvalidTread(msg) => write!(f, "Invalid tread width: {}", msg),
            KinematicsError::InvalidTickConversion(msg) => {
                write!(f, "Invalid tick conversion factor: {}", msg)
            }
            KinematicsError::InvalidSamplePeriod(msg) => write!(f, "Invalid sample period: {}", msg),
        }
    }
}

impl core::error::Error for KinematicsError {}
