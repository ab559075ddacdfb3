//! Inverse kinematics for a three-armed parallel tilt platform.
//!
//! [`KinematicsSolver`] turns a platform pose (vertical offset plus a tilt
//! direction) into the drive angle of each of the three actuators. The
//! [`sweep`] module runs the solver over many poses to map out the reachable
//! workspace of a given geometry.

pub mod config;
pub mod solver;
pub mod sweep;

pub use solver::{Actuator, Angles, Geometry, KinematicsSolver, TiltNormal};
