//! Slice-to-slice in-plane motion correction.
//!
//! Given a stack of 2D slices cut from a 3D volume, this crate projects
//! each slice into its local in-plane frame, fits one 2D rigid transform
//! per slice against its neighbor in the stack by joint nonlinear least
//! squares, and composes the fitted corrections back into 3D affine
//! updates of each slice's placement.

pub mod error;
pub mod inplane;
pub mod solver;

pub use error::{RegistrationError, Result};
pub use inplane::{InPlaneRegistration, InPlaneRegistrationConfig};
pub use solver::{LeastSquaresFit, LeastSquaresOptions, Loss, Method};
