//! Stack and slice containers for motion-corrected reconstruction.
//!
//! A [`Stack`] is an ordered sequence of [`Slice`]s cut from a 3D volume
//! along the through-plane axis. Each slice carries its own [`Placement`]
//! in physical space, which motion correction updates independently.

pub mod placement;
pub mod slice;
#[allow(clippy::module_inception)]
pub mod stack;

pub use placement::Placement;
pub use slice::Slice;
pub use stack::Stack;

use thiserror::Error;

/// Errors raised by the stack and slice containers.
///
/// These are configuration errors: they are raised at construction time
/// and are not recoverable within the pipeline.
#[derive(Error, Debug)]
pub enum StackError {
    /// A stack needs at least one slice.
    #[error("stack requires at least one slice")]
    EmptyStack,

    /// Slice data must hold exactly one plane along the through-plane axis.
    #[error("slice data must be a single plane, got shape {shape:?}")]
    NotSinglePlane { shape: Vec<usize> },

    /// Mask geometry must match the slice it belongs to.
    #[error("mask shape {mask:?} does not match slice shape {slice:?}")]
    MaskShapeMismatch { slice: Vec<usize>, mask: Vec<usize> },
}
