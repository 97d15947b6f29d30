//! Basic numerical concepts used throughout the program

#![allow(missing_docs)]

// Floating-point precision is configured here
#[cfg(feature = "f32")]
pub type Float = f32;
#[cfg(feature = "f32")]
pub use std::f32 as floats;
#[cfg(not(feature = "f32"))]
pub type Float = f64;
#[cfg(not(feature = "f32"))]
pub use std::f64 as floats;

/// Sentinel used by the ntuples for attributes that were never filled
pub const UNSET: Float = -1e10;

/// Mathematical functions
pub mod functions {
    use super::Float;

    /// Square of a number
    pub fn sqr(x: Float) -> Float {
        x * x
    }
}
