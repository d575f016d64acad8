//! Scalar trait for matrix and vector entries.

use faer_traits::ComplexField;
use std::fmt::Debug;
use std::ops::{Add, Mul, Sub};

pub use faer::c64;

/// Trait for scalar types supported by blockcrs.
///
/// Wraps faer's `ComplexField` and adds the arithmetic and thread-safety
/// bounds the block kernels rely on.
pub trait Scalar:
    ComplexField
    + Copy
    + Debug
    + Default
    + PartialEq
    + Send
    + Sync
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + 'static
{
    /// Returns the additive identity (zero).
    fn zero() -> Self {
        Self::default()
    }

    /// Returns the multiplicative identity (one).
    fn one() -> Self;

    /// True when the value is exactly zero.
    ///
    /// The apply kernel uses this to skip reading inputs scaled by zero.
    #[inline]
    fn is_zero(&self) -> bool {
        *self == Self::zero()
    }
}

impl Scalar for f64 {
    fn one() -> Self {
        1.0
    }
}

impl Scalar for c64 {
    fn one() -> Self {
        c64::new(1.0, 0.0)
    }
}
