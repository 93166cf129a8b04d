//! Utilities related to numbers.

use num;
use std::fmt;

/// Floating point marker trait for easier control over trait bounds.
pub trait FmFloat: Sync + Send + num::Float + num::cast::FromPrimitive + fmt::Debug {}

impl FmFloat for f32 {}
impl FmFloat for f64 {}
