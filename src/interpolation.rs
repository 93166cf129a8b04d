//! Interpolation of field-map samples at arbitrary query points.

use crate::{
    geometry::{Axis, FieldValue, Idx4, Point4},
    grid::{FieldExtent, FieldSampler},
    num::FmFloat,
};
use std::{
    fmt, io,
    ops::{Add, Mul, Sub},
    str::FromStr,
    sync::Arc,
};

/// Computes the linear blend of two samples at the given fractional offset.
pub fn interp_linear_1d<F, T>(p0: T, p1: T, frac: F) -> T
where
    F: FmFloat,
    T: Add<Output = T> + Mul<F, Output = T> + Copy,
{
    p0 * (F::one() - frac) + p1 * frac
}

/// Computes the multilinear blend of a 2^D block of samples, ordered with
/// the first axis fastest-varying, at the given per-axis fractional offsets.
///
/// The reduction folds the last axis first and recurses down to the 1D
/// blend.
pub fn interp_linear_nd<F, T>(values: &[T], fracs: &[F]) -> T
where
    F: FmFloat,
    T: Add<Output = T> + Mul<F, Output = T> + Copy,
{
    let rank = fracs.len();
    debug_assert_eq!(values.len(), 1 << rank);
    if rank == 1 {
        interp_linear_1d(values[0], values[1], fracs[0])
    } else {
        let half = values.len() / 2;
        interp_linear_1d(
            interp_linear_nd(&values[..half], &fracs[..rank - 1]),
            interp_linear_nd(&values[half..], &fracs[..rank - 1]),
            fracs[rank - 1],
        )
    }
}

/// Computes the cubic convolution of four consecutive samples at the given
/// fractional offset between the middle two.
///
/// The polynomial is the Catmull-Rom kernel
/// `p1 + 0.5*t*(p2-p0 + t*(2p0-5p1+4p2-p3 + t*(3*(p1-p2)+p3-p0)))`,
/// which passes through `p1` and `p2` and reproduces linear and quadratic
/// sample sequences exactly.
pub fn interp_cubic_1d<F, T>(p: [T; 4], frac: F) -> T
where
    F: FmFloat,
    T: Add<Output = T> + Sub<Output = T> + Mul<F, Output = T> + Copy,
{
    let one = F::one();
    let two = one + one;
    let three = two + one;
    let four = two + two;
    let five = four + one;
    let half = one / two;

    let linear_term = p[2] - p[0];
    let quadratic_term = p[0] * two - p[1] * five + p[2] * four - p[3];
    let cubic_term = (p[1] - p[2]) * three + p[3] - p[0];

    p[1] + (linear_term + (quadratic_term + cubic_term * frac) * frac) * (half * frac)
}

/// Computes the cubic convolution of a 4^D block of samples, ordered with
/// the first axis fastest-varying, at the given per-axis fractional offsets.
///
/// Folds the last axis first, recursing exactly as the linear reduction.
pub fn interp_cubic_nd<F, T>(values: &[T], fracs: &[F]) -> T
where
    F: FmFloat,
    T: Add<Output = T> + Sub<Output = T> + Mul<F, Output = T> + Copy,
{
    let rank = fracs.len();
    debug_assert_eq!(values.len(), 4usize.pow(rank as u32));
    if rank == 1 {
        interp_cubic_1d([values[0], values[1], values[2], values[3]], fracs[0])
    } else {
        let stride = values.len() / 4;
        let sub =
            |plane: usize| interp_cubic_nd(&values[plane * stride..(plane + 1) * stride], &fracs[..rank - 1]);
        interp_cubic_1d([sub(0), sub(1), sub(2), sub(3)], fracs[rank - 1])
    }
}

/// Strategy for reconstructing a continuous field value from grid samples.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InterpolationMethod {
    /// The sample at the nearest grid point, unblended.
    Nearest,
    /// Multilinear blend of the 2^D cell corners.
    Linear,
    /// Multilinear blend rescaled so its magnitude matches the separately
    /// blended corner magnitudes, smoothing magnitude behavior near field
    /// extrema.
    LinearMagnitude,
    /// Cubic convolution over the 4^D neighborhood.
    Cubic,
}

impl InterpolationMethod {
    /// Returns the name of the method.
    pub fn name(self) -> &'static str {
        match self {
            Self::Nearest => "nearest",
            Self::Linear => "linear",
            Self::LinearMagnitude => "linearmag",
            Self::Cubic => "cubic",
        }
    }
}

impl fmt::Display for InterpolationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A requested interpolator type: a method, optionally pinned to an explicit
/// grid dimensionality ("cubic2d"); without the suffix the dimensionality is
/// resolved from the grid itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InterpolatorSpec {
    pub method: InterpolationMethod,
    pub dimensions: Option<usize>,
}

impl InterpolatorSpec {
    /// Creates a new spec resolving its dimensionality from the grid.
    pub fn auto(method: InterpolationMethod) -> Self {
        Self {
            method,
            dimensions: None,
        }
    }

    /// Returns the concrete method for a grid of the given rank, failing
    /// when an explicitly requested dimensionality disagrees with it.
    pub fn resolve(&self, rank: usize) -> io::Result<InterpolationMethod> {
        match self.dimensions {
            Some(dimensions) if dimensions != rank => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Interpolator {} requires a {}-dimensional grid, but the grid has {} dimensions",
                    self, dimensions, rank
                ),
            )),
            _ => Ok(self.method),
        }
    }
}

impl fmt::Display for InterpolatorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.dimensions {
            Some(dimensions) => write!(f, "{}{}d", self.method, dimensions),
            None => fmt::Display::fmt(&self.method, f),
        }
    }
}

impl FromStr for InterpolatorSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        let (method_name, dimensions) = match lower.strip_suffix('d') {
            Some(rest) if rest.ends_with(|c: char| c.is_ascii_digit()) => {
                let digit = rest
                    .chars()
                    .last()
                    .and_then(|c| c.to_digit(10))
                    .expect("Suffix digit was checked to be present") as usize;
                (&rest[..rest.len() - 1], Some(digit))
            }
            _ => (lower.as_str(), None),
        };

        if let Some(dimensions) = dimensions {
            if !(1..=4).contains(&dimensions) {
                return Err(format!("invalid interpolator dimensionality in {}", s));
            }
        }

        let method = match method_name {
            "nearest" => InterpolationMethod::Nearest,
            "linear" => InterpolationMethod::Linear,
            "linearmag" => InterpolationMethod::LinearMagnitude,
            "cubic" => InterpolationMethod::Cubic,
            _ => return Err(format!("invalid interpolator type {}", s)),
        };

        Ok(Self { method, dimensions })
    }
}

/// Reconstructs continuous field values over a (possibly transformed) grid.
///
/// This is the object the particle-transport layer queries on every
/// integration step: it exposes the field value at an arbitrary point, the
/// logical extent, the time-varying flag and the smallest spatial step of
/// the underlying grid (the latter two cached at construction).
#[derive(Clone)]
pub struct FieldInterpolator<F> {
    sampler: Arc<dyn FieldSampler<F>>,
    method: InterpolationMethod,
    smallest_spatial_step: F,
    time_varying: bool,
}

impl<F: FmFloat> FieldInterpolator<F> {
    /// Creates a new interpolator over the given sampler.
    pub fn new(sampler: Arc<dyn FieldSampler<F>>, method: InterpolationMethod) -> Self {
        let smallest_spatial_step = sampler.layout().smallest_spatial_step();
        let time_varying = sampler.layout().time_varying();
        Self {
            sampler,
            method,
            smallest_spatial_step,
            time_varying,
        }
    }

    /// Returns the interpolation method.
    pub fn method(&self) -> InterpolationMethod {
        self.method
    }

    /// Returns a reference to the underlying sampler.
    pub fn sampler(&self) -> &Arc<dyn FieldSampler<F>> {
        &self.sampler
    }

    /// Returns the logical bounding box of the field.
    pub fn extent(&self) -> FieldExtent<F> {
        self.sampler.layout().extent()
    }

    /// Whether the field varies in time.
    pub fn time_varying(&self) -> bool {
        self.time_varying
    }

    /// Returns the smallest spatial distance between adjacent samples.
    pub fn smallest_spatial_step(&self) -> F {
        self.smallest_spatial_step
    }

    /// Computes the field value at the given point.
    ///
    /// Points outside the logical domain silently yield the zero value;
    /// downstream integration relies on this to mean "no field here".
    pub fn get_value(&self, point: &Point4<F>) -> FieldValue<F> {
        if self.sampler.layout().outside_spatial(point) {
            return FieldValue::zero();
        }
        match self.method {
            InterpolationMethod::Nearest => self.nearest(point),
            InterpolationMethod::Linear => self.linear(point),
            InterpolationMethod::LinearMagnitude => self.linear_magnitude(point),
            InterpolationMethod::Cubic => self.cubic(point),
        }
    }

    fn nearest(&self, point: &Point4<F>) -> FieldValue<F> {
        let layout = self.sampler.layout();
        let mut idx = Idx4::origin();
        for (number, &axis) in Axis::slice().iter().enumerate().take(layout.rank()) {
            let coord = self
                .sampler
                .base_coord(number, point[layout.axis_spec(number).label()]);
            idx[axis] = num::cast::<F, isize>(coord.round()).expect("Conversion failed");
        }
        self.sampler.sample(&idx)
    }

    fn linear(&self, point: &Point4<F>) -> FieldValue<F> {
        let rank = self.sampler.layout().rank();
        let (values, fracs) = self.sampler.linear_support(point);
        interp_linear_nd(&values[..1 << rank], &fracs[..rank])
    }

    fn linear_magnitude(&self, point: &Point4<F>) -> FieldValue<F> {
        let rank = self.sampler.layout().rank();
        let (values, fracs) = self.sampler.linear_support(point);
        let blended = interp_linear_nd(&values[..1 << rank], &fracs[..rank]);

        let mut magnitudes = [F::zero(); crate::grid::LINEAR_SUPPORT_LEN];
        for (magnitude, value) in magnitudes.iter_mut().zip(values.iter()) {
            *magnitude = value.magnitude();
        }
        let blended_magnitude = interp_linear_nd(&magnitudes[..1 << rank], &fracs[..rank]);

        let ratio = blended_magnitude / blended.magnitude();
        let ratio = if ratio.is_nan() { F::one() } else { ratio };
        blended * ratio
    }

    fn cubic(&self, point: &Point4<F>) -> FieldValue<F> {
        let rank = self.sampler.layout().rank();
        let (values, fracs) = self.sampler.cubic_support(point);
        interp_cubic_nd(&values[..4usize.pow(rank as u32)], &fracs[..rank])
    }
}

impl<F: FmFloat> fmt::Debug for FieldInterpolator<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldInterpolator")
            .field("method", &self.method)
            .field("smallest_spatial_step", &self.smallest_spatial_step)
            .field("time_varying", &self.time_varying)
            .finish()
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::grid::{AxisSpec, FieldGrid};
    use approx::assert_abs_diff_eq;

    #[test]
    fn linear_kernel_blends_between_samples() {
        assert_abs_diff_eq!(interp_linear_1d(2.0, 6.0, 0.25), 3.0);
        assert_abs_diff_eq!(interp_linear_1d(2.0, 6.0, 0.0), 2.0);
        assert_abs_diff_eq!(interp_linear_1d(2.0, 6.0, 1.0), 6.0);
    }

    #[test]
    fn bilinear_blend_folds_last_axis_first() {
        // Corners ordered x fastest: (0,0), (1,0), (0,1), (1,1).
        let values = [1.0, 3.0, 5.0, 7.0];
        let fracs = [0.5, 0.5];
        assert_abs_diff_eq!(interp_linear_nd(&values, &fracs), 4.0);
        // Pure-x blend leaves the y-planes untouched.
        assert_abs_diff_eq!(interp_linear_nd(&values, &[0.25, 0.0]), 1.5);
        // Pure-y blend crosses the halves.
        assert_abs_diff_eq!(interp_linear_nd(&values, &[0.0, 0.25]), 2.0);
    }

    #[test]
    fn cubic_kernel_is_node_exact_and_linear_exact() {
        let ramp = [0.0, 1.0, 2.0, 3.0];
        assert_abs_diff_eq!(interp_cubic_1d(ramp, 0.0), 1.0);
        assert_abs_diff_eq!(interp_cubic_1d(ramp, 1.0), 2.0);
        assert_abs_diff_eq!(interp_cubic_1d(ramp, 0.5), 1.5);
        assert_abs_diff_eq!(interp_cubic_1d(ramp, 0.25), 1.25);

        let parabola = [1.0, 0.0, 1.0, 4.0]; // f(x) = x^2 at -1..2
        assert_abs_diff_eq!(interp_cubic_1d(parabola, 0.5), 0.25);
        assert_abs_diff_eq!(interp_cubic_1d(parabola, 0.25), 0.0625);
    }

    #[test]
    fn interpolator_specs_parse_and_resolve() {
        let spec: InterpolatorSpec = "cubic".parse().unwrap();
        assert_eq!(spec.method, InterpolationMethod::Cubic);
        assert_eq!(spec.dimensions, None);
        assert_eq!(spec.resolve(3).unwrap(), InterpolationMethod::Cubic);

        let spec: InterpolatorSpec = "linearmag3d".parse().unwrap();
        assert_eq!(spec.method, InterpolationMethod::LinearMagnitude);
        assert_eq!(spec.dimensions, Some(3));
        assert_eq!(spec.to_string(), "linearmag3d");
        assert!(spec.resolve(2).is_err());

        let spec: InterpolatorSpec = "nearest2d".parse().unwrap();
        assert_eq!(spec.resolve(2).unwrap(), InterpolationMethod::Nearest);

        assert!("quintic".parse::<InterpolatorSpec>().is_err());
        assert!("cubic5d".parse::<InterpolatorSpec>().is_err());
    }

    fn ramp_grid_1d() -> Arc<FieldGrid<f64>> {
        // F(x) = (2x + 1, 0, 0) sampled on x = 0..=4
        let mut grid =
            FieldGrid::new_zeroed(&[AxisSpec::new(0.0, 4.0, 5, Axis::X).unwrap()]).unwrap();
        for i in 0..5_usize {
            grid.set(
                &Idx4::new(i, 0, 0, 0),
                FieldValue::new(2.0 * i as f64 + 1.0, 0.0, 0.0),
            );
        }
        Arc::new(grid)
    }

    #[test]
    fn nearest_returns_the_stored_sample() {
        let interpolator =
            FieldInterpolator::new(ramp_grid_1d(), InterpolationMethod::Nearest);
        assert_eq!(
            interpolator.get_value(&Point4::spatial(2.0, 0.0, 0.0)),
            FieldValue::new(5.0, 0.0, 0.0)
        );
        // Rounds to the nearest grid point, no blending.
        assert_eq!(
            interpolator.get_value(&Point4::spatial(2.4, 0.0, 0.0)),
            FieldValue::new(5.0, 0.0, 0.0)
        );
        assert_eq!(
            interpolator.get_value(&Point4::spatial(2.6, 0.0, 0.0)),
            FieldValue::new(7.0, 0.0, 0.0)
        );
    }

    #[test]
    fn linear_is_exact_at_nodes_and_blends_within_cells() {
        let interpolator = FieldInterpolator::new(ramp_grid_1d(), InterpolationMethod::Linear);
        assert_abs_diff_eq!(
            interpolator
                .get_value(&Point4::spatial(3.0, 0.0, 0.0))
                .x(),
            7.0
        );
        assert_abs_diff_eq!(
            interpolator
                .get_value(&Point4::spatial(2.5, 0.0, 0.0))
                .x(),
            6.0
        );
        // Continuity approaching a node from inside the cell.
        assert_abs_diff_eq!(
            interpolator
                .get_value(&Point4::spatial(3.0 - 1e-9, 0.0, 0.0))
                .x(),
            7.0,
            epsilon = 1e-7
        );
    }

    #[test]
    fn cubic_reproduces_a_linear_ramp_exactly_in_the_interior() {
        let interpolator = FieldInterpolator::new(ramp_grid_1d(), InterpolationMethod::Cubic);
        // All four support samples in range: exact for the degree-1 ramp.
        assert_abs_diff_eq!(
            interpolator
                .get_value(&Point4::spatial(1.75, 0.0, 0.0))
                .x(),
            4.5
        );
        assert_abs_diff_eq!(
            interpolator
                .get_value(&Point4::spatial(2.25, 0.0, 0.0))
                .x(),
            5.5
        );
        // Node-exact even where the support clips the boundary.
        assert_abs_diff_eq!(
            interpolator
                .get_value(&Point4::spatial(0.0, 0.0, 0.0))
                .x(),
            1.0
        );
    }

    #[test]
    fn every_method_returns_zero_outside_the_domain() {
        for method in [
            InterpolationMethod::Nearest,
            InterpolationMethod::Linear,
            InterpolationMethod::LinearMagnitude,
            InterpolationMethod::Cubic,
        ] {
            let interpolator = FieldInterpolator::new(ramp_grid_1d(), method);
            assert_eq!(
                interpolator.get_value(&Point4::spatial(-0.1, 0.0, 0.0)),
                FieldValue::zero()
            );
            assert_eq!(
                interpolator.get_value(&Point4::spatial(4.3, 0.0, 0.0)),
                FieldValue::zero()
            );
        }
    }

    #[test]
    fn linear_magnitude_preserves_the_blended_magnitude() {
        // Two corners of equal magnitude pointing in different directions:
        // the naive blend shrinks, the magnitude blend must not.
        let mut grid =
            FieldGrid::new_zeroed(&[AxisSpec::new(0.0, 1.0, 2, Axis::X).unwrap()]).unwrap();
        grid.set(&Idx4::new(0, 0, 0, 0), FieldValue::new(3.0, 4.0, 0.0));
        grid.set(&Idx4::new(1, 0, 0, 0), FieldValue::new(0.0, -5.0, 0.0));

        let interpolator =
            FieldInterpolator::new(Arc::new(grid), InterpolationMethod::LinearMagnitude);
        let value = interpolator.get_value(&Point4::spatial(0.5, 0.0, 0.0));
        assert_abs_diff_eq!(value.magnitude(), 5.0, epsilon = 1e-12);

        // Direction still follows the naive blend.
        let naive = FieldValue::new(1.5, -0.5, 0.0);
        assert_abs_diff_eq!(
            value.dot(&naive) / (value.magnitude() * naive.magnitude()),
            1.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn four_dimensional_linear_blend_is_exact_for_multilinear_fields() {
        // F = x + 10y + 100z + 1000t in the x-component: multilinear, so the
        // quadlinear blend is exact everywhere inside the domain.
        let specs = [
            AxisSpec::new(0.0, 1.0, 2, Axis::X).unwrap(),
            AxisSpec::new(0.0, 1.0, 2, Axis::Y).unwrap(),
            AxisSpec::new(0.0, 1.0, 2, Axis::Z).unwrap(),
            AxisSpec::new(0.0, 1.0, 2, Axis::T).unwrap(),
        ];
        let mut grid = FieldGrid::new_zeroed(&specs).unwrap();
        for i in 0..2_usize {
            for j in 0..2_usize {
                for k in 0..2_usize {
                    for l in 0..2_usize {
                        grid.set(
                            &Idx4::new(i, j, k, l),
                            FieldValue::new(
                                i as f64 + 10.0 * j as f64 + 100.0 * k as f64 + 1000.0 * l as f64,
                                0.0,
                                0.0,
                            ),
                        );
                    }
                }
            }
        }
        let interpolator = FieldInterpolator::new(Arc::new(grid), InterpolationMethod::Linear);
        let value = interpolator.get_value(&Point4::new(0.5, 0.25, 0.75, 0.1));
        assert_abs_diff_eq!(value.x(), 0.5 + 2.5 + 75.0 + 100.0, epsilon = 1e-12);
        assert!(interpolator.time_varying());
    }
}
