//! Uniform grids mapping array indices to physical coordinates.

use crate::{
    array::FieldArray,
    geometry::{Axis, FieldValue, Idx4, In4D, Point4},
    num::FmFloat,
};
use std::io;

/// Maximum number of samples in a multilinear interpolation neighborhood.
pub const LINEAR_SUPPORT_LEN: usize = 16;

/// Maximum number of samples in a cubic interpolation neighborhood.
pub const CUBIC_SUPPORT_LEN: usize = 256;

/// Uniform coordinate mapping for a single array axis.
///
/// The stored spatial coordinate of index `i` is `min + i*step`, with
/// `step = (max - min)/(n - 1)` for `n > 1` and 1 for a degenerate
/// (single-sample) axis. The label states which physical dimension the axis
/// represents; labels need not appear in x,y,z,t order.
#[derive(Clone, Copy, Debug)]
pub struct AxisSpec<F> {
    min: F,
    max: F,
    size: usize,
    label: Axis,
    step: F,
}

impl<F: FmFloat> AxisSpec<F> {
    /// Creates a new axis mapping from the spatial bounds and sample count.
    ///
    /// Fails when the derived step is zero or not finite.
    pub fn new(min: F, max: F, size: usize, label: Axis) -> io::Result<Self> {
        assert_ne!(size, 0, "Cannot create axis mapping with size zero");
        let step = if size > 1 {
            (max - min) / F::from_usize(size - 1).expect("Conversion failed")
        } else {
            F::one()
        };
        if !step.is_finite() || step == F::zero() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Invalid grid step {:?} derived from bounds [{:?}, {:?}] and {} samples along {}-axis",
                    step, min, max, size, label
                ),
            ));
        }
        Ok(Self {
            min,
            max,
            size,
            label,
            step,
        })
    }

    /// Creates a degenerate single-sample axis at spatial coordinate zero.
    pub fn degenerate(label: Axis) -> Self {
        Self {
            min: F::zero(),
            max: F::zero(),
            size: 1,
            label,
            step: F::one(),
        }
    }

    /// Returns the lower spatial bound of the axis.
    pub fn min(&self) -> F {
        self.min
    }

    /// Returns the upper spatial bound of the axis.
    pub fn max(&self) -> F {
        self.max
    }

    /// Returns the number of samples along the axis.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns the physical dimension the axis represents.
    pub fn label(&self) -> Axis {
        self.label
    }

    /// Returns the spatial distance between adjacent samples.
    pub fn step(&self) -> F {
        self.step
    }

    /// Computes the continuous array coordinate of the given spatial value.
    pub fn array_coord_from_spatial(&self, value: F) -> F {
        (value - self.min) / self.step
    }

    /// Computes the spatial value of the given continuous array coordinate.
    pub fn spatial_from_array_coord(&self, coord: F) -> F {
        self.min + coord * self.step
    }

    /// Returns the index of the sample nearest to the given spatial value.
    pub fn nearest_index(&self, value: F) -> isize {
        num::cast::<F, isize>(self.array_coord_from_spatial(value).round())
            .expect("Conversion failed")
    }

    /// Whether the given spatial value lies within the axis bounds.
    pub fn contains(&self, value: F) -> bool {
        let (lower, upper) = self.ordered_bounds();
        value >= lower && value <= upper
    }

    /// Returns the bounds ordered lower before upper.
    pub fn ordered_bounds(&self) -> (F, F) {
        if self.min <= self.max {
            (self.min, self.max)
        } else {
            (self.max, self.min)
        }
    }

    /// Constructs a copy of the mapping with replaced logical bounds.
    ///
    /// Used by index operators to report flipped or mirrored logical extents;
    /// the stored step is kept since the underlying samples do not move.
    pub fn with_limits(&self, min: F, max: F) -> Self {
        Self {
            min,
            max,
            size: self.size,
            label: self.label,
            step: self.step,
        }
    }
}

/// Spatial-temporal bounding box of a field's logical domain.
///
/// Physical dimensions without a stored array axis are unbounded and report
/// infinite limits.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize))]
pub struct FieldExtent<F> {
    lower: In4D<F>,
    upper: In4D<F>,
}

impl<F: FmFloat> FieldExtent<F> {
    /// Creates a new extent from the per-dimension bounds.
    pub fn new(lower: In4D<F>, upper: In4D<F>) -> Self {
        Self { lower, upper }
    }

    /// Returns the lower bound for the given physical dimension.
    pub fn lower_bound(&self, axis: Axis) -> F {
        self.lower[axis]
    }

    /// Returns the upper bound for the given physical dimension.
    pub fn upper_bound(&self, axis: Axis) -> F {
        self.upper[axis]
    }

    /// Whether the given point lies inside the extent.
    pub fn contains(&self, point: &Point4<F>) -> bool {
        Axis::slice()
            .iter()
            .all(|&axis| point[axis] >= self.lower[axis] && point[axis] <= self.upper[axis])
    }
}

/// The logical layout of a field-map grid: per-axis coordinate mappings,
/// rank, and the map from physical dimension labels to array axes.
#[derive(Clone, Debug)]
pub struct GridLayout<F> {
    axes: In4D<AxisSpec<F>>,
    rank: usize,
    label_map: In4D<Option<usize>>,
    smallest_spatial_step: F,
    time_varying: bool,
}

impl<F: FmFloat> GridLayout<F> {
    /// Creates a new layout from the mappings of the meaningful axes, in
    /// array-axis order. Trailing axes up to rank 4 are padded with
    /// degenerate single-sample mappings carrying the unused labels.
    ///
    /// Fails when two axes carry the same label.
    pub fn new(specs: &[AxisSpec<F>]) -> io::Result<Self> {
        let rank = specs.len();
        assert!(
            rank >= 1 && rank <= 4,
            "Grid layout requires between 1 and 4 axes, got {}",
            rank
        );

        let mut label_map = In4D::same(None);
        for (number, spec) in specs.iter().enumerate() {
            if label_map[spec.label()].is_some() {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("Two grid axes carry the same label {}", spec.label()),
                ));
            }
            label_map[spec.label()] = Some(number);
        }

        let mut unused_labels = Axis::slice()
            .into_iter()
            .filter(|&label| label_map[label].is_none());

        let mut padded: Vec<AxisSpec<F>> = specs.to_vec();
        while padded.len() < 4 {
            let label = unused_labels
                .next()
                .expect("At most three of four labels can be in use here");
            padded.push(AxisSpec::degenerate(label));
        }
        let axes = In4D::new(padded[0], padded[1], padded[2], padded[3]);

        let smallest_spatial_step = specs
            .iter()
            .filter(|spec| spec.label().is_spatial())
            .map(|spec| spec.step().abs())
            .fold(None, |smallest: Option<F>, step| {
                Some(smallest.map_or(step, |s| F::min(s, step)))
            })
            .unwrap_or_else(F::one);

        let time_varying = specs.iter().any(|spec| spec.label() == Axis::T);

        Ok(Self {
            axes,
            rank,
            label_map,
            smallest_spatial_step,
            time_varying,
        })
    }

    /// Returns the number of meaningful axes.
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Returns the mapping of the array axis with the given number.
    pub fn axis_spec(&self, number: usize) -> &AxisSpec<F> {
        &self.axes[Axis::slice()[number]]
    }

    /// Returns the number of the array axis representing the given physical
    /// dimension, if the grid stores one.
    pub fn axis_for_label(&self, label: Axis) -> Option<usize> {
        self.label_map[label]
    }

    /// Returns the 4D shape implied by the axis mappings.
    pub fn shape(&self) -> In4D<usize> {
        In4D::with_each_component(|axis| self.axes[axis].size())
    }

    /// Computes the continuous array coordinate of the given spatial value
    /// along the numbered array axis.
    pub fn array_coord_from_spatial(&self, number: usize, value: F) -> F {
        self.axis_spec(number).array_coord_from_spatial(value)
    }

    /// Computes the spatial value of the given continuous array coordinate
    /// along the numbered array axis.
    pub fn spatial_from_array_coord(&self, number: usize, coord: F) -> F {
        self.axis_spec(number).spatial_from_array_coord(coord)
    }

    /// Returns the index of the sample nearest to the given spatial value
    /// along the numbered array axis.
    pub fn nearest_index(&self, number: usize, value: F) -> isize {
        self.axis_spec(number).nearest_index(value)
    }

    /// Returns the smallest spatial distance between adjacent samples,
    /// typically consulted for integration step sizing.
    pub fn smallest_spatial_step(&self) -> F {
        self.smallest_spatial_step
    }

    /// Whether any axis represents the temporal dimension.
    pub fn time_varying(&self) -> bool {
        self.time_varying
    }

    /// Returns the logical bounding box; physical dimensions without a
    /// stored axis are unbounded.
    pub fn extent(&self) -> FieldExtent<F> {
        let lower = In4D::with_each_component(|label| match self.label_map[label] {
            Some(number) => self.axis_spec(number).ordered_bounds().0,
            None => F::neg_infinity(),
        });
        let upper = In4D::with_each_component(|label| match self.label_map[label] {
            Some(number) => self.axis_spec(number).ordered_bounds().1,
            None => F::infinity(),
        });
        FieldExtent::new(lower, upper)
    }

    /// Whether the given point lies outside the logical domain.
    pub fn outside_spatial(&self, point: &Point4<F>) -> bool {
        (0..self.rank).any(|number| {
            let spec = self.axis_spec(number);
            !spec.contains(point[spec.label()])
        })
    }

    /// Constructs a copy of the layout with per-axis logical bounds replaced
    /// by the given (min, max) pairs.
    pub fn with_transformed_limits(&self, limits: &In4D<(F, F)>) -> Self {
        let mut specs = Vec::with_capacity(self.rank);
        for number in 0..self.rank {
            let axis = Axis::slice()[number];
            let (min, max) = limits[axis];
            specs.push(self.axis_spec(number).with_limits(min, max));
        }
        Self::new(&specs).expect("Transforming limits preserves layout validity")
    }
}

/// A populated field-map grid: dense samples plus their coordinate layout.
#[derive(Clone, Debug)]
pub struct FieldGrid<F> {
    layout: GridLayout<F>,
    array: FieldArray<F>,
}

impl<F: FmFloat> FieldGrid<F> {
    /// Creates a new grid from a layout and a matching sample array.
    pub fn new(layout: GridLayout<F>, array: FieldArray<F>) -> Self {
        for axis in Axis::slice() {
            assert_eq!(
                layout.shape()[axis],
                array.shape()[axis],
                "Sample array shape does not match grid layout along {}-axis",
                axis
            );
        }
        Self { layout, array }
    }

    /// Creates a new zero-filled grid with the given axis mappings.
    pub fn new_zeroed(specs: &[AxisSpec<F>]) -> io::Result<Self> {
        let layout = GridLayout::new(specs)?;
        let array = FieldArray::new(layout.shape());
        Ok(Self { layout, array })
    }

    /// Returns a reference to the grid layout.
    pub fn layout(&self) -> &GridLayout<F> {
        &self.layout
    }

    /// Returns a reference to the sample array.
    pub fn array(&self) -> &FieldArray<F> {
        &self.array
    }

    /// Returns the value at the given index, or zero if out of range.
    pub fn get(&self, idx: &Idx4<isize>) -> FieldValue<F> {
        self.array.get(idx)
    }

    /// Stores the given value at the given index.
    ///
    /// # Panics
    ///
    /// If any index component is out of range.
    pub fn set(&mut self, idx: &Idx4<usize>, value: FieldValue<F>) {
        self.array.set(idx, value);
    }
}

/// Access seam shared by plain and symmetry-transformed grids.
///
/// Interpolators reconstruct continuous field values through this trait
/// alone, so a transformed decorator is indistinguishable from a raw grid.
pub trait FieldSampler<F: FmFloat>: Sync + Send {
    /// Returns the logical grid layout. Decorators report their extended
    /// logical limits here.
    fn layout(&self) -> &GridLayout<F>;

    /// Computes the continuous array coordinate of the given value along the
    /// numbered array axis, measured against the *stored* grid mapping.
    ///
    /// For transformed grids this deliberately uses the base mapping, so
    /// queries in a mirrored region produce out-of-range (e.g. negative)
    /// coordinates that the index operators then fold into storage.
    fn base_coord(&self, axis_number: usize, value: F) -> F;

    /// Returns the field value for the given logical index tuple, or the
    /// default (zero) value when the index falls outside the stored data.
    fn sample(&self, idx: &Idx4<isize>) -> FieldValue<F>;

    /// Computes, per meaningful axis, the continuous array coordinate of the
    /// given point, routing each physical coordinate to the array axis
    /// carrying its label.
    fn point_coords(&self, point: &Point4<F>) -> In4D<F> {
        let layout = self.layout();
        In4D::with_each_component(|axis| {
            let number = axis.num();
            if number < layout.rank() {
                self.base_coord(number, point[layout.axis_spec(number).label()])
            } else {
                F::zero()
            }
        })
    }

    /// Extracts the 2^D corner neighborhood around the given point together
    /// with the fractional offsets within the containing cell.
    ///
    /// Corners are ordered with the first axis fastest-varying. Corners
    /// outside the stored data come back as the default (zero) value.
    fn linear_support(
        &self,
        point: &Point4<F>,
    ) -> ([FieldValue<F>; LINEAR_SUPPORT_LEN], [F; 4]) {
        let rank = self.layout().rank();
        let coords = self.point_coords(point);

        let mut base = Idx4::origin();
        let mut fracs = [F::zero(); 4];
        for (number, &axis) in Axis::slice().iter().enumerate().take(rank) {
            let coord = coords[axis];
            let floor = coord.floor();
            base[axis] = num::cast::<F, isize>(floor).expect("Conversion failed");
            fracs[number] = coord - floor;
        }

        let mut values = [FieldValue::zero(); LINEAR_SUPPORT_LEN];
        for (corner, value) in values.iter_mut().enumerate().take(1 << rank) {
            let mut idx = base;
            for (number, &axis) in Axis::slice().iter().enumerate().take(rank) {
                if corner >> number & 1 == 1 {
                    idx[axis] += 1;
                }
            }
            *value = self.sample(&idx);
        }
        (values, fracs)
    }

    /// Extracts the 4^D neighborhood spanning indices i-1..i+2 per axis
    /// around the given point together with the fractional offsets.
    ///
    /// Samples beyond the stored data come back as the default (zero) value,
    /// giving cubic interpolation an implicit drop-to-zero boundary.
    fn cubic_support(&self, point: &Point4<F>) -> ([FieldValue<F>; CUBIC_SUPPORT_LEN], [F; 4]) {
        let rank = self.layout().rank();
        let coords = self.point_coords(point);

        let mut base = Idx4::origin();
        let mut fracs = [F::zero(); 4];
        for (number, &axis) in Axis::slice().iter().enumerate().take(rank) {
            let coord = coords[axis];
            let floor = coord.floor();
            base[axis] = num::cast::<F, isize>(floor).expect("Conversion failed");
            fracs[number] = coord - floor;
        }

        let mut values = [FieldValue::zero(); CUBIC_SUPPORT_LEN];
        for (flat, value) in values.iter_mut().enumerate().take(4usize.pow(rank as u32)) {
            let mut idx = base;
            let mut remaining = flat;
            for &axis in Axis::slice().iter().take(rank) {
                idx[axis] += (remaining % 4) as isize - 1;
                remaining /= 4;
            }
            *value = self.sample(&idx);
        }
        (values, fracs)
    }
}

impl<F: FmFloat> FieldSampler<F> for FieldGrid<F> {
    fn layout(&self) -> &GridLayout<F> {
        &self.layout
    }

    fn base_coord(&self, axis_number: usize, value: F) -> F {
        self.layout.array_coord_from_spatial(axis_number, value)
    }

    fn sample(&self, idx: &Idx4<isize>) -> FieldValue<F> {
        self.array.get(idx)
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use approx::assert_abs_diff_eq;

    fn spec(min: f64, max: f64, size: usize, label: Axis) -> AxisSpec<f64> {
        AxisSpec::new(min, max, size, label).unwrap()
    }

    #[test]
    fn axis_step_derivation_works() {
        let axis = spec(-1.0, 1.0, 5, Axis::X);
        assert_abs_diff_eq!(axis.step(), 0.5);
        assert_abs_diff_eq!(axis.array_coord_from_spatial(0.25), 2.5);
        assert_abs_diff_eq!(axis.spatial_from_array_coord(2.5), 0.25);
        assert_eq!(axis.nearest_index(0.3), 3);
        assert_eq!(axis.nearest_index(-1.1), 0);
    }

    #[test]
    fn degenerate_axis_has_unit_step() {
        let axis = AxisSpec::<f64>::degenerate(Axis::T);
        assert_eq!(axis.size(), 1);
        assert_eq!(axis.step(), 1.0);
    }

    #[test]
    fn invalid_axis_steps_are_rejected() {
        assert!(AxisSpec::new(2.0, 2.0, 5, Axis::X).is_err());
        assert!(AxisSpec::new(0.0, f64::INFINITY, 5, Axis::X).is_err());
        assert!(AxisSpec::new(0.0, f64::NAN, 5, Axis::X).is_err());
        assert!(AxisSpec::new(0.0, 1.0, 2, Axis::X).is_ok());
    }

    #[test]
    fn labels_map_to_array_axes_in_any_order() {
        let layout = GridLayout::new(&[spec(0.0, 4.0, 5, Axis::Z)]).unwrap();
        assert_eq!(layout.rank(), 1);
        assert_eq!(layout.axis_for_label(Axis::Z), Some(0));
        assert_eq!(layout.axis_for_label(Axis::X), None);
        assert!(!layout.time_varying());

        let layout =
            GridLayout::new(&[spec(0.0, 1.0, 2, Axis::Y), spec(0.0, 1.0, 2, Axis::T)]).unwrap();
        assert_eq!(layout.axis_for_label(Axis::T), Some(1));
        assert!(layout.time_varying());
    }

    #[test]
    fn duplicate_labels_are_rejected() {
        assert!(
            GridLayout::new(&[spec(0.0, 1.0, 2, Axis::X), spec(0.0, 1.0, 2, Axis::X)]).is_err()
        );
    }

    #[test]
    fn extent_reports_unbounded_missing_dimensions() {
        let layout = GridLayout::new(&[spec(0.0, 4.0, 5, Axis::Z)]).unwrap();
        let extent = layout.extent();
        assert_eq!(extent.lower_bound(Axis::Z), 0.0);
        assert_eq!(extent.upper_bound(Axis::Z), 4.0);
        assert_eq!(extent.lower_bound(Axis::X), f64::NEG_INFINITY);
        assert_eq!(extent.upper_bound(Axis::Y), f64::INFINITY);
        assert!(extent.contains(&Point4::new(100.0, -100.0, 2.0, 0.0)));
        assert!(!extent.contains(&Point4::new(0.0, 0.0, 4.5, 0.0)));
    }

    #[test]
    fn outside_spatial_respects_labels() {
        let layout = GridLayout::new(&[spec(0.0, 4.0, 5, Axis::Z)]).unwrap();
        assert!(!layout.outside_spatial(&Point4::new(99.0, 99.0, 2.0, 99.0)));
        assert!(layout.outside_spatial(&Point4::new(0.0, 0.0, -0.5, 0.0)));
    }

    #[test]
    fn smallest_spatial_step_ignores_time() {
        let layout = GridLayout::new(&[
            spec(0.0, 10.0, 11, Axis::X),
            spec(0.0, 1.0, 5, Axis::Y),
            spec(0.0, 100.0, 2, Axis::T),
        ])
        .unwrap();
        assert_abs_diff_eq!(layout.smallest_spatial_step(), 0.25);
    }

    fn ramp_grid() -> FieldGrid<f64> {
        // 1D ramp along x: F(x) = (x, 0, 0) on x = 0..=4
        let mut grid = FieldGrid::new_zeroed(&[spec(0.0, 4.0, 5, Axis::X)]).unwrap();
        for i in 0..5 {
            grid.set(
                &Idx4::new(i, 0, 0, 0),
                FieldValue::new(i as f64, 0.0, 0.0),
            );
        }
        grid
    }

    #[test]
    fn linear_support_extracts_cell_corners() {
        let grid = ramp_grid();
        let (values, fracs) = grid.linear_support(&Point4::spatial(1.25, 0.0, 0.0));
        assert_abs_diff_eq!(fracs[0], 0.25);
        assert_eq!(values[0], FieldValue::new(1.0, 0.0, 0.0));
        assert_eq!(values[1], FieldValue::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn cubic_support_defaults_to_zero_beyond_bounds() {
        let grid = ramp_grid();
        let (values, fracs) = grid.cubic_support(&Point4::spatial(0.5, 0.0, 0.0));
        assert_abs_diff_eq!(fracs[0], 0.5);
        // Neighborhood indices -1..=2: the leading sample is outside.
        assert_eq!(values[0], FieldValue::zero());
        assert_eq!(values[1], FieldValue::new(0.0, 0.0, 0.0));
        assert_eq!(values[2], FieldValue::new(1.0, 0.0, 0.0));
        assert_eq!(values[3], FieldValue::new(2.0, 0.0, 0.0));
    }
}
