//! Dense storage of field-map samples.

use crate::{
    geometry::{Axis, FieldValue, Idx4, In4D},
    num::FmFloat,
};
use ndarray::{Array4, ShapeBuilder};

/// A dense rank-4 array of field values.
///
/// Samples are stored contiguously with the first axis fastest-varying, so
/// adjacent x-indices are adjacent in memory. Lower-rank maps pin their
/// trailing axes to size 1. Dimensions are fixed at construction.
#[derive(Clone, Debug)]
pub struct FieldArray<F> {
    values: Array4<FieldValue<F>>,
    shape: In4D<usize>,
}

impl<F: FmFloat> FieldArray<F> {
    /// Creates a new zero-filled array with the given shape.
    pub fn new(shape: In4D<usize>) -> Self {
        for axis in Axis::slice() {
            assert_ne!(
                shape[axis], 0,
                "Cannot create array with size zero along any dimension"
            );
        }
        let values = Array4::from_elem(shape.to_tuple().f(), FieldValue::zero());
        Self { values, shape }
    }

    /// Creates a new array with the given shape from a flat vector of values
    /// ordered with the first axis fastest-varying.
    pub fn from_values(shape: In4D<usize>, values: Vec<FieldValue<F>>) -> Self {
        let (size_x, size_y, size_z, size_t) = shape.to_tuple();
        assert_eq!(
            values.len(),
            size_x * size_y * size_z * size_t,
            "Number of values does not match array shape"
        );
        let values = Array4::from_shape_vec((size_x, size_y, size_z, size_t).f(), values)
            .expect("Shape and value count were checked to be consistent");
        Self { values, shape }
    }

    /// Returns the 4D shape of the array.
    pub fn shape(&self) -> &In4D<usize> {
        &self.shape
    }

    /// Returns the total number of stored samples.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the array holds no samples.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns a reference to the underlying values.
    pub fn values(&self) -> &Array4<FieldValue<F>> {
        &self.values
    }

    /// Whether the given index lies outside the array bounds.
    pub fn outside(&self, idx: &Idx4<isize>) -> bool {
        Axis::slice()
            .iter()
            .any(|&axis| idx[axis] < 0 || idx[axis] >= self.shape[axis] as isize)
    }

    /// Returns the value at the given index, or the shared default (zero)
    /// value if any index component is out of range.
    pub fn get(&self, idx: &Idx4<isize>) -> FieldValue<F> {
        if self.outside(idx) {
            FieldValue::zero()
        } else {
            self.values[[
                idx[Axis::X] as usize,
                idx[Axis::Y] as usize,
                idx[Axis::Z] as usize,
                idx[Axis::T] as usize,
            ]]
        }
    }

    /// Stores the given value at the given index.
    ///
    /// # Panics
    ///
    /// If any index component is out of range. Out-of-range writes indicate a
    /// defective loader and are fatal, unlike out-of-range reads.
    pub fn set(&mut self, idx: &Idx4<usize>, value: FieldValue<F>) {
        for axis in Axis::slice() {
            assert!(
                idx[axis] < self.shape[axis],
                "Index {} out of range along {}-axis of size {}",
                idx[axis],
                axis,
                self.shape[axis]
            );
        }
        self.values[[idx[Axis::X], idx[Axis::Y], idx[Axis::Z], idx[Axis::T]]] = value;
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    fn filled_array() -> FieldArray<f64> {
        let mut array = FieldArray::new(In4D::new(3, 2, 1, 1));
        for i in 0..3 {
            for j in 0..2 {
                array.set(
                    &Idx4::new(i, j, 0, 0),
                    FieldValue::new((i * 10 + j) as f64, 0.0, 0.0),
                );
            }
        }
        array
    }

    #[test]
    fn stored_values_are_recovered_by_index() {
        let array = filled_array();
        assert_eq!(
            array.get(&Idx4::new(2, 1, 0, 0)),
            FieldValue::new(21.0, 0.0, 0.0)
        );
        assert_eq!(array.len(), 6);
    }

    #[test]
    fn out_of_range_read_yields_default_value() {
        let array = filled_array();
        assert_eq!(array.get(&Idx4::new(-1, 0, 0, 0)), FieldValue::zero());
        assert_eq!(array.get(&Idx4::new(0, 0, 0, 5)), FieldValue::zero());
        assert!(array.outside(&Idx4::new(3, 0, 0, 0)));
        assert!(!array.outside(&Idx4::new(2, 1, 0, 0)));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn out_of_range_write_panics() {
        let mut array = filled_array();
        array.set(&Idx4::new(0, 2, 0, 0), FieldValue::zero());
    }

    #[test]
    #[should_panic(expected = "size zero")]
    fn zero_sized_dimension_is_rejected() {
        let _ = FieldArray::<f64>::new(In4D::new(3, 0, 1, 1));
    }

    #[test]
    fn flat_values_are_first_axis_fastest() {
        let values = (0..6)
            .map(|n| FieldValue::new(n as f64, 0.0, 0.0))
            .collect();
        let array = FieldArray::from_values(In4D::new(3, 2, 1, 1), values);
        assert_eq!(
            array.get(&Idx4::new(1, 0, 0, 0)),
            FieldValue::new(1.0, 0.0, 0.0)
        );
        assert_eq!(
            array.get(&Idx4::new(0, 1, 0, 0)),
            FieldValue::new(3.0, 0.0, 0.0)
        );
    }
}
