//! Geometric utility objects for field-map grids.

use crate::num::FmFloat;
use num;
use std::{
    fmt,
    ops::{Add, Div, Index, IndexMut, Mul, Neg, Sub},
    str::FromStr,
};

#[cfg(feature = "serialization")]
use serde::Serialize;

#[cfg(feature = "for-testing")]
use approx::{AbsDiffEq, RelativeEq};

/// Denotes the x-, y-, z- or t-dimension of a field-map grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    X = 0,
    Y = 1,
    Z = 2,
    T = 3,
}

impl Axis {
    /// Creates an array for iterating over all four dimensions.
    pub fn slice() -> [Self; 4] {
        [Self::X, Self::Y, Self::Z, Self::T]
    }

    /// Creates an array for iterating over the three spatial dimensions.
    pub fn slice_spatial() -> [Self; 3] {
        [Self::X, Self::Y, Self::Z]
    }

    /// Returns the number of the dimension.
    pub fn num(self) -> usize {
        self as usize
    }

    /// Whether the dimension is spatial rather than temporal.
    pub fn is_spatial(self) -> bool {
        !matches!(self, Self::T)
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::X => "x",
                Self::Y => "y",
                Self::Z => "z",
                Self::T => "t",
            }
        )
    }
}

impl FromStr for Axis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "x" => Ok(Self::X),
            "y" => Ok(Self::Y),
            "z" => Ok(Self::Z),
            "t" => Ok(Self::T),
            other => Err(format!("invalid axis label {}", other)),
        }
    }
}

use Axis::{T, X, Y, Z};

/// Represents any quantity with four dimensional components.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(Serialize))]
pub struct In4D<T>([T; 4]);

impl<T> In4D<T> {
    /// Creates a new 4D quantity given the four components.
    pub fn new(x: T, y: T, z: T, t: T) -> Self {
        Self([x, y, z, t])
    }

    /// Creates a new 4D quantity by evaluating the given component
    /// constructor for each dimension.
    pub fn with_each_component<C>(create_component: C) -> Self
    where
        C: Fn(Axis) -> T,
    {
        Self::new(
            create_component(X),
            create_component(Y),
            create_component(Z),
            create_component(T),
        )
    }

    /// Creates a new 4D quantity with the given value copied into all components.
    pub fn same(a: T) -> Self
    where
        T: Copy,
    {
        Self([a, a, a, a])
    }

    /// Creates a new tuple containing copies of the four components.
    pub fn to_tuple(&self) -> (T, T, T, T)
    where
        T: Copy,
    {
        (self[X], self[Y], self[Z], self[T])
    }
}

impl<T> Index<Axis> for In4D<T> {
    type Output = T;
    fn index(&self, axis: Axis) -> &Self::Output {
        &self.0[axis as usize]
    }
}

impl<T> IndexMut<Axis> for In4D<T> {
    fn index_mut(&mut self, axis: Axis) -> &mut Self::Output {
        &mut self.0[axis as usize]
    }
}

impl<'a, T> IntoIterator for &'a In4D<T> {
    type Item = &'a T;
    type IntoIter = ::std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<T: fmt::Display> fmt::Display for In4D<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        fmt::Display::fmt(&self[X], f)?;
        f.write_str(", ")?;
        fmt::Display::fmt(&self[Y], f)?;
        f.write_str(", ")?;
        fmt::Display::fmt(&self[Z], f)?;
        f.write_str(", ")?;
        fmt::Display::fmt(&self[T], f)?;
        f.write_str("]")
    }
}

#[cfg(feature = "for-testing")]
impl<T> AbsDiffEq for In4D<T>
where
    T: AbsDiffEq,
    T::Epsilon: Copy,
{
    type Epsilon = <T as AbsDiffEq>::Epsilon;

    fn default_epsilon() -> Self::Epsilon {
        T::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        T::abs_diff_eq(&self[X], &other[X], epsilon)
            && T::abs_diff_eq(&self[Y], &other[Y], epsilon)
            && T::abs_diff_eq(&self[Z], &other[Z], epsilon)
            && T::abs_diff_eq(&self[T], &other[T], epsilon)
    }
}

#[cfg(feature = "for-testing")]
impl<T> RelativeEq for In4D<T>
where
    T: RelativeEq,
    T::Epsilon: Copy,
{
    fn default_max_relative() -> Self::Epsilon {
        T::default_max_relative()
    }

    fn relative_eq(
        &self,
        other: &Self,
        epsilon: Self::Epsilon,
        max_relative: Self::Epsilon,
    ) -> bool {
        T::relative_eq(&self[X], &other[X], epsilon, max_relative)
            && T::relative_eq(&self[Y], &other[Y], epsilon, max_relative)
            && T::relative_eq(&self[Z], &other[Z], epsilon, max_relative)
            && T::relative_eq(&self[T], &other[T], epsilon, max_relative)
    }
}

/// A 4D array index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(Serialize))]
pub struct Idx4<I>(In4D<I>);

impl<I: num::Integer> Idx4<I> {
    /// Creates a new 4D index given the four components.
    pub fn new(i: I, j: I, k: I, l: I) -> Self {
        Self(In4D::new(i, j, k, l))
    }

    /// Creates a new 4D index by evaluating the given component
    /// constructor for each dimension.
    pub fn with_each_component<C>(create_component: C) -> Self
    where
        C: Fn(Axis) -> I,
    {
        Self(In4D::with_each_component(create_component))
    }

    /// Creates a new 4D index with all components set to zero.
    pub fn origin() -> Self {
        Self::new(I::zero(), I::zero(), I::zero(), I::zero())
    }

    /// Creates a new 4D index from the given index, which may have a different component type.
    pub fn from<U>(other: &Idx4<U>) -> Self
    where
        I: num::NumCast + Copy,
        U: num::Integer + num::NumCast + Copy,
    {
        Self::new(
            I::from(other[X]).expect("Conversion failed"),
            I::from(other[Y]).expect("Conversion failed"),
            I::from(other[Z]).expect("Conversion failed"),
            I::from(other[T]).expect("Conversion failed"),
        )
    }
}

impl<I: num::Integer> Index<Axis> for Idx4<I> {
    type Output = I;
    fn index(&self, axis: Axis) -> &Self::Output {
        &self.0[axis]
    }
}

impl<I: num::Integer> IndexMut<Axis> for Idx4<I> {
    fn index_mut(&mut self, axis: Axis) -> &mut Self::Output {
        &mut self.0[axis]
    }
}

impl<'a, I: num::Integer> IntoIterator for &'a Idx4<I> {
    type Item = &'a I;
    type IntoIter = ::std::slice::Iter<'a, I>;

    fn into_iter(self) -> Self::IntoIter {
        (&self.0).into_iter()
    }
}

impl<I: num::Integer + fmt::Display> fmt::Display for Idx4<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A point in the spatial-temporal domain of a field map.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serialization", derive(Serialize))]
pub struct Point4<F>(In4D<F>);

impl<F: FmFloat> Point4<F> {
    /// Creates a new point given the four coordinates.
    pub fn new(x: F, y: F, z: F, t: F) -> Self {
        Self(In4D::new(x, y, z, t))
    }

    /// Creates a new point with time zero from the three spatial coordinates.
    pub fn spatial(x: F, y: F, z: F) -> Self {
        Self::new(x, y, z, F::zero())
    }

    /// Creates a new point at the origin.
    pub fn origin() -> Self {
        Self::new(F::zero(), F::zero(), F::zero(), F::zero())
    }
}

impl<F: FmFloat> Index<Axis> for Point4<F> {
    type Output = F;
    fn index(&self, axis: Axis) -> &Self::Output {
        &self.0[axis]
    }
}

impl<F: FmFloat> IndexMut<Axis> for Point4<F> {
    fn index_mut(&mut self, axis: Axis) -> &mut Self::Output {
        &mut self.0[axis]
    }
}

impl<F: FmFloat + fmt::Display> fmt::Display for Point4<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(feature = "for-testing")]
impl<F> AbsDiffEq for Point4<F>
where
    F: FmFloat + AbsDiffEq,
    F::Epsilon: Copy,
{
    type Epsilon = <In4D<F> as AbsDiffEq>::Epsilon;

    fn default_epsilon() -> Self::Epsilon {
        In4D::<F>::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        In4D::<F>::abs_diff_eq(&self.0, &other.0, epsilon)
    }
}

/// A sampled field vector with three components.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serialization", derive(Serialize))]
pub struct FieldValue<F>([F; 3]);

impl<F: FmFloat> FieldValue<F> {
    /// Creates a new field value given the three components.
    pub fn new(x: F, y: F, z: F) -> Self {
        Self([x, y, z])
    }

    /// Creates a new zero field value.
    pub fn zero() -> Self {
        Self([F::zero(), F::zero(), F::zero()])
    }

    /// Creates a new field value with all components equal to the given value.
    pub fn equal_components(a: F) -> Self {
        Self([a, a, a])
    }

    /// Returns the x-component.
    pub fn x(&self) -> F {
        self.0[0]
    }

    /// Returns the y-component.
    pub fn y(&self) -> F {
        self.0[1]
    }

    /// Returns the z-component.
    pub fn z(&self) -> F {
        self.0[2]
    }

    /// Whether all components are exactly zero.
    pub fn is_zero(&self) -> bool {
        self.0[0] == F::zero() && self.0[1] == F::zero() && self.0[2] == F::zero()
    }

    /// Computes the dot product with another field value.
    pub fn dot(&self, other: &Self) -> F {
        self.0[0] * other.0[0] + self.0[1] * other.0[1] + self.0[2] * other.0[2]
    }

    /// Computes the squared magnitude of the field value.
    pub fn squared_magnitude(&self) -> F {
        self.dot(self)
    }

    /// Computes the magnitude of the field value.
    pub fn magnitude(&self) -> F {
        self.squared_magnitude().sqrt()
    }

    /// Constructs a new field value with the component for the given spatial
    /// axis negated. The temporal axis has no component and leaves the value
    /// unchanged.
    pub fn with_negated(self, axis: Axis) -> Self {
        let Self([x, y, z]) = self;
        match axis {
            X => Self([-x, y, z]),
            Y => Self([x, -y, z]),
            Z => Self([x, y, -z]),
            T => Self([x, y, z]),
        }
    }
}

impl<'a, F: FmFloat> Add<&'a FieldValue<F>> for &'a FieldValue<F> {
    type Output = FieldValue<F>;
    fn add(self, other: Self) -> Self::Output {
        FieldValue::new(
            self.x() + other.x(),
            self.y() + other.y(),
            self.z() + other.z(),
        )
    }
}

impl<F: FmFloat> Add<FieldValue<F>> for FieldValue<F> {
    type Output = Self;
    fn add(self, other: Self) -> Self::Output {
        (&self).add(&other)
    }
}

impl<F: FmFloat> Add<FieldValue<F>> for &FieldValue<F> {
    type Output = FieldValue<F>;
    fn add(self, other: FieldValue<F>) -> Self::Output {
        self.add(&other)
    }
}

impl<F: FmFloat> Add<&FieldValue<F>> for FieldValue<F> {
    type Output = Self;
    fn add(self, other: &Self) -> Self::Output {
        (&self).add(other)
    }
}

impl<'a, F: FmFloat> Sub<&'a FieldValue<F>> for &'a FieldValue<F> {
    type Output = FieldValue<F>;
    fn sub(self, other: Self) -> Self::Output {
        FieldValue::new(
            self.x() - other.x(),
            self.y() - other.y(),
            self.z() - other.z(),
        )
    }
}

impl<F: FmFloat> Sub<FieldValue<F>> for FieldValue<F> {
    type Output = Self;
    fn sub(self, other: Self) -> Self::Output {
        (&self).sub(&other)
    }
}

impl<F: FmFloat> Sub<FieldValue<F>> for &FieldValue<F> {
    type Output = FieldValue<F>;
    fn sub(self, other: FieldValue<F>) -> Self::Output {
        self.sub(&other)
    }
}

impl<F: FmFloat> Sub<&FieldValue<F>> for FieldValue<F> {
    type Output = Self;
    fn sub(self, other: &Self) -> Self::Output {
        (&self).sub(other)
    }
}

impl<F: FmFloat> Mul<F> for &FieldValue<F> {
    type Output = FieldValue<F>;
    fn mul(self, factor: F) -> Self::Output {
        FieldValue::new(self.x() * factor, self.y() * factor, self.z() * factor)
    }
}

impl<F: FmFloat> Mul<F> for FieldValue<F> {
    type Output = Self;
    fn mul(self, factor: F) -> Self::Output {
        (&self).mul(factor)
    }
}

impl<F: FmFloat> Div<F> for &FieldValue<F> {
    type Output = FieldValue<F>;
    #[allow(clippy::suspicious_arithmetic_impl)]
    fn div(self, divisor: F) -> Self::Output {
        self.mul(divisor.recip())
    }
}

impl<F: FmFloat> Div<F> for FieldValue<F> {
    type Output = Self;
    #[allow(clippy::suspicious_arithmetic_impl)]
    fn div(self, divisor: F) -> Self::Output {
        (&self).mul(divisor.recip())
    }
}

impl<F: FmFloat> Neg for FieldValue<F> {
    type Output = Self;
    fn neg(self) -> Self::Output {
        Self::new(-self.x(), -self.y(), -self.z())
    }
}

impl<F: FmFloat + fmt::Display> fmt::Display for FieldValue<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        fmt::Display::fmt(&self.x(), f)?;
        f.write_str(", ")?;
        fmt::Display::fmt(&self.y(), f)?;
        f.write_str(", ")?;
        fmt::Display::fmt(&self.z(), f)?;
        f.write_str(")")
    }
}

#[cfg(feature = "for-testing")]
impl<F> AbsDiffEq for FieldValue<F>
where
    F: FmFloat + AbsDiffEq,
    F::Epsilon: Copy,
{
    type Epsilon = <F as AbsDiffEq>::Epsilon;

    fn default_epsilon() -> Self::Epsilon {
        F::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        F::abs_diff_eq(&self.x(), &other.x(), epsilon)
            && F::abs_diff_eq(&self.y(), &other.y(), epsilon)
            && F::abs_diff_eq(&self.z(), &other.z(), epsilon)
    }
}

#[cfg(feature = "for-testing")]
impl<F> RelativeEq for FieldValue<F>
where
    F: FmFloat + RelativeEq,
    F::Epsilon: Copy,
{
    fn default_max_relative() -> Self::Epsilon {
        F::default_max_relative()
    }

    fn relative_eq(
        &self,
        other: &Self,
        epsilon: Self::Epsilon,
        max_relative: Self::Epsilon,
    ) -> bool {
        F::relative_eq(&self.x(), &other.x(), epsilon, max_relative)
            && F::relative_eq(&self.y(), &other.y(), epsilon, max_relative)
            && F::relative_eq(&self.z(), &other.z(), epsilon, max_relative)
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn field_value_arithmetic_works() {
        let a = FieldValue::new(1.0, -2.0, 3.0);
        let b = FieldValue::new(0.5, 4.0, -1.0);

        assert_eq!(a + b, FieldValue::new(1.5, 2.0, 2.0));
        assert_eq!(a - b, FieldValue::new(0.5, -6.0, 4.0));
        assert_eq!(a * 2.0, FieldValue::new(2.0, -4.0, 6.0));
        assert_eq!(-a, FieldValue::new(-1.0, 2.0, -3.0));
        assert_eq!(a.dot(&b), 0.5 - 8.0 - 3.0);
    }

    #[test]
    fn field_value_magnitude_works() {
        let v = FieldValue::new(3.0_f64, 4.0, 0.0);
        assert_eq!(v.squared_magnitude(), 25.0);
        assert_eq!(v.magnitude(), 5.0);
        assert!(FieldValue::<f64>::zero().is_zero());
        assert!(!v.is_zero());
    }

    #[test]
    fn field_value_component_negation_works() {
        let v = FieldValue::new(1.0, 2.0, 3.0);
        assert_eq!(v.with_negated(Axis::X), FieldValue::new(-1.0, 2.0, 3.0));
        assert_eq!(v.with_negated(Axis::Y), FieldValue::new(1.0, -2.0, 3.0));
        assert_eq!(v.with_negated(Axis::Z), FieldValue::new(1.0, 2.0, -3.0));
        assert_eq!(v.with_negated(Axis::T), v);
    }

    #[test]
    fn axis_labels_parse_and_display() {
        for axis in Axis::slice() {
            assert_eq!(axis.to_string().parse::<Axis>().unwrap(), axis);
        }
        assert!("w".parse::<Axis>().is_err());
        assert!(Axis::X.is_spatial());
        assert!(!Axis::T.is_spatial());
    }

    #[test]
    fn index_components_are_addressable_by_axis() {
        let mut idx = Idx4::new(1_isize, 2, 3, 4);
        assert_eq!(idx[Axis::Z], 3);
        idx[Axis::Z] = -3;
        assert_eq!(idx[Axis::Z], -3);
        assert_eq!(Idx4::<usize>::from(&Idx4::new(1_isize, 2, 3, 4))[Axis::T], 4);
    }
}
