//! Symmetry transforms presenting a stored grid region as a larger
//! logically-reflected field without duplicating storage.

use crate::{
    geometry::{Axis, FieldValue, Idx4, In4D},
    grid::{FieldGrid, FieldSampler, GridLayout},
    num::FmFloat,
};
use lazy_static::lazy_static;
use std::{collections::HashMap, fmt, io, str::FromStr, sync::Arc};

/// Classification of reflection kinds used when validating combinations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ReflectionClass {
    SimpleFlip,
    SimpleReflect,
    Advanced,
}

/// A named symmetry operation requested for a field map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReflectionKind {
    FlipX,
    FlipY,
    FlipZ,
    FlipT,
    ReflectX,
    ReflectY,
    ReflectZ,
    ReflectT,
    ReflectXYDipole,
    ReflectYDipole,
    ReflectXYQuadrupole,
    ReflectZSolenoid,
}

impl ReflectionKind {
    /// Returns the name the kind is requested by.
    pub fn name(self) -> &'static str {
        match self {
            Self::FlipX => "flipx",
            Self::FlipY => "flipy",
            Self::FlipZ => "flipz",
            Self::FlipT => "flipt",
            Self::ReflectX => "reflectx",
            Self::ReflectY => "reflecty",
            Self::ReflectZ => "reflectz",
            Self::ReflectT => "reflectt",
            Self::ReflectXYDipole => "reflectxydipole",
            Self::ReflectYDipole => "reflectydipole",
            Self::ReflectXYQuadrupole => "reflectxyquadrupole",
            Self::ReflectZSolenoid => "reflectzsolenoid",
        }
    }

    /// Returns the physical dimensions the kind folds.
    pub fn labels(self) -> &'static [Axis] {
        match self {
            Self::FlipX | Self::ReflectX => &[Axis::X],
            Self::FlipY | Self::ReflectY | Self::ReflectYDipole => &[Axis::Y],
            Self::FlipZ | Self::ReflectZ | Self::ReflectZSolenoid => &[Axis::Z],
            Self::FlipT | Self::ReflectT => &[Axis::T],
            Self::ReflectXYDipole | Self::ReflectXYQuadrupole => &[Axis::X, Axis::Y],
        }
    }

    fn class(self) -> ReflectionClass {
        match self {
            Self::FlipX | Self::FlipY | Self::FlipZ | Self::FlipT => ReflectionClass::SimpleFlip,
            Self::ReflectX | Self::ReflectY | Self::ReflectZ | Self::ReflectT => {
                ReflectionClass::SimpleReflect
            }
            Self::ReflectXYDipole
            | Self::ReflectYDipole
            | Self::ReflectXYQuadrupole
            | Self::ReflectZSolenoid => ReflectionClass::Advanced,
        }
    }
}

impl fmt::Display for ReflectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

lazy_static! {
    static ref REFLECTION_KINDS_BY_NAME: HashMap<&'static str, ReflectionKind> = {
        let kinds = [
            ReflectionKind::FlipX,
            ReflectionKind::FlipY,
            ReflectionKind::FlipZ,
            ReflectionKind::FlipT,
            ReflectionKind::ReflectX,
            ReflectionKind::ReflectY,
            ReflectionKind::ReflectZ,
            ReflectionKind::ReflectT,
            ReflectionKind::ReflectXYDipole,
            ReflectionKind::ReflectYDipole,
            ReflectionKind::ReflectXYQuadrupole,
            ReflectionKind::ReflectZSolenoid,
        ];
        kinds.iter().map(|&kind| (kind.name(), kind)).collect()
    };
}

impl FromStr for ReflectionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        REFLECTION_KINDS_BY_NAME
            .get(s)
            .copied()
            .ok_or_else(|| format!("invalid reflection name {}", s))
    }
}

/// Checks whether the given reflections can be combined.
///
/// Any mixture of simple per-axis flips and reflections is permitted, but at
/// most one distinct geometry-specific (dipole, quadrupole or solenoid)
/// reflection can be applied at a time; combining two is physically
/// ambiguous. Returns a human-readable diagnostic for an invalid
/// combination, or `None` when the combination is acceptable.
pub fn problem_with_reflection_combination(kinds: &[ReflectionKind]) -> Option<String> {
    let mut advanced: Vec<ReflectionKind> = Vec::new();
    for &kind in kinds {
        if kind.class() == ReflectionClass::Advanced && !advanced.contains(&kind) {
            advanced.push(kind);
        }
    }
    if advanced.len() > 1 {
        let names: Vec<&str> = advanced.iter().map(|kind| kind.name()).collect();
        Some(format!(
            "Incompatible combination of reflections ({}): at most one dipole, quadrupole or solenoid reflection can be applied at a time",
            names.join(", ")
        ))
    } else {
        None
    }
}

/// An array axis an operator acts on, together with the physical dimension
/// the axis represents.
#[derive(Clone, Copy, Debug)]
pub struct AxisTarget {
    pub number: usize,
    pub label: Axis,
}

/// How a reflection folds one array axis onto the stored data.
#[derive(Clone, Copy, Debug)]
pub struct ReflectTarget {
    pub number: usize,
    pub label: Axis,
    /// Fold centre in array coordinates, `floor(array_coord_from_spatial(0))`.
    pub zero_point: isize,
    /// Whether the stored side lies below the zero point (zero point at the
    /// far edge of the array).
    pub inverted: bool,
}

/// Remaps a logical index tuple onto the stored data.
#[derive(Clone, Debug)]
pub enum IndexOp {
    /// Per-axis sign multiply on the index; the mirrored logical extents are
    /// negated. Field continuity is preserved, so no value correction is
    /// required.
    Flip { targets: Vec<AxisTarget> },
    /// Per-axis fold about the zero point in array coordinates, reflecting a
    /// query on the unstored side into the stored region.
    Reflect { targets: Vec<ReflectTarget> },
}

impl IndexOp {
    /// Creates a flip of the given array axes.
    pub fn flip(targets: Vec<AxisTarget>) -> Self {
        Self::Flip { targets }
    }

    /// Creates a reflection of the given array axes, deriving each fold
    /// centre from the grid's own coordinate mapping.
    ///
    /// A fold centre that does not align with a grid point leaves the
    /// reflected field spatially distorted; this is diagnosed with a warning
    /// but does not prevent construction.
    pub fn reflect<F: FmFloat>(targets: Vec<AxisTarget>, layout: &GridLayout<F>) -> Self {
        let alignment_tolerance = F::from_f64(1e-6).expect("Conversion failed");
        let targets = targets
            .into_iter()
            .map(|target| {
                let spec = layout.axis_spec(target.number);
                let coord = spec.array_coord_from_spatial(F::zero());
                let floor = coord.floor();
                if (coord - floor).abs() > alignment_tolerance {
                    eprintln!(
                        "Warning: reflection about {}=0 does not align with a grid point \
                         (array coordinate {:?}); the reflected field may be spatially distorted",
                        target.label, coord
                    );
                }
                let zero_point = num::cast::<F, isize>(floor).expect("Conversion failed");
                ReflectTarget {
                    number: target.number,
                    label: target.label,
                    zero_point,
                    inverted: zero_point == spec.size() as isize - 1,
                }
            })
            .collect();
        Self::Reflect { targets }
    }

    /// Remaps the given index tuple in place.
    pub fn apply(&self, idx: &mut Idx4<isize>) {
        match self {
            Self::Flip { targets } => {
                for target in targets {
                    let axis = Axis::slice()[target.number];
                    idx[axis] = -idx[axis];
                }
            }
            Self::Reflect { targets } => {
                for target in targets {
                    let axis = Axis::slice()[target.number];
                    let offset = (idx[axis] - target.zero_point).abs();
                    idx[axis] = if target.inverted {
                        target.zero_point - offset
                    } else {
                        target.zero_point + offset
                    };
                }
            }
        }
    }

    /// Updates the per-axis logical (min, max) bounds to the region the
    /// operator makes addressable.
    pub fn transform_limits<F: FmFloat>(&self, limits: &mut In4D<(F, F)>) {
        match self {
            Self::Flip { targets } => {
                for target in targets {
                    let axis = Axis::slice()[target.number];
                    let (min, max) = limits[axis];
                    limits[axis] = (-max, -min);
                }
            }
            Self::Reflect { targets } => {
                for target in targets {
                    let axis = Axis::slice()[target.number];
                    let (min, max) = limits[axis];
                    limits[axis] = (F::min(min, -max), F::max(max, -min));
                }
            }
        }
    }

    /// Declares which of the four array axes the operator touches.
    pub fn operates_on(&self) -> [bool; 4] {
        let mut axes = [false; 4];
        match self {
            Self::Flip { targets } => {
                for target in targets {
                    axes[target.number] = true;
                }
            }
            Self::Reflect { targets } => {
                for target in targets {
                    axes[target.number] = true;
                }
            }
        }
        axes
    }

    /// Returns the operator's name.
    pub fn name(&self) -> String {
        match self {
            Self::Flip { targets } => {
                let mut name = String::from("flip");
                for target in targets {
                    name.push_str(&target.label.to_string());
                }
                name
            }
            Self::Reflect { targets } => {
                let mut name = String::from("reflect");
                for target in targets {
                    name.push_str(&target.label.to_string());
                }
                name
            }
        }
    }
}

/// Corrects a fetched field value as a function of the original, unmapped
/// index tuple, deciding each sign from which side of zero the query fell on.
#[derive(Clone, Debug)]
pub enum ValueOp {
    /// No correction (the companion of a flip).
    Identity,
    /// Negates the field component matching each target's physical dimension
    /// when the original index on that axis is negative.
    Reflect { targets: Vec<AxisTarget> },
    /// Dipole quadrant fold: the transverse component is odd across the
    /// vertical plane and across the midplane; the main component is even;
    /// the longitudinal component is odd across the midplane only.
    DipoleXY { x_number: usize, y_number: usize },
    /// Dipole midplane fold.
    DipoleY { y_number: usize },
    /// Quadrupole quadrant fold.
    QuadrupoleXY { x_number: usize, y_number: usize },
    /// Solenoid end-to-end fold: transverse components are odd across the
    /// symmetry plane, the longitudinal component is even.
    SolenoidZ { z_number: usize },
}

impl ValueOp {
    /// Applies the correction for a query at the given original index tuple.
    pub fn apply<F: FmFloat>(
        &self,
        value: FieldValue<F>,
        original: &Idx4<isize>,
    ) -> FieldValue<F> {
        let axes = Axis::slice();
        match *self {
            Self::Identity => value,
            Self::Reflect { ref targets } => {
                let mut value = value;
                for target in targets {
                    if original[axes[target.number]] < 0 {
                        value = value.with_negated(target.label);
                    }
                }
                value
            }
            Self::DipoleXY { x_number, y_number } => {
                let mut value = value;
                if original[axes[x_number]] < 0 {
                    value = value.with_negated(Axis::X);
                }
                if original[axes[y_number]] < 0 {
                    value = value.with_negated(Axis::X).with_negated(Axis::Z);
                }
                value
            }
            Self::DipoleY { y_number } => {
                if original[axes[y_number]] < 0 {
                    value.with_negated(Axis::X).with_negated(Axis::Z)
                } else {
                    value
                }
            }
            Self::QuadrupoleXY { x_number, y_number } => {
                let mut value = value;
                if original[axes[x_number]] < 0 {
                    value = value.with_negated(Axis::Y).with_negated(Axis::Z);
                }
                if original[axes[y_number]] < 0 {
                    value = value.with_negated(Axis::X).with_negated(Axis::Z);
                }
                value
            }
            Self::SolenoidZ { z_number } => {
                if original[axes[z_number]] < 0 {
                    value.with_negated(Axis::X).with_negated(Axis::Y)
                } else {
                    value
                }
            }
        }
    }

    /// Declares which of the four array axes the operator inspects.
    pub fn operates_on(&self) -> [bool; 4] {
        let mut axes = [false; 4];
        match *self {
            Self::Identity => {}
            Self::Reflect { ref targets } => {
                for target in targets {
                    axes[target.number] = true;
                }
            }
            Self::DipoleXY { x_number, y_number } | Self::QuadrupoleXY { x_number, y_number } => {
                axes[x_number] = true;
                axes[y_number] = true;
            }
            Self::DipoleY { y_number } => axes[y_number] = true,
            Self::SolenoidZ { z_number } => axes[z_number] = true,
        }
        axes
    }

    /// Returns the operator's name.
    pub fn name(&self) -> String {
        match self {
            Self::Identity => String::new(),
            Self::Reflect { targets } => {
                let mut name = String::from("reflect");
                for target in targets {
                    name.push_str(&target.label.to_string());
                }
                name
            }
            Self::DipoleXY { .. } => String::from("reflectxydipole"),
            Self::DipoleY { .. } => String::from("reflectydipole"),
            Self::QuadrupoleXY { .. } => String::from("reflectxyquadrupole"),
            Self::SolenoidZ { .. } => String::from("reflectzsolenoid"),
        }
    }
}

/// An ordered chain of index operators applied in sequence.
#[derive(Clone, Debug, Default)]
pub struct IndexOps(Vec<IndexOp>);

impl IndexOps {
    /// Creates a new chain from the given operators.
    pub fn new(ops: Vec<IndexOp>) -> Self {
        Self(ops)
    }

    /// Whether the chain contains no operators.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Remaps the given index tuple through every operator in order.
    pub fn apply(&self, idx: &mut Idx4<isize>) {
        for op in &self.0 {
            op.apply(idx);
        }
    }

    /// Folds the per-axis logical bounds through every operator in order.
    pub fn transform_limits<F: FmFloat>(&self, limits: &mut In4D<(F, F)>) {
        for op in &self.0 {
            op.transform_limits(limits);
        }
    }

    /// Declares the union of axes touched by the chained operators.
    pub fn operates_on(&self) -> [bool; 4] {
        let mut axes = [false; 4];
        for op in &self.0 {
            for (mask, touched) in axes.iter_mut().zip(op.operates_on()) {
                *mask |= touched;
            }
        }
        axes
    }

    /// Returns the concatenation of the chained operators' names.
    pub fn name(&self) -> String {
        self.0.iter().map(|op| op.name()).collect()
    }
}

/// An ordered chain of value operators applied in sequence.
#[derive(Clone, Debug, Default)]
pub struct ValueOps(Vec<ValueOp>);

impl ValueOps {
    /// Creates a new chain from the given operators.
    pub fn new(ops: Vec<ValueOp>) -> Self {
        Self(ops)
    }

    /// Whether the chain contains no operators.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Corrects the given value through every operator in order.
    pub fn apply<F: FmFloat>(
        &self,
        value: FieldValue<F>,
        original: &Idx4<isize>,
    ) -> FieldValue<F> {
        self.0
            .iter()
            .fold(value, |value, op| op.apply(value, original))
    }

    /// Declares the union of axes inspected by the chained operators.
    pub fn operates_on(&self) -> [bool; 4] {
        let mut axes = [false; 4];
        for op in &self.0 {
            for (mask, touched) in axes.iter_mut().zip(op.operates_on()) {
                *mask |= touched;
            }
        }
        axes
    }

    /// Returns the concatenation of the chained operators' names.
    pub fn name(&self) -> String {
        self.0.iter().map(|op| op.name()).collect()
    }
}

/// Converts an ordered set of requested reflections into index and value
/// operator chains for the given grid.
///
/// Fails when the combination is invalid or when a requested reflection
/// folds a physical dimension the grid does not store.
pub fn build_operator_chains<F: FmFloat>(
    kinds: &[ReflectionKind],
    layout: &GridLayout<F>,
) -> io::Result<(IndexOps, ValueOps)> {
    if let Some(problem) = problem_with_reflection_combination(kinds) {
        return Err(io::Error::new(io::ErrorKind::InvalidData, problem));
    }

    let resolve = |kind: ReflectionKind| -> io::Result<Vec<AxisTarget>> {
        kind.labels()
            .iter()
            .map(|&label| {
                layout
                    .axis_for_label(label)
                    .map(|number| AxisTarget { number, label })
                    .ok_or_else(|| {
                        io::Error::new(
                            io::ErrorKind::InvalidData,
                            format!(
                                "Reflection {} requires a {}-dimension the grid does not store",
                                kind, label
                            ),
                        )
                    })
            })
            .collect()
    };

    let mut index_ops = Vec::new();
    let mut value_ops = Vec::new();

    for &kind in kinds {
        let targets = resolve(kind)?;
        match kind {
            ReflectionKind::FlipX
            | ReflectionKind::FlipY
            | ReflectionKind::FlipZ
            | ReflectionKind::FlipT => {
                index_ops.push(IndexOp::flip(targets));
            }
            ReflectionKind::ReflectX
            | ReflectionKind::ReflectY
            | ReflectionKind::ReflectZ
            | ReflectionKind::ReflectT => {
                index_ops.push(IndexOp::reflect(targets.clone(), layout));
                let spatial_targets: Vec<AxisTarget> = targets
                    .into_iter()
                    .filter(|target| target.label.is_spatial())
                    .collect();
                if !spatial_targets.is_empty() {
                    value_ops.push(ValueOp::Reflect {
                        targets: spatial_targets,
                    });
                }
            }
            ReflectionKind::ReflectXYDipole => {
                index_ops.push(IndexOp::reflect(targets.clone(), layout));
                value_ops.push(ValueOp::DipoleXY {
                    x_number: targets[0].number,
                    y_number: targets[1].number,
                });
            }
            ReflectionKind::ReflectYDipole => {
                index_ops.push(IndexOp::reflect(targets.clone(), layout));
                value_ops.push(ValueOp::DipoleY {
                    y_number: targets[0].number,
                });
            }
            ReflectionKind::ReflectXYQuadrupole => {
                index_ops.push(IndexOp::reflect(targets.clone(), layout));
                value_ops.push(ValueOp::QuadrupoleXY {
                    x_number: targets[0].number,
                    y_number: targets[1].number,
                });
            }
            ReflectionKind::ReflectZSolenoid => {
                index_ops.push(IndexOp::reflect(targets.clone(), layout));
                value_ops.push(ValueOp::SolenoidZ {
                    z_number: targets[0].number,
                });
            }
        }
    }

    Ok((IndexOps::new(index_ops), ValueOps::new(value_ops)))
}

/// A grid decorator combining a base grid with an index operator chain and a
/// value operator chain, applied transparently at every access.
///
/// The base grid is shared, not owned: a decorator built over a cached grid
/// holds the same `Arc` handle as the cache, so the samples are dropped
/// exactly once.
#[derive(Clone, Debug)]
pub struct TransformedFieldGrid<F> {
    base: Arc<FieldGrid<F>>,
    index_ops: IndexOps,
    value_ops: ValueOps,
    layout: GridLayout<F>,
}

impl<F: FmFloat> TransformedFieldGrid<F> {
    /// Creates a new transformed grid from a shared base grid and operator
    /// chains. The logical layout (extended or mirrored bounds) is derived
    /// from the chains once, at construction.
    pub fn new(base: Arc<FieldGrid<F>>, index_ops: IndexOps, value_ops: ValueOps) -> Self {
        let base_layout = base.layout();
        let mut limits = In4D::with_each_component(|axis| {
            let spec = &base_layout.axis_spec(axis.num());
            (spec.min(), spec.max())
        });
        index_ops.transform_limits(&mut limits);
        let layout = base_layout.with_transformed_limits(&limits);
        Self {
            base,
            index_ops,
            value_ops,
            layout,
        }
    }

    /// Creates a new transformed grid from named reflections.
    pub fn from_reflections(
        base: Arc<FieldGrid<F>>,
        kinds: &[ReflectionKind],
    ) -> io::Result<Self> {
        let (index_ops, value_ops) = build_operator_chains(kinds, base.layout())?;
        Ok(Self::new(base, index_ops, value_ops))
    }

    /// Returns a reference to the wrapped base grid.
    pub fn base(&self) -> &Arc<FieldGrid<F>> {
        &self.base
    }

    /// Returns the index operator chain.
    pub fn index_ops(&self) -> &IndexOps {
        &self.index_ops
    }

    /// Returns the value operator chain.
    pub fn value_ops(&self) -> &ValueOps {
        &self.value_ops
    }
}

impl<F: FmFloat> FieldSampler<F> for TransformedFieldGrid<F> {
    fn layout(&self) -> &GridLayout<F> {
        &self.layout
    }

    fn base_coord(&self, axis_number: usize, value: F) -> F {
        self.base.layout().array_coord_from_spatial(axis_number, value)
    }

    fn sample(&self, idx: &Idx4<isize>) -> FieldValue<F> {
        let mut mapped = *idx;
        self.index_ops.apply(&mut mapped);
        let value = self.base.get(&mapped);
        self.value_ops.apply(value, idx)
    }
}
