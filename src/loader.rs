//! Composition of populated field-map grids into queryable fields.
//!
//! File parsing lives outside this crate; a loader hands over fully
//! populated grids and the helpers here wire them to reflections and
//! interpolators, caching base grids so one file read can back several
//! differently-parameterized fields.

use crate::{
    grid::{FieldGrid, FieldSampler},
    interpolation::{FieldInterpolator, InterpolatorSpec},
    num::FmFloat,
    transform::{ReflectionKind, TransformedFieldGrid},
};
use std::{collections::HashMap, io, sync::Arc};

/// Floating point type of loaded field-map data.
#[allow(non_camel_case_types)]
pub type fdm = f64;

/// Whether or not to print non-critical status messages.
#[derive(Clone, Copy, Debug)]
pub enum Verbosity {
    Quiet,
    Messages,
}

impl Verbosity {
    pub fn print_messages(&self) -> bool {
        matches!(self, Self::Messages)
    }
}

/// Cache of base grids keyed by the identity of the source they were
/// populated from, so the same underlying samples can back several
/// differently-transformed fields without being loaded twice.
///
/// Grids are handed out as shared `Arc` handles: the cache and every
/// decorator built over a cached grid reference the same allocation, which
/// is dropped exactly once when the last handle goes away.
#[derive(Debug)]
pub struct FieldMapCache<F> {
    grids: HashMap<String, Arc<FieldGrid<F>>>,
    verbosity: Verbosity,
}

impl<F: FmFloat> FieldMapCache<F> {
    /// Creates a new empty cache.
    pub fn new(verbosity: Verbosity) -> Self {
        Self {
            grids: HashMap::new(),
            verbosity,
        }
    }

    /// Returns the number of cached grids.
    pub fn len(&self) -> usize {
        self.grids.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.grids.is_empty()
    }

    /// Whether a grid is cached under the given key.
    pub fn contains(&self, key: &str) -> bool {
        self.grids.contains_key(key)
    }

    /// Stores the given grid under the given key, replacing any previous
    /// entry, and returns a shared handle to it.
    pub fn insert(&mut self, key: &str, grid: FieldGrid<F>) -> Arc<FieldGrid<F>> {
        let grid = Arc::new(grid);
        self.grids.insert(key.to_string(), Arc::clone(&grid));
        grid
    }

    /// Returns the grid cached under the given key, or builds, caches and
    /// returns it using the given closure.
    pub fn get_or_insert_with<B>(&mut self, key: &str, build: B) -> io::Result<Arc<FieldGrid<F>>>
    where
        B: FnOnce() -> io::Result<FieldGrid<F>>,
    {
        if let Some(grid) = self.grids.get(key) {
            if self.verbosity.print_messages() {
                println!("Using cached {}", key);
            }
            return Ok(Arc::clone(grid));
        }
        let grid = Arc::new(build()?);
        self.grids.insert(key.to_string(), Arc::clone(&grid));
        Ok(grid)
    }

    /// Removes the grid cached under the given key.
    pub fn drop_grid(&mut self, key: &str) {
        self.grids.remove(key);
    }

    /// Removes all cached grids.
    pub fn drop_all_grids(&mut self) {
        self.grids.clear();
    }
}

/// Parses a whitespace-separated list of reflection names.
pub fn parse_reflections(names: &str) -> io::Result<Vec<ReflectionKind>> {
    names
        .split_whitespace()
        .map(|name| {
            name.parse::<ReflectionKind>()
                .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
        })
        .collect()
}

/// Wraps a base grid in reflection operators when any are requested; with no
/// reflections the base grid is used directly.
pub fn wrap_with_reflections<F: FmFloat + 'static>(
    base: Arc<FieldGrid<F>>,
    kinds: &[ReflectionKind],
) -> io::Result<Arc<dyn FieldSampler<F>>> {
    if kinds.is_empty() {
        let sampler: Arc<dyn FieldSampler<F>> = base;
        Ok(sampler)
    } else {
        Ok(Arc::new(TransformedFieldGrid::from_reflections(
            base, kinds,
        )?))
    }
}

/// Composes a populated base grid, an interpolator choice and an optional
/// ordered set of reflections into a queryable field.
///
/// Failures carry the field definition's name so the caller can tell which
/// definition could not be loaded.
pub fn assemble_field<F: FmFloat + 'static>(
    name: &str,
    base: Arc<FieldGrid<F>>,
    spec: InterpolatorSpec,
    reflections: &[ReflectionKind],
) -> io::Result<FieldInterpolator<F>> {
    let rank = base.layout().rank();
    let method = spec
        .resolve(rank)
        .map_err(|err| annotate_with_name(name, err))?;
    let sampler =
        wrap_with_reflections(base, reflections).map_err(|err| annotate_with_name(name, err))?;
    Ok(FieldInterpolator::new(sampler, method))
}

fn annotate_with_name(name: &str, err: io::Error) -> io::Error {
    io::Error::new(err.kind(), format!("Field definition {}: {}", name, err))
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::geometry::{Axis, FieldValue, Idx4, Point4};
    use crate::grid::AxisSpec;
    use crate::interpolation::InterpolationMethod;

    fn ramp_grid() -> FieldGrid<fdm> {
        let mut grid =
            FieldGrid::new_zeroed(&[AxisSpec::new(0.0, 4.0, 5, Axis::X).unwrap()]).unwrap();
        for i in 0..5_usize {
            grid.set(
                &Idx4::new(i, 0, 0, 0),
                FieldValue::new(i as fdm, 0.0, 0.0),
            );
        }
        grid
    }

    #[test]
    fn cached_grids_are_shared_not_rebuilt() {
        let mut cache = FieldMapCache::<fdm>::new(Verbosity::Quiet);

        let first = cache
            .get_or_insert_with("maps/dipole.dat", || Ok(ramp_grid()))
            .unwrap();
        let second = cache
            .get_or_insert_with("maps/dipole.dat", || {
                panic!("cached entry must not be rebuilt")
            })
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);

        cache.drop_grid("maps/dipole.dat");
        assert!(cache.is_empty());
    }

    #[test]
    fn failed_builds_are_not_cached() {
        let mut cache = FieldMapCache::<fdm>::new(Verbosity::Quiet);
        let result = cache.get_or_insert_with("maps/broken.dat", || {
            Err(io::Error::new(io::ErrorKind::InvalidData, "bad header"))
        });
        assert!(result.is_err());
        assert!(!cache.contains("maps/broken.dat"));
    }

    #[test]
    fn reflection_lists_parse() {
        assert_eq!(
            parse_reflections("flipx reflecty").unwrap(),
            vec![ReflectionKind::FlipX, ReflectionKind::ReflectY]
        );
        assert!(parse_reflections("flipx reflectw").is_err());
        assert!(parse_reflections("").unwrap().is_empty());
    }

    #[test]
    fn assembled_fields_are_queryable() {
        let field = assemble_field(
            "ramp",
            Arc::new(ramp_grid()),
            "linear".parse::<InterpolatorSpec>().unwrap(),
            &[],
        )
        .unwrap();
        assert_eq!(field.method(), InterpolationMethod::Linear);
        assert_eq!(
            field.get_value(&Point4::spatial(2.5, 0.0, 0.0)),
            FieldValue::new(2.5, 0.0, 0.0)
        );
    }

    #[test]
    fn assembly_errors_carry_the_definition_name() {
        let err = assemble_field(
            "solenoid_map",
            Arc::new(ramp_grid()),
            "cubic3d".parse::<InterpolatorSpec>().unwrap(),
            &[],
        )
        .unwrap_err();
        assert!(err.to_string().contains("solenoid_map"));

        let err = assemble_field(
            "bad_combination",
            Arc::new(ramp_grid()),
            "linear".parse::<InterpolatorSpec>().unwrap(),
            &[
                ReflectionKind::ReflectXYDipole,
                ReflectionKind::ReflectXYQuadrupole,
            ],
        )
        .unwrap_err();
        assert!(err.to_string().contains("bad_combination"));
    }
}
