//! Stages that drop or reorder records.

use crate::batch::{BatchReport, BatchRunner, ItemError};
use crate::errors::Result;
use crate::store::{RecordStore, SortOrder};
use crate::toolkit::Toolkit;
use crate::validation::validate_min_max_f64;

/// Drops records without a molecule or with zero atoms.
pub fn remove_invalid<T: Toolkit>(
    toolkit: &T,
    store: &mut RecordStore<T::Molecule>,
    runner: &BatchRunner,
) -> BatchReport {
    store.retain_parallel(runner, "Removing invalid molecules", |_, record| {
        Ok(record.molecule.as_ref().is_some_and(|mol| toolkit.atom_count(mol) > 0))
    })
}

/// Keeps records whose `property` parses to a number in `[min, max]`.
///
/// Missing and non-numeric values are dropped and counted as failures.
///
/// # Errors
/// `InvalidParameter` if `min > max` or a bound is not finite.
pub fn filter_by_property<M: Clone + Send + Sync>(
    store: &mut RecordStore<M>,
    runner: &BatchRunner,
    property: &str,
    min: f64,
    max: f64,
) -> Result<BatchReport> {
    validate_min_max_f64(min, max, "filter-by-property")?;
    let label = format!("Filtering by {property} in [{min}, {max}]");
    Ok(store.retain_parallel(runner, &label, |_, record| {
        record
            .numeric_property(property)
            .map(|value| (min..=max).contains(&value))
            .ok_or_else(|| ItemError::Failed(format!("no numeric '{property}' property")))
    }))
}

/// Stable sort on a numeric property; records without a numeric value are dropped.
pub fn sort_by_property<M: Clone + Send + Sync>(
    store: &mut RecordStore<M>,
    runner: &BatchRunner,
    property: &str,
    order: SortOrder,
) -> BatchReport {
    let label = format!("Sorting by {property}");
    store.sort_by_numeric_key(runner, &label, property, order)
}
