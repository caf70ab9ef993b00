//! A toolkit over plain integers with injectable failures.
//!
//! Molecules are `u32` values written as decimal text. The toolkit is cheap
//! enough for stores of many thousands of records and lets a test choose
//! exactly which molecules fail or panic in which operation.

#![allow(dead_code)]

use std::collections::HashSet;

use molpipe_lib::record::Record;
use molpipe_lib::store::RecordStore;
use molpipe_lib::toolkit::{FragmentMethod, Toolkit, ToolkitError, ToolkitResult, Transform};

/// Integer toolkit: canonical text is the decimal value, fragments are the
/// decimal digits, stereoisomers are `value * 1000 + k`.
#[derive(Debug, Clone, Default)]
pub struct NumberToolkit {
    /// Values whose canonical text, transform and generators fail.
    pub failing: HashSet<u32>,
    /// Values whose transform panics.
    pub panicking: HashSet<u32>,
}

impl NumberToolkit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails every operation on `values`.
    pub fn failing_on(values: &[u32]) -> Self {
        Self { failing: values.iter().copied().collect(), ..Self::default() }
    }

    /// Panics inside `transform` for `values`.
    pub fn panicking_on(values: &[u32]) -> Self {
        Self { panicking: values.iter().copied().collect(), ..Self::default() }
    }

    fn check(&self, mol: u32) -> ToolkitResult<()> {
        if self.failing.contains(&mol) {
            Err(ToolkitError::Failed(format!("injected failure for {mol}")))
        } else {
            Ok(())
        }
    }
}

impl Toolkit for NumberToolkit {
    type Molecule = u32;
    type Query = u32;

    fn parse(&self, text: &str) -> ToolkitResult<u32> {
        text.trim().parse().map_err(|_| ToolkitError::Parse(format!("not a number: {text}")))
    }

    fn canonical_text(&self, mol: &u32) -> ToolkitResult<String> {
        self.check(*mol)?;
        Ok(mol.to_string())
    }

    fn atom_count(&self, mol: &u32) -> usize {
        if *mol == 0 { 0 } else { mol.to_string().len() }
    }

    fn transform(&self, mol: &u32, transform: Transform) -> ToolkitResult<u32> {
        assert!(!self.panicking.contains(mol), "injected panic for {mol}");
        self.check(*mol)?;
        match transform {
            Transform::Neutralize => Ok(mol + 1),
            Transform::Standardize => Ok(mol / 10 * 10),
            Transform::LargestFragment | Transform::RemoveStereo => Ok(*mol),
            Transform::Tautomer | Transform::AddHydrogens => {
                Err(ToolkitError::Unsupported(transform.name().to_string()))
            }
        }
    }

    fn fragments(&self, mol: &u32, _method: FragmentMethod) -> ToolkitResult<Vec<u32>> {
        self.check(*mol)?;
        Ok(mol.to_string().bytes().map(|b| u32::from(b - b'0')).collect())
    }

    fn stereoisomers(&self, mol: &u32, limit: usize) -> ToolkitResult<Vec<u32>> {
        self.check(*mol)?;
        Ok((1..=limit as u32).map(|k| mol * 1000 + k).collect())
    }

    fn random_text(&self, mol: &u32, seed: u64) -> ToolkitResult<String> {
        self.check(*mol)?;
        Ok(format!("{mol}~{}", seed % 1000))
    }

    fn scaffold(&self, mol: &u32) -> ToolkitResult<Option<u32>> {
        self.check(*mol)?;
        Ok((*mol >= 10).then_some(mol / 10))
    }

    fn compile_query(&self, text: &str) -> ToolkitResult<u32> {
        match text.trim().parse::<u32>() {
            Ok(q) if q > 0 => Ok(q),
            _ => Err(ToolkitError::Parse(format!("bad divisor query: {text}"))),
        }
    }

    fn has_match(&self, mol: &u32, query: &u32) -> ToolkitResult<bool> {
        self.check(*mol)?;
        Ok(mol % query == 0)
    }
}

/// A store holding `values` with `SMILES` set to the decimal text.
pub fn number_store(values: impl IntoIterator<Item = u32>) -> RecordStore<u32> {
    values.into_iter().map(|v| Record::with_smiles(v, v.to_string())).collect()
}

/// Molecules of `store`, `None` for absent ones.
pub fn molecules(store: &RecordStore<u32>) -> Vec<Option<u32>> {
    store.iter().map(|r| r.molecule).collect()
}
