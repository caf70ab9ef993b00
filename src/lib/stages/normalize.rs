//! In-place molecule rewrites: canonicalization and the [`Transform`] stages.

use crate::batch::{BatchReport, BatchRunner};
use crate::store::RecordStore;
use crate::toolkit::{Toolkit, Transform};

/// Sets `SMILES` to the canonical text of every molecule.
///
/// Records without a molecule are skipped; failures leave the record unchanged.
pub fn canonicalize<T: Toolkit>(
    toolkit: &T,
    store: &mut RecordStore<T::Molecule>,
    runner: &BatchRunner,
) -> BatchReport {
    runner.update("Canonicalizing SMILES", store.records_mut(), |_, record| {
        let Some(mol) = &record.molecule else { return Ok(()) };
        let text = toolkit.canonical_text(mol)?;
        record.set_smiles(text);
        Ok(())
    })
}

/// Replaces every molecule with its transformed form and refreshes `SMILES`.
///
/// The record is only written once both the transform and the canonical text
/// have succeeded.
pub fn apply_transform<T: Toolkit>(
    toolkit: &T,
    store: &mut RecordStore<T::Molecule>,
    runner: &BatchRunner,
    transform: Transform,
) -> BatchReport {
    let label = match transform {
        Transform::LargestFragment => "Removing salts/solvents",
        Transform::Tautomer => "Canonicalizing tautomers",
        Transform::Neutralize => "Neutralizing charged molecules",
        Transform::AddHydrogens => "Adding hydrogens",
        Transform::Standardize => "Standardizing molecules",
        Transform::RemoveStereo => "Removing stereochemistry",
    };
    runner.update(label, store.records_mut(), |_, record| {
        let Some(mol) = &record.molecule else { return Ok(()) };
        let transformed = toolkit.transform(mol, transform)?;
        let text = toolkit.canonical_text(&transformed)?;
        record.molecule = Some(transformed);
        record.set_smiles(text);
        Ok(())
    })
}
