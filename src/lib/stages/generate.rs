//! Generator stages: one source record in, zero or more records out.
//!
//! All three run through [`RecordStore::expand`], which produces buckets in
//! parallel and concatenates them in source order.

use crate::batch::{BatchRunner, ItemResult};
use crate::errors::{MolpipeError, Result};
use crate::record::Record;
use crate::stages::FRAGMENT_SOURCE_KEY;
use crate::store::{ExpandOptions, ExpandReport, Layout, RecordStore};
use crate::toolkit::{FragmentMethod, Toolkit};

/// The only synonym method: random SMILES.
pub const RANDOM_SYNONYMS: &str = "random";

/// Seed for variant `variant` of record `index`, independent of scheduling.
#[must_use]
pub fn variant_seed(run_seed: u64, index: usize, variant: usize) -> u64 {
    let mut z = run_seed
        ^ (index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (variant as u64).wrapping_mul(0xD1B5_4A32_D192_ED03);
    // splitmix64 finalizer
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Appends `count` random-SMILES variants of every valid record after all originals.
///
/// Each variant is a copy of its source with `SMILES` replaced. Output is
/// `M * (count + 1)` records for `M` sources with a molecule.
///
/// # Errors
/// [`MolpipeError::InvalidParameter`] for a method other than `random`.
pub fn generate_synonyms<T: Toolkit>(
    toolkit: &T,
    store: &mut RecordStore<T::Molecule>,
    runner: &BatchRunner,
    count: usize,
    method: &str,
    seed: u64,
) -> Result<ExpandReport> {
    if method != RANDOM_SYNONYMS {
        return Err(MolpipeError::InvalidParameter {
            parameter: "synonyms".to_string(),
            reason: format!("Unsupported synonym generation method '{method}' (random)"),
        });
    }
    let options = ExpandOptions { keep_originals: true, ..ExpandOptions::default() };
    Ok(store.expand(runner, "Generating random SMILES synonyms", options, |i, source| {
        let Some(mol) = &source.molecule else { return Ok(Vec::new()) };
        (0..count)
            .map(|j| -> ItemResult<Record<T::Molecule>> {
                let text = toolkit.random_text(mol, variant_seed(seed, i, j))?;
                let mut variant = source.clone();
                variant.set_smiles(text);
                Ok(variant)
            })
            .collect::<ItemResult<Vec<_>>>()
    }))
}

/// Replaces records with their fragments, truncated to `max` per source (0 = all).
///
/// Fragments copy their source's properties, get `SMILES` set to their own
/// canonical text and `Fragment_Source` set to the source's SMILES. A source
/// that yields no fragment (or fails) is kept as-is; with `keep_originals`
/// every source is kept, ahead of all fragments.
pub fn fragment<T: Toolkit>(
    toolkit: &T,
    store: &mut RecordStore<T::Molecule>,
    runner: &BatchRunner,
    method: FragmentMethod,
    max: usize,
    keep_originals: bool,
) -> ExpandReport {
    let options =
        ExpandOptions { keep_originals, keep_source_when_empty: true, layout: Layout::Prepend };
    let label = format!("Fragmenting molecules using {method}");
    store.expand(runner, &label, options, |_, source| {
        let Some(mol) = &source.molecule else { return Ok(Vec::new()) };
        let mut fragments = toolkit.fragments(mol, method)?;
        if max > 0 {
            fragments.truncate(max);
        }
        let source_smiles = match source.smiles() {
            Some(smiles) => smiles.to_string(),
            None => toolkit.canonical_text(mol)?,
        };
        fragments
            .into_iter()
            .map(|frag| -> ItemResult<Record<T::Molecule>> {
                let text = toolkit.canonical_text(&frag)?;
                let mut record =
                    Record { molecule: Some(frag), properties: source.properties.clone() };
                record.set_property(FRAGMENT_SOURCE_KEY, source_smiles.as_str());
                record.set_smiles(text);
                Ok(record)
            })
            .collect::<ItemResult<Vec<_>>>()
    })
}

/// Follows every valid record with up to `count` of its stereoisomers.
pub fn generate_stereoisomers<T: Toolkit>(
    toolkit: &T,
    store: &mut RecordStore<T::Molecule>,
    runner: &BatchRunner,
    count: usize,
) -> ExpandReport {
    let options = ExpandOptions {
        keep_originals: true,
        keep_source_when_empty: false,
        layout: Layout::Interleave,
    };
    store.expand(runner, "Generating stereoisomers", options, |_, source| {
        let Some(mol) = &source.molecule else { return Ok(Vec::new()) };
        toolkit
            .stereoisomers(mol, count)?
            .into_iter()
            .map(|isomer| -> ItemResult<Record<T::Molecule>> {
                let text = toolkit.canonical_text(&isomer)?;
                let mut record =
                    Record { molecule: Some(isomer), properties: source.properties.clone() };
                record.set_smiles(text);
                Ok(record)
            })
            .collect::<ItemResult<Vec<_>>>()
    })
}
