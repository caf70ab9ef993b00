//! Annotation stages: write a column, never touch the molecule.

use crate::batch::{BatchReport, BatchRunner};
use crate::errors::{MolpipeError, Result};
use crate::store::RecordStore;
use crate::toolkit::Toolkit;

/// Writes the scaffold SMILES to `column`, or `""` when there is none.
///
/// Records without a molecule, acyclic molecules and failures all get `""`.
pub fn annotate_scaffold<T: Toolkit>(
    toolkit: &T,
    store: &mut RecordStore<T::Molecule>,
    runner: &BatchRunner,
    column: &str,
) -> BatchReport {
    runner.update("Generating Murcko scaffolds", store.records_mut(), |_, record| {
        let scaffold = match &record.molecule {
            Some(mol) => toolkit.scaffold(mol).and_then(|scaffold| {
                scaffold.map(|s| toolkit.canonical_text(&s)).transpose()
            }),
            None => Ok(None),
        };
        match scaffold {
            Ok(text) => {
                record.set_property(column, text.unwrap_or_default());
                Ok(())
            }
            Err(e) => {
                record.set_property(column, "");
                Err(e.into())
            }
        }
    })
}

/// Writes `"1"`/`"0"` to `column` depending on whether the molecule contains `query`.
///
/// # Errors
/// [`MolpipeError::InvalidQuery`] if the query does not compile; no record is touched.
pub fn annotate_substructure<T: Toolkit>(
    toolkit: &T,
    store: &mut RecordStore<T::Molecule>,
    runner: &BatchRunner,
    query: &str,
    column: &str,
) -> Result<BatchReport> {
    let compiled = toolkit.compile_query(query).map_err(|e| MolpipeError::InvalidQuery {
        query: query.to_string(),
        reason: e.to_string(),
    })?;

    Ok(runner.update("Substructure matching", store.records_mut(), |_, record| {
        let matched = match &record.molecule {
            Some(mol) => toolkit.has_match(mol, &compiled),
            None => Ok(false),
        };
        let flag = matches!(matched, Ok(true));
        record.set_property(column, if flag { "1" } else { "0" });
        matched.map(|_| ()).map_err(Into::into)
    }))
}
