//! The chemistry toolkit boundary.
//!
//! Stages never look inside a molecule. Everything chemical goes through
//! [`Toolkit`], so the pipeline can run on any implementation: the bundled
//! [`crate::smiles::SmilesToolkit`] or a binding to a full cheminformatics
//! library.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::errors::MolpipeError;

/// Errors reported by a toolkit for a single molecule or query.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolkitError {
    /// Text could not be parsed as a molecule or query.
    #[error("parse error: {0}")]
    Parse(String),
    /// The toolkit does not implement this operation.
    #[error("unsupported operation: {0}")]
    Unsupported(String),
    /// The operation ran and failed for this molecule.
    #[error("{0}")]
    Failed(String),
}

/// Result type for toolkit calls.
pub type ToolkitResult<T> = std::result::Result<T, ToolkitError>;

/// Whole-molecule rewrites applied by the normalization stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transform {
    /// Keep only the largest disconnected fragment (desalting).
    LargestFragment,
    /// Canonical tautomer.
    Tautomer,
    /// Remove formal charges where a neutral form exists.
    Neutralize,
    /// Make implicit hydrogens explicit.
    AddHydrogens,
    /// Cleanup plus fragment parent.
    Standardize,
    /// Drop all stereo annotations.
    RemoveStereo,
}

impl Transform {
    /// Name used in logs and metrics.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::LargestFragment => "desalt",
            Self::Tautomer => "tautomerize",
            Self::Neutralize => "neutralize",
            Self::AddHydrogens => "add-hydrogens",
            Self::Standardize => "standardize",
            Self::RemoveStereo => "remove-stereochemistry",
        }
    }
}

/// Fragmentation scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentMethod {
    Brics,
    Recap,
    /// Split into disconnected components.
    Components,
}

impl FragmentMethod {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Brics => "brics",
            Self::Recap => "recap",
            Self::Components => "components",
        }
    }
}

impl fmt::Display for FragmentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FragmentMethod {
    type Err = MolpipeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "brics" => Ok(Self::Brics),
            "recap" => Ok(Self::Recap),
            "components" => Ok(Self::Components),
            _ => Err(MolpipeError::InvalidParameter {
                parameter: "fragment".to_string(),
                reason: format!("Unknown fragmentation method '{s}' (brics, recap, components)"),
            }),
        }
    }
}

/// Capability contract of a chemistry backend.
///
/// Every method works on one molecule and must be callable from many threads
/// at once. `canonical_text` must be deterministic: equal molecules give
/// byte-identical text.
pub trait Toolkit: Send + Sync {
    /// Parsed molecule.
    type Molecule: Clone + Send + Sync;
    /// Compiled substructure query.
    type Query: Send + Sync;

    /// Parses SMILES text.
    ///
    /// # Errors
    /// [`ToolkitError::Parse`] when the text is not a valid molecule.
    fn parse(&self, text: &str) -> ToolkitResult<Self::Molecule>;

    /// Canonical SMILES for `mol`.
    ///
    /// # Errors
    /// When the molecule cannot be written.
    fn canonical_text(&self, mol: &Self::Molecule) -> ToolkitResult<String>;

    /// Number of heavy atoms.
    fn atom_count(&self, mol: &Self::Molecule) -> usize;

    /// Applies a whole-molecule rewrite.
    ///
    /// # Errors
    /// When the transform fails or is unsupported.
    fn transform(&self, mol: &Self::Molecule, transform: Transform)
    -> ToolkitResult<Self::Molecule>;

    /// Splits `mol` into fragments.
    ///
    /// # Errors
    /// When fragmentation fails or the method is unsupported.
    fn fragments(
        &self,
        mol: &Self::Molecule,
        method: FragmentMethod,
    ) -> ToolkitResult<Vec<Self::Molecule>>;

    /// Up to `limit` stereoisomers of `mol`, excluding `mol` itself.
    ///
    /// # Errors
    /// When enumeration fails or is unsupported.
    fn stereoisomers(&self, mol: &Self::Molecule, limit: usize)
    -> ToolkitResult<Vec<Self::Molecule>>;

    /// A valid, usually non-canonical SMILES for `mol`, determined by `seed`.
    ///
    /// # Errors
    /// When the molecule cannot be written.
    fn random_text(&self, mol: &Self::Molecule, seed: u64) -> ToolkitResult<String>;

    /// Murcko scaffold, or `None` for acyclic molecules.
    ///
    /// # Errors
    /// When scaffold extraction fails or is unsupported.
    fn scaffold(&self, mol: &Self::Molecule) -> ToolkitResult<Option<Self::Molecule>>;

    /// Compiles a substructure query.
    ///
    /// # Errors
    /// [`ToolkitError::Parse`] for an invalid query.
    fn compile_query(&self, text: &str) -> ToolkitResult<Self::Query>;

    /// Whether `mol` contains `query`.
    ///
    /// # Errors
    /// When matching fails.
    fn has_match(&self, mol: &Self::Molecule, query: &Self::Query) -> ToolkitResult<bool>;
}
