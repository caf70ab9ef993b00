//! A molecule paired with its string properties.

use std::collections::BTreeMap;

/// Property key holding the record's SMILES text.
pub const SMILES_KEY: &str = "SMILES";

/// One entry of a dataset.
///
/// `molecule` is `None` when parsing failed or a stage dropped the structure;
/// such records are skipped by transforms and never written.
#[derive(Debug, Clone, PartialEq)]
pub struct Record<M> {
    pub molecule: Option<M>,
    pub properties: BTreeMap<String, String>,
}

impl<M> Record<M> {
    /// Record with a molecule and no properties.
    #[must_use]
    pub fn new(molecule: M) -> Self {
        Self { molecule: Some(molecule), properties: BTreeMap::new() }
    }

    /// Record with a molecule whose `SMILES` property is `smiles`.
    #[must_use]
    pub fn with_smiles(molecule: M, smiles: impl Into<String>) -> Self {
        let mut record = Self::new(molecule);
        record.set_smiles(smiles);
        record
    }

    /// Record without a molecule.
    #[must_use]
    pub fn empty() -> Self {
        Self { molecule: None, properties: BTreeMap::new() }
    }

    #[must_use]
    pub fn has_molecule(&self) -> bool {
        self.molecule.is_some()
    }

    #[must_use]
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn smiles(&self) -> Option<&str> {
        self.property(SMILES_KEY)
    }

    pub fn set_smiles(&mut self, smiles: impl Into<String>) {
        self.set_property(SMILES_KEY, smiles);
    }

    /// Parses `key` as a number, see [`parse_numeric`].
    #[must_use]
    pub fn numeric_property(&self, key: &str) -> Option<f64> {
        self.property(key).and_then(parse_numeric)
    }
}

/// Parses a property value as a number.
///
/// Surrounding whitespace is ignored. Empty text, trailing garbage and NaN all
/// yield `None`; infinities are accepted.
///
/// ```
/// use molpipe_lib::record::parse_numeric;
///
/// assert_eq!(parse_numeric(" 3.5 "), Some(3.5));
/// assert_eq!(parse_numeric("1e3"), Some(1000.0));
/// assert_eq!(parse_numeric("abc"), None);
/// assert_eq!(parse_numeric("12abc"), None);
/// assert_eq!(parse_numeric("NaN"), None);
/// ```
#[must_use]
pub fn parse_numeric(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| !v.is_nan())
}
