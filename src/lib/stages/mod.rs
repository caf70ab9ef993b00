//! Pipeline stages.
//!
//! Each stage takes the toolkit, the store and a [`BatchRunner`] for its own
//! worker pool. Stages that mutate records in place use
//! [`BatchRunner::update`]; stages that change the record count go through the
//! [`RecordStore`] primitives.
//!
//! [`BatchRunner`]: crate::batch::BatchRunner
//! [`BatchRunner::update`]: crate::batch::BatchRunner::update
//! [`RecordStore`]: crate::store::RecordStore

pub mod annotate;
pub mod dedup;
pub mod filter;
pub mod generate;
pub mod normalize;

pub use annotate::{annotate_scaffold, annotate_substructure};
pub use dedup::{DedupReport, deduplicate};
pub use filter::{filter_by_property, remove_invalid, sort_by_property};
pub use generate::{fragment, generate_stereoisomers, generate_synonyms};
pub use normalize::{apply_transform, canonicalize};

/// Property written on fragment records with the SMILES of their source.
pub const FRAGMENT_SOURCE_KEY: &str = "Fragment_Source";

/// Default column for substructure match flags.
pub const DEFAULT_MATCH_COLUMN: &str = "Match";
