//! CLI command implementations for molpipe.
//!
//! # Commands
//!
//! - [`run`] - Load molecules, run the selected stages and write the result
//! - [`split`] - Write shuffled train/test/validation subsets of a dataset

// Blanket clippy pedantic allows for command implementations.
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::struct_excessive_bools,
    clippy::must_use_candidate,
    clippy::too_many_lines,
    clippy::uninlined_format_args
)]

pub mod command;
pub mod common;
pub mod run;
pub mod split;
