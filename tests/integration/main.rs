//! Integration tests for molpipe.
//!
//! These tests validate end-to-end workflows that span multiple modules,
//! ensuring that module interactions work correctly.

mod helpers;
mod test_batch_runner;
mod test_cli;
mod test_dedup;
mod test_expansion;
mod test_pipeline;
mod test_store;
