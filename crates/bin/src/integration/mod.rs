//! Glue between the command line and the library crates.
//!
//! Resolves the data directory layout and runs the load, record and
//! extraction steps the commands share.

pub(crate) mod paths;
pub(crate) mod pipeline;
