//! # CLI Command Implementations
//!
//! `gencontrol` has a single command. Its arguments are defined with
//! `clap` in [`generate::GenerateArgs`] and flattened into the top-level
//! parser; [`generate::execute`] loads the inputs, runs the generator and
//! writes the results.

pub mod generate;
