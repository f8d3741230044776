//! Command-line front end for the dirflow pipeline.
//!
//! The binary in `main.rs` only parses arguments and sets up logging; the
//! commands themselves live in [`cli`] so they can be tested directly.

pub mod cli;
