//! Command-line front end for the datalyst analyst.
//!
//! The binary wires settings, the SQLite database and the Gemini model into
//! a [`DataAnalyst`](datalyst::DataAnalyst); this library holds the pieces
//! that do not need a terminal or a network to test.
#![allow(clippy::print_stdout)]

pub mod evaluate;
pub mod render;
pub mod repl;

pub use evaluate::{EvaluationCase, EvaluationSummary, Evaluator, SAMPLE_CASES};
pub use repl::{ChatRepl, Command};
