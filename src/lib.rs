//! scriptgen
//!
//! Generate → extract → gate → sandbox-execute pipeline for turning a
//! natural-language task into a script and, when the operator allows it,
//! running that script once in a scratch directory.

pub mod auth;
pub mod backend;
pub mod cli;
pub mod config;
pub mod engine;
pub mod extract;
pub mod generator;
pub mod ids;
pub mod language;
pub mod runner;
pub mod runtime;
pub mod safety;
pub mod sandbox;
pub mod sinks;
pub mod util;
