//! Tagstep Graph
//!
//! This crate derives the dependency graph of a set of steps from the links
//! they declare. A step depends on every step that creates one of the links it
//! requires.
//!
//! Building a graph:
//! - Rejects duplicate step names
//! - Rejects requirements nobody creates (unless declared satisfied up front)
//! - Rejects cycles
//! - Computes a deterministic execution order

mod error;
mod graph;

pub use error::GraphError;
pub use graph::StepGraph;
