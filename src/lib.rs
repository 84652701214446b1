//! mindgraph: hierarchy and connectivity engine for diagram and mind-map editors
//!
//! Layered architecture:
//! - `domain`: node forest, derived indices, ordering, cascades, transition function,
//!   node-type registry
//! - `application`: node store, snapshot persistence, built-in defaults
//! - `infrastructure`: filesystem boundary, service wiring
//! - `cli`: argument parsing and command dispatch

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
