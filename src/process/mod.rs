//! External engine orchestration.
//!
//! Engines are located once per process, run with captured output and a cancellation
//! token, and given scratch space through [`TempWorkspace`].

/// Subprocess runner.
pub mod invocation;
/// Video snapshot offset heuristic.
pub mod timecode;
/// `PATH` discovery.
pub mod tools;
/// Scratch directories.
pub mod workspace;

pub use invocation::{Invocation, Output};
pub use tools::{Tool, Tools};
pub use workspace::TempWorkspace;
