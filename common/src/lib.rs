//! Functionality shared between the KEY tools.

pub mod perf;
pub mod tool;
