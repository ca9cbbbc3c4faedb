//! Abstraction of the command line tools (keymerge, keyinfo).

/// Trait that represents a functionality of a tool.
///
/// Every tool is executed with a set of parameters, usually a struct that
/// is parsed from the command line with `structopt`. Tools read their input
/// files, do their work with the `key` crate and write their output. The
/// `execute` function returns whatever the tool wants to report back.
pub trait Tool {
    /// Parameters accepted by this tool.
    type Params;

    /// Output of the `execute` function.
    type Result;

    /// Performs the effect of this tool with specified parameters.
    fn execute(&self, params: Self::Params) -> Self::Result;
}
