use arcstr::ArcStr;
use thiserror::Error;

/// An enumeration of cell-library parsing errors.
#[derive(Debug, Error)]
pub enum LefError {
    /// A `DIRECTION` statement with a token other than INPUT, OUTPUT, or INOUT.
    #[error("line {line}: unknown pin direction `{token}`")]
    InvalidDirection { line: usize, token: String },

    /// A `USE` statement with a token other than SIGNAL, CLOCK, POWER, or GROUND.
    #[error("line {line}: unknown pin use `{token}`")]
    InvalidUse { line: usize, token: String },

    /// A `SIZE` statement that does not match `SIZE <w> BY <h>`.
    #[error("line {line}: malformed SIZE statement")]
    MalformedSize { line: usize },

    /// A `MACRO` or `PIN` statement with no name token.
    #[error("line {line}: `{keyword}` statement is missing a name")]
    MissingName { line: usize, keyword: &'static str },

    /// A pin record closed without a `DIRECTION` statement.
    #[error("line {line}: pin `{pin}` of macro `{cell}` has no DIRECTION")]
    MissingDirection {
        line: usize,
        cell: ArcStr,
        pin: ArcStr,
    },

    /// A macro defining more than one output pin.
    #[error("macro `{cell}` has more than one output pin")]
    MultipleOutputs { cell: ArcStr },

    /// A `MACRO` block with no matching `END` marker.
    #[error("macro `{cell}` is missing its END marker")]
    UnterminatedMacro { cell: ArcStr },
}
