use std::fmt::{Debug, Display};
use std::path::PathBuf;

use thiserror::Error;

use crate::dist::DistError;
use crate::lef::error::LefError;
use crate::netlist::NetlistError;
use crate::render::RenderError;

pub type Result<T> = std::result::Result<T, GenError>;

/// The top-level error type, pairing an [`ErrorSource`] with the
/// contexts in which the error occurred.
pub struct GenError {
    pub(crate) source: ErrorSource,
    pub(crate) context: Vec<ErrorContext>,
}

impl GenError {
    pub fn new(source: impl Into<ErrorSource>) -> Self {
        Self {
            source: source.into(),
            context: Vec::new(),
        }
    }

    pub fn source(&self) -> &ErrorSource {
        &self.source
    }

    pub fn with_context(mut self, ctx: impl Into<ErrorContext>) -> Self {
        self.context.push(ctx.into());
        self
    }

    #[inline]
    pub fn into_inner(self) -> ErrorSource {
        self.source
    }
}

impl std::error::Error for GenError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

impl Display for GenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Error:\n{}", self.source)?;
        if !self.context.is_empty() {
            writeln!(f, "\nError occurred:")?;
            for item in self.context.iter() {
                writeln!(f, "\twhile {}", item)?;
            }
        }
        Ok(())
    }
}

impl Debug for GenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.source)?;
        if !self.context.is_empty() {
            writeln!(f, "\nError occurred:")?;
            for (i, item) in self.context.iter().enumerate() {
                writeln!(f, "\t{}: {:?}", i, item)?;
            }
        }
        Ok(())
    }
}

impl<T> From<T> for GenError
where
    T: Into<ErrorSource>,
{
    fn from(value: T) -> Self {
        Self {
            source: value.into(),
            context: Vec::new(),
        }
    }
}

/// Attaches the given context to the error variant of `result`, if any.
#[inline]
pub fn with_err_context<T, E, C>(result: std::result::Result<T, E>, ctx: C) -> Result<T>
where
    C: FnOnce() -> ErrorContext,
    E: Into<GenError>,
{
    result.map_err(|err| err.into().with_context(ctx()))
}

/// A description of what the generator was doing when an error occurred.
#[derive(Debug, Clone, Eq, PartialEq)]
#[non_exhaustive]
pub enum ErrorContext {
    ReadFile(PathBuf),
    WriteFile(PathBuf),
    Task(arcstr::ArcStr),
}

impl Display for ErrorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use ErrorContext::*;
        match self {
            ReadFile(path) => write!(f, "reading file {path:?}"),
            WriteFile(path) => write!(f, "writing file {path:?}"),
            Task(task) => write!(f, "{task}"),
        }
    }
}

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ErrorSource {
    #[error("error parsing cell library: {0}")]
    Lef(#[from] LefError),

    #[error("error loading cell distribution: {0}")]
    Dist(#[from] DistError),

    #[error("error while building netlist: {0}")]
    Netlist(#[from] NetlistError),

    #[error("error while rendering netlist: {0}")]
    Render(#[from] RenderError),

    #[error("error parsing TOML: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
