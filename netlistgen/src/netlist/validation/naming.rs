//! Verifies that instance, net, and port names are Verilog friendly and
//! that there are no duplicates.

use std::collections::HashSet;
use std::fmt::Display;

use arcstr::ArcStr;

use super::super::Netlist;
use crate::log::Log;
use crate::validation::{Empty, ValidatorOutput};

/// Validates the names used by a netlist.
pub(crate) fn validate_naming(netlist: &Netlist) -> NamingValidatorOutput {
    NamingValidator {
        netlist,
        output: ValidatorOutput::default(),
    }
    .validate()
}

/// Verifies that all instance, net, and port names are unique and
/// reasonable.
pub struct NamingValidator<'a> {
    netlist: &'a Netlist,
    output: NamingValidatorOutput,
}

#[derive(Default)]
pub struct NamingValidatorData {
    // Empty for now.
}

impl Log for NamingValidatorData {
    fn log(&self) {
        // Empty for now.
    }
}

pub type NamingValidatorOutput = ValidatorOutput<Empty, Empty, Error, NamingValidatorData>;

/// Data for an error.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Error {
    cause: ErrorCause,
}

/// An enumeration of causes for an error.
#[non_exhaustive]
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum ErrorCause {
    /// The given name is not a plain Verilog identifier.
    InvalidName { name: ArcStr },
    /// Multiple instances have the same name.
    DuplicateInstanceName { name: ArcStr },
    /// Multiple nets have the same name.
    DuplicateNetName { name: ArcStr },
    /// Multiple ports have the same name.
    DuplicatePortName { name: ArcStr },
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.cause {
            ErrorCause::InvalidName { name } => write!(f, "invalid name: `{name}`"),
            ErrorCause::DuplicateInstanceName { name } => {
                write!(f, "duplicate instance name: `{name}`")
            }
            ErrorCause::DuplicateNetName { name } => write!(f, "duplicate net name: `{name}`"),
            ErrorCause::DuplicatePortName { name } => write!(f, "duplicate port name: `{name}`"),
        }
    }
}

impl Log for Error {
    /// Logs the error to `stderr`.
    fn log(&self) {
        use crate::log::error;
        error!("{self}");
    }
}

impl Error {
    pub fn new(cause: ErrorCause) -> Self {
        Self { cause }
    }
}

/// Checks if the given string `name` is a plain Verilog identifier.
fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

impl<'a> NamingValidator<'a> {
    fn validate(mut self) -> NamingValidatorOutput {
        if !is_valid_name(self.netlist.top_name()) {
            self.output.errors.push(Error::new(ErrorCause::InvalidName {
                name: self.netlist.top_name().clone(),
            }));
        }

        let mut instance_names = HashSet::with_capacity(self.netlist.num_instances());
        let names: Vec<ArcStr> = self
            .netlist
            .instances()
            .map(|(_, i)| i.name().clone())
            .collect();
        for name in names {
            self.validate_name(name, &mut instance_names, |name| {
                ErrorCause::DuplicateInstanceName { name }
            });
        }

        let mut net_names = HashSet::with_capacity(self.netlist.num_nets());
        let names: Vec<ArcStr> = self.netlist.nets().map(|(_, n)| n.name().clone()).collect();
        for name in names {
            self.validate_name(name, &mut net_names, |name| ErrorCause::DuplicateNetName {
                name,
            });
        }

        let mut port_names = HashSet::with_capacity(self.netlist.ports().len());
        let names: Vec<ArcStr> = self
            .netlist
            .ports()
            .iter()
            .map(|p| p.name.clone())
            .collect();
        for name in names {
            self.validate_name(name, &mut port_names, |name| {
                ErrorCause::DuplicatePortName { name }
            });
        }

        self.output
    }

    fn validate_name(
        &mut self,
        name: ArcStr,
        set: &mut HashSet<ArcStr>,
        mut duplicate_error: impl FnMut(ArcStr) -> ErrorCause,
    ) {
        if !is_valid_name(&name) {
            self.output
                .errors
                .push(Error::new(ErrorCause::InvalidName { name: name.clone() }));
        }

        if set.contains(&name) {
            self.output
                .errors
                .push(Error::new(duplicate_error(name.clone())));
        }

        set.insert(name);
    }
}
