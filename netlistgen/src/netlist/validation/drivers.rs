//! Verifies that nets are driven appropriately and that every input pin
//! carries a net.

use std::fmt::Display;

use arcstr::ArcStr;
use slotmap::SecondaryMap;

use super::super::{NetKey, Netlist};
use super::ResolveMode;
use crate::lef::Direction;
use crate::log::Log;
use crate::validation::ValidatorOutput;

/// Validates the number of drivers on each net and the resolution of
/// every instance input pin.
pub(crate) fn validate_drivers(netlist: &Netlist, mode: ResolveMode) -> DriverValidatorOutput {
    DriverValidator { netlist, mode }.validate()
}

/// Validates that every net has exactly one driver and that pins resolve
/// according to the requested [`ResolveMode`].
pub struct DriverValidator<'a> {
    netlist: &'a Netlist,
    mode: ResolveMode,
}

#[derive(Default)]
pub struct DriverValidatorData {
    /// The number of unresolved input pins observed.
    unresolved: usize,
}

impl Log for DriverValidatorData {
    fn log(&self) {
        use crate::log::warn;

        if self.unresolved > 0 {
            warn!("{} input pin(s) have no net bound", self.unresolved);
        }
    }
}

pub type DriverValidatorOutput = ValidatorOutput<Info, Warning, Error, DriverValidatorData>;

/// An error location: a net or an instance pin.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Location {
    Net { name: ArcStr },
    Pin { instance: ArcStr, pin: ArcStr },
}

impl Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Net { name } => write!(f, "net {name}"),
            Self::Pin { instance, pin } => write!(f, "pin {instance}.{pin}"),
        }
    }
}

/// Data for an info-level debug message.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Info {
    loc: Location,
    cause: InfoCause,
}

/// An enumeration of causes for an info message.
#[non_exhaustive]
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum InfoCause {
    /// A net that is driven but read by nothing.
    NotConsumed,
}

impl Info {
    pub fn new(loc: Location, cause: InfoCause) -> Self {
        Self { loc, cause }
    }
}

impl Display for Info {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.cause {
            InfoCause::NotConsumed => {
                write!(f, "net is driven but has no consumers: {}", self.loc)
            }
        }
    }
}

impl Log for Info {
    fn log(&self) {
        use crate::log::info;
        info!("{self}");
    }
}

/// Data for a warning.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Warning {
    loc: Location,
    cause: WarningCause,
}

/// An enumeration of causes for a warning.
#[non_exhaustive]
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum WarningCause {
    /// An input pin with no net bound to it.
    UnresolvedInput,
    /// A net connected to nothing at all.
    Floating,
}

impl Warning {
    pub fn new(loc: Location, cause: WarningCause) -> Self {
        Self { loc, cause }
    }
}

impl Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.cause {
            WarningCause::UnresolvedInput => {
                write!(f, "input pin has no net bound: {}", self.loc)
            }
            WarningCause::Floating => {
                write!(f, "net is connected to nothing: {}", self.loc)
            }
        }
    }
}

impl Log for Warning {
    fn log(&self) {
        use crate::log::warn;
        warn!("{self}");
    }
}

/// Data for an error.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Error {
    loc: Location,
    cause: ErrorCause,
}

/// An enumeration of causes for an error.
#[non_exhaustive]
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum ErrorCause {
    /// A net that is read but has no driver.
    NoDriver,
    /// A net with more than one driver.
    MultipleDrivers,
    /// An unresolved input pin under [`ResolveMode::FullyResolved`].
    UnresolvedInput,
}

impl Error {
    pub fn new(loc: Location, cause: ErrorCause) -> Self {
        Self { loc, cause }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.cause {
            ErrorCause::NoDriver => {
                write!(f, "net is read but has no driver: {}", self.loc)
            }
            ErrorCause::MultipleDrivers => {
                write!(f, "net has multiple drivers: {}", self.loc)
            }
            ErrorCause::UnresolvedInput => {
                write!(f, "input pin has no net bound: {}", self.loc)
            }
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

/// The state of a net.
#[derive(Debug, Clone, Default)]
struct NetState {
    /// The number of drivers on this net.
    ///
    /// A primary input port counts as a driver, since the net is driven
    /// from outside the module.
    drivers: usize,
    /// The number of readers of this net.
    ///
    /// A primary output port counts as a reader.
    taps: usize,
}

impl NetState {
    fn degree(&self) -> usize {
        self.drivers + self.taps
    }

    fn validate(&self, loc: Location, output: &mut DriverValidatorOutput) {
        if self.drivers > 1 {
            output
                .errors
                .push(Error::new(loc.clone(), ErrorCause::MultipleDrivers));
        }

        if self.taps > 0 && self.drivers == 0 {
            output
                .errors
                .push(Error::new(loc.clone(), ErrorCause::NoDriver));
        }

        if self.degree() == 0 {
            output
                .warnings
                .push(Warning::new(loc.clone(), WarningCause::Floating));
        }

        if self.taps == 0 && self.drivers == 1 {
            output.infos.push(Info::new(loc, InfoCause::NotConsumed));
        }
    }
}

impl<'a> DriverValidator<'a> {
    fn validate(&self) -> DriverValidatorOutput {
        let mut output = DriverValidatorOutput::default();

        let mut net_states: SecondaryMap<NetKey, NetState> = SecondaryMap::new();
        for (key, _) in self.netlist.nets() {
            net_states.insert(key, NetState::default());
        }

        for port in self.netlist.ports() {
            let state = &mut net_states[port.net];
            match port.direction {
                Direction::Input => state.drivers += 1,
                Direction::Output | Direction::Inout => state.taps += 1,
            }
        }

        for (_, instance) in self.netlist.instances() {
            if let Some(net) = instance.output_net() {
                net_states[net].drivers += 1;
            }
            for binding in instance.inputs() {
                match binding.net() {
                    Some(net) => net_states[net].taps += 1,
                    None => {
                        let loc = Location::Pin {
                            instance: instance.name().clone(),
                            pin: binding.pin().clone(),
                        };
                        output.data.unresolved += 1;
                        match self.mode {
                            ResolveMode::Diagnostic => output
                                .warnings
                                .push(Warning::new(loc, WarningCause::UnresolvedInput)),
                            ResolveMode::FullyResolved => output
                                .errors
                                .push(Error::new(loc, ErrorCause::UnresolvedInput)),
                        }
                    }
                }
            }
        }

        for (key, state) in net_states.iter() {
            let loc = Location::Net {
                name: self.netlist.net(key).name().clone(),
            };
            state.validate(loc, &mut output);
        }

        output
    }
}
