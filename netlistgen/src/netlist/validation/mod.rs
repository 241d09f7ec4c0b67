//! Post-construction checks on generated netlists.

use super::{Netlist, NetlistError};

pub mod drivers;
pub mod naming;

/// How strictly unresolved input pins are treated.
#[derive(Clone, Copy, Eq, PartialEq, Debug, Default)]
pub enum ResolveMode {
    /// Unresolved input pins are reported as warnings.
    #[default]
    Diagnostic,
    /// Unresolved input pins are errors; every pin must carry a net.
    FullyResolved,
}

/// Runs every validator over `netlist`, logging all findings.
///
/// Fails with the first error when any validator reports one.
pub fn validate(netlist: &Netlist, mode: ResolveMode) -> Result<(), NetlistError> {
    let naming = naming::validate_naming(netlist);
    naming.log();
    if naming.has_errors() {
        return Err(NetlistError::InvalidNetlist(naming.first_error()));
    }

    let drivers = drivers::validate_drivers(netlist, mode);
    drivers.log();
    if drivers.has_errors() {
        return Err(NetlistError::InvalidNetlist(drivers.first_error()));
    }

    Ok(())
}
