//! Random gate-level netlist generation.
//!
//! `netlistgen` samples cell instances from a weighted distribution over a
//! LEF cell library, wires them into a clocked design with randomly
//! leveled combinational clouds, sizes the primary I/O with Rent's rule,
//! and renders the result as structural Verilog. Runs are fully
//! deterministic: the same inputs and seed reproduce the same output byte
//! for byte.
//!
//! The typical entry points are [`generate`], which returns the in-memory
//! [`Netlist`](netlist::Netlist), and [`run`], which also renders it to
//! `<top name>.v`.

pub mod config;
pub mod dist;
pub mod error;
pub mod lef;
pub(crate) mod log;
pub mod netlist;
pub mod render;
pub mod stats;
pub mod validation;

use std::path::{Path, PathBuf};

use crate::config::{GenConfig, UnboundInputPolicy};
use crate::dist::CellDistribution;
use crate::error::{with_err_context, ErrorContext, ErrorSource, Result};
use crate::lef::{CellLibrary, LefOpts};
use crate::log::Log;
use crate::netlist::builder::NetlistBuilder;
use crate::netlist::validation::ResolveMode;
use crate::netlist::Netlist;
use crate::render::{RenderOpts, Verilog};
use crate::stats::NetlistStats;

/// Generates a netlist according to `config`.
///
/// Loads and cross-checks the cell library and distribution, runs the
/// construction phases, and validates the result before returning it.
pub fn generate(config: &GenConfig) -> Result<Netlist> {
    if config.instance_count == 0 {
        return Err(
            ErrorSource::InvalidArgs("instance_count must be positive".to_string()).into(),
        );
    }

    let lef_text = with_err_context(std::fs::read_to_string(&config.library), || {
        ErrorContext::ReadFile(config.library.clone())
    })?;
    let library = with_err_context(
        CellLibrary::from_lef_opts(
            &lef_text,
            &LefOpts {
                ignore_power_pins: config.ignore_power_pins,
            },
        ),
        || ErrorContext::ReadFile(config.library.clone()),
    )?;

    let dist_text = with_err_context(std::fs::read_to_string(&config.distribution), || {
        ErrorContext::ReadFile(config.distribution.clone())
    })?;
    let dist = with_err_context(CellDistribution::parse(&dist_text), || {
        ErrorContext::ReadFile(config.distribution.clone())
    })?;
    with_err_context(dist.validate_against(&library), || {
        ErrorContext::Task(arcstr::literal!("cross-checking distribution against library"))
    })?;

    let netlist = with_err_context(NetlistBuilder::new(&library, &dist, config).build(), || {
        ErrorContext::Task(arcstr::literal!("building netlist"))
    })?;

    // Promotion guarantees full resolution, so hold it to that standard.
    let mode = match config.unbound_input_policy {
        UnboundInputPolicy::Diagnostic => ResolveMode::Diagnostic,
        UnboundInputPolicy::PromoteToIo => ResolveMode::FullyResolved,
    };
    with_err_context(netlist::validation::validate(&netlist, mode), || {
        ErrorContext::Task(arcstr::literal!("validating generated netlist"))
    })?;

    NetlistStats::compute(&netlist).log();

    Ok(netlist)
}

/// Generates a netlist and renders it to `<top name>.v` under `out_dir`.
///
/// Returns the path of the written file.
pub fn run(config: &GenConfig, out_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let netlist = generate(config)?;
    let renderer = Verilog::with_opts(RenderOpts {
        include_wire_declarations: !config.suppress_wire_declarations,
    });
    let path = with_err_context(renderer.save(&netlist, out_dir.as_ref()), || {
        ErrorContext::Task(arcstr::literal!("writing rendered netlist"))
    })?;
    Ok(path)
}
