//! Structural Verilog output.
//!
//! Rendering walks ports, nets, and instances in insertion order, so the
//! same netlist always produces byte-identical text.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use itertools::Itertools;
use thiserror::Error;

use crate::lef::Direction;
use crate::netlist::{Instance, NetRole, Netlist};

/// The placeholder written in place of a net name for an unbound pin.
pub const UNASSIGNED: &str = "UNASSIGNED";

/// An enumeration of rendering errors.
#[derive(Debug, Error)]
pub enum RenderError {
    /// I/O error while writing output.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other error.
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, RenderError>;

/// Configuration options for the Verilog renderer.
#[derive(Clone, Debug)]
pub struct RenderOpts {
    /// Whether to declare internal nets with `wire` statements.
    pub include_wire_declarations: bool,
}

impl Default for RenderOpts {
    fn default() -> Self {
        Self {
            include_wire_declarations: true,
        }
    }
}

/// A structural Verilog renderer.
#[derive(Clone, Debug, Default)]
pub struct Verilog {
    opts: RenderOpts,
}

impl Verilog {
    /// Creates a new [`Verilog`] renderer with default options.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new [`Verilog`] renderer with the given options.
    #[inline]
    pub fn with_opts(opts: RenderOpts) -> Self {
        Self { opts }
    }

    /// Renders `netlist` to a [`String`].
    pub fn render(&self, netlist: &Netlist) -> Result<String> {
        let mut buf = Vec::new();
        self.emit(&mut buf, netlist)?;
        String::from_utf8(buf).map_err(|e| RenderError::Other(e.to_string()))
    }

    /// Renders `netlist` to `<top name>.v` under `out_dir`.
    ///
    /// The netlist is rendered in full before the file is created, so a
    /// rendering failure leaves no partial artifact behind.
    pub fn save(&self, netlist: &Netlist, out_dir: &Path) -> Result<PathBuf> {
        let text = self.render(netlist)?;
        let path = out_dir.join(format!("{}.v", netlist.top_name()));
        fs::write(&path, text)?;
        Ok(path)
    }

    /// Emits `netlist` to `out`.
    pub fn emit(&self, out: &mut dyn Write, netlist: &Netlist) -> Result<()> {
        self.emit_module_begin(out, netlist)?;
        self.emit_port_directions(out, netlist)?;
        if self.opts.include_wire_declarations {
            self.emit_wires(out, netlist)?;
        }
        writeln!(out)?;
        for (_, instance) in netlist.instances() {
            self.emit_instance(out, netlist, instance)?;
        }
        writeln!(out, "endmodule")?;
        Ok(())
    }

    fn emit_module_begin(&self, out: &mut dyn Write, netlist: &Netlist) -> Result<()> {
        if netlist.ports().is_empty() {
            writeln!(out, "module {} ();", netlist.top_name())?;
            return Ok(());
        }
        writeln!(out, "module {} (", netlist.top_name())?;
        let ports = netlist.ports().iter().map(|p| &p.name).join(",\n  ");
        writeln!(out, "  {ports}")?;
        writeln!(out, ");")?;
        Ok(())
    }

    fn emit_port_directions(&self, out: &mut dyn Write, netlist: &Netlist) -> Result<()> {
        for port in netlist.ports() {
            let keyword = match port.direction {
                Direction::Input => "input",
                Direction::Output => "output",
                Direction::Inout => "inout",
            };
            writeln!(out, "{keyword} {};", port.name)?;
        }
        Ok(())
    }

    fn emit_wires(&self, out: &mut dyn Write, netlist: &Netlist) -> Result<()> {
        for (_, net) in netlist.nets() {
            if net.role() == NetRole::InternalWire {
                writeln!(out, "wire {};", net.name())?;
            }
        }
        Ok(())
    }

    /// Emits one instantiation, connecting pins in cell declaration order.
    fn emit_instance(
        &self,
        out: &mut dyn Write,
        netlist: &Netlist,
        instance: &Instance,
    ) -> Result<()> {
        let connections = instance
            .cell()
            .pins()
            .iter()
            .map(|pin| {
                let net = match instance.pin_net(pin.name()) {
                    Some(net) => netlist.net(net).name().as_str(),
                    None => UNASSIGNED,
                };
                format!(".{}({net})", pin.name())
            })
            .join(", ");
        writeln!(
            out,
            "{} {} ( {connections} );",
            instance.cell().name(),
            instance.name()
        )?;
        Ok(())
    }
}
