//! The generated netlist data model.
//!
//! A [`Netlist`] owns its [`Instance`]s and [`Net`]s in slotmaps and keeps
//! separate insertion-order lists so that iteration, and therefore rendered
//! output, is deterministic.

use std::sync::Arc;

use arcstr::ArcStr;
use slotmap::{new_key_type, SlotMap};
use thiserror::Error;

use crate::lef::{Direction, PinUse, StdCell};

pub mod builder;
pub(crate) mod pool;
pub mod validation;

#[cfg(test)]
mod tests;

new_key_type! {
    /// A key identifying an [`Instance`] within a [`Netlist`].
    pub struct InstanceKey;

    /// A key identifying a [`Net`] within a [`Netlist`].
    pub struct NetKey;
}

/// An enumeration of netlist construction errors.
#[derive(Debug, Error)]
pub enum NetlistError {
    /// A pin with a direction other than input or output where exactly
    /// those two are expected.
    #[error("pin `{pin}` of cell `{cell}` has direction {direction:?}; expected INPUT or OUTPUT")]
    UnexpectedDirection {
        cell: ArcStr,
        pin: ArcStr,
        direction: Direction,
    },

    /// An attempt to instantiate a cell with no output pin.
    #[error("cell `{cell}` has no output pin; cannot instantiate it")]
    MissingOutput { cell: ArcStr },

    /// The builder needed a sequential instance but the library defines no
    /// sequential cell with a free data input.
    #[error("library defines no sequential cell with a data input")]
    NoSequentialCell,

    /// The distribution referenced a cell absent from the library.
    #[error("no such cell in the library: `{cell}`")]
    UnknownCell { cell: ArcStr },

    /// Post-synthesis validation failed.
    #[error("invalid netlist (enable logging for details): {0}")]
    InvalidNetlist(String),
}

/// The role of a net within the netlist.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub enum NetRole {
    PrimaryInput,
    PrimaryOutput,
    InternalWire,
}

/// A named electrical connection. Created once, never renamed.
#[derive(Clone, Debug)]
pub struct Net {
    name: ArcStr,
    role: NetRole,
}

impl Net {
    #[inline]
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    #[inline]
    pub fn role(&self) -> NetRole {
        self.role
    }
}

/// A primary pin exposed by the top module.
#[derive(Clone, Debug)]
pub struct Port {
    pub name: ArcStr,
    pub direction: Direction,
    pub net: NetKey,
}

/// An input pin binding of an [`Instance`].
///
/// `net` is `None` while the pin is unbound; there is no sentinel net.
#[derive(Clone, Debug)]
pub struct InputBinding {
    pub(crate) pin: ArcStr,
    pub(crate) role: PinUse,
    pub(crate) net: Option<NetKey>,
}

impl InputBinding {
    #[inline]
    pub fn pin(&self) -> &ArcStr {
        &self.pin
    }

    #[inline]
    pub fn role(&self) -> PinUse {
        self.role
    }

    #[inline]
    pub fn net(&self) -> Option<NetKey> {
        self.net
    }
}

/// A concrete placement of a cell within the netlist.
#[derive(Clone, Debug)]
pub struct Instance {
    name: ArcStr,
    cell: Arc<StdCell>,
    inputs: Vec<InputBinding>,
    output_pin: Option<ArcStr>,
    output_net: Option<NetKey>,
}

impl Instance {
    /// Creates an unbound instance of `cell`.
    ///
    /// Fails if the cell carries a pin with a direction other than input
    /// or output.
    pub fn new(name: impl Into<ArcStr>, cell: Arc<StdCell>) -> Result<Self, NetlistError> {
        let mut inputs = Vec::new();
        let mut output_pin = None;
        for pin in cell.pins() {
            match pin.direction() {
                Direction::Input => inputs.push(InputBinding {
                    pin: pin.name().clone(),
                    role: pin.role(),
                    net: None,
                }),
                Direction::Output => output_pin = Some(pin.name().clone()),
                Direction::Inout => {
                    return Err(NetlistError::UnexpectedDirection {
                        cell: cell.name().clone(),
                        pin: pin.name().clone(),
                        direction: pin.direction(),
                    })
                }
            }
        }
        Ok(Self {
            name: name.into(),
            cell,
            inputs,
            output_pin,
            output_net: None,
        })
    }

    #[inline]
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    #[inline]
    pub fn cell(&self) -> &Arc<StdCell> {
        &self.cell
    }

    #[inline]
    pub fn inputs(&self) -> &[InputBinding] {
        &self.inputs
    }

    #[inline]
    pub fn output_pin(&self) -> Option<&ArcStr> {
        self.output_pin.as_ref()
    }

    #[inline]
    pub fn output_net(&self) -> Option<NetKey> {
        self.output_net
    }

    #[inline]
    pub fn set_output_net(&mut self, net: NetKey) {
        self.output_net = Some(net);
    }

    /// Binds the named input pin to `net`. Returns `false` if the instance
    /// has no such input pin.
    pub fn bind_input(&mut self, pin: &str, net: NetKey) -> bool {
        match self.inputs.iter_mut().find(|b| b.pin == pin) {
            Some(binding) => {
                binding.net = Some(net);
                true
            }
            None => false,
        }
    }

    /// Binds every clock-role input pin to `clk`.
    pub fn bind_clock(&mut self, clk: NetKey) {
        for binding in self.inputs.iter_mut() {
            if binding.role == PinUse::Clock {
                binding.net = Some(clk);
            }
        }
    }

    /// Names of input pins that are still unbound.
    pub fn unbound_inputs(&self) -> impl Iterator<Item = &ArcStr> + '_ {
        self.inputs
            .iter()
            .filter(|b| b.net.is_none())
            .map(|b| &b.pin)
    }

    /// Resolves a pin of the underlying cell to its bound net, if any.
    pub fn pin_net(&self, pin: &str) -> Option<NetKey> {
        if self.output_pin.as_deref() == Some(pin) {
            return self.output_net;
        }
        self.inputs.iter().find(|b| b.pin == pin).and_then(|b| b.net)
    }
}

/// A generated gate-level network.
#[derive(Clone, Debug, Default)]
pub struct Netlist {
    top_name: ArcStr,
    ports: Vec<Port>,
    instances: SlotMap<InstanceKey, Instance>,
    instance_order: Vec<InstanceKey>,
    nets: SlotMap<NetKey, Net>,
    net_order: Vec<NetKey>,
}

impl Netlist {
    /// Creates an empty netlist with the given top module name.
    pub fn new(top_name: impl Into<ArcStr>) -> Self {
        Self {
            top_name: top_name.into(),
            ..Default::default()
        }
    }

    #[inline]
    pub fn top_name(&self) -> &ArcStr {
        &self.top_name
    }

    /// Adds a net; nets are never removed or renamed.
    pub fn add_net(&mut self, name: impl Into<ArcStr>, role: NetRole) -> NetKey {
        let key = self.nets.insert(Net {
            name: name.into(),
            role,
        });
        self.net_order.push(key);
        key
    }

    /// Adds an instance to the end of the instance list.
    pub fn add_instance(&mut self, instance: Instance) -> InstanceKey {
        let key = self.instances.insert(instance);
        self.instance_order.push(key);
        key
    }

    /// Exposes a primary pin at the top level.
    pub fn add_port(&mut self, name: impl Into<ArcStr>, direction: Direction, net: NetKey) {
        self.ports.push(Port {
            name: name.into(),
            direction,
            net,
        });
    }

    #[inline]
    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    #[inline]
    pub fn instance(&self, key: InstanceKey) -> &Instance {
        &self.instances[key]
    }

    #[inline]
    pub fn instance_mut(&mut self, key: InstanceKey) -> &mut Instance {
        &mut self.instances[key]
    }

    #[inline]
    pub fn net(&self, key: NetKey) -> &Net {
        &self.nets[key]
    }

    /// Iterates over instances in insertion order.
    pub fn instances(&self) -> impl Iterator<Item = (InstanceKey, &Instance)> + '_ {
        self.instance_order.iter().map(|&k| (k, &self.instances[k]))
    }

    /// Iterates over nets in insertion order.
    pub fn nets(&self) -> impl Iterator<Item = (NetKey, &Net)> + '_ {
        self.net_order.iter().map(|&k| (k, &self.nets[k]))
    }

    #[inline]
    pub fn num_instances(&self) -> usize {
        self.instance_order.len()
    }

    #[inline]
    pub fn num_nets(&self) -> usize {
        self.net_order.len()
    }
}
