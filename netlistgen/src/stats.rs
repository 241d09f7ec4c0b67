//! Summary statistics for a generated netlist.

use std::fmt::Display;

use arcstr::ArcStr;
use indexmap::IndexMap;
use slotmap::SecondaryMap;

use crate::lef::Direction;
use crate::log::Log;
use crate::netlist::{NetKey, Netlist};

/// Aggregate counts describing a [`Netlist`].
#[derive(Debug, Clone, Default)]
pub struct NetlistStats {
    /// The total number of instances.
    pub instances: usize,
    /// The number of combinational instances.
    pub combinational: usize,
    /// The number of sequential instances.
    pub sequential: usize,
    /// The total number of nets.
    pub nets: usize,
    /// The number of input ports.
    pub inputs: usize,
    /// The number of output ports.
    pub outputs: usize,
    /// Instance counts per cell, in order of first use.
    pub cell_counts: IndexMap<ArcStr, usize>,
    /// Mean number of consumers per driven net.
    pub average_fanout: f64,
}

impl NetlistStats {
    /// Computes statistics over `netlist`.
    pub fn compute(netlist: &Netlist) -> Self {
        let mut stats = Self {
            instances: netlist.num_instances(),
            nets: netlist.num_nets(),
            ..Default::default()
        };

        for port in netlist.ports() {
            match port.direction {
                Direction::Input => stats.inputs += 1,
                Direction::Output | Direction::Inout => stats.outputs += 1,
            }
        }

        let mut consumers: SecondaryMap<NetKey, usize> = SecondaryMap::new();
        let mut driven: SecondaryMap<NetKey, bool> = SecondaryMap::new();
        for (key, _) in netlist.nets() {
            consumers.insert(key, 0);
            driven.insert(key, false);
        }
        for port in netlist.ports() {
            match port.direction {
                Direction::Input => driven[port.net] = true,
                Direction::Output | Direction::Inout => consumers[port.net] += 1,
            }
        }

        for (_, instance) in netlist.instances() {
            if instance.cell().is_sequential() {
                stats.sequential += 1;
            } else {
                stats.combinational += 1;
            }
            *stats
                .cell_counts
                .entry(instance.cell().name().clone())
                .or_insert(0) += 1;
            if let Some(net) = instance.output_net() {
                driven[net] = true;
            }
            for binding in instance.inputs() {
                if let Some(net) = binding.net() {
                    consumers[net] += 1;
                }
            }
        }

        let driven_nets = driven.values().filter(|d| **d).count();
        if driven_nets > 0 {
            let total: usize = driven
                .iter()
                .filter(|(_, d)| **d)
                .map(|(k, _)| consumers[k])
                .sum();
            stats.average_fanout = total as f64 / driven_nets as f64;
        }

        stats
    }
}

impl Display for NetlistStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{} instances ({} combinational, {} sequential)",
            self.instances, self.combinational, self.sequential
        )?;
        writeln!(
            f,
            "{} nets, {} input port(s), {} output port(s)",
            self.nets, self.inputs, self.outputs
        )?;
        writeln!(f, "average fanout: {:.2}", self.average_fanout)?;
        for (cell, count) in self.cell_counts.iter() {
            writeln!(f, "  {cell}: {count}")?;
        }
        Ok(())
    }
}

impl Log for NetlistStats {
    fn log(&self) {
        use crate::log::info;
        info!("{self}");
    }
}

#[cfg(test)]
mod tests {
    use float_eq::assert_float_eq;

    use super::*;
    use crate::lef::CellLibrary;
    use crate::netlist::{Instance, NetRole, Netlist};

    const LEF: &str = r#"
MACRO INV
  PIN A
    DIRECTION INPUT ;
  END A
  PIN Y
    DIRECTION OUTPUT ;
  END Y
END INV
MACRO DFF
  PIN D
    DIRECTION INPUT ;
  END D
  PIN CK
    DIRECTION INPUT ;
    USE CLOCK ;
  END CK
  PIN Q
    DIRECTION OUTPUT ;
  END Q
END DFF
"#;

    #[test]
    fn test_stats_small_netlist() {
        let lib = CellLibrary::from_lef(LEF).unwrap();
        let mut netlist = Netlist::new("top");
        let clk = netlist.add_net("clk", NetRole::PrimaryInput);
        netlist.add_port("clk", Direction::Input, clk);
        let n0 = netlist.add_net("n0", NetRole::InternalWire);
        let out0 = netlist.add_net("out0", NetRole::PrimaryOutput);
        netlist.add_port("out0", Direction::Output, out0);

        let mut dff = Instance::new("dff_0", lib.cell("DFF").unwrap().clone()).unwrap();
        dff.bind_clock(clk);
        dff.bind_input("D", n0);
        dff.set_output_net(out0);
        netlist.add_instance(dff);

        let mut inv = Instance::new("inv_1", lib.cell("INV").unwrap().clone()).unwrap();
        inv.bind_input("A", n0);
        inv.set_output_net(n0);
        netlist.add_instance(inv);

        let stats = NetlistStats::compute(&netlist);
        assert_eq!(stats.instances, 2);
        assert_eq!(stats.sequential, 1);
        assert_eq!(stats.combinational, 1);
        assert_eq!(stats.nets, 3);
        assert_eq!(stats.inputs, 1);
        assert_eq!(stats.outputs, 1);
        assert_eq!(stats.cell_counts["DFF"], 1);
        assert_eq!(stats.cell_counts["INV"], 1);
        // clk: 1 consumer; n0: 2 consumers; out0: 1 consumer. All driven.
        assert_float_eq!(stats.average_fanout, 4.0 / 3.0, abs <= 1e-12);
    }
}
