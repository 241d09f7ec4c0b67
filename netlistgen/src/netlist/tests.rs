use std::collections::HashSet;

use super::builder::NetlistBuilder;
use super::validation::{validate, ResolveMode};
use super::{NetKey, Netlist, NetlistError};
use crate::config::{GenConfig, IoDirectionMode, UnboundInputPolicy};
use crate::dist::CellDistribution;
use crate::lef::{CellLibrary, PinUse};
use crate::render::Verilog;

const LEF: &str = r#"
MACRO INV
  SIZE 0.42 BY 0.24 ;
  PIN A
    DIRECTION INPUT ;
    USE SIGNAL ;
  END A
  PIN Y
    DIRECTION OUTPUT ;
    USE SIGNAL ;
  END Y
END INV
MACRO NAND2
  SIZE 0.56 BY 0.24 ;
  PIN A
    DIRECTION INPUT ;
  END A
  PIN B
    DIRECTION INPUT ;
  END B
  PIN Y
    DIRECTION OUTPUT ;
  END Y
END NAND2
MACRO DFF
  SIZE 1.26 BY 0.24 ;
  PIN D
    DIRECTION INPUT ;
    USE SIGNAL ;
  END D
  PIN CK
    DIRECTION INPUT ;
    USE CLOCK ;
  END CK
  PIN Q
    DIRECTION OUTPUT ;
    USE SIGNAL ;
  END Q
END DFF
"#;

const COMB_ONLY_LEF: &str = r#"
MACRO INV
  PIN A
    DIRECTION INPUT ;
  END A
  PIN Y
    DIRECTION OUTPUT ;
  END Y
END INV
"#;

fn config(seed: u64, instance_count: usize) -> GenConfig {
    GenConfig::builder()
        .library("cells.lef")
        .distribution("cells.dist")
        .instance_count(instance_count)
        .seed(seed)
        .build()
        .unwrap()
}

fn build(lef: &str, dist: &str, config: &GenConfig) -> Result<Netlist, NetlistError> {
    let library = CellLibrary::from_lef(lef).unwrap();
    let dist = CellDistribution::parse(dist).unwrap();
    dist.validate_against(&library).unwrap();
    NetlistBuilder::new(&library, &dist, config).build()
}

fn clock_net(netlist: &Netlist) -> NetKey {
    netlist
        .nets()
        .find(|(_, n)| n.name() == "clk")
        .map(|(k, _)| k)
        .unwrap()
}

#[test]
fn test_build_basic_netlist() {
    let mut config = config(0, 20);
    config.io_direction_mode = IoDirectionMode::AllInputs;
    let netlist = build(LEF, "INV 4\nNAND2 4\nDFF 2\n", &config).unwrap();

    // On-demand synthesis can only grow the netlist.
    assert!(netlist.num_instances() >= 20);
    validate(&netlist, ResolveMode::Diagnostic).unwrap();

    // Primary I/O terminal count follows T = r * N^p, with r measured as
    // the average combinational fan-in plus one, plus the clk port.
    let comb: Vec<_> = netlist
        .instances()
        .filter(|(_, i)| !i.cell().is_sequential())
        .collect();
    assert!(!comb.is_empty());
    let r = comb
        .iter()
        .map(|(_, i)| i.cell().fanin() as f64 + 1.0)
        .sum::<f64>()
        / comb.len() as f64;
    let terminals = (r * 20f64.powf(0.4)).trunc() as usize;
    assert_eq!(netlist.ports().len(), terminals + 1);
}

#[test]
fn test_all_sequential_clocked_by_shared_net() {
    let netlist = build(LEF, "INV 4\nNAND2 4\nDFF 2\n", &config(3, 50)).unwrap();
    let clk = clock_net(&netlist);
    let mut seq = 0;
    for (_, instance) in netlist.instances() {
        if !instance.cell().is_sequential() {
            continue;
        }
        seq += 1;
        for binding in instance.inputs() {
            if binding.role() == PinUse::Clock {
                assert_eq!(binding.net(), Some(clk));
            }
        }
    }
    assert!(seq > 0);
}

#[test]
fn test_instance_and_net_names_unique() {
    let netlist = build(LEF, "INV 4\nNAND2 4\nDFF 2\n", &config(7, 80)).unwrap();
    let mut names = HashSet::new();
    for (_, instance) in netlist.instances() {
        assert!(names.insert(instance.name().clone()));
    }
    let mut names = HashSet::new();
    for (_, net) in netlist.nets() {
        assert!(names.insert(net.name().clone()));
    }
}

#[test]
fn test_same_seed_reproduces_output() {
    let config = config(42, 100);
    let a = build(LEF, "INV 5\nNAND2 3\nDFF 2\n", &config).unwrap();
    let b = build(LEF, "INV 5\nNAND2 3\nDFF 2\n", &config).unwrap();
    let renderer = Verilog::new();
    assert_eq!(renderer.render(&a).unwrap(), renderer.render(&b).unwrap());
}

#[test]
fn test_different_seeds_diverge() {
    let a = build(LEF, "INV 5\nNAND2 3\nDFF 2\n", &config(1, 100)).unwrap();
    let b = build(LEF, "INV 5\nNAND2 3\nDFF 2\n", &config(2, 100)).unwrap();
    let renderer = Verilog::new();
    assert_ne!(renderer.render(&a).unwrap(), renderer.render(&b).unwrap());
}

#[test]
fn test_comb_only_distribution_synthesizes_registers() {
    // The distribution never yields a sequential cell, but the library
    // defines one; routing must fall back to a library scan.
    let netlist = build(LEF, "INV 1\n", &config(0, 30)).unwrap();
    let seq = netlist
        .instances()
        .filter(|(_, i)| i.cell().is_sequential())
        .count();
    assert!(seq > 0);
    validate(&netlist, ResolveMode::Diagnostic).unwrap();
}

#[test]
fn test_no_sequential_cell_is_fatal() {
    let err = build(COMB_ONLY_LEF, "INV 1\n", &config(0, 30)).unwrap_err();
    assert!(matches!(err, NetlistError::NoSequentialCell));
}

#[test]
fn test_promote_to_io_leaves_nothing_unbound() {
    let mut config = config(5, 60);
    config.unbound_input_policy = UnboundInputPolicy::PromoteToIo;
    let netlist = build(LEF, "INV 4\nNAND2 4\nDFF 2\n", &config).unwrap();
    for (_, instance) in netlist.instances() {
        assert_eq!(instance.unbound_inputs().count(), 0);
    }
    validate(&netlist, ResolveMode::FullyResolved).unwrap();
}

#[test]
fn test_every_net_has_one_driver() {
    let netlist = build(LEF, "INV 4\nNAND2 4\nDFF 2\n", &config(9, 120)).unwrap();
    let mut drivers: std::collections::HashMap<NetKey, usize> = Default::default();
    for port in netlist.ports() {
        if port.direction == crate::lef::Direction::Input {
            *drivers.entry(port.net).or_insert(0) += 1;
        }
    }
    for (_, instance) in netlist.instances() {
        if let Some(net) = instance.output_net() {
            *drivers.entry(net).or_insert(0) += 1;
        }
    }
    for (key, _) in netlist.nets() {
        assert_eq!(drivers.get(&key).copied().unwrap_or(0), 1);
    }
}

#[test]
fn test_explicit_rent_coefficient() {
    let mut config = config(0, 20);
    config.io_direction_mode = IoDirectionMode::AllInputs;
    config.rent_coefficient = Some(3.0);
    let netlist = build(LEF, "INV 4\nNAND2 4\nDFF 2\n", &config).unwrap();
    let terminals = (3.0 * 20f64.powf(0.4)).trunc() as usize;
    assert_eq!(netlist.ports().len(), terminals + 1);
}
