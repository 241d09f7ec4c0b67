//! The stochastic netlist construction algorithm.
//!
//! Construction runs in phases over a single seeded random source:
//! sample and classify instances, distribute the clock, resolve
//! combinational logic in randomly leveled clouds, size and bind primary
//! I/O from a Rent's-rule estimate, chain leftover sequential instances,
//! and finally apply the unbound-input policy.

use std::sync::Arc;

use arcstr::ArcStr;
use rand::Rng;
use rand_distr::StandardNormal;
use rand_xoshiro::rand_core::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;

use super::pool::{FreeSeqPool, FreeSlot};
use super::{Instance, InstanceKey, NetKey, NetRole, Netlist, NetlistError};
use crate::config::{GenConfig, IoDirectionMode, UnboundInputPolicy, DEFAULT_RENT_COEFFICIENT};
use crate::dist::CellDistribution;
use crate::lef::{CellKind, CellLibrary, Direction, StdCell};
use crate::log::{debug, warn};

/// Bounds on the number of combinational instances drawn into one cloud.
const CLOUD_MIN: usize = 10;
const CLOUD_MAX: usize = 100;

/// Bounds on the number of instances in one cloud level.
const LEVEL_MIN: usize = 1;
const LEVEL_MAX: usize = 10;

/// Distribution draws attempted before falling back to a library scan
/// when synthesizing a sequential instance on demand.
const SYNTH_DRAW_LIMIT: usize = 64;

/// Builds a [`Netlist`] from a cell library and a cell distribution.
pub struct NetlistBuilder<'a> {
    library: &'a CellLibrary,
    dist: &'a CellDistribution,
    config: &'a GenConfig,
    rng: Xoshiro256StarStar,
    netlist: Netlist,
    pool: FreeSeqPool,
    /// Combinational instances, in creation order.
    comb: Vec<InstanceKey>,
    /// Sequential instances, in creation order.
    seq: Vec<InstanceKey>,
    clock: Option<NetKey>,
    net_counter: u64,
    instance_counter: u64,
    pi_counter: u64,
    po_counter: u64,
}

impl<'a> NetlistBuilder<'a> {
    pub fn new(
        library: &'a CellLibrary,
        dist: &'a CellDistribution,
        config: &'a GenConfig,
    ) -> Self {
        Self {
            library,
            dist,
            config,
            rng: Xoshiro256StarStar::seed_from_u64(config.seed),
            netlist: Netlist::new(config.top_name.clone()),
            pool: FreeSeqPool::new(),
            comb: Vec::new(),
            seq: Vec::new(),
            clock: None,
            net_counter: 0,
            instance_counter: 0,
            pi_counter: 0,
            po_counter: 0,
        }
    }

    /// Runs all construction phases and returns the finished netlist.
    pub fn build(mut self) -> Result<Netlist, NetlistError> {
        self.sample_instances()?;
        self.distribute_clock();
        self.resolve_combinational()?;
        self.create_primary_io()?;
        self.interconnect_leftovers()?;
        self.resolve_unbound();
        debug!(
            "built netlist `{}`: {} instances ({} combinational, {} sequential), {} nets",
            self.netlist.top_name(),
            self.netlist.num_instances(),
            self.comb.len(),
            self.seq.len(),
            self.netlist.num_nets()
        );
        Ok(self.netlist)
    }

    /// Phase 1: draw cells from the distribution and instantiate them,
    /// each with a freshly created output net.
    fn sample_instances(&mut self) -> Result<(), NetlistError> {
        let names = self.dist.sample(&mut self.rng, self.config.instance_count);
        for name in names {
            let cell = self
                .library
                .cell(&name)
                .cloned()
                .ok_or(NetlistError::UnknownCell { cell: name })?;
            self.instantiate(cell, None)?;
        }
        Ok(())
    }

    /// Phase 2: create the single shared clock net and bind every
    /// clock-role input pin of every sequential instance to it.
    fn distribute_clock(&mut self) {
        let clk = self
            .netlist
            .add_net(arcstr::literal!("clk"), NetRole::PrimaryInput);
        self.netlist
            .add_port(arcstr::literal!("clk"), Direction::Input, clk);
        for &key in &self.seq {
            self.netlist.instance_mut(key).bind_clock(clk);
        }
        self.clock = Some(clk);
    }

    /// Phase 3: resolve combinational instances in randomly leveled clouds.
    fn resolve_combinational(&mut self) -> Result<(), NetlistError> {
        let mut pending = self.comb.clone();
        while !pending.is_empty() {
            let cloud_size = self.rng.gen_range(CLOUD_MIN..=CLOUD_MAX).min(pending.len());
            let mut cloud = Vec::with_capacity(cloud_size);
            for _ in 0..cloud_size {
                let i = self.rng.gen_range(0..pending.len());
                cloud.push(pending.swap_remove(i));
            }
            self.resolve_cloud(cloud)?;
        }
        Ok(())
    }

    fn resolve_cloud(&mut self, mut cloud: Vec<InstanceKey>) -> Result<(), NetlistError> {
        let mut levels: Vec<Vec<InstanceKey>> = Vec::new();
        while !cloud.is_empty() {
            let size = self.rng.gen_range(LEVEL_MIN..=LEVEL_MAX).min(cloud.len());
            levels.push(cloud.drain(..size).collect());
        }

        // The first level reads from register outputs.
        for &inst in &levels[0] {
            let pins: Vec<ArcStr> = self
                .netlist
                .instance(inst)
                .unbound_inputs()
                .cloned()
                .collect();
            for pin in pins {
                let net = self.random_register_output()?;
                self.netlist.instance_mut(inst).bind_input(&pin, net);
            }
        }

        for li in 1..levels.len() {
            let mut prev = Vec::with_capacity(levels[li - 1].len());
            for &k in &levels[li - 1] {
                prev.push(self.instance_output(k)?);
            }
            let mut consumed = vec![false; prev.len()];
            for &inst in &levels[li] {
                let pins: Vec<ArcStr> = self
                    .netlist
                    .instance(inst)
                    .unbound_inputs()
                    .cloned()
                    .collect();
                for pin in pins {
                    let i = self.rng.gen_range(0..prev.len());
                    consumed[i] = true;
                    self.netlist.instance_mut(inst).bind_input(&pin, prev[i]);
                }
            }
            // Outputs no consumer selected are captured by a register.
            for (i, &net) in prev.iter().enumerate() {
                if !consumed[i] {
                    self.route_to_sequential(net)?;
                }
            }
        }
        Ok(())
    }

    /// Phases 4 and 5: estimate the primary terminal count from Rent's
    /// rule, then create and bind each terminal.
    fn create_primary_io(&mut self) -> Result<(), NetlistError> {
        let n = self.config.instance_count as f64;
        let r = self.rent_coefficient();
        let terminals = (r * n.powf(self.config.rent_exponent)).trunc() as usize;
        debug!("creating {terminals} primary terminals (r = {r:.3})");

        for _ in 0..terminals {
            let is_input = match self.config.io_direction_mode {
                IoDirectionMode::AllInputs => true,
                IoDirectionMode::Random => self.rng.gen::<bool>(),
            };
            if is_input {
                let name = arcstr::format!("in{}", self.pi_counter);
                self.pi_counter += 1;
                let net = self.netlist.add_net(name.clone(), NetRole::PrimaryInput);
                self.netlist.add_port(name, Direction::Input, net);
                let slot = self.acquire_or_synthesize()?;
                self.netlist
                    .instance_mut(slot.instance)
                    .bind_input(&slot.pin, net);
            } else {
                let name = arcstr::format!("out{}", self.po_counter);
                self.po_counter += 1;
                let net = self.netlist.add_net(name.clone(), NetRole::PrimaryOutput);
                self.netlist.add_port(name, Direction::Output, net);
                self.synthesize_sequential(Some(net))?;
            }
        }
        Ok(())
    }

    /// Phase 6: chain the remaining free sequential inputs off register
    /// outputs until the free pool is exhausted.
    fn interconnect_leftovers(&mut self) -> Result<(), NetlistError> {
        while let Some(slot) = self.pool.acquire_random(&mut self.rng) {
            let donor = self.donor_net_excluding(slot.instance)?;
            self.netlist
                .instance_mut(slot.instance)
                .bind_input(&slot.pin, donor);
            // Fan the donor net out to a Gaussian-sized set of receivers.
            let extra = self.fanout_target().saturating_sub(1);
            for _ in 0..extra {
                match self.pool.acquire_random(&mut self.rng) {
                    Some(s) => {
                        self.netlist.instance_mut(s.instance).bind_input(&s.pin, donor);
                    }
                    None => break,
                }
            }
        }
        Ok(())
    }

    /// Phase 7: apply the unbound-input policy to any input pin still
    /// unbound.
    fn resolve_unbound(&mut self) {
        let mut dangling: Vec<(InstanceKey, ArcStr)> = Vec::new();
        for (key, instance) in self.netlist.instances() {
            for pin in instance.unbound_inputs() {
                dangling.push((key, pin.clone()));
            }
        }
        if dangling.is_empty() {
            return;
        }
        match self.config.unbound_input_policy {
            UnboundInputPolicy::Diagnostic => {
                for (key, pin) in &dangling {
                    warn!(
                        "input pin {}.{} left unbound",
                        self.netlist.instance(*key).name(),
                        pin
                    );
                }
                warn!("{} input pin(s) left unbound", dangling.len());
            }
            UnboundInputPolicy::PromoteToIo => {
                for (i, (key, pin)) in dangling.into_iter().enumerate() {
                    let name = arcstr::format!("in_unbound{i}");
                    let net = self.netlist.add_net(name.clone(), NetRole::PrimaryInput);
                    self.netlist.add_port(name, Direction::Input, net);
                    self.netlist.instance_mut(key).bind_input(&pin, net);
                }
            }
        }
    }

    /// The Rent's-rule coefficient: configured, or measured as the average
    /// fan-in plus one across combinational instances.
    fn rent_coefficient(&self) -> f64 {
        if let Some(r) = self.config.rent_coefficient {
            return r;
        }
        if self.comb.is_empty() {
            return DEFAULT_RENT_COEFFICIENT;
        }
        let total: usize = self
            .comb
            .iter()
            .map(|&k| self.netlist.instance(k).inputs().len() + 1)
            .sum();
        total as f64 / self.comb.len() as f64
    }

    /// Draws a fan-out target from a Gaussian centered at the configured
    /// average with standard deviation 1, floored at 0.
    fn fanout_target(&mut self) -> usize {
        let noise: f64 = self.rng.sample(StandardNormal);
        let target = (self.config.average_fanout + noise).floor();
        if target <= 0.0 {
            0
        } else {
            target as usize
        }
    }

    /// The output net of an arbitrary existing sequential instance,
    /// synthesizing one on demand if none exists.
    fn random_register_output(&mut self) -> Result<NetKey, NetlistError> {
        if self.seq.is_empty() {
            self.synthesize_sequential(None)?;
        }
        let i = self.rng.gen_range(0..self.seq.len());
        self.instance_output(self.seq[i])
    }

    /// A register output to use as a donor, avoiding `receiver`'s own
    /// output when another candidate exists.
    fn donor_net_excluding(&mut self, receiver: InstanceKey) -> Result<NetKey, NetlistError> {
        let mut i = self.rng.gen_range(0..self.seq.len());
        if self.seq[i] == receiver && self.seq.len() > 1 {
            i = (i + 1) % self.seq.len();
        }
        self.instance_output(self.seq[i])
    }

    fn instance_output(&self, key: InstanceKey) -> Result<NetKey, NetlistError> {
        let instance = self.netlist.instance(key);
        instance
            .output_net()
            .ok_or_else(|| NetlistError::MissingOutput {
                cell: instance.cell().name().clone(),
            })
    }

    /// Routes `net` into a free sequential input slot, synthesizing a new
    /// sequential instance when the pool is empty.
    fn route_to_sequential(&mut self, net: NetKey) -> Result<(), NetlistError> {
        let slot = self.acquire_or_synthesize()?;
        self.netlist
            .instance_mut(slot.instance)
            .bind_input(&slot.pin, net);
        Ok(())
    }

    fn acquire_or_synthesize(&mut self) -> Result<FreeSlot, NetlistError> {
        if let Some(slot) = self.pool.acquire_random(&mut self.rng) {
            return Ok(slot);
        }
        self.synthesize_sequential(None)?;
        self.pool
            .acquire_random(&mut self.rng)
            .ok_or(NetlistError::NoSequentialCell)
    }

    /// Appends a sequential instance drawn on demand. Its output drives
    /// `output` when given, or a fresh internal net otherwise.
    fn synthesize_sequential(
        &mut self,
        output: Option<NetKey>,
    ) -> Result<InstanceKey, NetlistError> {
        let cell = self.pick_sequential_cell()?;
        self.instantiate(cell, output)
    }

    /// Draws from the distribution, rejecting combinational cells; falls
    /// back to scanning the library so a distribution with no sequential
    /// weight cannot stall the run.
    fn pick_sequential_cell(&mut self) -> Result<Arc<StdCell>, NetlistError> {
        for _ in 0..SYNTH_DRAW_LIMIT {
            let name = self.dist.choose(&mut self.rng);
            if let Some(cell) = self.library.cell(name) {
                if cell.is_sequential() && cell.fanin() > 0 {
                    return Ok(cell.clone());
                }
            }
        }
        self.library
            .cells()
            .find(|c| c.is_sequential() && c.fanin() > 0)
            .cloned()
            .ok_or(NetlistError::NoSequentialCell)
    }

    /// Creates an instance of `cell`, binds its output net, classifies it,
    /// and registers free slots for sequential cells.
    fn instantiate(
        &mut self,
        cell: Arc<StdCell>,
        output: Option<NetKey>,
    ) -> Result<InstanceKey, NetlistError> {
        if cell.output_pin().is_none() {
            return Err(NetlistError::MissingOutput {
                cell: cell.name().clone(),
            });
        }
        let name = arcstr::format!("{}_{}", cell.name().to_lowercase(), self.instance_counter);
        self.instance_counter += 1;
        let mut instance = Instance::new(name, cell.clone())?;
        let net = match output {
            Some(net) => net,
            None => self.fresh_internal_net(),
        };
        instance.set_output_net(net);
        match cell.kind() {
            CellKind::Sequential => {
                if let Some(clk) = self.clock {
                    instance.bind_clock(clk);
                }
                let free: Vec<ArcStr> = cell.signal_inputs().map(|p| p.name().clone()).collect();
                let key = self.netlist.add_instance(instance);
                self.pool.register(key, free);
                self.seq.push(key);
                Ok(key)
            }
            CellKind::Combinational => {
                let key = self.netlist.add_instance(instance);
                self.comb.push(key);
                Ok(key)
            }
        }
    }

    fn fresh_internal_net(&mut self) -> NetKey {
        let name = arcstr::format!("n{}", self.net_counter);
        self.net_counter += 1;
        self.netlist.add_net(name, NetRole::InternalWire)
    }
}
