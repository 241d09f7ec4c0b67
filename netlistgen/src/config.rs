//! Generation parameters for a single synthesis run.

use std::path::{Path, PathBuf};

use arcstr::ArcStr;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::error::{with_err_context, ErrorContext, Result};

/// The default Rent's-rule exponent.
pub const DEFAULT_RENT_EXPONENT: f64 = 0.4;

/// The Rent's-rule coefficient used when it can neither be configured
/// nor measured (e.g. a netlist with no combinational instances).
pub const DEFAULT_RENT_COEFFICIENT: f64 = 3.0;

/// Parameters controlling netlist generation.
///
/// A config is typically deserialized from a TOML file or assembled with
/// [`GenConfig::builder`]; the generator itself treats it as read-only.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
pub struct GenConfig {
    /// Path to the LEF cell library.
    #[builder(setter(into))]
    pub library: PathBuf,

    /// Path to the cell distribution file.
    #[builder(setter(into))]
    pub distribution: PathBuf,

    /// Name of the generated top module.
    #[builder(setter(into), default = "arcstr::literal!(\"top\")")]
    #[serde(default = "default_top_name")]
    pub top_name: ArcStr,

    /// Number of gate instances to sample from the distribution.
    ///
    /// On-demand synthesis of sequential instances may grow the netlist
    /// beyond this count.
    pub instance_count: usize,

    /// Center of the Gaussian from which per-net fan-out targets are drawn.
    #[builder(default = "2.0")]
    #[serde(default = "default_average_fanout")]
    pub average_fanout: f64,

    /// Omit `wire` declarations from the rendered output.
    #[builder(default)]
    #[serde(default)]
    pub suppress_wire_declarations: bool,

    /// What to do with input pins still unbound at the end of synthesis.
    #[builder(default)]
    #[serde(default)]
    pub unbound_input_policy: UnboundInputPolicy,

    /// How directions are assigned to primary I/O terminals.
    #[builder(default)]
    #[serde(default)]
    pub io_direction_mode: IoDirectionMode,

    /// Seed for the generator's random source.
    ///
    /// Reusing a seed with identical inputs reproduces a bit-identical
    /// rendered netlist.
    #[builder(default)]
    #[serde(default)]
    pub seed: u64,

    /// The Rent's-rule exponent `p` in `T = r * N^p`.
    #[builder(default = "DEFAULT_RENT_EXPONENT")]
    #[serde(default = "default_rent_exponent")]
    pub rent_exponent: f64,

    /// The Rent's-rule coefficient `r` in `T = r * N^p`.
    ///
    /// `None` selects the measured interpretation: the average fan-in plus
    /// one across combinational instances.
    #[builder(default)]
    #[serde(default)]
    pub rent_coefficient: Option<f64>,

    /// Drop power and ground pins from parsed cell definitions.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub ignore_power_pins: bool,
}

impl GenConfig {
    #[inline]
    pub fn builder() -> GenConfigBuilder {
        GenConfigBuilder::default()
    }

    /// Loads a config from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = with_err_context(std::fs::read_to_string(path), || {
            ErrorContext::ReadFile(path.to_path_buf())
        })?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }
}

/// Policy for input pins left unbound at the end of synthesis.
#[derive(
    Clone, Copy, Eq, PartialEq, Hash, Default, Debug, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum UnboundInputPolicy {
    /// Leave the pin unbound and report a warning; the rendered output
    /// carries an `UNASSIGNED` literal.
    #[default]
    Diagnostic,
    /// Promote each unbound input to a dedicated, uniquely-named primary
    /// input pin.
    PromoteToIo,
}

/// Direction assignment for primary I/O terminals.
#[derive(
    Clone, Copy, Eq, PartialEq, Hash, Default, Debug, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum IoDirectionMode {
    /// Every estimated terminal becomes a primary input.
    AllInputs,
    /// Each terminal is randomly assigned input or output.
    #[default]
    Random,
}

fn default_top_name() -> ArcStr {
    arcstr::literal!("top")
}

fn default_average_fanout() -> f64 {
    2.0
}

fn default_rent_exponent() -> f64 {
    DEFAULT_RENT_EXPONENT
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = GenConfig::builder()
            .library("cells.lef")
            .distribution("cells.dist")
            .instance_count(100usize)
            .build()
            .unwrap();
        assert_eq!(config.top_name, "top");
        assert_eq!(config.average_fanout, 2.0);
        assert_eq!(config.rent_exponent, DEFAULT_RENT_EXPONENT);
        assert_eq!(config.rent_coefficient, None);
        assert_eq!(config.unbound_input_policy, UnboundInputPolicy::Diagnostic);
        assert_eq!(config.io_direction_mode, IoDirectionMode::Random);
        assert!(config.ignore_power_pins);
        assert!(!config.suppress_wire_declarations);
    }

    #[test]
    fn test_toml_defaults() {
        let config: GenConfig = toml::from_str(
            r#"
            library = "cells.lef"
            distribution = "cells.dist"
            instance_count = 50
            "#,
        )
        .unwrap();
        assert_eq!(config.instance_count, 50);
        assert_eq!(config.top_name, "top");
        assert_eq!(config.seed, 0);
    }

    #[test]
    fn test_toml_full() {
        let config: GenConfig = toml::from_str(
            r#"
            library = "cells.lef"
            distribution = "cells.dist"
            top_name = "bench0"
            instance_count = 1000
            average_fanout = 3.5
            suppress_wire_declarations = true
            unbound_input_policy = "promote_to_io"
            io_direction_mode = "all_inputs"
            seed = 42
            rent_coefficient = 3.0
            "#,
        )
        .unwrap();
        assert_eq!(config.top_name, "bench0");
        assert_eq!(config.unbound_input_policy, UnboundInputPolicy::PromoteToIo);
        assert_eq!(config.io_direction_mode, IoDirectionMode::AllInputs);
        assert_eq!(config.rent_coefficient, Some(3.0));
        assert_eq!(config.seed, 42);
    }
}
