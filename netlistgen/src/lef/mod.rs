//! Block-scoped LEF macro parser.
//!
//! Only the records relevant to netlist generation are extracted: `MACRO`
//! blocks, their `PIN` records (`DIRECTION`/`USE`), and `SIZE` geometry.
//! Lines outside an open `MACRO` block are never attributed to a cell.

use std::sync::Arc;

use arcstr::ArcStr;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use self::error::LefError;

pub mod error;

/// Pin names treated as supply pins regardless of their `USE` clause.
const SUPPLY_NAMES: [&str; 4] = ["VDD", "VCC", "VSS", "GND"];

/// An enumeration of pin directions.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub enum Direction {
    Input,
    Output,
    Inout,
}

/// The functional category of a pin.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Default, Debug, Serialize, Deserialize)]
pub enum PinUse {
    #[default]
    Signal,
    Clock,
    Power,
    Ground,
}

/// Whether a cell holds state.
///
/// Computed once at library load time from the presence of a clock pin.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub enum CellKind {
    Combinational,
    Sequential,
}

/// A pin of a [`StdCell`]. Immutable once parsed.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct PinDef {
    name: ArcStr,
    direction: Direction,
    role: PinUse,
}

impl PinDef {
    #[inline]
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    #[inline]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    #[inline]
    pub fn role(&self) -> PinUse {
        self.role
    }
}

/// A standard cell definition. Immutable once parsed; shared by reference
/// across all instances of the cell.
#[derive(Clone, Debug)]
pub struct StdCell {
    name: ArcStr,
    width: f64,
    height: f64,
    pins: Vec<PinDef>,
    kind: CellKind,
    output: Option<usize>,
}

impl StdCell {
    #[inline]
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.height
    }

    /// The cell's behavioral pins, in file order.
    #[inline]
    pub fn pins(&self) -> &[PinDef] {
        &self.pins
    }

    #[inline]
    pub fn kind(&self) -> CellKind {
        self.kind
    }

    #[inline]
    pub fn is_sequential(&self) -> bool {
        self.kind == CellKind::Sequential
    }

    /// The cell's single output pin, if it has one.
    #[inline]
    pub fn output_pin(&self) -> Option<&PinDef> {
        self.output.map(|i| &self.pins[i])
    }

    /// Input pins carrying data (clock pins excluded).
    pub fn signal_inputs(&self) -> impl Iterator<Item = &PinDef> + '_ {
        self.pins
            .iter()
            .filter(|p| p.direction == Direction::Input && p.role != PinUse::Clock)
    }

    /// The number of data inputs, i.e. the cell's fan-in.
    #[inline]
    pub fn fanin(&self) -> usize {
        self.signal_inputs().count()
    }
}

/// Options controlling library parsing.
#[derive(Debug, Clone)]
pub struct LefOpts {
    /// Drop power and ground pins from parsed cells.
    pub ignore_power_pins: bool,
}

impl Default for LefOpts {
    fn default() -> Self {
        Self {
            ignore_power_pins: true,
        }
    }
}

/// A parsed cell library, keyed by cell name in file order.
#[derive(Debug, Default, Clone)]
pub struct CellLibrary {
    cells: IndexMap<ArcStr, Arc<StdCell>>,
}

impl CellLibrary {
    /// Parses a library from LEF text with default options.
    pub fn from_lef(text: &str) -> Result<Self, LefError> {
        Self::from_lef_opts(text, &LefOpts::default())
    }

    /// Parses a library from LEF text.
    pub fn from_lef_opts(text: &str, opts: &LefOpts) -> Result<Self, LefError> {
        let mut cells = IndexMap::new();
        let mut scan: Option<MacroScan> = None;

        for (i, raw) in text.lines().enumerate() {
            let line = i + 1;
            let mut tokens = raw.split_whitespace().filter(|t| *t != ";");
            let Some(keyword) = tokens.next() else {
                continue;
            };
            match keyword {
                "MACRO" => {
                    let name = tokens
                        .next()
                        .ok_or(LefError::MissingName {
                            line,
                            keyword: "MACRO",
                        })?
                        .trim_end_matches(';');
                    if let Some(open) = scan.take() {
                        return Err(LefError::UnterminatedMacro { cell: open.name });
                    }
                    scan = Some(MacroScan::new(name));
                }
                "PIN" => {
                    if let Some(m) = scan.as_mut() {
                        let name = tokens
                            .next()
                            .ok_or(LefError::MissingName {
                                line,
                                keyword: "PIN",
                            })?
                            .trim_end_matches(';');
                        m.finish_pin(opts)?;
                        m.pin = Some(PinScan::new(name, line));
                    }
                }
                "DIRECTION" => {
                    if let Some(p) = scan.as_mut().and_then(|m| m.pin.as_mut()) {
                        let token = tokens.next().unwrap_or("").trim_end_matches(';');
                        p.direction = Some(match token {
                            "INPUT" => Direction::Input,
                            "OUTPUT" => Direction::Output,
                            "INOUT" => Direction::Inout,
                            _ => {
                                return Err(LefError::InvalidDirection {
                                    line,
                                    token: token.to_string(),
                                })
                            }
                        });
                    }
                }
                "USE" => {
                    if let Some(p) = scan.as_mut().and_then(|m| m.pin.as_mut()) {
                        let token = tokens.next().unwrap_or("").trim_end_matches(';');
                        p.role = Some(match token {
                            "SIGNAL" => PinUse::Signal,
                            "CLOCK" => PinUse::Clock,
                            "POWER" => PinUse::Power,
                            "GROUND" => PinUse::Ground,
                            _ => {
                                return Err(LefError::InvalidUse {
                                    line,
                                    token: token.to_string(),
                                })
                            }
                        });
                    }
                }
                "SIZE" => {
                    if let Some(m) = scan.as_mut() {
                        if m.pin.is_none() {
                            let w = tokens
                                .next()
                                .and_then(|t| t.parse::<f64>().ok())
                                .ok_or(LefError::MalformedSize { line })?;
                            if tokens.next() != Some("BY") {
                                return Err(LefError::MalformedSize { line });
                            }
                            let h = tokens
                                .next()
                                .map(|t| t.trim_end_matches(';'))
                                .and_then(|t| t.parse::<f64>().ok())
                                .ok_or(LefError::MalformedSize { line })?;
                            m.width = w;
                            m.height = h;
                        }
                    }
                }
                "END" => {
                    if let Some(mut m) = scan.take() {
                        let Some(name) = tokens.next().map(|t| t.trim_end_matches(';')) else {
                            scan = Some(m);
                            continue;
                        };
                        if m.pin.as_ref().map_or(false, |p| p.name == name) {
                            m.finish_pin(opts)?;
                            scan = Some(m);
                        } else if m.name == name {
                            let cell = m.finish(opts)?;
                            cells.insert(cell.name.clone(), Arc::new(cell));
                        } else {
                            scan = Some(m);
                        }
                    }
                }
                _ => {}
            }
        }

        if let Some(open) = scan {
            return Err(LefError::UnterminatedMacro { cell: open.name });
        }
        Ok(Self { cells })
    }

    /// Looks up a cell by name.
    #[inline]
    pub fn cell(&self, name: &str) -> Option<&Arc<StdCell>> {
        self.cells.get(name)
    }

    /// Iterates over cells in file order.
    #[inline]
    pub fn cells(&self) -> impl Iterator<Item = &Arc<StdCell>> + '_ {
        self.cells.values()
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.cells.contains_key(name)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

fn is_supply_name(name: &str) -> bool {
    SUPPLY_NAMES.iter().any(|s| name.contains(s))
}

/// Scratch state for the macro block currently being scanned.
struct MacroScan {
    name: ArcStr,
    width: f64,
    height: f64,
    pins: Vec<PinDef>,
    pin: Option<PinScan>,
}

struct PinScan {
    name: ArcStr,
    line: usize,
    direction: Option<Direction>,
    role: Option<PinUse>,
}

impl MacroScan {
    fn new(name: &str) -> Self {
        Self {
            name: ArcStr::from(name),
            width: 0.0,
            height: 0.0,
            pins: Vec::new(),
            pin: None,
        }
    }

    /// Closes the currently open pin record, if any.
    fn finish_pin(&mut self, opts: &LefOpts) -> Result<(), LefError> {
        let Some(pin) = self.pin.take() else {
            return Ok(());
        };
        let role = pin.role.unwrap_or_default();
        let supply =
            matches!(role, PinUse::Power | PinUse::Ground) || is_supply_name(&pin.name);
        if supply && opts.ignore_power_pins {
            return Ok(());
        }
        let direction = pin.direction.ok_or(LefError::MissingDirection {
            line: pin.line,
            cell: self.name.clone(),
            pin: pin.name.clone(),
        })?;
        self.pins.push(PinDef {
            name: pin.name,
            direction,
            role,
        });
        Ok(())
    }

    fn finish(mut self, opts: &LefOpts) -> Result<StdCell, LefError> {
        self.finish_pin(opts)?;
        let mut output = None;
        for (i, pin) in self.pins.iter().enumerate() {
            if pin.direction == Direction::Output {
                if output.is_some() {
                    return Err(LefError::MultipleOutputs { cell: self.name });
                }
                output = Some(i);
            }
        }
        let kind = if self.pins.iter().any(|p| p.role == PinUse::Clock) {
            CellKind::Sequential
        } else {
            CellKind::Combinational
        };
        Ok(StdCell {
            name: self.name,
            width: self.width,
            height: self.height,
            pins: self.pins,
            kind,
            output,
        })
    }
}

impl PinScan {
    fn new(name: &str, line: usize) -> Self {
        Self {
            name: ArcStr::from(name),
            line,
            direction: None,
            role: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INV_DFF_LEF: &str = r#"
MACRO INV
  CLASS CORE ;
  SIZE 0.42 BY 0.24 ;
  PIN A
    DIRECTION INPUT ;
    USE SIGNAL ;
  END A
  PIN Y
    DIRECTION OUTPUT ;
    USE SIGNAL ;
  END Y
  PIN VDD
    DIRECTION INOUT ;
    USE POWER ;
  END VDD
END INV
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

    #[test]
    fn test_parse_basic_library() {
        let lib = CellLibrary::from_lef(INV_DFF_LEF).unwrap();
        assert_eq!(lib.len(), 2);

        let inv = lib.cell("INV").unwrap();
        assert_eq!(inv.pins().len(), 2);
        assert_eq!(inv.kind(), CellKind::Combinational);
        assert_eq!(inv.output_pin().unwrap().name(), "Y");
        assert_eq!(inv.fanin(), 1);
        assert_eq!(inv.width(), 0.42);
        assert_eq!(inv.height(), 0.24);

        let dff = lib.cell("DFF").unwrap();
        assert_eq!(dff.kind(), CellKind::Sequential);
        assert_eq!(dff.fanin(), 1);
        assert_eq!(dff.output_pin().unwrap().name(), "Q");
    }

    #[test]
    fn test_power_pins_ignored_by_policy() {
        let text = r#"
MACRO NAND2
  PIN A
    DIRECTION INPUT ;
  END A
  PIN B
    DIRECTION INPUT ;
  END B
  PIN Y
    DIRECTION OUTPUT ;
  END Y
  PIN VSS
    USE GROUND ;
  END VSS
END NAND2
"#;
        let lib = CellLibrary::from_lef(text).unwrap();
        let cell = lib.cell("NAND2").unwrap();
        assert_eq!(cell.pins().len(), 3);

        let lib = CellLibrary::from_lef_opts(
            text,
            &LefOpts {
                ignore_power_pins: false,
            },
        );
        // With the policy disabled the VSS pin is kept, and its missing
        // DIRECTION becomes an error.
        assert!(matches!(lib, Err(LefError::MissingDirection { .. })));
    }

    #[test]
    fn test_supply_name_heuristic() {
        // No USE clause at all: the name alone marks the pin as supply.
        let text = r#"
MACRO BUF
  PIN A
    DIRECTION INPUT ;
  END A
  PIN Y
    DIRECTION OUTPUT ;
  END Y
  PIN VDDX
  END VDDX
END BUF
"#;
        let lib = CellLibrary::from_lef(text).unwrap();
        assert_eq!(lib.cell("BUF").unwrap().pins().len(), 2);
    }

    #[test]
    fn test_block_scoped_attribution() {
        // The pin of the second macro must not leak into the first, and
        // stray lines outside any MACRO block are ignored.
        let text = r#"
PIN STRAY
MACRO A1
  PIN X
    DIRECTION INPUT ;
  END X
END A1
PIN STRAY2
MACRO B1
  PIN Y
    DIRECTION OUTPUT ;
  END Y
END B1
"#;
        let lib = CellLibrary::from_lef(text).unwrap();
        assert_eq!(lib.cell("A1").unwrap().pins().len(), 1);
        assert_eq!(lib.cell("A1").unwrap().pins()[0].name(), "X");
        assert_eq!(lib.cell("B1").unwrap().pins().len(), 1);
        assert_eq!(lib.cell("B1").unwrap().pins()[0].name(), "Y");
    }

    #[test]
    fn test_invalid_direction() {
        let text = "MACRO A1\n PIN X\n DIRECTION SIDEWAYS ;\n END X\nEND A1\n";
        let err = CellLibrary::from_lef(text).unwrap_err();
        assert!(matches!(err, LefError::InvalidDirection { line: 3, .. }));
    }

    #[test]
    fn test_invalid_use() {
        let text = "MACRO A1\n PIN X\n DIRECTION INPUT ;\n USE MAGIC ;\n END X\nEND A1\n";
        let err = CellLibrary::from_lef(text).unwrap_err();
        assert!(matches!(err, LefError::InvalidUse { line: 4, .. }));
    }

    #[test]
    fn test_malformed_size() {
        let text = "MACRO A1\n SIZE 0.42 0.24 ;\nEND A1\n";
        let err = CellLibrary::from_lef(text).unwrap_err();
        assert!(matches!(err, LefError::MalformedSize { line: 2 }));
    }

    #[test]
    fn test_multiple_outputs_rejected() {
        let text = r#"
MACRO BAD
  PIN Y1
    DIRECTION OUTPUT ;
  END Y1
  PIN Y2
    DIRECTION OUTPUT ;
  END Y2
END BAD
"#;
        let err = CellLibrary::from_lef(text).unwrap_err();
        assert!(matches!(err, LefError::MultipleOutputs { .. }));
    }

    #[test]
    fn test_unterminated_macro() {
        let text = "MACRO A1\n PIN X\n DIRECTION INPUT ;\n END X\n";
        let err = CellLibrary::from_lef(text).unwrap_err();
        assert!(matches!(err, LefError::UnterminatedMacro { .. }));
    }
}
