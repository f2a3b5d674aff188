//! Status light output.
//!
//! The light has three lamps. A colour is shown by switching every lamp off
//! and then asserting at most one, so two colours are never lit together.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// One physical lamp.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lamp {
    Green,
    Red,
    Yellow,
}

impl Lamp {
    pub const ALL: [Lamp; 3] = [Lamp::Green, Lamp::Red, Lamp::Yellow];
}

/// Colour shown by the status light.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorColor {
    Off,
    Green,
    Red,
    PulsatingYellow,
}

impl IndicatorColor {
    /// Lamp asserted for this colour, `None` for [`IndicatorColor::Off`].
    pub fn lamp(self) -> Option<Lamp> {
        match self {
            Self::Off => None,
            Self::Green => Some(Lamp::Green),
            Self::Red => Some(Lamp::Red),
            Self::PulsatingYellow => Some(Lamp::Yellow),
        }
    }
}

impl fmt::Display for IndicatorColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Off => "off",
            Self::Green => "green",
            Self::Red => "red",
            Self::PulsatingYellow => "pulsating yellow",
        })
    }
}

/// Hardware binding of the lamps (GPIO, console, recorder).
pub trait IndicatorPanel: Send {
    fn switch(&mut self, lamp: Lamp, on: bool);

    /// Show `color`: clear every lamp, then assert the one for `color`.
    fn set_indicator(&mut self, color: IndicatorColor) {
        for lamp in Lamp::ALL {
            self.switch(lamp, false);
        }
        if let Some(lamp) = color.lamp() {
            self.switch(lamp, true);
        }
    }
}

/// Panel that only logs, for machines without lamps attached.
#[derive(Debug, Default)]
pub struct ConsoleIndicator {
    lit: Option<Lamp>,
}

impl IndicatorPanel for ConsoleIndicator {
    fn switch(&mut self, lamp: Lamp, on: bool) {
        match (on, self.lit) {
            (true, _) => self.lit = Some(lamp),
            (false, Some(lit)) if lit == lamp => self.lit = None,
            _ => {}
        }
    }

    fn set_indicator(&mut self, color: IndicatorColor) {
        self.lit = color.lamp();
        info!(color = %color, "LED");
    }
}

#[derive(Debug, Default)]
struct PanelRecord {
    lit: Vec<Lamp>,
    activations: Vec<Lamp>,
    max_lit: usize,
}

/// Panel recording every switch, shareable with the test that inspects it.
#[derive(Debug, Default, Clone)]
pub struct MemoryIndicator {
    record: Arc<Mutex<PanelRecord>>,
}

impl MemoryIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lamps currently on.
    pub fn lit(&self) -> Vec<Lamp> {
        self.record.lock().lit.clone()
    }

    /// The colour currently shown.
    pub fn color(&self) -> IndicatorColor {
        match self.record.lock().lit.as_slice() {
            [Lamp::Green] => IndicatorColor::Green,
            [Lamp::Red] => IndicatorColor::Red,
            [Lamp::Yellow] => IndicatorColor::PulsatingYellow,
            _ => IndicatorColor::Off,
        }
    }

    /// Every lamp switched on, in order.
    pub fn activations(&self) -> Vec<Lamp> {
        self.record.lock().activations.clone()
    }

    /// Largest number of lamps that were ever on at the same time.
    pub fn max_simultaneously_lit(&self) -> usize {
        self.record.lock().max_lit
    }
}

impl IndicatorPanel for MemoryIndicator {
    fn switch(&mut self, lamp: Lamp, on: bool) {
        let mut record = self.record.lock();
        if on {
            if !record.lit.contains(&lamp) {
                record.lit.push(lamp);
            }
            record.activations.push(lamp);
        } else {
            record.lit.retain(|lit| *lit != lamp);
        }
        record.max_lit = record.max_lit.max(record.lit.len());
    }
}
