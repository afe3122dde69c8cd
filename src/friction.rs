//! Friction levels and the project load gauge.
//!
//! Every task carries one of four friction levels. Levels are totally ordered
//! (`none < low < moderate < high`) and map to a numeric cost that feeds the
//! lowest-friction suggestion and the per-project load gauge.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::GaugeConfig;
use crate::error::{Error, Result};
use crate::model::Task;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Friction {
    #[default]
    None,
    Low,
    Moderate,
    High,
}

impl Friction {
    /// All levels in ascending order.
    pub const ALL: [Friction; 4] = [
        Friction::None,
        Friction::Low,
        Friction::Moderate,
        Friction::High,
    ];

    pub fn cost(self) -> u32 {
        match self {
            Friction::None => 0,
            Friction::Low => 1,
            Friction::Moderate => 3,
            Friction::High => 5,
        }
    }

    /// Cyclic successor: `none -> low -> moderate -> high -> none`.
    pub fn next(self) -> Friction {
        match self {
            Friction::None => Friction::Low,
            Friction::Low => Friction::Moderate,
            Friction::Moderate => Friction::High,
            Friction::High => Friction::None,
        }
    }

    /// One step up, saturating at `high`.
    pub fn escalate(self) -> Friction {
        match self {
            Friction::None => Friction::Low,
            Friction::Low => Friction::Moderate,
            Friction::Moderate | Friction::High => Friction::High,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Friction::None => "none",
            Friction::Low => "low",
            Friction::Moderate => "moderate",
            Friction::High => "high",
        }
    }

    /// Short display label.
    pub fn label(self) -> &'static str {
        match self {
            Friction::None => "None",
            Friction::Low => "Low",
            Friction::Moderate => "Mod",
            Friction::High => "High",
        }
    }
}

impl fmt::Display for Friction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Friction {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "none" | "0" => Ok(Friction::None),
            "low" | "1" => Ok(Friction::Low),
            "moderate" | "mod" | "3" => Ok(Friction::Moderate),
            "high" | "5" => Ok(Friction::High),
            other => Err(Error::InvalidArgument(format!(
                "invalid friction '{other}' (expected none|low|moderate|high)"
            ))),
        }
    }
}

/// Sum of friction costs over the open tasks in `tasks`.
pub fn open_cost<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> u32 {
    tasks
        .into_iter()
        .filter(|task| !task.completed)
        .map(|task| task.friction.cost())
        .sum()
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LoadBand {
    Calm,
    Warm,
    Strained,
}

impl LoadBand {
    pub fn as_str(self) -> &'static str {
        match self {
            LoadBand::Calm => "calm",
            LoadBand::Warm => "warm",
            LoadBand::Strained => "strained",
        }
    }
}

/// Friction load of one project.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Load {
    pub score: u32,
    pub percent: u32,
    pub band: LoadBand,
}

impl Load {
    pub fn measure<'a>(tasks: impl IntoIterator<Item = &'a Task>, gauge: &GaugeConfig) -> Self {
        let score = open_cost(tasks);
        let percent = if gauge.max == 0 {
            100
        } else {
            (score.saturating_mul(100) / gauge.max).min(100)
        };
        let band = if score > gauge.strained_above {
            LoadBand::Strained
        } else if score > gauge.warm_above {
            LoadBand::Warm
        } else {
            LoadBand::Calm
        };
        Self {
            score,
            percent,
            band,
        }
    }
}
