// Tech Type module - technology codes shared by the cost model, the selector and the summaries
use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Technology code, numbered the way result tables report them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TechCode {
    Grid,
    SaDiesel,
    SaPv,
    MgDiesel,
    MgPv,
    MgWind,
    MgHydro,
    MgHybrid,
    Unelectrified,
}

impl TechCode {
    /// Every technology that can electrify a settlement, grid first.
    pub const ELECTRIFYING: [TechCode; 8] = [
        TechCode::Grid,
        TechCode::SaDiesel,
        TechCode::SaPv,
        TechCode::MgDiesel,
        TechCode::MgPv,
        TechCode::MgWind,
        TechCode::MgHydro,
        TechCode::MgHybrid,
    ];

    pub const OFF_GRID: [TechCode; 7] = [
        TechCode::SaDiesel,
        TechCode::SaPv,
        TechCode::MgDiesel,
        TechCode::MgPv,
        TechCode::MgWind,
        TechCode::MgHydro,
        TechCode::MgHybrid,
    ];

    pub fn code(&self) -> u8 {
        match self {
            TechCode::Grid => 1,
            TechCode::SaDiesel => 2,
            TechCode::SaPv => 3,
            TechCode::MgDiesel => 4,
            TechCode::MgPv => 5,
            TechCode::MgWind => 6,
            TechCode::MgHydro => 7,
            TechCode::MgHybrid => 8,
            TechCode::Unelectrified => 99,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(TechCode::Grid),
            2 => Some(TechCode::SaDiesel),
            3 => Some(TechCode::SaPv),
            4 => Some(TechCode::MgDiesel),
            5 => Some(TechCode::MgPv),
            6 => Some(TechCode::MgWind),
            7 => Some(TechCode::MgHydro),
            8 => Some(TechCode::MgHybrid),
            99 => Some(TechCode::Unelectrified),
            _ => None,
        }
    }

    /// Label used in summary row names.
    pub fn display_name(&self) -> &'static str {
        match self {
            TechCode::Grid => "Grid",
            TechCode::SaDiesel => "SA_Diesel",
            TechCode::SaPv => "SA_PV",
            TechCode::MgDiesel => "MG_Diesel",
            TechCode::MgPv => "MG_PV",
            TechCode::MgWind => "MG_Wind",
            TechCode::MgHydro => "MG_Hydro",
            TechCode::MgHybrid => "MG_Hybrid",
            TechCode::Unelectrified => "Unelectrified",
        }
    }

    pub fn is_off_grid(&self) -> bool {
        !matches!(self, TechCode::Grid | TechCode::Unelectrified)
    }

    fn slot(&self) -> usize {
        match self {
            TechCode::Grid => 0,
            TechCode::SaDiesel => 1,
            TechCode::SaPv => 2,
            TechCode::MgDiesel => 3,
            TechCode::MgPv => 4,
            TechCode::MgWind => 5,
            TechCode::MgHydro => 6,
            TechCode::MgHybrid => 7,
            TechCode::Unelectrified => 8,
        }
    }
}

impl fmt::Display for TechCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for TechCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TechCode::ELECTRIFYING
            .iter()
            .chain(std::iter::once(&TechCode::Unelectrified))
            .find(|tech| tech.display_name().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| format!("Unknown technology: {}", s))
    }
}

/// Fixed-size map with one slot per technology code.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TechMap<T>([T; 9]);

impl<T: Copy> TechMap<T> {
    pub fn filled(value: T) -> Self {
        Self([value; 9])
    }

    pub fn get(&self, tech: TechCode) -> T {
        self.0[tech.slot()]
    }

    pub fn set(&mut self, tech: TechCode, value: T) {
        self.0[tech.slot()] = value;
    }
}

impl<T> Index<TechCode> for TechMap<T> {
    type Output = T;

    fn index(&self, tech: TechCode) -> &T {
        &self.0[tech.slot()]
    }
}

impl<T> IndexMut<TechCode> for TechMap<T> {
    fn index_mut(&mut self, tech: TechCode) -> &mut T {
        &mut self.0[tech.slot()]
    }
}

impl<T: Copy + Default> Default for TechMap<T> {
    fn default() -> Self {
        Self([T::default(); 9])
    }
}
