use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::const_funcs::{calc_pv_capacity_factor, calc_wind_capacity_factor};
use crate::config::tech_type::{TechCode, TechMap};
use crate::data::poi::{Coordinate, POI};

/// Geography and start-year attributes; immutable for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementGeography {
    pub coordinate: Coordinate,
    pub population: f64,
    pub urban: bool,
    pub elevation_m: f64,
    pub ghi_kwh_m2_year: f64,
    pub wind_speed_ms: f64,
    pub mv_distance_km: f64,
    pub road_distance_km: f64,
    pub substation_distance_km: f64,
    pub transformer_distance_km: f64,
    pub night_lights: f64,
    pub hydro_distance_km: Option<f64>,
    pub hydro_power_kw: Option<f64>,
    pub travel_hours: f64,
    pub grid_penalty_ratio: f64,
    pub electrified_at_start: bool,
}

impl SettlementGeography {
    /// Minimal geography for a settlement at `coordinate`; every other attribute neutral.
    pub fn at(coordinate: Coordinate, population: f64) -> Self {
        Self {
            coordinate,
            population,
            urban: false,
            elevation_m: 0.0,
            ghi_kwh_m2_year: 0.0,
            wind_speed_ms: 0.0,
            mv_distance_km: f64::INFINITY,
            road_distance_km: 0.0,
            substation_distance_km: 0.0,
            transformer_distance_km: 0.0,
            night_lights: 0.0,
            hydro_distance_km: None,
            hydro_power_kw: None,
            travel_hours: 0.0,
            grid_penalty_ratio: 1.0,
            electrified_at_start: false,
        }
    }
}

/// How a settlement came to be grid-connected in a given year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GridAdmissionPath {
    /// Connected in an earlier year; only population growth is costed.
    PreElectrified,
    /// Grid was cheaper than every off-grid option within the extension distance.
    Economic,
    /// Within the auto-intensification radius; cost comparison skipped.
    Intensification,
}

/// Everything computed for one settlement in one planning year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementYear {
    pub population: f64,
    pub households: f64,
    /// People newly needing a connection this step.
    pub new_connections: f64,
    pub new_households: f64,
    pub demand_per_household: f64,
    /// Annual consumption of the new connections (kWh/year).
    pub energy_demand_kwh: f64,
    pub grid_distance_km: f64,
    pub lcoe: TechMap<f64>,
    pub investment_by_tech: TechMap<f64>,
    pub capacity_by_tech: TechMap<f64>,
    pub chosen: TechCode,
    pub investment: f64,
    pub new_capacity_kw: f64,
    pub grid_connected: bool,
    pub admission: Option<GridAdmissionPath>,
    pub grid_iteration: Option<u32>,
    pub grid_parent: Option<u64>,
}

impl SettlementYear {
    pub fn is_electrified(&self) -> bool {
        self.chosen != TechCode::Unelectrified
    }
}

/// A settlement and its planning history, one entry per planned year.
#[derive(Debug, Clone)]
pub struct Settlement {
    id: u64,
    data: Arc<SettlementGeography>,
    history: BTreeMap<u32, SettlementYear>,
}

impl Serialize for Settlement {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("Settlement", 3)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("data", &*self.data)?;
        state.serialize_field("history", &self.history)?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for Settlement {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Helper {
            id: u64,
            data: SettlementGeography,
            history: BTreeMap<u32, SettlementYear>,
        }

        let helper = Helper::deserialize(deserializer)?;
        Ok(Settlement {
            id: helper.id,
            data: Arc::new(helper.data),
            history: helper.history,
        })
    }
}

impl Settlement {
    pub fn new(id: u64, geography: SettlementGeography) -> Self {
        Self {
            id,
            data: Arc::new(geography),
            history: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn geography(&self) -> &SettlementGeography {
        &self.data
    }

    pub fn start_population(&self) -> f64 {
        self.data.population
    }

    pub fn is_urban(&self) -> bool {
        self.data.urban
    }

    pub fn pv_capacity_factor(&self) -> f64 {
        calc_pv_capacity_factor(self.data.ghi_kwh_m2_year)
    }

    pub fn wind_capacity_factor(&self) -> f64 {
        calc_wind_capacity_factor(self.data.wind_speed_ms)
    }

    pub fn history(&self) -> &BTreeMap<u32, SettlementYear> {
        &self.history
    }

    pub fn year(&self, year: u32) -> Option<&SettlementYear> {
        self.history.get(&year)
    }

    /// Latest recorded year strictly before `year`.
    pub fn previous(&self, year: u32) -> Option<(u32, &SettlementYear)> {
        self.history.range(..year).next_back().map(|(y, state)| (*y, state))
    }

    /// Grid status carried into `year`: the last recorded status, or the start flag.
    pub fn grid_connected_before(&self, year: u32) -> bool {
        match self.previous(year) {
            Some((_, state)) => state.grid_connected,
            None => self.data.electrified_at_start,
        }
    }

    pub fn electrified_before(&self, year: u32) -> bool {
        match self.previous(year) {
            Some((_, state)) => state.is_electrified(),
            None => self.data.electrified_at_start,
        }
    }

    /// Technology carried into `year`, if any.
    pub fn technology_before(&self, year: u32) -> Option<TechCode> {
        match self.previous(year) {
            Some((_, state)) if state.is_electrified() => Some(state.chosen),
            Some(_) => None,
            None if self.data.electrified_at_start => Some(TechCode::Grid),
            None => None,
        }
    }

    pub fn record_year(&mut self, year: u32, state: SettlementYear) {
        self.history.insert(year, state);
    }
}

impl POI for Settlement {
    fn get_coordinate(&self) -> &Coordinate {
        &self.data.coordinate
    }

    fn get_id(&self) -> u64 {
        self.id
    }
}
