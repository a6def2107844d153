// Time Constants
pub const HOURS_PER_YEAR: f64 = 8760.0;
pub const DEFAULT_START_YEAR: u32 = 2018;
pub const DEFAULT_END_YEAR: u32 = 2030;
pub const DEFAULT_INTERMEDIATE_YEAR: u32 = 2025;

// Economic Constants
pub const DEFAULT_DISCOUNT_RATE: f64 = 0.08;
pub const DEFAULT_GRID_GENERATION_COST: f64 = 0.05;    // USD/kWh
pub const DEFAULT_DIESEL_PRICE: f64 = 0.8;             // USD/l
pub const DEFAULT_GRID_CAPACITY_INVESTMENT: f64 = 2000.0; // USD/kW
pub const DEFAULT_GRID_LOSSES: f64 = 0.08;
pub const DEFAULT_MV_LINE_COST_PER_KM: f64 = 9000.0;

// Mini-grid distribution network
pub const DEFAULT_LV_LINE_COST_PER_KM: f64 = 10000.0;
pub const DEFAULT_LV_LINE_KM_PER_HOUSEHOLD: f64 = 0.025;
pub const DEFAULT_SERVICE_TRANSFORMER_COST: f64 = 4250.0;
pub const DEFAULT_SERVICE_TRANSFORMER_KVA: f64 = 50.0;
pub const DEFAULT_MAX_HOUSEHOLDS_PER_TRANSFORMER: f64 = 300.0;
pub const DEFAULT_POWER_FACTOR: f64 = 0.9;

// Fuel Constants
pub const LHV_DIESEL: f64 = 9.9445485;                 // kWh/l

// Sentinel cost used for technologies that cannot serve a settlement
pub const INFEASIBLE_LCOE: f64 = f64::INFINITY;

// Household electricity targets per tier (kWh/household/year)
pub const TIER_DEMAND_KWH: [f64; 5] = [38.7, 219.0, 803.0, 2117.0, 2993.0];
pub const MIN_TIER: u8 = 1;
pub const MAX_TIER: u8 = 5;

// Household Constants
pub const DEFAULT_PEOPLE_PER_HH_URBAN: f64 = 4.4;
pub const DEFAULT_PEOPLE_PER_HH_RURAL: f64 = 5.0;

// Grid Extension Constants
pub const DEFAULT_MAX_GRID_EXTENSION_KM: f64 = 50.0;
pub const DEFAULT_AUTO_INTENSIFICATION_KM: f64 = 0.0;
pub const DEFAULT_ANNUAL_CONNECTIONS_LIMIT: f64 = 150_000.0; // people
pub const DEFAULT_ANNUAL_CAPACITY_LIMIT_MW: f64 = 100.0;

// Hydro Constants
pub const DEFAULT_MAX_HYDRO_DISTANCE_KM: f64 = 15.0;

// Hybrid Constants
pub const DEFAULT_HYBRID_RENEWABLE_SHARE: f64 = 0.8;

// Wind turbine reference (600 kW rated, 55 m hub, speeds measured at 80 m)
pub const WIND_AVAILABILITY: f64 = 0.97;
pub const WIND_ELECTRICAL_EFFICIENCY: f64 = 0.85;
pub const WIND_RATED_POWER_KW: f64 = 600.0;
pub const WIND_HUB_HEIGHT_M: f64 = 55.0;
pub const WIND_MEASUREMENT_HEIGHT_M: f64 = 80.0;
pub const WIND_POWER_CURVE_KW: [f64; 25] = [
    0.0, 0.0, 0.0, 0.0, 30.0, 77.0, 135.0, 208.0, 287.0, 371.0, 450.0, 514.0, 558.0,
    582.0, 594.0, 598.0, 600.0, 600.0, 600.0, 600.0, 600.0, 600.0, 600.0, 600.0, 600.0,
];

// Target enforcement
pub const TARGET_TOLERANCE: f64 = 1e-9;

// Spatial index
pub const QUADTREE_NODE_CAPACITY: usize = 16;
pub const QUADTREE_MIN_HALF_SIZE_KM: f64 = 0.01;
