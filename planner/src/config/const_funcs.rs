use crate::config::constants::*;

/// Clip a capacity factor into (0, 1]. Non-positive or NaN factors come back as `None`.
pub fn clip_capacity_factor(capacity_factor: f64) -> Option<f64> {
    if capacity_factor.is_nan() || capacity_factor <= 0.0 {
        None
    } else {
        Some(capacity_factor.min(1.0))
    }
}

/// PV capacity factor from annual global horizontal irradiation (kWh/m2/year).
pub fn calc_pv_capacity_factor(ghi_kwh_m2_year: f64) -> f64 {
    ghi_kwh_m2_year / HOURS_PER_YEAR
}

/// Wind capacity factor from mean wind speed, integrating the reference turbine
/// power curve over a Rayleigh speed distribution at hub height.
pub fn calc_wind_capacity_factor(wind_speed_ms: f64) -> f64 {
    if wind_speed_ms <= 0.0 {
        return 0.0;
    }

    // Hellmann exponent as a function of measured speed
    let alpha = (0.37 - 0.088 * wind_speed_ms.ln())
        / (1.0 - 0.088 * (WIND_MEASUREMENT_HEIGHT_M / 10.0).ln());
    let hub_speed = wind_speed_ms * (WIND_HUB_HEIGHT_M / WIND_MEASUREMENT_HEIGHT_M).powf(alpha);

    let energy_produced: f64 = WIND_POWER_CURVE_KW
        .iter()
        .enumerate()
        .map(|(i, power)| {
            let u = (i + 1) as f64;
            let rayleigh = (std::f64::consts::PI / 2.0) * (u / hub_speed.powi(2))
                * ((-std::f64::consts::PI / 4.0) * (u / hub_speed).powi(2)).exp();
            WIND_AVAILABILITY * WIND_ELECTRICAL_EFFICIENCY * HOURS_PER_YEAR * power * rayleigh
        })
        .sum();

    energy_produced / (WIND_RATED_POWER_KW * HOURS_PER_YEAR)
}

/// Delivered diesel cost per kWh of generated electricity.
///
/// The truck burns fuel on the way out and back, which is charged against its payload.
pub fn calc_fuel_cost_per_kwh(
    fuel_price_per_l: f64,
    travel_hours: f64,
    truck_consumption_l_per_h: f64,
    truck_volume_l: f64,
    efficiency: f64,
) -> f64 {
    let transport = if truck_volume_l > 0.0 {
        2.0 * fuel_price_per_l * truck_consumption_l_per_h * travel_hours.max(0.0) / truck_volume_l
    } else {
        0.0
    };
    (fuel_price_per_l + transport) / LHV_DIESEL / efficiency
}

/// Annual household demand for a tier (1..=5).
pub fn calc_tier_demand(tier: u8) -> Option<f64> {
    if (MIN_TIER..=MAX_TIER).contains(&tier) {
        Some(TIER_DEMAND_KWH[(tier - MIN_TIER) as usize])
    } else {
        None
    }
}

/// Uniform annual growth rate that takes `start_population` to `end_population` in `years`.
pub fn calc_growth_rate(start_population: f64, end_population: f64, years: u32) -> f64 {
    if start_population <= 0.0 || years == 0 {
        return 0.0;
    }
    (end_population / start_population).powf(1.0 / years as f64) - 1.0
}

pub fn calc_population(base_population: f64, growth_rate: f64, years: u32) -> f64 {
    base_population * (1.0 + growth_rate).powi(years as i32)
}
