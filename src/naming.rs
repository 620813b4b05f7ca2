// ─────────────────────────────────────────────────────────────────────
// Field key → netCDF variable name, long_name, CF standard_name
// ─────────────────────────────────────────────────────────────────────

const LONG_NAMES: &[(&str, &str)] = &[
    ("sensor par",    "Photosynthetically Active Radiation"),
    ("sensor co2",    "Atmospheric CO2 Concentration"),
    ("sunDirection",  "Solar zenith (or elevation) angle"),
    ("temperature",   "Atmospheric Temperature"),
    ("relHumidity",   "Relative Humidity"),
    ("precipitation", "Precipitation Rate"),
    ("windDirection", "Wind Direction"),
    ("windVelocity",  "Wind Speed"),
    ("airPressure",   "Atmospheric Air Pressure"),
];

const STANDARD_NAMES: &[(&str, &str)] = &[
    ("precipitation", "precipitation_flux"),
    ("airPressure",   "air_pressure"),
    ("relHumidity",   "relative_humidity"),
    ("windDirection", "wind_from_direction"),
    ("windVelocity",  "wind_speed"),
    ("temperature",   "air_temperature"),
    ("sensor co2",    "mole_fraction_of_carbon_dioxide_in_air"),
    ("sensor par",    "surface_downwelling_photosynthetic_photon_flux_in_air"),
];

// Sensor objects keep their `sensor_*` names for the provenance scalars,
// so their measurements need distinct variable names.
const VARIABLE_NAMES: &[(&str, &str)] = &[
    ("sensor par", "par"),
    ("sensor co2", "co2"),
];

fn find(table: &'static [(&'static str, &'static str)], key: &str) -> Option<&'static str> {
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

pub fn long_name(key: &str) -> Option<&'static str> {
    find(LONG_NAMES, key)
}

pub fn standard_name(key: &str) -> Option<&'static str> {
    find(STANDARD_NAMES, key)
}

/// A netCDF-legal variable name for `key`.
pub fn variable_name(key: &str) -> String {
    match find(VARIABLE_NAMES, key) {
        Some(name) => name.to_string(),
        None => key
            .trim()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
            .collect(),
    }
}
