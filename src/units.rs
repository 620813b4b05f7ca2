// ─────────────────────────────────────────────────────────────────────
// Native unit label → SI unit + linear scale
// ─────────────────────────────────────────────────────────────────────
use std::collections::HashMap;

use crate::error::{ConvertError, ConvertResult};

/// One row of the unit table: `si_value = native_value * scale`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitEntry {
    pub label:   &'static str,
    pub display: &'static str,
    pub si:      &'static str,
    pub scale:   f64,
}

impl UnitEntry {
    pub fn to_si(&self, native: f64) -> f64 {
        native * self.scale
    }
}

// The logger writes µ through a lossy encoder, so "µs", "?s" and "us" all
// show up in the wild.
const ENTRIES: &[UnitEntry] = &[
    UnitEntry { label: "",               display: "",                           si: "",                       scale: 1.0 },
    UnitEntry { label: "m",              display: "meter",                      si: "meter",                  scale: 1.0 },
    UnitEntry { label: "nm",             display: "nanometer",                  si: "meter",                  scale: 1e-9 },
    UnitEntry { label: "hPa",            display: "hectopascal",                si: "pascal",                 scale: 1e2 },
    UnitEntry { label: "DegCelsius",     display: "celsius",                    si: "celsius",                scale: 1.0 },
    UnitEntry { label: "s",              display: "second",                     si: "second",                 scale: 1.0 },
    UnitEntry { label: "m/s",            display: "meter second-1",             si: "meter second-1",         scale: 1.0 },
    UnitEntry { label: "mm/h",           display: "millimeter hour-1",          si: "meter second-1",         scale: 1e-3 / 3600.0 },
    UnitEntry { label: "relHumPerCent",  display: "percent",                    si: "percent",                scale: 1.0 },
    UnitEntry { label: "umol/(m^2*s)",   display: "micromole meter-2 second-1", si: "mole meter-2 second-1",  scale: 1e-6 },
    UnitEntry { label: "?mol/(m^2*s)",   display: "micromole meter-2 second-1", si: "mole meter-2 second-1",  scale: 1e-6 },
    UnitEntry { label: "µmol/(m^2*s)",   display: "micromole meter-2 second-1", si: "mole meter-2 second-1",  scale: 1e-6 },
    UnitEntry { label: "kilo Lux",       display: "kilolux",                    si: "lux",                    scale: 1e3 },
    UnitEntry { label: "degrees",        display: "degree",                     si: "degree",                 scale: 1.0 },
    UnitEntry { label: "us",             display: "microsecond",                si: "second",                 scale: 1e-6 },
    UnitEntry { label: "?s",             display: "microsecond",                si: "second",                 scale: 1e-6 },
    UnitEntry { label: "µs",             display: "microsecond",                si: "second",                 scale: 1e-6 },
    UnitEntry { label: "ppm",            display: "part per million",           si: "mol mol-1",              scale: 1e-6 },
];

/// Read-only lookup from the unit labels the logger emits to their SI form.
///
/// Build it once with [`UnitTable::standard`] and hand out `&UnitTable`.
#[derive(Debug, Clone)]
pub struct UnitTable {
    entries: HashMap<&'static str, UnitEntry>,
}

impl UnitTable {
    pub fn standard() -> Self {
        Self::from_entries(ENTRIES)
    }

    pub fn from_entries(entries: &[UnitEntry]) -> Self {
        Self { entries: entries.iter().map(|e| (e.label, *e)).collect() }
    }

    /// `field` only feeds the error message.
    pub fn lookup(&self, label: &str, field: &str) -> ConvertResult<&UnitEntry> {
        self.entries.get(label).ok_or_else(|| ConvertError::UnknownUnit {
            label: label.to_string(),
            field: field.to_string(),
        })
    }

    pub fn entries(&self) -> impl Iterator<Item = &UnitEntry> {
        self.entries.values()
    }
}

impl Default for UnitTable {
    fn default() -> Self {
        Self::standard()
    }
}
