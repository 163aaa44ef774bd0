//! # Channel Catalog Module
//!
//! Static registry of every telemetry channel carried by the vehicle link.
//!
//! The order of [`fields`] is load-bearing: it is the unpack order for
//! incoming frames, the column order of the durable log and the slot order of
//! a [`Sample`](crate::history::Sample).
//!
//! ## Channel Groups
//!
//! | Category | Channels |
//! |----------|----------|
//! | vehicle | velocity, distance_travelled |
//! | battery | pack voltage/current, cell voltages and temperatures, BMS |
//! | motor | motor current and temperatures |
//! | mppt | MPPT1..3 power and total |
//! | communication | rssi (sourced out-of-band) |
//!
//! ## Usage
//!
//! ```
//! use lora_telemetry::catalog;
//!
//! assert_eq!(catalog::fields()[0].key, "velocity");
//! assert_eq!(catalog::max_expected("battery_volt"), 150.0);
//! assert_eq!(catalog::max_expected("no_such_channel"), 100.0);
//! ```

pub mod signal;

use serde::Serialize;

/// Total number of channels in the catalog
pub const CHANNEL_COUNT: usize = 21;

/// Scaling ceiling used for channels without an explicit entry
pub const DEFAULT_MAX_EXPECTED: f64 = 100.0;

/// Key of the out-of-band signal strength channel
pub const RSSI_KEY: &str = "rssi";

/// Channel category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Vehicle,
    Battery,
    Motor,
    Mppt,
    Communication,
}

impl Category {
    /// All categories in catalog order
    pub const ALL: [Category; 5] = [
        Category::Vehicle,
        Category::Battery,
        Category::Motor,
        Category::Mppt,
        Category::Communication,
    ];

    /// Lowercase name, as used in log output and table rows
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Vehicle => "vehicle",
            Category::Battery => "battery",
            Category::Motor => "motor",
            Category::Mppt => "mppt",
            Category::Communication => "communication",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable channel descriptor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Channel {
    /// Unique key, stable for the process lifetime
    pub key: &'static str,
    /// Human readable name
    pub display_name: &'static str,
    /// Unit suffix (may be empty)
    pub unit: &'static str,
    pub category: Category,
    /// Soft ceiling for scaling, not a validation bound
    pub expected_max: f64,
    pub description: &'static str,
}

const fn channel(
    key: &'static str,
    display_name: &'static str,
    unit: &'static str,
    category: Category,
    expected_max: f64,
    description: &'static str,
) -> Channel {
    Channel {
        key,
        display_name,
        unit,
        category,
        expected_max,
        description,
    }
}

static CHANNELS: [Channel; CHANNEL_COUNT] = [
    channel("velocity", "Velocity", "km/h", Category::Vehicle, 100.0, "Current vehicle speed"),
    channel("distance_travelled", "Distance Travelled", "km", Category::Vehicle, 1000.0, "Total distance covered"),
    channel("battery_volt", "Battery Voltage", "V", Category::Battery, 150.0, "Total battery pack voltage"),
    channel("battery_current", "Battery Current", "A", Category::Battery, 100.0, "Battery current (positive = charging)"),
    channel("battery_cell_LOW_volt", "Lowest Cell Voltage", "V", Category::Battery, 4.0, "Lowest individual cell voltage"),
    channel("battery_cell_HIGH_volt", "Highest Cell Voltage", "V", Category::Battery, 4.0, "Highest individual cell voltage"),
    channel("battery_cell_AVG_volt", "Average Cell Voltage", "V", Category::Battery, 4.0, "Average cell voltage"),
    channel("battery_cell_LOW_temp", "Lowest Cell Temperature", "°C", Category::Battery, 60.0, "Lowest cell temperature"),
    channel("battery_cell_HIGH_temp", "Highest Cell Temperature", "°C", Category::Battery, 60.0, "Highest cell temperature"),
    channel("battery_cell_AVG_temp", "Average Cell Temperature", "°C", Category::Battery, 60.0, "Average cell temperature"),
    channel("battery_cell_ID_HIGH_temp", "High Temp Cell ID", "", Category::Battery, 40.0, "Cell ID with highest temperature"),
    channel("battery_cell_ID_LOW_temp", "Low Temp Cell ID", "", Category::Battery, 40.0, "Cell ID with lowest temperature"),
    channel("BMS_temp", "BMS Temperature", "°C", Category::Battery, 80.0, "Battery Management System temperature"),
    channel("motor_current", "Motor Current", "A", Category::Motor, 200.0, "Motor current consumption"),
    channel("motor_temp", "Motor Temperature", "°C", Category::Motor, 120.0, "Motor temperature"),
    channel("motor_controller_temp", "Motor Controller Temperature", "°C", Category::Motor, 100.0, "Motor controller temperature"),
    channel("MPPT1_watt", "MPPT 1 Power", "W", Category::Mppt, 1000.0, "MPPT 1 power output"),
    channel("MPPT2_watt", "MPPT 2 Power", "W", Category::Mppt, 1000.0, "MPPT 2 power output"),
    channel("MPPT3_watt", "MPPT 3 Power", "W", Category::Mppt, 1000.0, "MPPT 3 power output"),
    channel("MPPT_total_watt", "Total MPPT Power", "W", Category::Mppt, 3000.0, "Total MPPT power output"),
    channel(RSSI_KEY, "Signal Strength", "dBm", Category::Communication, DEFAULT_MAX_EXPECTED, "LoRa signal strength"),
];

/// All channels in canonical order
pub fn fields() -> &'static [Channel] {
    &CHANNELS
}

/// Channel keys in canonical order
pub fn keys() -> impl Iterator<Item = &'static str> {
    CHANNELS.iter().map(|c| c.key)
}

/// Look up a channel by key
pub fn get(key: &str) -> Option<&'static Channel> {
    CHANNELS.iter().find(|c| c.key == key)
}

/// Position of a channel in canonical order
pub fn index_of(key: &str) -> Option<usize> {
    CHANNELS.iter().position(|c| c.key == key)
}

/// Scaling ceiling for a channel, [`DEFAULT_MAX_EXPECTED`] if the key is unknown
pub fn max_expected(key: &str) -> f64 {
    get(key).map_or(DEFAULT_MAX_EXPECTED, |c| c.expected_max)
}

/// Display name for a channel, or the key itself if unknown
pub fn display_name(key: &str) -> &str {
    get(key).map_or(key, |c| c.display_name)
}

/// Unit for a channel, empty if unknown
pub fn unit(key: &str) -> &'static str {
    get(key).map_or("", |c| c.unit)
}

/// Category for a channel
pub fn category(key: &str) -> Option<Category> {
    get(key).map(|c| c.category)
}

/// Channels of one category, in canonical order
pub fn fields_by_category(category: Category) -> impl Iterator<Item = &'static Channel> {
    CHANNELS.iter().filter(move |c| c.category == category)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_channel_count() {
        assert_eq!(fields().len(), CHANNEL_COUNT);
        assert_eq!(keys().count(), 21);
    }

    #[test]
    fn test_keys_are_unique() {
        let unique: HashSet<_> = keys().collect();
        assert_eq!(unique.len(), CHANNEL_COUNT);
    }

    #[test]
    fn test_canonical_order() {
        let keys: Vec<_> = keys().collect();
        assert_eq!(keys[0], "velocity");
        assert_eq!(keys[1], "distance_travelled");
        assert_eq!(keys[2], "battery_volt");
        assert_eq!(keys[12], "BMS_temp");
        assert_eq!(keys[19], "MPPT_total_watt");
        assert_eq!(keys[20], RSSI_KEY, "rssi must be the last channel");
    }

    #[test]
    fn test_get_known_and_unknown() {
        let channel = get("motor_temp").unwrap();
        assert_eq!(channel.display_name, "Motor Temperature");
        assert_eq!(channel.unit, "°C");
        assert_eq!(channel.category, Category::Motor);

        assert!(get("MPPT4_watt").is_none());
    }

    #[test]
    fn test_max_expected_values() {
        assert_eq!(max_expected("velocity"), 100.0);
        assert_eq!(max_expected("distance_travelled"), 1000.0);
        assert_eq!(max_expected("battery_cell_LOW_volt"), 4.0);
        assert_eq!(max_expected("motor_current"), 200.0);
        assert_eq!(max_expected("MPPT_total_watt"), 3000.0);
        assert_eq!(max_expected(RSSI_KEY), DEFAULT_MAX_EXPECTED);
        assert_eq!(max_expected("unknown"), DEFAULT_MAX_EXPECTED);
    }

    #[test]
    fn test_display_name_and_unit_fallbacks() {
        assert_eq!(display_name("battery_volt"), "Battery Voltage");
        assert_eq!(display_name("not_a_key"), "not_a_key");
        assert_eq!(unit("MPPT1_watt"), "W");
        assert_eq!(unit("battery_cell_ID_LOW_temp"), "");
        assert_eq!(unit("not_a_key"), "");
        assert_eq!(category("rssi"), Some(Category::Communication));
        assert_eq!(category("not_a_key"), None);
    }

    #[test]
    fn test_index_of() {
        assert_eq!(index_of("velocity"), Some(0));
        assert_eq!(index_of(RSSI_KEY), Some(CHANNEL_COUNT - 1));
        assert_eq!(index_of("nope"), None);
    }

    #[test]
    fn test_fields_by_category() {
        let counts: Vec<usize> = Category::ALL
            .iter()
            .map(|&c| fields_by_category(c).count())
            .collect();
        assert_eq!(counts, vec![2, 11, 3, 4, 1]);
        assert_eq!(counts.iter().sum::<usize>(), CHANNEL_COUNT);

        let mppt: Vec<_> = fields_by_category(Category::Mppt).map(|c| c.key).collect();
        assert_eq!(mppt, vec!["MPPT1_watt", "MPPT2_watt", "MPPT3_watt", "MPPT_total_watt"]);
    }

    #[test]
    fn test_category_names() {
        assert_eq!(Category::Mppt.to_string(), "mppt");
        assert_eq!(
            serde_json::to_string(&Category::Communication).unwrap(),
            "\"communication\""
        );
    }
}
