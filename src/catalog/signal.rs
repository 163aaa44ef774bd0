//! Signal strength bands for the `rssi` channel.

/// Link quality classification derived from RSSI in dBm
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SignalQuality {
    Poor,
    Fair,
    Good,
    Excellent,
}

/// Lower bound (inclusive) for [`SignalQuality::Excellent`]
pub const RSSI_EXCELLENT_DBM: f64 = -50.0;
/// Lower bound (inclusive) for [`SignalQuality::Good`]
pub const RSSI_GOOD_DBM: f64 = -70.0;
/// Lower bound (inclusive) for [`SignalQuality::Fair`]
pub const RSSI_FAIR_DBM: f64 = -85.0;

impl SignalQuality {
    /// Classify an RSSI reading
    ///
    /// ```
    /// use lora_telemetry::catalog::signal::SignalQuality;
    ///
    /// assert_eq!(SignalQuality::from_rssi(-42.0), SignalQuality::Excellent);
    /// assert_eq!(SignalQuality::from_rssi(-90.0), SignalQuality::Poor);
    /// ```
    #[must_use]
    pub fn from_rssi(dbm: f64) -> Self {
        if dbm >= RSSI_EXCELLENT_DBM {
            SignalQuality::Excellent
        } else if dbm >= RSSI_GOOD_DBM {
            SignalQuality::Good
        } else if dbm >= RSSI_FAIR_DBM {
            SignalQuality::Fair
        } else {
            SignalQuality::Poor
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SignalQuality::Excellent => "Excellent",
            SignalQuality::Good => "Good",
            SignalQuality::Fair => "Fair",
            SignalQuality::Poor => "Poor",
        }
    }
}
