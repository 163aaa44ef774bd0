//! # Simulated Telemetry Source
//!
//! Deterministic stand-in for the radio link, used when no receiver is
//! attached. Each tick produces one complete [`Sample`] from phase-based
//! models:
//!
//! - velocity follows a cosine acceleration curve up to 100 km/h, then cruises
//!   within ±5 km/h
//! - distance integrates `|sin(t / 10)|`
//! - battery voltage discharges slowly above 20% of 140 V and fast below it,
//!   then recharges to 140 V
//! - every other channel sweeps its nominal range with its own rate and phase

use std::f64::consts::PI;

use crate::history::Sample;

/// Fully charged pack voltage
pub const INITIAL_BATTERY_VOLT: f64 = 140.0;

/// Cruise speed reached by the acceleration curve
pub const CRUISE_VELOCITY: f64 = 100.0;

/// Fraction of the full pack voltage where the fast discharge starts
const FAST_DISCHARGE_FRACTION: f64 = 0.2;

/// Deterministic telemetry generator
#[derive(Debug, Clone)]
pub struct SimulatedSource {
    tick: u64,
    velocity: f64,
    cruising: bool,
    distance: f64,
    battery_volt: f64,
    charging: bool,
}

impl Default for SimulatedSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedSource {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tick: 0,
            velocity: 0.0,
            cruising: false,
            distance: 0.0,
            battery_volt: INITIAL_BATTERY_VOLT,
            charging: false,
        }
    }

    /// Samples produced so far
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Value in [0, 1] oscillating with the given rate and phase
    fn wave(&self, rate: f64, phase: f64) -> f64 {
        0.5 * (1.0 + (self.tick as f64 * rate + phase).sin())
    }

    /// Sweep `lo..=hi` with a per-channel rate and phase
    fn sweep(&self, channel: usize, lo: f64, hi: f64) -> f64 {
        let rate = 0.11 + 0.037 * channel as f64;
        let phase = 1.3 * channel as f64;
        lo + (hi - lo) * self.wave(rate, phase)
    }

    fn step_velocity(&mut self) {
        if !self.cruising {
            self.velocity = CRUISE_VELOCITY * (1.0 - (self.tick as f64 * PI / 100.0).cos());
            if self.velocity >= CRUISE_VELOCITY {
                self.cruising = true;
            }
        }
        if self.cruising {
            self.velocity = CRUISE_VELOCITY + 5.0 * (self.tick as f64 * 0.37).sin();
        }
    }

    fn step_battery(&mut self) {
        let threshold = INITIAL_BATTERY_VOLT * FAST_DISCHARGE_FRACTION;
        let w = self.wave(0.53, 0.0);

        if self.charging {
            self.battery_volt += 3.0 + 2.0 * w;
            if self.battery_volt >= INITIAL_BATTERY_VOLT {
                self.battery_volt = INITIAL_BATTERY_VOLT;
                self.charging = false;
            }
        } else {
            let drop = if self.battery_volt > threshold {
                1.0 + 4.0 * w
            } else {
                5.0 + 5.0 * w
            };
            self.battery_volt -= drop;
            if self.battery_volt <= 0.0 {
                self.battery_volt = 0.0;
                self.charging = true;
            }
        }
    }

    /// Produce the next sample
    ///
    /// # Examples
    ///
    /// ```
    /// use lora_telemetry::pipeline::simulation::SimulatedSource;
    ///
    /// let mut source = SimulatedSource::new();
    /// let sample = source.next_sample();
    /// assert_eq!(sample.get("velocity"), Some(0.0));
    /// assert!(sample.get("battery_volt").unwrap() < 140.0);
    /// ```
    pub fn next_sample(&mut self) -> Sample {
        self.step_velocity();
        self.distance += (self.tick as f64 / 10.0).sin().abs();
        self.step_battery();

        let cell_low_volt = self.sweep(4, 3.0, 3.4);
        let cell_high_volt = self.sweep(5, 3.6, 4.0);
        let cell_low_temp = self.sweep(7, 20.0, 25.0);
        let cell_high_temp = self.sweep(8, 30.0, 35.0);
        let mppt1 = self.sweep(16, 300.0, 400.0);
        let mppt2 = self.sweep(17, 0.0, 400.0);
        let mppt3 = self.sweep(18, 300.0, 400.0);

        let values = [
            self.velocity,
            self.distance,
            self.battery_volt,
            self.sweep(3, 2.0, 5.0),
            cell_low_volt,
            cell_high_volt,
            (cell_low_volt + cell_high_volt) / 2.0,
            cell_low_temp,
            cell_high_temp,
            (cell_low_temp + cell_high_temp) / 2.0,
            self.sweep(10, 1.0, 8.0).round(),
            self.sweep(11, 11.0, 42.0).round(),
            self.sweep(12, 18.0, 24.0),
            self.sweep(13, 0.0, 15.0),
            self.sweep(14, 40.0, 60.0),
            self.sweep(15, 40.0, 60.0),
            mppt1,
            mppt2,
            mppt3,
            mppt1 + mppt2 + mppt3,
            self.sweep(20, -95.0, -40.0),
        ];

        self.tick += 1;
        Sample::from_positional(&values, 0.0)
    }
}
