//! Synthetic light aircraft.
//!
//! Flies a fixed profile (takeoff, climb, cruise, descent, landing) one
//! update at a time so the assistant has moving numbers, trends and, with
//! injected faults, warnings to talk about without a running simulator.

use async_trait::async_trait;
use flightdeck_core::error::TelemetryError;
use flightdeck_core::snapshot::{Snapshot, Value};
use flightdeck_core::telemetry::{Capabilities, Priority, TelemetrySource, TrendField, WarningSet};
use serde::Serialize;
use std::collections::BTreeSet;
use std::time::Duration;

use crate::refresher::{Capture, Refresher};

/// Simulated seconds that pass per update.
const SECONDS_PER_UPDATE: f64 = 10.0;
const CRUISE_ALTITUDE_FT: f64 = 6500.0;
const CRUISE_UPDATES: u32 = 90;
const ROTATE_SPEED_KT: f64 = 60.0;
const STALL_SPEED_KT: f64 = 55.0;
const NEVER_EXCEED_KT: f64 = 250.0;
const MAX_OIL_TEMP_C: f64 = 240.0;
const LOW_FUEL_GAL: f64 = 5.0;
const START_FUEL_GAL: f64 = 53.0;

struct WarningInfo {
    key: &'static str,
    priority: Priority,
    message: &'static str,
}

const WARNINGS: &[WarningInfo] = &[
    WarningInfo { key: "stall", priority: Priority::High, message: "Stall warning! Lower the nose and add power to regain airspeed." },
    WarningInfo { key: "overspeed", priority: Priority::High, message: "Overspeed warning! Reduce power and raise the nose." },
    WarningInfo { key: "engine", priority: Priority::High, message: "Engine warning! Check the engine gauges immediately." },
    WarningInfo { key: "fuel", priority: Priority::High, message: "Low fuel warning! Check fuel quantity and find a place to land." },
    WarningInfo { key: "electrical", priority: Priority::Medium, message: "Electrical system warning. Check the electrical system and shed non-essential loads." },
    WarningInfo { key: "hydraulic", priority: Priority::Medium, message: "Hydraulic system warning. Aircraft control may be affected." },
    WarningInfo { key: "pitot", priority: Priority::Medium, message: "Pitot system warning. Airspeed indications may be wrong." },
    WarningInfo { key: "apu", priority: Priority::Low, message: "Auxiliary power unit warning. Check the auxiliary systems." },
    WarningInfo { key: "avionics", priority: Priority::Low, message: "Avionics warning. Navigation instruments may be failing." },
    WarningInfo { key: "vacuum", priority: Priority::Low, message: "Vacuum system warning. Gyroscopic instruments may be unreliable." },
    WarningInfo { key: "oxygen", priority: Priority::Low, message: "Oxygen system warning. Check the oxygen supply and consider descending." },
];

fn warning_info(key: &str) -> Option<&'static WarningInfo> {
    WARNINGS.iter().find(|w| w.key == key)
}

/// Every warning key the flight source can report.
pub fn warning_keys() -> impl Iterator<Item = &'static str> {
    WARNINGS.iter().map(|w| w.key)
}

const ASSISTANT_CONTEXT: &str = "\
You are a virtual co-pilot for a light aircraft. You know flight operations, \
navigation and aircraft systems.

Normal airspeed is 60 to 130 knots for this aircraft. Normal climb and descent \
rates are within 1000 feet per minute. Oil temperature should stay below 240 \
degrees Celsius. A stall warning means dangerously low airspeed and needs \
immediate action; an overspeed warning means power must come back now.

Report altitude in feet rounded to the nearest whole number, airspeed in knots, \
heading in degrees from 0 to 359 and vertical speed in feet per minute. When \
warnings are active, mention them first and recommend an action.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Takeoff,
    Climb,
    Cruise,
    Descent,
    Landed,
}

impl Phase {
    fn as_str(self) -> &'static str {
        match self {
            Phase::Takeoff => "takeoff",
            Phase::Climb => "climb",
            Phase::Cruise => "cruise",
            Phase::Descent => "descent",
            Phase::Landed => "landed",
        }
    }
}

/// State of the synthetic aircraft.
#[derive(Debug, Clone)]
pub struct FlightModel {
    pub phase: Phase,
    pub altitude_ft: f64,
    pub airspeed_kt: f64,
    pub vertical_speed_fpm: f64,
    pub heading_deg: f64,
    pub engine_rpm: f64,
    pub fuel_gal: f64,
    pub fuel_flow_gph: f64,
    pub oil_temp_c: f64,
    pub on_ground: bool,
    pub gear_down: bool,
    pub flaps_pct: f64,
    pub autopilot: bool,
    cruise_updates: u32,
    faults: BTreeSet<String>,
}

impl FlightModel {
    /// Parked at the runway threshold, engine running.
    pub fn new() -> Self {
        Self {
            phase: Phase::Takeoff,
            altitude_ft: 0.0,
            airspeed_kt: 0.0,
            vertical_speed_fpm: 0.0,
            heading_deg: 270.0,
            engine_rpm: 2600.0,
            fuel_gal: START_FUEL_GAL,
            fuel_flow_gph: 12.0,
            oil_temp_c: 70.0,
            on_ground: true,
            gear_down: true,
            flaps_pct: 10.0,
            autopilot: false,
            cruise_updates: 0,
            faults: BTreeSet::new(),
        }
    }

    /// Force the given warnings on regardless of the aircraft state.
    pub fn with_faults<I, S>(mut self, faults: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.faults = faults.into_iter().map(Into::into).collect();
        self
    }

    /// Advance the aircraft by one update.
    pub fn step(&mut self) {
        match self.phase {
            Phase::Takeoff => {
                self.airspeed_kt = approach(self.airspeed_kt, 75.0, 12.0);
                if self.airspeed_kt >= ROTATE_SPEED_KT {
                    self.on_ground = false;
                    self.vertical_speed_fpm = 800.0;
                }
                if self.altitude_ft >= 500.0 {
                    self.gear_down = false;
                    self.flaps_pct = 0.0;
                    self.phase = Phase::Climb;
                }
            }
            Phase::Climb => {
                self.airspeed_kt = approach(self.airspeed_kt, 90.0, 3.0);
                self.vertical_speed_fpm = 700.0;
                self.engine_rpm = 2500.0;
                self.fuel_flow_gph = 11.0;
                if self.altitude_ft >= CRUISE_ALTITUDE_FT {
                    self.altitude_ft = CRUISE_ALTITUDE_FT;
                    self.vertical_speed_fpm = 0.0;
                    self.phase = Phase::Cruise;
                }
            }
            Phase::Cruise => {
                self.vertical_speed_fpm = 0.0;
                self.airspeed_kt = approach(self.airspeed_kt, 120.0, 4.0);
                self.engine_rpm = 2300.0;
                self.fuel_flow_gph = 8.5;
                self.autopilot = true;
                self.heading_deg = (self.heading_deg + 1.5) % 360.0;
                self.cruise_updates += 1;
                if self.cruise_updates >= CRUISE_UPDATES {
                    self.autopilot = false;
                    self.phase = Phase::Descent;
                }
            }
            Phase::Descent => {
                self.vertical_speed_fpm = -500.0;
                self.engine_rpm = 2000.0;
                self.fuel_flow_gph = 6.0;
                let target_speed = if self.altitude_ft < 1000.0 { 65.0 } else { 110.0 };
                self.airspeed_kt = approach(self.airspeed_kt, target_speed, 4.0);
                if self.altitude_ft < 1500.0 {
                    self.gear_down = true;
                }
                if self.altitude_ft < 1000.0 {
                    self.flaps_pct = 30.0;
                }
                if self.altitude_ft <= 0.0 {
                    self.altitude_ft = 0.0;
                    self.on_ground = true;
                    self.phase = Phase::Landed;
                }
            }
            Phase::Landed => {
                self.vertical_speed_fpm = 0.0;
                self.airspeed_kt = approach(self.airspeed_kt, 0.0, 15.0);
                self.engine_rpm = 800.0;
                self.fuel_flow_gph = 2.0;
                self.flaps_pct = 0.0;
            }
        }

        if !self.on_ground {
            let climb = self.vertical_speed_fpm * SECONDS_PER_UPDATE / 60.0;
            self.altitude_ft = (self.altitude_ft + climb).max(0.0);
        }

        self.fuel_gal = (self.fuel_gal - self.fuel_flow_gph * SECONDS_PER_UPDATE / 3600.0).max(0.0);
        let oil_target = 90.0 + self.engine_rpm / 40.0;
        self.oil_temp_c += (oil_target - self.oil_temp_c) * 0.1;
    }

    /// Warnings implied by the current state plus injected faults.
    pub fn warnings(&self) -> WarningSet {
        let mut active: BTreeSet<&str> = self.faults.iter().map(String::as_str).collect();

        if !self.on_ground && self.airspeed_kt < STALL_SPEED_KT {
            active.insert("stall");
        }
        if self.airspeed_kt > NEVER_EXCEED_KT {
            active.insert("overspeed");
        }
        if self.oil_temp_c > MAX_OIL_TEMP_C {
            active.insert("engine");
        }
        if self.fuel_gal < LOW_FUEL_GAL {
            active.insert("fuel");
        }

        active
            .into_iter()
            .filter_map(|key| warning_info(key).map(|w| (key, w.priority)))
            .collect()
    }

    pub fn snapshot(&self) -> Snapshot {
        let warnings = self.warnings();
        let listed = if warnings.is_empty() {
            "none".to_string()
        } else {
            warnings.keys().collect::<Vec<_>>().join(", ")
        };

        Snapshot::new([
            ("phase", Value::from(self.phase.as_str())),
            ("altitude_ft", Value::from(self.altitude_ft.round())),
            ("airspeed_kt", Value::from(round1(self.airspeed_kt))),
            ("vertical_speed_fpm", Value::from(self.vertical_speed_fpm)),
            ("heading_deg", Value::from(self.heading_deg.round() % 360.0)),
            ("engine_rpm", Value::from(self.engine_rpm)),
            ("fuel_gal", Value::from(round1(self.fuel_gal))),
            ("fuel_flow_gph", Value::from(self.fuel_flow_gph)),
            ("oil_temp_c", Value::from(round1(self.oil_temp_c))),
            ("on_ground", Value::from(self.on_ground)),
            ("gear_down", Value::from(self.gear_down)),
            ("flaps_pct", Value::from(self.flaps_pct)),
            ("autopilot", Value::from(self.autopilot)),
            ("warnings", Value::from(listed)),
        ])
    }
}

impl Default for FlightModel {
    fn default() -> Self {
        Self::new()
    }
}

fn approach(current: f64, target: f64, step: f64) -> f64 {
    if current < target {
        (current + step).min(target)
    } else {
        (current - step).max(target)
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Telemetry source backed by [`FlightModel`].
pub struct FlightSource {
    refresher: Refresher,
    faults: Vec<String>,
}

impl FlightSource {
    pub fn new() -> Self {
        Self {
            refresher: Refresher::new("flight"),
            faults: Vec::new(),
        }
    }

    /// Inject warnings that stay active for the whole flight.
    pub fn with_faults(mut self, faults: &[String]) -> Result<Self, TelemetryError> {
        if let Some(unknown) = faults.iter().find(|f| warning_info(f).is_none()) {
            return Err(TelemetryError::UnknownWarning {
                source_name: "flight".into(),
                key: unknown.clone(),
            });
        }
        self.faults = faults.to_vec();
        Ok(self)
    }
}

impl Default for FlightSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TelemetrySource for FlightSource {
    fn name(&self) -> &str {
        "flight"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities { warnings: true }
    }

    async fn start(&self, interval: Duration) -> Result<(), TelemetryError> {
        let mut model = FlightModel::new().with_faults(self.faults.clone());
        let mut first = true;
        self.refresher.start(interval, move || -> Result<Capture, TelemetryError> {
            // The first capture shows the aircraft before it moves
            if !first {
                model.step();
            }
            first = false;
            Ok(Capture::new(model.snapshot()).with_warnings(model.warnings()))
        })
    }

    fn fetch_snapshot(&self) -> Snapshot {
        self.refresher.latest().snapshot
    }

    fn active_warnings(&self) -> WarningSet {
        self.refresher.latest().warnings
    }

    fn warning_message(&self, key: &str) -> Option<String> {
        warning_info(key).map(|w| w.message.to_string())
    }

    fn warning_priority(&self, key: &str) -> Option<Priority> {
        warning_info(key).map(|w| w.priority)
    }

    fn trend_fields(&self) -> Vec<TrendField> {
        vec![
            TrendField::new("altitude_ft", "Altitude", "feet", 50.0),
            TrendField::new("airspeed_kt", "Airspeed", "knots", 5.0),
        ]
    }

    fn assistant_context(&self) -> Option<String> {
        Some(ASSISTANT_CONTEXT.to_string())
    }

    fn stop(&self) {
        self.refresher.stop();
    }
}
