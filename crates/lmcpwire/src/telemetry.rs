//! Simulated air vehicle for the `stream` command.
//!
//! Produces one `afrl.cmasi.AirVehicleConfiguration` describing the vehicle
//! and then an `afrl.cmasi.AirVehicleState` per tick. The vehicle climbs
//! slowly and drifts along a line of latitude, reversing direction every
//! `reverse_every` ticks. Payloads are JSON.

use bytes::Bytes;
use lmcpwire_client::{MessageSource, OutgoingMessage, SourceError};
use lmcpwire_frame::MessageName;
use serde::Serialize;

pub const AIR_VEHICLE_CONFIGURATION: &str = "afrl.cmasi.AirVehicleConfiguration";
pub const AIR_VEHICLE_STATE: &str = "afrl.cmasi.AirVehicleState";

const HEADING_EAST: f64 = 90.0;
const HEADING_WEST: f64 = 270.0;

#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub vehicle_id: u64,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub energy: f64,
    /// Degrees of longitude per tick, before the direction sign.
    pub longitude_step: f64,
    /// Metres per tick.
    pub altitude_step: f64,
    /// Percent per tick.
    pub energy_step: f64,
    /// Ticks between direction reversals.
    pub reverse_every: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            vehicle_id: 600,
            latitude: 45.30724068719066,
            longitude: -121.00538540744407,
            altitude: 755.0,
            energy: 99.0,
            longitude_step: 0.0021223,
            altitude_step: 1.2,
            energy_step: 0.15,
            reverse_every: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AirVehicleConfiguration {
    #[serde(rename = "ID")]
    pub id: u64,
    pub affiliation: &'static str,
    pub label: &'static str,
    pub nominal_speed: f32,
    pub nominal_altitude: f32,
    pub nominal_altitude_type: &'static str,
    pub minimum_speed: f32,
    pub maximum_speed: f32,
    pub minimum_altitude: f32,
    pub min_altitude_type: &'static str,
    pub maximum_altitude: f32,
    pub max_altitude_type: &'static str,
    pub available_loiter_types: Vec<&'static str>,
    pub available_turn_types: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Location3D {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f32,
    pub altitude_type: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AirVehicleState {
    #[serde(rename = "ID")]
    pub id: u64,
    pub location: Location3D,
    pub airspeed: f32,
    pub pitch: f32,
    pub roll: f32,
    pub heading: f32,
    pub mode: &'static str,
    pub energy_available: f32,
}

pub struct VehicleSimulator {
    config: SimulationConfig,
    longitude: f64,
    altitude: f64,
    energy: f64,
    heading: f64,
    direction: f64,
    since_reverse: u32,
}

impl VehicleSimulator {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            longitude: config.longitude,
            altitude: config.altitude,
            energy: config.energy,
            heading: HEADING_EAST,
            direction: 1.0,
            since_reverse: 0,
            config,
        }
    }

    pub fn configuration(&self) -> AirVehicleConfiguration {
        AirVehicleConfiguration {
            id: self.config.vehicle_id,
            affiliation: "Tangram Flex",
            label: "Tangram UAV",
            nominal_speed: 25.0,
            nominal_altitude: 800.0,
            nominal_altitude_type: "MSL",
            minimum_speed: 18.044,
            maximum_speed: 33.223,
            minimum_altitude: 0.0,
            min_altitude_type: "AGL",
            maximum_altitude: 100_000.0,
            max_altitude_type: "MSL",
            available_loiter_types: vec!["Circular", "FigureEight"],
            available_turn_types: vec!["TurnShort", "FlyOver"],
        }
    }

    /// Snapshot of the vehicle as of the current tick.
    pub fn state(&self) -> AirVehicleState {
        AirVehicleState {
            id: self.config.vehicle_id,
            location: Location3D {
                latitude: self.config.latitude,
                longitude: self.longitude,
                altitude: self.altitude as f32,
                altitude_type: "MSL",
            },
            airspeed: 19.4423,
            pitch: -0.5,
            roll: 2.442,
            heading: self.heading as f32,
            mode: "FlightDirector",
            energy_available: self.energy as f32,
        }
    }

    /// Move one tick forward.
    pub fn advance(&mut self) {
        self.longitude += self.config.longitude_step * self.direction;
        self.altitude += self.config.altitude_step;
        self.energy -= self.config.energy_step;

        self.since_reverse += 1;
        if self.since_reverse >= self.config.reverse_every {
            self.since_reverse = 0;
            self.heading = if self.direction < 0.0 {
                HEADING_EAST
            } else {
                HEADING_WEST
            };
            self.direction = -self.direction;
        }
    }

    pub fn configuration_message(&self) -> Result<OutgoingMessage, SourceError> {
        encode(AIR_VEHICLE_CONFIGURATION, &self.configuration())
    }
}

impl MessageSource for VehicleSimulator {
    /// The current state, after which the vehicle advances.
    fn next_message(&mut self) -> Result<OutgoingMessage, SourceError> {
        let message = encode(AIR_VEHICLE_STATE, &self.state());
        self.advance();
        message
    }
}

fn encode<T: Serialize>(name: &str, value: &T) -> Result<OutgoingMessage, SourceError> {
    let name_value = MessageName::new(name).map_err(|err| SourceError::new(name, err))?;
    let payload = serde_json::to_vec(value).map_err(|err| SourceError::new(name, err))?;
    Ok(OutgoingMessage::new(name_value, Bytes::from(payload)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn starts_at_configured_position() {
        let sim = VehicleSimulator::new(SimulationConfig::default());
        let state = sim.state();

        assert_eq!(state.id, 600);
        assert!(approx(state.location.latitude, 45.30724068719066));
        assert!(approx(state.location.longitude, -121.00538540744407));
        assert_eq!(state.location.altitude, 755.0);
        assert_eq!(state.heading, 90.0);
        assert_eq!(state.energy_available, 99.0);
    }

    #[test]
    fn each_tick_drifts_climbs_and_drains() {
        let mut sim = VehicleSimulator::new(SimulationConfig::default());
        sim.advance();
        sim.advance();

        let state = sim.state();
        assert!(approx(
            state.location.longitude,
            -121.00538540744407 + 2.0 * 0.0021223
        ));
        assert!((state.location.altitude - 757.4).abs() < 1e-3);
        assert!((state.energy_available - 98.7).abs() < 1e-3);
        assert!(approx(state.location.latitude, 45.30724068719066));
    }

    #[test]
    fn reverses_every_thirty_ticks() {
        let mut sim = VehicleSimulator::new(SimulationConfig::default());

        for _ in 0..29 {
            sim.advance();
        }
        assert_eq!(sim.state().heading, 90.0);

        sim.advance();
        let turned = sim.state();
        assert_eq!(turned.heading, 270.0);

        sim.advance();
        assert!(sim.state().location.longitude < turned.location.longitude);

        for _ in 0..29 {
            sim.advance();
        }
        assert_eq!(sim.state().heading, 90.0);
        // 30 ticks out, 30 back.
        assert!(approx(sim.state().location.longitude, -121.00538540744407));
    }

    #[test]
    fn next_message_sends_current_state_then_advances() {
        let mut sim = VehicleSimulator::new(SimulationConfig::default());

        let first = sim.next_message().unwrap();
        assert_eq!(first.name.as_str(), AIR_VEHICLE_STATE);
        let json: serde_json::Value = serde_json::from_slice(&first.payload).unwrap();
        assert_eq!(json["ID"], 600);
        assert_eq!(json["Heading"], 90.0);
        assert_eq!(json["Location"]["AltitudeType"], "MSL");
        assert_eq!(json["Mode"], "FlightDirector");

        let second = sim.next_message().unwrap();
        let json: serde_json::Value = serde_json::from_slice(&second.payload).unwrap();
        assert!(json["Location"]["Altitude"].as_f64().unwrap() > 755.0);
    }

    #[test]
    fn configuration_message_describes_vehicle() {
        let sim = VehicleSimulator::new(SimulationConfig {
            vehicle_id: 42,
            ..SimulationConfig::default()
        });

        let message = sim.configuration_message().unwrap();
        assert_eq!(message.name.as_str(), AIR_VEHICLE_CONFIGURATION);
        let json: serde_json::Value = serde_json::from_slice(&message.payload).unwrap();
        assert_eq!(json["ID"], 42);
        assert_eq!(json["Label"], "Tangram UAV");
        assert_eq!(json["AvailableLoiterTypes"][1], "FigureEight");
    }

    #[test]
    fn custom_reverse_interval() {
        let mut sim = VehicleSimulator::new(SimulationConfig {
            reverse_every: 2,
            ..SimulationConfig::default()
        });
        sim.advance();
        sim.advance();
        assert_eq!(sim.state().heading, 270.0);
        sim.advance();
        sim.advance();
        assert_eq!(sim.state().heading, 90.0);
    }
}
