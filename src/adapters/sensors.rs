//! Sensor sampling adapter.
//!
//! Implements [`SensorPort`] over the configured slots. Acquisition
//! drivers for the physical sensors are not part of this build, so the
//! device backend reports nothing; the simulation backend synthesizes
//! plausible greenhouse values so telemetry and its tests have data to
//! move.

use crate::app::ports::{Measurement, MeasurementChannel, SensorPort};
use crate::config::SensorSlot;

#[cfg(not(target_os = "espidf"))]
use crate::config::SensorKind;

pub struct SlotSampler {
    #[cfg(not(target_os = "espidf"))]
    rng: fastrand::Rng,
}

impl SlotSampler {
    #[cfg(target_os = "espidf")]
    pub fn new() -> Self {
        Self {}
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        Self {
            rng: fastrand::Rng::new(),
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn around(&mut self, base: f32, spread: f32) -> f32 {
        base + (self.rng.f32() - 0.5) * spread
    }
}

impl SensorPort for SlotSampler {
    fn sample(&mut self, slot: &SensorSlot) -> heapless::Vec<Measurement, 2> {
        #[cfg(target_os = "espidf")]
        {
            // No acquisition drivers wired; the slot stays silent.
            let _ = slot;
            heapless::Vec::new()
        }

        #[cfg(not(target_os = "espidf"))]
        {
            let mut out = heapless::Vec::new();
            match slot.kind {
                SensorKind::Dht22 | SensorKind::Dht11 => {
                    let _ = out.push(Measurement {
                        channel: MeasurementChannel::Temperature,
                        value: self.around(22.0, 4.0),
                    });
                    let _ = out.push(Measurement {
                        channel: MeasurementChannel::Humidity,
                        value: self.around(55.0, 15.0),
                    });
                }
                SensorKind::SoilMoisture => {
                    let _ = out.push(Measurement {
                        channel: MeasurementChannel::SoilMoisture,
                        value: self.around(40.0, 20.0),
                    });
                }
                SensorKind::WaterLevel => {
                    let _ = out.push(Measurement {
                        channel: MeasurementChannel::WaterLevel,
                        value: self.around(70.0, 10.0),
                    });
                }
                SensorKind::None => {}
            }
            out
        }
    }
}
