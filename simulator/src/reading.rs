use rand::Rng;
use serde::{Deserialize, Serialize};

pub const TEMPERATURE_MIN: f64 = 22.0;
pub const TEMPERATURE_MAX: f64 = 100.0;
pub const VOLTAGE_MIN: f64 = 12.0;
pub const VOLTAGE_MAX: f64 = 86.0;
pub const DEVID_MIN: u32 = 0;
pub const DEVID_MAX: u32 = 20;

/// Randomly generated part of a reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub temperature: f64,
    pub voltage: f64,
    pub devid: u32,
}

/// One sensor sample as it goes on the wire.
///
/// Field order is the JSON key order: generated values first, then the
/// client-specific fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub temperature: f64,
    pub voltage: f64,
    pub devid: u32,
    pub id: String,
    pub name: String,
    pub ts: u64,
}

impl Reading {
    pub fn new(sample: Sample, id: impl Into<String>, name: impl Into<String>, ts: u64) -> Self {
        Self {
            temperature: sample.temperature,
            voltage: sample.voltage,
            devid: sample.devid,
            id: id.into(),
            name: name.into(),
            ts,
        }
    }
}

/// Draws one sample; bounds are inclusive and floats carry two decimals.
pub fn generate_sample(rng: &mut impl Rng) -> Sample {
    Sample {
        temperature: round2(rng.gen_range(TEMPERATURE_MIN..=TEMPERATURE_MAX)),
        voltage: round2(rng.gen_range(VOLTAGE_MIN..=VOLTAGE_MAX)),
        devid: rng.gen_range(DEVID_MIN..=DEVID_MAX),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
