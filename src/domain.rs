use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::HydroError;

pub const IS_LITER_URI: &str = "http://example.com/isLiter";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SiteCode(u16);

impl SiteCode {
    pub fn as_u16(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for SiteCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SiteCode {
    type Err = HydroError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let code = value
            .trim()
            .parse::<u16>()
            .map_err(|_| HydroError::InvalidSiteCode(value.to_string()))?;
        if !(1..=9999).contains(&code) {
            return Err(HydroError::InvalidSiteCode(value.to_string()));
        }
        Ok(Self(code))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Parameter {
    Station,
    Discharge,
    MeasurementTime,
    WaterLevel,
    DangerLevel,
    WaterTemperature,
    IsLiter,
}

impl Parameter {
    pub const ALL: [Parameter; 7] = [
        Parameter::Station,
        Parameter::Discharge,
        Parameter::MeasurementTime,
        Parameter::WaterLevel,
        Parameter::DangerLevel,
        Parameter::WaterTemperature,
        Parameter::IsLiter,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Parameter::Station => "station",
            Parameter::Discharge => "discharge",
            Parameter::MeasurementTime => "measurementTime",
            Parameter::WaterLevel => "waterLevel",
            Parameter::DangerLevel => "dangerLevel",
            Parameter::WaterTemperature => "waterTemperature",
            Parameter::IsLiter => "isLiter",
        }
    }

    pub fn dimension_uri(&self, base_url: &str) -> String {
        match self {
            Parameter::IsLiter => IS_LITER_URI.to_string(),
            _ => format!("{base_url}/dimension/{}", self.name()),
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Parameter {
    type Err = HydroError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "station" => Ok(Parameter::Station),
            "discharge" => Ok(Parameter::Discharge),
            "measurementTime" => Ok(Parameter::MeasurementTime),
            "waterLevel" => Ok(Parameter::WaterLevel),
            "dangerLevel" => Ok(Parameter::DangerLevel),
            "waterTemperature" => Ok(Parameter::WaterTemperature),
            "isLiter" => Ok(Parameter::IsLiter),
            _ => Err(HydroError::InvalidParameter(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measurement {
    pub station: SiteCode,
    pub timestamp: Option<String>,
    pub discharge: Option<f64>,
    pub water_level: Option<f64>,
    pub danger_level: Option<f64>,
    pub water_temperature: Option<f64>,
    pub is_liter: Option<bool>,
    pub collection_time: String,
}

impl Measurement {
    pub fn empty(station: SiteCode, collection_time: &str) -> Self {
        Self {
            station,
            timestamp: None,
            discharge: None,
            water_level: None,
            danger_level: None,
            water_temperature: None,
            is_liter: None,
            collection_time: collection_time.to_string(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.timestamp.is_some()
            && (self.discharge.is_some()
                || self.water_level.is_some()
                || self.water_temperature.is_some())
    }

    pub fn dedup_key(&self) -> Option<String> {
        self.timestamp
            .as_ref()
            .map(|timestamp| dedup_key(timestamp, &self.station.to_string()))
    }
}

pub fn dedup_key(timestamp: &str, station_id: &str) -> String {
    format!("{timestamp}_{station_id}")
}
