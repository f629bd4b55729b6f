use tracing::{debug, warn};

use crate::domain::{Measurement, SiteCode};
use crate::error::HydroError;
use crate::sparql::SelectResponse;

pub fn map_bindings(
    site: SiteCode,
    response: &SelectResponse,
    base_url: &str,
    collected_at: &str,
) -> Result<Option<Measurement>, HydroError> {
    if response.results.bindings.is_empty() {
        return Ok(None);
    }

    let base = base_url.trim_end_matches('/');
    let dimension_prefix = format!("{base}/dimension/");
    let station_prefix = format!("{base}/station/");

    let mut record = Measurement::empty(site, collected_at);

    for binding in &response.results.bindings {
        let predicate = binding.predicate.as_ref().ok_or_else(|| {
            HydroError::MalformedResponse("binding without a predicate term".to_string())
        })?;
        let object = binding.object.as_ref().ok_or_else(|| {
            HydroError::MalformedResponse("binding without an object term".to_string())
        })?;

        let name = predicate
            .value
            .strip_prefix(&dimension_prefix)
            .or_else(|| predicate.value.strip_prefix("http://example.com/"))
            .unwrap_or(&predicate.value);
        let value = object
            .value
            .strip_prefix(&station_prefix)
            .unwrap_or(&object.value);

        match name {
            "measurementTime" => record.timestamp = Some(value.to_string()),
            "discharge" => record.discharge = parse_float(site, "discharge", value),
            "waterLevel" => record.water_level = parse_float(site, "waterLevel", value),
            "dangerLevel" => record.danger_level = parse_float(site, "dangerLevel", value),
            "waterTemperature" => {
                record.water_temperature = parse_float(site, "waterTemperature", value)
            }
            "isLiter" => record.is_liter = parse_flag(site, value),
            "station" => {
                if value != site.to_string() {
                    warn!("site {site}: response names station {value}, keeping queried code");
                }
            }
            other => debug!("site {site}: ignoring predicate {other}"),
        }
    }

    if !record.is_valid() {
        debug!("site {site}: response carried no valid measurement");
        return Ok(None);
    }
    Ok(Some(record))
}

fn parse_float(site: SiteCode, field: &str, raw: &str) -> Option<f64> {
    match raw.parse::<f64>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("site {site}: {field} value {raw:?} is not a number, leaving empty");
            None
        }
    }
}

fn parse_flag(site: SiteCode, raw: &str) -> Option<bool> {
    match raw {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => {
            warn!("site {site}: isLiter value {raw:?} is not a flag, leaving empty");
            None
        }
    }
}
