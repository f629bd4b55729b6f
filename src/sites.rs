use camino::Utf8Path;
use csv::ReaderBuilder;
use tracing::warn;

use crate::domain::SiteCode;
use crate::error::HydroError;

pub const RIVER_TAG: &str = "lhg_fluss";

// Reference exports come Latin-1 encoded, so rows are read as bytes and
// decoded lossily; the two columns we need are plain ASCII.
pub fn river_station_codes(path: &Utf8Path) -> Result<Vec<SiteCode>, HydroError> {
    let mut reader = ReaderBuilder::new()
        .from_path(path.as_std_path())
        .map_err(|err| HydroError::Persistence(err.to_string()))?;
    let headers = reader
        .byte_headers()
        .map_err(|err| HydroError::Persistence(err.to_string()))?
        .clone();

    let mut code_idx = None;
    let mut url_idx = None;
    for (idx, name) in headers.iter().enumerate() {
        match String::from_utf8_lossy(name).as_ref() {
            "lhg_code" => code_idx = Some(idx),
            "lhg_url" => url_idx = Some(idx),
            _ => {}
        }
    }
    let (code_idx, url_idx) = match (code_idx, url_idx) {
        (Some(code), Some(url)) => (code, url),
        _ => {
            return Err(HydroError::Persistence(
                "reference CSV lacks lhg_code/lhg_url columns".to_string(),
            ));
        }
    };

    let mut codes = Vec::new();
    for row in reader.byte_records() {
        let row = row.map_err(|err| HydroError::Persistence(err.to_string()))?;
        let tag = String::from_utf8_lossy(row.get(code_idx).unwrap_or_default());
        if tag != RIVER_TAG {
            continue;
        }
        let url = String::from_utf8_lossy(row.get(url_idx).unwrap_or_default());
        let stem = url.trim();
        let stem = stem.strip_suffix(".htm").unwrap_or(stem);
        match stem.parse::<SiteCode>() {
            Ok(code) => codes.push(code),
            Err(_) => warn!("skipping river station with unparseable code {url:?}"),
        }
    }
    Ok(codes)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use camino::Utf8PathBuf;

    use super::*;

    #[test]
    fn filters_rivers_and_strips_extension() {
        let temp = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp.path().join("stations.csv")).unwrap();
        fs::write(
            path.as_std_path(),
            "lhg_code,lhg_url,name\n\
             lhg_fluss,2044.htm,Aare\n\
             lhg_see,2005.htm,Bielersee\n\
             lhg_fluss,2112.htm,Rhein\n",
        )
        .unwrap();

        let codes = river_station_codes(&path).unwrap();
        let codes: Vec<String> = codes.iter().map(SiteCode::to_string).collect();
        assert_eq!(codes, vec!["2044", "2112"]);
    }

    #[test]
    fn skips_unparseable_codes() {
        let temp = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp.path().join("stations.csv")).unwrap();
        fs::write(
            path.as_std_path(),
            "lhg_code,lhg_url\nlhg_fluss,index.htm\nlhg_fluss,2491.htm\n",
        )
        .unwrap();

        let codes = river_station_codes(&path).unwrap();
        assert_eq!(codes.len(), 1);
        assert_eq!(codes[0].to_string(), "2491");
    }

    #[test]
    fn missing_columns_is_an_error() {
        let temp = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp.path().join("stations.csv")).unwrap();
        fs::write(path.as_std_path(), "code,url\nlhg_fluss,2044.htm\n").unwrap();

        assert!(river_station_codes(&path).is_err());
    }
}
