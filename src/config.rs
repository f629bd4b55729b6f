use std::env;
use std::path::Path;

use camino::Utf8PathBuf;

use crate::domain::{Parameter, SiteCode};
use crate::error::HydroError;
use crate::store::SchemaMode;

pub const DEFAULT_ENDPOINT: &str = "https://example.com/sparql";
pub const DEFAULT_BASE_URL: &str = "https://environment.ld.admin.ch/foen/hydro";
pub const DEFAULT_SITE_CODES: &str = "2044,2112,2491,2355";
pub const OUTPUT_FILE_NAME: &str = "lindas_hydro_data.csv";

pub const ENV_ENDPOINT: &str = "SPARQL_ENDPOINT";
pub const ENV_BASE_URL: &str = "SPARQL_BASE_URL";
pub const ENV_DATA_DIR: &str = "HYDRO_DATA_DIR";
pub const ENV_SITE_CODES: &str = "SITE_CODES";
pub const ENV_PARAMETERS: &str = "PARAMETERS";
pub const ENV_CSV_SCHEMA: &str = "CSV_SCHEMA";

#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub endpoint_url: String,
    pub base_url: String,
    pub data_dir: Utf8PathBuf,
    pub sites: Vec<SiteCode>,
    pub parameters: Vec<Parameter>,
    pub schema: SchemaMode,
}

impl ScraperConfig {
    pub fn from_env() -> Result<Self, HydroError> {
        let endpoint_url =
            env::var(ENV_ENDPOINT).unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
        let base_url = env::var(ENV_BASE_URL).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let data_dir = match env::var(ENV_DATA_DIR) {
            Ok(dir) => Utf8PathBuf::from(dir),
            Err(_) => default_data_dir(),
        };
        let sites = parse_site_list(
            &env::var(ENV_SITE_CODES).unwrap_or_else(|_| DEFAULT_SITE_CODES.to_string()),
        )?;
        let parameters = match env::var(ENV_PARAMETERS) {
            Ok(raw) => parse_parameter_list(&raw)?,
            Err(_) => Parameter::ALL.to_vec(),
        };
        let schema = match env::var(ENV_CSV_SCHEMA) {
            Ok(raw) => raw.parse()?,
            Err(_) => SchemaMode::Current,
        };

        Ok(Self {
            endpoint_url,
            base_url,
            data_dir,
            sites,
            parameters,
            schema,
        })
    }

    pub fn output_file(&self) -> Utf8PathBuf {
        self.data_dir.join(OUTPUT_FILE_NAME)
    }
}

pub fn parse_site_list(raw: &str) -> Result<Vec<SiteCode>, HydroError> {
    let sites = raw
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(str::parse)
        .collect::<Result<Vec<_>, HydroError>>()?;
    if sites.is_empty() {
        return Err(HydroError::InvalidConfig("no site codes given".to_string()));
    }
    Ok(sites)
}

pub fn parse_parameter_list(raw: &str) -> Result<Vec<Parameter>, HydroError> {
    let parameters = raw
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(str::parse)
        .collect::<Result<Vec<_>, HydroError>>()?;
    if parameters.is_empty() {
        return Err(HydroError::InvalidConfig("no parameters given".to_string()));
    }
    Ok(parameters)
}

fn default_data_dir() -> Utf8PathBuf {
    if Path::new("/.dockerenv").exists() {
        Utf8PathBuf::from("/app/data")
    } else {
        Utf8PathBuf::from("data")
    }
}
