use std::fs;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use camino::Utf8PathBuf;
use tempfile::TempDir;

use lindas_hydro::config::{self, ScraperConfig};
use lindas_hydro::domain::Parameter;
use lindas_hydro::error::HydroError;
use lindas_hydro::scraper::Scraper;
use lindas_hydro::sparql::{
    Binding, ResultSet, RetryPolicy, SelectResponse, SparqlClient, Term,
};
use lindas_hydro::store::SchemaMode;

const BASE: &str = "https://environment.ld.admin.ch/foen/hydro";

fn test_config(temp: &TempDir, sites: &str) -> ScraperConfig {
    ScraperConfig {
        endpoint_url: "https://example.com/sparql".to_string(),
        base_url: BASE.to_string(),
        data_dir: Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap(),
        sites: config::parse_site_list(sites).unwrap(),
        parameters: Parameter::ALL.to_vec(),
        schema: SchemaMode::Current,
    }
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        initial_delay: Duration::from_millis(1),
    }
}

fn binding(predicate: &str, value: &str) -> Binding {
    Binding {
        predicate: Some(Term::uri(&format!("{BASE}/dimension/{predicate}"))),
        object: Some(Term::literal(value)),
    }
}

fn response(bindings: Vec<Binding>) -> SelectResponse {
    SelectResponse {
        results: ResultSet { bindings },
        ..SelectResponse::default()
    }
}

struct FixedClient {
    bindings: Vec<Binding>,
}

impl SparqlClient for FixedClient {
    fn select(&self, _query: &str) -> Result<SelectResponse, HydroError> {
        Ok(response(self.bindings.clone()))
    }
}

struct FailingClient {
    calls: Arc<Mutex<u32>>,
}

impl SparqlClient for FailingClient {
    fn select(&self, _query: &str) -> Result<SelectResponse, HydroError> {
        let mut guard = self.calls.lock().unwrap();
        *guard += 1;
        Err(HydroError::SparqlHttp("connection reset".to_string()))
    }
}

struct PerSiteClient;

impl SparqlClient for PerSiteClient {
    fn select(&self, query: &str) -> Result<SelectResponse, HydroError> {
        if query.contains("/river/observation/2112") {
            return Err(HydroError::SparqlStatus {
                status: 503,
                message: "unavailable".to_string(),
            });
        }
        Ok(response(vec![
            binding("measurementTime", "2024-01-01T00:00:00"),
            binding("discharge", "12.5"),
        ]))
    }
}

#[test]
fn end_to_end_appends_one_row() {
    let temp = tempfile::tempdir().unwrap();
    let config = test_config(&temp, "2044");
    let output = config.output_file();
    let client = FixedClient {
        bindings: vec![
            binding("measurementTime", "2024-01-01T00:00:00"),
            binding("discharge", "12.5"),
        ],
    };

    let outcome = Scraper::new(config, client).run().unwrap();
    assert_eq!(outcome.new_records, 1);
    assert_eq!(outcome.sites_ok, 1);
    assert_eq!(outcome.sites_skipped, 0);

    let content = fs::read_to_string(output.as_std_path()).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(
        lines[0],
        "timestamp,station_id,discharge,water_level,danger_level,water_temperature,is_liter"
    );
    assert_eq!(lines[1], "2024-01-01T00:00:00,2044,12.5,,,,");
    assert_eq!(lines.len(), 2);
}

#[test]
fn second_run_over_identical_data_appends_nothing() {
    let temp = tempfile::tempdir().unwrap();
    let bindings = vec![
        binding("measurementTime", "2024-01-01T00:00:00"),
        binding("discharge", "12.5"),
    ];
    let output = test_config(&temp, "2044").output_file();

    let first = Scraper::new(
        test_config(&temp, "2044"),
        FixedClient {
            bindings: bindings.clone(),
        },
    )
    .run()
    .unwrap();
    assert_eq!(first.new_records, 1);

    // Fresh scraper, same endpoint data: the dedup set reseeds from disk.
    let second = Scraper::new(test_config(&temp, "2044"), FixedClient { bindings })
        .run()
        .unwrap();
    assert_eq!(second.new_records, 0);
    assert_eq!(second.duplicates, 1);

    let content = fs::read_to_string(output.as_std_path()).unwrap();
    assert_eq!(content.lines().count(), 2);
}

#[test]
fn failing_site_is_skipped_not_fatal() {
    let temp = tempfile::tempdir().unwrap();
    let config = test_config(&temp, "2044,2112");
    let output = config.output_file();

    let outcome = Scraper::new(config, PerSiteClient)
        .with_retry_policy(fast_retry())
        .run()
        .unwrap();
    assert_eq!(outcome.sites_ok, 1);
    assert_eq!(outcome.sites_skipped, 1);
    assert_eq!(outcome.new_records, 1);

    let content = fs::read_to_string(output.as_std_path()).unwrap();
    assert_eq!(content.lines().count(), 2);
}

#[test]
fn transport_failure_is_retried_three_times_per_site() {
    let temp = tempfile::tempdir().unwrap();
    let config = test_config(&temp, "2044");
    let output = config.output_file();
    let calls = Arc::new(Mutex::new(0));
    let client = FailingClient {
        calls: Arc::clone(&calls),
    };

    let scraper = Scraper::new(config, client).with_retry_policy(fast_retry());
    let outcome = scraper.run().unwrap();
    assert_eq!(outcome.sites_skipped, 1);
    assert_eq!(outcome.new_records, 0);
    assert_eq!(*calls.lock().unwrap(), 3);

    // No valid record, so nothing was appended and no file was created.
    assert!(!output.as_std_path().exists());
}

#[test]
fn record_without_measurement_time_is_not_persisted() {
    let temp = tempfile::tempdir().unwrap();
    let config = test_config(&temp, "2044");
    let output = config.output_file();
    let client = FixedClient {
        bindings: vec![binding("discharge", "12.5"), binding("waterLevel", "430.2")],
    };

    let outcome = Scraper::new(config, client).run().unwrap();
    assert_eq!(outcome.sites_ok, 1);
    assert_eq!(outcome.new_records, 0);
    assert!(!output.as_std_path().exists());
}
