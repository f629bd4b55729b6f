use std::fs;

use tracing::{debug, error, info, warn};

use crate::config::ScraperConfig;
use crate::domain::{Measurement, SiteCode};
use crate::error::HydroError;
use crate::mapper::map_bindings;
use crate::query::QueryBuilder;
use crate::sparql::{RetryPolicy, SparqlClient, select_with_retry};
use crate::store::CsvStore;

#[derive(Debug, Clone, Copy, Default)]
pub struct ScrapeOutcome {
    pub sites_ok: usize,
    pub sites_skipped: usize,
    pub new_records: usize,
    pub duplicates: usize,
}

pub struct Scraper<C: SparqlClient> {
    config: ScraperConfig,
    client: C,
    retry: RetryPolicy,
}

impl<C: SparqlClient> Scraper<C> {
    pub fn new(config: ScraperConfig, client: C) -> Self {
        Self {
            config,
            client,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn run(&self) -> Result<ScrapeOutcome, HydroError> {
        fs::create_dir_all(self.config.data_dir.as_std_path())
            .map_err(|err| HydroError::Filesystem(err.to_string()))?;
        let store = CsvStore::new(self.config.output_file(), self.config.schema);
        let mut seen = store.load_seen()?;
        info!(
            "loaded {} seen measurement keys from {}",
            seen.len(),
            store.path()
        );

        let builder = QueryBuilder::new(&self.config.base_url);
        let collected_at = iso_timestamp();

        let mut outcome = ScrapeOutcome::default();
        let mut fresh: Vec<Measurement> = Vec::new();
        for &site in &self.config.sites {
            match self.scrape_site(&builder, site, &collected_at) {
                Ok(Some(record)) => {
                    outcome.sites_ok += 1;
                    if let Some(key) = record.dedup_key() {
                        if seen.contains(&key) {
                            debug!("site {site}: measurement {key} already recorded");
                            outcome.duplicates += 1;
                        } else {
                            seen.insert(key);
                            fresh.push(record);
                        }
                    }
                }
                Ok(None) => {
                    outcome.sites_ok += 1;
                    debug!("site {site}: no measurement to record");
                }
                Err(err) => {
                    warn!("site {site}: skipped: {err}");
                    outcome.sites_skipped += 1;
                }
            }
        }

        match store.append(&fresh) {
            Ok(count) => {
                outcome.new_records = count;
                if count > 0 {
                    info!("appended {count} new records to {}", store.path());
                }
            }
            Err(err) => {
                // Batch is lost but the next run refetches; dedup keys come from disk.
                error!("failed to append batch to {}: {err}", store.path());
            }
        }

        Ok(outcome)
    }

    fn scrape_site(
        &self,
        builder: &QueryBuilder,
        site: SiteCode,
        collected_at: &str,
    ) -> Result<Option<Measurement>, HydroError> {
        let query = builder.site_query(site, &self.config.parameters)?;
        let response = select_with_retry(&self.client, &query, &self.retry)?;
        map_bindings(site, &response, builder.base_url(), collected_at)
    }
}

fn iso_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
