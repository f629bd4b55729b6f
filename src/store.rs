use std::collections::HashSet;
use std::fs::OpenOptions;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use csv::{ReaderBuilder, WriterBuilder};
use tracing::info;

use crate::dedup::DedupStore;
use crate::domain::{Measurement, dedup_key};
use crate::error::HydroError;

pub const CURRENT_HEADER: [&str; 7] = [
    "timestamp",
    "station_id",
    "discharge",
    "water_level",
    "danger_level",
    "water_temperature",
    "is_liter",
];

pub const LEGACY_HEADER: [&str; 7] = [
    "timestamp",
    "station_id",
    "discharge",
    "water_level",
    "danger_level",
    "water_temperature",
    "collection_time",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchemaMode {
    #[default]
    Current,
    Legacy,
}

impl SchemaMode {
    pub fn header(&self) -> [&'static str; 7] {
        match self {
            SchemaMode::Current => CURRENT_HEADER,
            SchemaMode::Legacy => LEGACY_HEADER,
        }
    }
}

impl FromStr for SchemaMode {
    type Err = HydroError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "current" => Ok(SchemaMode::Current),
            "legacy" => Ok(SchemaMode::Legacy),
            _ => Err(HydroError::InvalidConfig(format!(
                "unknown CSV schema {value:?} (expected \"current\" or \"legacy\")"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CsvStore {
    path: Utf8PathBuf,
    schema: SchemaMode,
}

#[derive(Debug)]
pub struct CompactOutcome {
    pub kept: usize,
    pub removed: usize,
    pub seen: DedupStore,
}

impl CsvStore {
    pub fn new(path: Utf8PathBuf, schema: SchemaMode) -> Self {
        Self { path, schema }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn load_seen(&self) -> Result<DedupStore, HydroError> {
        if !self.path.as_std_path().exists() {
            return Ok(DedupStore::new());
        }
        let mut reader = ReaderBuilder::new()
            .from_path(self.path.as_std_path())
            .map_err(|err| HydroError::Persistence(err.to_string()))?;
        let headers = reader
            .headers()
            .map_err(|err| HydroError::Persistence(err.to_string()))?
            .clone();
        let (timestamp_idx, station_idx) = key_columns(headers.iter())?;

        let mut keys = Vec::new();
        for row in reader.records() {
            let row = row.map_err(|err| HydroError::Persistence(err.to_string()))?;
            if let (Some(timestamp), Some(station)) = (row.get(timestamp_idx), row.get(station_idx))
            {
                if !timestamp.is_empty() {
                    keys.push(dedup_key(timestamp, station));
                }
            }
        }
        Ok(DedupStore::from_keys(keys))
    }

    pub fn append(&self, records: &[Measurement]) -> Result<usize, HydroError> {
        let rows = records
            .iter()
            .filter(|record| record.timestamp.is_some())
            .map(|record| self.row_for(record))
            .collect::<Vec<_>>();
        if rows.is_empty() {
            return Ok(0);
        }

        let existed = self.path.as_std_path().exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path.as_std_path())
            .map_err(|err| HydroError::Persistence(err.to_string()))?;
        let mut writer = WriterBuilder::new().from_writer(file);
        if !existed {
            writer
                .write_record(self.schema.header())
                .map_err(|err| HydroError::Persistence(err.to_string()))?;
        }
        for row in &rows {
            writer
                .write_record(row)
                .map_err(|err| HydroError::Persistence(err.to_string()))?;
        }
        writer
            .flush()
            .map_err(|err| HydroError::Persistence(err.to_string()))?;
        Ok(rows.len())
    }

    pub fn compact(&self) -> Result<CompactOutcome, HydroError> {
        if !self.path.as_std_path().exists() {
            return Ok(CompactOutcome {
                kept: 0,
                removed: 0,
                seen: DedupStore::new(),
            });
        }

        let mut reader = ReaderBuilder::new()
            .from_path(self.path.as_std_path())
            .map_err(|err| HydroError::Persistence(err.to_string()))?;
        let headers = reader
            .headers()
            .map_err(|err| HydroError::Persistence(err.to_string()))?
            .clone();
        let (timestamp_idx, station_idx) = key_columns(headers.iter())?;

        let mut distinct = HashSet::new();
        let mut kept_rows = Vec::new();
        let mut total = 0usize;
        for row in reader.records() {
            let row = row.map_err(|err| HydroError::Persistence(err.to_string()))?;
            total += 1;
            let fields: Vec<String> = row.iter().map(str::to_string).collect();
            if distinct.insert(fields.clone()) {
                kept_rows.push(fields);
            }
        }

        let parent = self
            .path
            .parent()
            .ok_or_else(|| HydroError::Persistence("CSV path has no parent".to_string()))?;
        let temp = tempfile::Builder::new()
            .prefix("lindas-hydro")
            .suffix(".csv")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| HydroError::Persistence(err.to_string()))?;
        {
            let mut writer = WriterBuilder::new().from_writer(temp.as_file());
            writer
                .write_record(&headers)
                .map_err(|err| HydroError::Persistence(err.to_string()))?;
            for row in &kept_rows {
                writer
                    .write_record(row)
                    .map_err(|err| HydroError::Persistence(err.to_string()))?;
            }
            writer
                .flush()
                .map_err(|err| HydroError::Persistence(err.to_string()))?;
        }
        temp.persist(self.path.as_std_path())
            .map_err(|err| HydroError::Persistence(err.to_string()))?;

        let keys = kept_rows.iter().filter_map(|row| {
            let timestamp = row.get(timestamp_idx)?;
            let station = row.get(station_idx)?;
            if timestamp.is_empty() {
                None
            } else {
                Some(dedup_key(timestamp, station))
            }
        });
        let seen = DedupStore::from_keys(keys);
        let removed = total - kept_rows.len();
        info!(
            "compacted {}: kept {} rows, removed {removed} duplicates",
            self.path,
            kept_rows.len()
        );

        Ok(CompactOutcome {
            kept: kept_rows.len(),
            removed,
            seen,
        })
    }

    fn row_for(&self, record: &Measurement) -> [String; 7] {
        let last = match self.schema {
            SchemaMode::Current => record
                .is_liter
                .map(|flag| flag.to_string())
                .unwrap_or_default(),
            SchemaMode::Legacy => record.collection_time.clone(),
        };
        [
            record.timestamp.clone().unwrap_or_default(),
            record.station.to_string(),
            format_float(record.discharge),
            format_float(record.water_level),
            format_float(record.danger_level),
            format_float(record.water_temperature),
            last,
        ]
    }
}

fn key_columns<'a, I>(headers: I) -> Result<(usize, usize), HydroError>
where
    I: Iterator<Item = &'a str>,
{
    let mut timestamp_idx = None;
    let mut station_idx = None;
    for (idx, name) in headers.enumerate() {
        match name {
            "timestamp" => timestamp_idx = Some(idx),
            "station_id" => station_idx = Some(idx),
            _ => {}
        }
    }
    match (timestamp_idx, station_idx) {
        (Some(timestamp), Some(station)) => Ok((timestamp, station)),
        _ => Err(HydroError::Persistence(
            "CSV header lacks timestamp/station_id columns".to_string(),
        )),
    }
}

fn format_float(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
