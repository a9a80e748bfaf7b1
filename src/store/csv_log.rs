use crate::core::currency::CurrencyCode;
use crate::core::error::Result;
use crate::core::rate::{RateObservation, TIMESTAMP_FORMAT};
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Append-only CSV store of rate observations, one record per line.
pub struct ObservationLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ObservationLog {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn append(&self, obs: &RateObservation) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        writer.write_record([
            obs.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            obs.currency.to_string(),
            obs.currency_name.clone(),
            obs.visa_rate.to_string(),
            obs.benchmark_rate.to_string(),
            obs.markup_percent.to_string(),
        ])?;
        let record = writer
            .into_inner()
            .map_err(|e| std::io::Error::other(e.to_string()))?;

        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| std::io::Error::other("observation log lock poisoned"))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(&record)?;
        debug!(currency = %obs.currency, path = %self.path.display(), "Appended observation");
        Ok(())
    }

    pub fn read_all(&self) -> Result<Vec<RateObservation>> {
        let bytes = self.raw_bytes()?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(bytes.as_slice());

        let mut observations = Vec::new();
        for (line, record) in reader.byte_records().enumerate() {
            let record = match record {
                Ok(record) => record,
                Err(e) if e.is_io_error() => return Err(e.into()),
                Err(e) => {
                    warn!(line = line + 1, error = %e, "Skipping unreadable observation log row");
                    continue;
                }
            };
            match parse_record(&record) {
                Some(obs) => observations.push(obs),
                None => warn!(line = line + 1, "Skipping malformed observation log row"),
            }
        }
        Ok(observations)
    }

    /// Markup percentages grouped by currency, in log order.
    pub fn markup_history(&self) -> Result<HashMap<CurrencyCode, Vec<f64>>> {
        let mut history: HashMap<CurrencyCode, Vec<f64>> = HashMap::new();
        for obs in self.read_all()? {
            history.entry(obs.currency).or_default().push(obs.markup_percent);
        }
        Ok(history)
    }

    /// File contents as written; empty when nothing has been logged yet.
    pub fn raw_bytes(&self) -> Result<Vec<u8>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Rows are read as bytes so that one corrupt row cannot fail the whole log.
fn parse_record(record: &csv::ByteRecord) -> Option<RateObservation> {
    if record.len() != 6 {
        return None;
    }
    let field = |i: usize| std::str::from_utf8(&record[i]).ok();
    Some(RateObservation {
        timestamp: NaiveDateTime::parse_from_str(field(0)?, TIMESTAMP_FORMAT).ok()?,
        currency: field(1)?.parse().ok()?,
        currency_name: field(2)?.to_string(),
        visa_rate: field(3)?.parse().ok()?,
        benchmark_rate: field(4)?.parse().ok()?,
        markup_percent: field(5)?.parse().ok()?,
    })
}
