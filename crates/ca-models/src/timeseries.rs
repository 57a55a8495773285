//! CSV time series with "value at or before" lookup.
//!
//! Files have a header row and at least two columns: a timestamp and a value.
//! Further columns are ignored.

use std::path::{Path, PathBuf};

use ca_adapter::params::parse_timestamp;
use ca_adapter::{ModelError, ModelResult};
use ca_core::Real;
use chrono::NaiveDateTime;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct CsvTimeseries {
    source: PathBuf,
    /// Sorted by timestamp.
    samples: Vec<(NaiveDateTime, Real)>,
}

impl CsvTimeseries {
    pub fn load(path: &Path) -> ModelResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let series = Self::parse(path, &content)?;
        debug!(path = %path.display(), samples = series.len(), "loaded time series");
        Ok(series)
    }

    pub fn parse(source: &Path, content: &str) -> ModelResult<Self> {
        let mut samples = Vec::new();
        for (line_no, line) in content.lines().enumerate().skip(1) {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let bad_row = |reason: &str| ModelError::Data {
                what: format!("{}:{}: {reason}", source.display(), line_no + 1),
            };
            let mut cols = line.split(',');
            let stamp = cols.next().unwrap_or_default();
            let value = cols.next().ok_or_else(|| bad_row("missing value column"))?;
            let stamp = parse_timestamp(stamp).ok_or_else(|| bad_row("unreadable timestamp"))?;
            let value: Real = value
                .trim()
                .parse()
                .map_err(|_| bad_row("value is not a number"))?;
            samples.push((stamp, value));
        }
        samples.sort_by_key(|(t, _)| *t);
        Ok(Self {
            source: source.to_path_buf(),
            samples,
        })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Value of the last sample not later than `time`.
    pub fn value_at_or_before(&self, time: NaiveDateTime) -> ModelResult<Real> {
        let idx = self.samples.partition_point(|(t, _)| *t <= time);
        match idx.checked_sub(1) {
            Some(i) => Ok(self.samples[i].1),
            None => Err(ModelError::Data {
                what: format!("{} has no sample at or before {time}", self.source.display()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "time,value\n\
        2023-01-01 00:15:00,0.5\n\
        2023-01-01 00:00:00,0.0\n\
        \n\
        2023-01-01 00:30:00,1.0\n";

    fn at(s: &str) -> NaiveDateTime {
        parse_timestamp(s).unwrap()
    }

    #[test]
    fn lookup_at_or_before() {
        let ts = CsvTimeseries::parse(Path::new("pv.csv"), CSV).unwrap();
        assert_eq!(ts.len(), 3);
        assert_eq!(ts.value_at_or_before(at("2023-01-01 00:15:00")).unwrap(), 0.5);
        assert_eq!(ts.value_at_or_before(at("2023-01-01 00:29:59")).unwrap(), 0.5);
        assert_eq!(ts.value_at_or_before(at("2023-06-01 00:00:00")).unwrap(), 1.0);
    }

    #[test]
    fn before_first_sample_fails() {
        let ts = CsvTimeseries::parse(Path::new("pv.csv"), CSV).unwrap();
        assert!(ts.value_at_or_before(at("2022-12-31 23:59:00")).is_err());
    }

    #[test]
    fn malformed_rows() {
        let err = CsvTimeseries::parse(Path::new("t.csv"), "t,v\n2023-01-01 00:00:00,abc\n")
            .unwrap_err();
        assert!(err.to_string().contains("t.csv:2"));
        assert!(CsvTimeseries::parse(Path::new("t.csv"), "t,v\nnot-a-date,1\n").is_err());
        assert!(CsvTimeseries::parse(Path::new("t.csv"), "t,v\n2023-01-01\n").is_err());
    }

    #[test]
    fn missing_file() {
        let err = CsvTimeseries::load(Path::new("/nonexistent/series.csv")).unwrap_err();
        assert!(matches!(err, ModelError::Io { .. }));
    }
}
