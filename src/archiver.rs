use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use log::info;

use crate::error::SinkError;
use crate::models::{COLUMNS, Record};

/// Writes dated and rolling "latest" CSV snapshots into one directory.
#[derive(Debug, Clone)]
pub struct CsvSink {
    pub dir: PathBuf,
    pub stem: String,
}

impl CsvSink {
    pub fn new(dir: impl Into<PathBuf>, stem: impl Into<String>) -> Self {
        CsvSink { dir: dir.into(), stem: stem.into() }
    }

    pub fn dated_path(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(format!("{}_{}.csv", self.stem, date.format("%Y-%m-%d")))
    }

    pub fn latest_path(&self) -> PathBuf {
        self.dir.join(format!("{}_latest.csv", self.stem))
    }

    /// Writes both snapshots, header row included even for no records.
    pub fn persist(&self, records: &[Record], date: NaiveDate) -> Result<(PathBuf, PathBuf), SinkError> {
        fs::create_dir_all(&self.dir).map_err(|source| SinkError::CreateDir {
            path: self.dir.clone(),
            source,
        })?;

        let content = to_csv(records)?;
        let dated = self.dated_path(date);
        let latest = self.latest_path();
        for path in [&dated, &latest] {
            fs::write(path, &content).map_err(|source| SinkError::Write {
                path: path.clone(),
                source,
            })?;
        }

        info!("saved {} records to {} and {}", records.len(), dated.display(), latest.display());
        Ok((dated, latest))
    }
}

pub fn to_csv(records: &[Record]) -> Result<Vec<u8>, SinkError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(COLUMNS)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer
        .into_inner()
        .map_err(|e| SinkError::Csv(csv::Error::from(e.into_error())))
}

pub fn read_snapshot(path: &Path) -> Result<Vec<Record>, SinkError> {
    let read_err = |source| SinkError::Read { path: path.to_path_buf(), source };
    let mut reader = csv::Reader::from_path(path).map_err(read_err)?;
    reader
        .deserialize()
        .collect::<Result<Vec<Record>, _>>()
        .map_err(read_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NOT_FOUND;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
    }

    #[test]
    fn empty_input_still_writes_header_only_files() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = CsvSink::new(tmp.path().join("data"), "appsumo");

        let (dated, latest) = sink.persist(&[], date()).unwrap();
        assert_eq!(dated, tmp.path().join("data/appsumo_2024-03-09.csv"));
        assert_eq!(latest, tmp.path().join("data/appsumo_latest.csv"));
        for path in [dated, latest] {
            assert_eq!(fs::read_to_string(path).unwrap(), "name,price,category,link,scraped_at\n");
        }
    }

    #[test]
    fn snapshot_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = CsvSink::new(tmp.path(), "appsumo");
        let records = vec![
            Record::new("Writer, \"Pro\"", "$49", "Marketing", "https://example.com/products/x"),
            Record::new(NOT_FOUND, "€19 / lifetime", NOT_FOUND, "https://example.com/"),
        ];

        let (dated, latest) = sink.persist(&records, date()).unwrap();
        assert_eq!(read_snapshot(&dated).unwrap(), records);
        assert_eq!(fs::read(&dated).unwrap(), fs::read(&latest).unwrap());
    }

    #[test]
    fn latest_is_overwritten() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = CsvSink::new(tmp.path(), "deals");
        sink.persist(&[Record::new("Old", "$1", NOT_FOUND, "https://example.com/old")], date()).unwrap();
        let fresh = vec![Record::new("New", "$2", NOT_FOUND, "https://example.com/new")];
        sink.persist(&fresh, date().succ_opt().unwrap()).unwrap();

        assert_eq!(read_snapshot(&sink.latest_path()).unwrap(), fresh);
        assert_eq!(read_snapshot(&sink.dated_path(date())).unwrap()[0].name, "Old");
    }

    #[test]
    fn uncreatable_directory_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("not-a-dir");
        fs::write(&blocker, "x").unwrap();

        let err = CsvSink::new(blocker.join("data"), "appsumo").persist(&[], date()).unwrap_err();
        assert!(matches!(err, SinkError::CreateDir { .. }));
    }
}
