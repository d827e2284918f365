//! Reading and writing datasets as CSV files.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use chrono::{DateTime, Local, TimeZone};
use tracing::debug;

use crate::dataset::{Column, Dataset, Value};
use crate::file;

/// Reads a dataset from a CSV file with a header row. Cells are interpreted with [Value::parse].
pub fn read_csv(path: impl AsRef<Path>) -> anyhow::Result<Dataset> {
    let path = path.as_ref();
    let reader = csv::Reader::from_path(path).with_context(|| format!("opening {path:?}"))?;
    let data = read_records(reader).with_context(|| format!("reading {path:?}"))?;
    debug!("read {} rows × {} columns from {path:?}", data.rows(), data.cols());
    Ok(data)
}

pub fn read_csv_from(reader: impl Read) -> anyhow::Result<Dataset> {
    read_records(csv::Reader::from_reader(reader))
}

fn read_records<R: Read>(mut reader: csv::Reader<R>) -> anyhow::Result<Dataset> {
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(ToString::to_string)
        .collect();
    let mut columns: Vec<Vec<Value>> = vec![vec![]; headers.len()];
    for (row, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("CSV row {row}"))?;
        if record.len() != headers.len() {
            bail!(
                "CSV row {row} has {} fields, expected {}",
                record.len(),
                headers.len()
            );
        }
        for (col, raw) in record.iter().enumerate() {
            columns[col].push(Value::parse(raw));
        }
    }
    let columns = headers
        .into_iter()
        .zip(columns)
        .map(|(name, values)| Column::new(name, values))
        .collect();
    Ok(Dataset::with_columns(columns)?)
}

/// Writes a dataset to `path`, creating missing parent directories. Columns are written in
/// dataset order; missing values are written as empty cells.
pub fn write_csv(data: &Dataset, path: impl AsRef<Path>) -> anyhow::Result<()> {
    let path = path.as_ref();
    let file = file::create(path).with_context(|| format!("creating {path:?}"))?;
    write_csv_to(data, file).with_context(|| format!("writing {path:?}"))?;
    debug!("wrote {} rows to {path:?}", data.rows());
    Ok(())
}

pub fn write_csv_to(data: &Dataset, writer: impl Write) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(data.columns().iter().map(|column| column.name.as_str()))?;
    for row in 0..data.rows() {
        writer.write_record(
            data.columns()
                .iter()
                .map(|column| column.values[row].to_string()),
        )?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes a dataset to `{dir}/{basename}_{YYYY_MM_DD_HH_MM}.csv`, timestamped with the local
/// clock. Returns the path written.
pub fn write_dated_csv(
    data: &Dataset,
    dir: impl AsRef<Path>,
    basename: &str,
) -> anyhow::Result<PathBuf> {
    let path = dir.as_ref().join(dated_filename(basename, &Local::now()));
    write_csv(data, &path)?;
    Ok(path)
}

pub fn dated_filename<Tz: TimeZone>(basename: &str, time: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("{basename}_{}.csv", time.format("%Y_%m_%d_%H_%M"))
}
