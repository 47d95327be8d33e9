//! Delimited-file I/O for trip sources and exports.
//!
//! Source files are read whole into a [`RawTable`]; the core never touches
//! the filesystem itself. Delimiters are resolved from the file extension
//! (`.tsv` → tab, anything else → comma) unless given explicitly, and input
//! decoding goes through `encoding_rs` (UTF-8 by default).

use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use encoding_rs::{Encoding, UTF_8};

use crate::{dataset::Sources, filter::MapPoint, record::VehicleType, source::RawTable};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(false)
        .from_reader(reader)
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

/// Reads every row of a delimited stream. An input without even a header
/// line yields an empty table.
pub fn read_table<R>(reader: R, delimiter: u8, encoding: &'static Encoding) -> Result<RawTable>
where
    R: Read,
{
    let mut reader = open_csv_reader(reader, delimiter);
    let headers = decode_record(reader.byte_headers()?, encoding)?;
    let mut rows = Vec::new();
    for (row_idx, record) in reader.byte_records().enumerate() {
        let record = record.with_context(|| format!("Reading row {}", row_idx + 2))?;
        rows.push(decode_record(&record, encoding)?);
    }
    Ok(RawTable::new(headers, rows))
}

pub fn read_table_from_path(
    path: &Path,
    delimiter: Option<u8>,
    encoding: &'static Encoding,
) -> Result<RawTable> {
    let file = File::open(path).with_context(|| format!("Opening input file {path:?}"))?;
    let delimiter = resolve_input_delimiter(path, delimiter);
    read_table(BufReader::new(file), delimiter, encoding)
        .with_context(|| format!("Reading {path:?}"))
}

/// Locations of the three source files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFiles {
    pub yellow: PathBuf,
    pub green: PathBuf,
    pub vtc: PathBuf,
}

impl SourceFiles {
    /// `<dir>/yellow_data.csv`, `<dir>/green_data.csv`, `<dir>/vtc_data.csv`.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            yellow: dir.join("yellow_data.csv"),
            green: dir.join("green_data.csv"),
            vtc: dir.join("vtc_data.csv"),
        }
    }

    pub fn path(&self, vehicle_type: VehicleType) -> &Path {
        match vehicle_type {
            VehicleType::Yellow => &self.yellow,
            VehicleType::Green => &self.green,
            VehicleType::Vtc => &self.vtc,
        }
    }

    pub fn read(&self, delimiter: Option<u8>, encoding: &'static Encoding) -> Result<Sources> {
        Ok(Sources {
            yellow: read_table_from_path(&self.yellow, delimiter, encoding)?,
            green: read_table_from_path(&self.green, delimiter, encoding)?,
            vtc: read_table_from_path(&self.vtc, delimiter, encoding)?,
        })
    }
}

/// Writes `vehicle_type,lat,lon` rows for a map renderer. The header is
/// written even when there are no points.
pub fn write_points(path: &Path, points: &[MapPoint]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Creating output file {path:?}"))?;
    write_points_to(BufWriter::new(file), points).with_context(|| format!("Writing {path:?}"))
}

pub fn write_points_to<W: Write>(writer: W, points: &[MapPoint]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    writer.write_record(["vehicle_type", "lat", "lon"])?;
    for point in points {
        writer.serialize(point)?;
    }
    writer.flush()?;
    Ok(())
}
