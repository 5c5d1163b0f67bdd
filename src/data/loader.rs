use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{
    Array, AsArray, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array,
    LargeListArray, ListArray, StringArray,
};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{MetadataValue, SpectralDataset, Spectrum, SpectrumRecord};
use super::shift::RamanShiftConfig;

/// Header lines preceding the data rows of an instrument export.
const SPECTROMETER_HEADER_LINES: usize = 5;
const SPECTROMETER_WAVELENGTH_COLUMN: usize = 1;
const SPECTROMETER_INTENSITY_COLUMN: usize = 3;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a spectral dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – Parquet file with `x` and `y` list columns
/// * `.json`    – `[{ "x": [...], "y": [...], ...meta }, ...]`
/// * `.csv`     – columns `x` and `y` containing semicolon-separated floats
/// * `.txt` / `.dat` – spectrometer export, see [`load_spectrometer_csv`]
///
/// Rows may list wavenumbers in either direction; they are sorted ascending.
pub fn load_file(path: &Path) -> Result<SpectralDataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    log::debug!("loading {} as .{ext}", path.display());
    match ext.as_str() {
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        "csv" => load_csv(path),
        "txt" | "dat" => load_spectrometer_csv(path, &RamanShiftConfig::default()),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

fn make_record(
    x: Vec<f64>,
    y: Vec<f64>,
    metadata: BTreeMap<String, MetadataValue>,
    row: usize,
) -> Result<SpectrumRecord> {
    let spectrum =
        Spectrum::from_unsorted(x, y).with_context(|| format!("Row {row}: invalid spectrum"))?;
    Ok(SpectrumRecord { spectrum, metadata })
}

// ---------------------------------------------------------------------------
// Spectrometer export
// ---------------------------------------------------------------------------

/// Read an instrument export and convert it to a Raman spectrum.
///
/// The file starts with five header lines, followed by comma-separated rows
/// whose second column is the wavelength in nm and fourth column the
/// intensity. Wavelengths outside the configured band are dropped and the
/// rest converted to Raman shift.
pub fn load_spectrometer_csv(path: &Path, shift: &RamanShiftConfig) -> Result<SpectralDataset> {
    let file = std::fs::File::open(path).context("opening spectrometer export")?;
    let spectrum = parse_spectrometer(file, shift)?;

    let mut metadata = BTreeMap::new();
    if let Some(name) = path.file_stem().and_then(|s| s.to_str()) {
        metadata.insert("file".to_string(), MetadataValue::String(name.to_string()));
    }
    metadata.insert(
        "incident_nm".to_string(),
        MetadataValue::Float(shift.incident_nm),
    );
    Ok(SpectralDataset::from_records(vec![SpectrumRecord {
        spectrum,
        metadata,
    }]))
}

/// Parse the body of a spectrometer export from any reader.
pub fn parse_spectrometer<R: Read>(reader: R, shift: &RamanShiftConfig) -> Result<Spectrum> {
    let mut lines = BufReader::new(reader).lines();
    for i in 0..SPECTROMETER_HEADER_LINES {
        match lines.next() {
            Some(line) => {
                line.with_context(|| format!("reading header line {i}"))?;
            }
            None => bail!("Header missing or incomplete"),
        }
    }

    let mut wavelength = Vec::new();
    let mut intensity = Vec::new();
    for (row_no, line) in lines.enumerate() {
        let line = line.with_context(|| format!("reading data row {row_no}"))?;
        if line.trim().is_empty() {
            continue;
        }
        let row: Vec<f64> = line
            .split(',')
            .map(|tok| {
                tok.trim()
                    .parse::<f64>()
                    .with_context(|| format!("Encountered non-numeric data: '{line}'"))
            })
            .collect::<Result<_>>()?;
        if row.len() <= SPECTROMETER_INTENSITY_COLUMN {
            bail!("Encountered row with too few columns: '{line}'");
        }
        wavelength.push(row[SPECTROMETER_WAVELENGTH_COLUMN]);
        intensity.push(row[SPECTROMETER_INTENSITY_COLUMN]);
    }

    let (x, y) = shift.convert(&wavelength, &intensity);
    log::debug!(
        "spectrometer export: {} rows, {} inside the Raman band",
        wavelength.len(),
        x.len()
    );
    Spectrum::from_unsorted(x, y).context("building Raman spectrum")
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default `df.to_json(orient='records')`):
///
/// ```json
/// [
///   {
///     "x": [200.0, 201.0, ...],
///     "y": [0.12,   0.14,  ...],
///     "sample": "A"
///   },
///   ...
/// ]
/// ```
fn load_json(path: &Path) -> Result<SpectralDataset> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    parse_json(&text)
}

pub fn parse_json(text: &str) -> Result<SpectralDataset> {
    let root: JsonValue = serde_json::from_str(text).context("parsing JSON")?;

    let rows = root.as_array().context("Expected top-level JSON array")?;

    let mut records = Vec::with_capacity(rows.len());

    for (i, rec) in rows.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;

        let x = json_array_to_f64(obj.get("x"), i, "x")?;
        let y = json_array_to_f64(obj.get("y"), i, "y")?;

        let metadata = obj
            .iter()
            .filter(|(key, _)| *key != "x" && *key != "y")
            .map(|(key, val)| (key.clone(), json_to_metadata(val)))
            .collect();

        records.push(make_record(x, y, metadata, i)?);
    }

    Ok(SpectralDataset::from_records(records))
}

fn json_array_to_f64(val: Option<&JsonValue>, row: usize, col: &str) -> Result<Vec<f64>> {
    let arr = val
        .and_then(|v| v.as_array())
        .with_context(|| format!("Row {row}: missing or invalid '{col}' array"))?;

    arr.iter()
        .enumerate()
        .map(|(j, v)| {
            v.as_f64()
                .with_context(|| format!("Row {row}, {col}[{j}]: not a number"))
        })
        .collect()
}

fn json_to_metadata(val: &JsonValue) -> MetadataValue {
    match val {
        JsonValue::String(s) => MetadataValue::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                MetadataValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                MetadataValue::Float(f)
            } else {
                MetadataValue::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => MetadataValue::Bool(*b),
        JsonValue::Null => MetadataValue::Null,
        other => MetadataValue::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout:  header row with column names.
/// `x` and `y` columns contain semicolon-separated floats:
///   `"200.0;201.0;202.0"`, `"0.12;0.14;0.11"`
/// All other columns are treated as metadata.
fn load_csv(path: &Path) -> Result<SpectralDataset> {
    let file = std::fs::File::open(path).context("opening CSV")?;
    parse_csv(file)
}

pub fn parse_csv<R: Read>(input: R) -> Result<SpectralDataset> {
    let mut reader = csv::Reader::from_reader(input);
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let x_idx = headers
        .iter()
        .position(|h| h == "x")
        .context("CSV missing 'x' column")?;
    let y_idx = headers
        .iter()
        .position(|h| h == "y")
        .context("CSV missing 'y' column")?;

    let mut records = Vec::new();

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;

        let x = parse_semicolon_floats(record.get(x_idx).unwrap_or(""), row_no, "x")?;
        let y = parse_semicolon_floats(record.get(y_idx).unwrap_or(""), row_no, "y")?;

        let metadata = record
            .iter()
            .enumerate()
            .filter(|(col_idx, _)| *col_idx != x_idx && *col_idx != y_idx)
            .map(|(col_idx, value)| (headers[col_idx].clone(), guess_metadata_type(value)))
            .collect();

        records.push(make_record(x, y, metadata, row_no)?);
    }

    Ok(SpectralDataset::from_records(records))
}

fn parse_semicolon_floats(s: &str, row: usize, col: &str) -> Result<Vec<f64>> {
    s.split(';')
        .enumerate()
        .map(|(j, tok)| {
            tok.trim()
                .parse::<f64>()
                .with_context(|| format!("Row {row}, {col}[{j}]: '{tok}' is not a number"))
        })
        .collect()
}

fn guess_metadata_type(s: &str) -> MetadataValue {
    if s.is_empty() {
        return MetadataValue::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return MetadataValue::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return MetadataValue::Float(f);
    }
    if s == "true" || s == "false" {
        return MetadataValue::Bool(s == "true");
    }
    MetadataValue::String(s.to_string())
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file containing spectral data.
///
/// Expected schema:
/// - `x`: List<Float64> or LargeList<Float64> – wavenumber arrays
/// - `y`: List<Float64> or LargeList<Float64> – intensity arrays
/// - Any other columns are treated as metadata (strings, ints, floats, bools)
fn load_parquet(path: &Path) -> Result<SpectralDataset> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut records = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();
        let n_rows = batch.num_rows();

        let x_idx = schema
            .index_of("x")
            .map_err(|_| anyhow::anyhow!("Parquet file missing 'x' column"))?;
        let y_idx = schema
            .index_of("y")
            .map_err(|_| anyhow::anyhow!("Parquet file missing 'y' column"))?;

        let x_col = batch.column(x_idx);
        let y_col = batch.column(y_idx);

        let meta_cols: Vec<(usize, String)> = schema
            .fields()
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != x_idx && *i != y_idx)
            .map(|(i, f)| (i, f.name().clone()))
            .collect();

        for row in 0..n_rows {
            let x = extract_f64_list(x_col, row)
                .with_context(|| format!("Row {row}: failed to read 'x'"))?;
            let y = extract_f64_list(y_col, row)
                .with_context(|| format!("Row {row}: failed to read 'y'"))?;

            let metadata = meta_cols
                .iter()
                .map(|(col_idx, col_name)| {
                    (
                        col_name.clone(),
                        extract_metadata_value(batch.column(*col_idx), row),
                    )
                })
                .collect();

            records.push(make_record(x, y, metadata, records.len())?);
        }
    }

    Ok(SpectralDataset::from_records(records))
}

/// Extract a `Vec<f64>` from a List or LargeList column at the given row.
fn extract_f64_list(col: &Arc<dyn Array>, row: usize) -> Result<Vec<f64>> {
    if col.is_null(row) {
        bail!("null value in list column");
    }

    let values_array = match col.data_type() {
        DataType::List(_) => col
            .as_any()
            .downcast_ref::<ListArray>()
            .context("expected ListArray")?
            .value(row),
        DataType::LargeList(_) => col
            .as_any()
            .downcast_ref::<LargeListArray>()
            .context("expected LargeListArray")?
            .value(row),
        other => bail!("Expected List or LargeList column, got {other:?}"),
    };

    // Nulls become NaN and are rejected by spectrum validation.
    if let Some(f64_arr) = values_array.as_any().downcast_ref::<Float64Array>() {
        Ok(f64_arr.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    } else if let Some(f32_arr) = values_array.as_any().downcast_ref::<Float32Array>() {
        Ok(f32_arr
            .iter()
            .map(|v| v.map_or(f64::NAN, f64::from))
            .collect())
    } else {
        bail!(
            "List inner type is {:?}, expected Float64 or Float32",
            values_array.data_type()
        )
    }
}

/// Extract a single metadata value from an Arrow column at a given row.
fn extract_metadata_value(col: &Arc<dyn Array>, row: usize) -> MetadataValue {
    if col.is_null(row) {
        return MetadataValue::Null;
    }
    let any = col.as_any();
    let value = match col.data_type() {
        DataType::Utf8 => any
            .downcast_ref::<StringArray>()
            .map(|s| MetadataValue::String(s.value(row).to_string())),
        DataType::LargeUtf8 => Some(MetadataValue::String(
            col.as_string::<i64>().value(row).to_string(),
        )),
        DataType::Int32 => any
            .downcast_ref::<Int32Array>()
            .map(|a| MetadataValue::Integer(i64::from(a.value(row)))),
        DataType::Int64 => any
            .downcast_ref::<Int64Array>()
            .map(|a| MetadataValue::Integer(a.value(row))),
        DataType::Float32 => any
            .downcast_ref::<Float32Array>()
            .map(|a| MetadataValue::Float(f64::from(a.value(row)))),
        DataType::Float64 => any
            .downcast_ref::<Float64Array>()
            .map(|a| MetadataValue::Float(a.value(row))),
        DataType::Boolean => any
            .downcast_ref::<BooleanArray>()
            .map(|a| MetadataValue::Bool(a.value(row))),
        other => Some(MetadataValue::String(format!("{other:?}"))),
    };
    value.unwrap_or(MetadataValue::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_records_with_metadata() {
        let text = r#"[
            {"x": [3.0, 2.0, 1.0], "y": [0.3, 0.2, 0.1], "sample": "A", "n": 2},
            {"x": [1.0, 2.0, 3.0], "y": [1.0, 2.0, 3.0], "sample": "B"}
        ]"#;
        let ds = parse_json(text).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.column_names, vec!["n".to_string(), "sample".to_string()]);
        assert_eq!(ds.records[0].spectrum.wavenumber(), &[1.0, 2.0, 3.0]);
        assert_eq!(ds.records[0].spectrum.intensity(), &[0.1, 0.2, 0.3]);
        assert_eq!(
            ds.records[1].metadata.get("sample"),
            Some(&MetadataValue::String("B".into()))
        );
    }

    #[test]
    fn json_length_mismatch_is_error() {
        let text = r#"[{"x": [1.0, 2.0, 3.0], "y": [1.0, 2.0]}]"#;
        assert!(parse_json(text).is_err());
    }

    #[test]
    fn csv_semicolon_cells() {
        let text = "x,y,operator,conc\n\"1;2;3;4\",\"5;6;7;8\",Alice,0.5\n";
        let ds = parse_csv(text.as_bytes()).unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.records[0].spectrum.len(), 4);
        assert_eq!(
            ds.records[0].metadata.get("conc"),
            Some(&MetadataValue::Float(0.5))
        );
    }

    #[test]
    fn spectrometer_export() {
        let mut text = String::from("h1\nh2\nh3\nh4\nh5\n");
        for i in 0..20 {
            let wl = 540.0 + i as f64;
            text.push_str(&format!("{i},{wl},0,{}\n", 100.0 + i as f64));
        }
        let s = parse_spectrometer(text.as_bytes(), &RamanShiftConfig::default()).unwrap();
        // 540 nm sits exactly at the lower band edge and is excluded.
        assert_eq!(s.len(), 19);
        assert_eq!(s.intensity()[0], 101.0);
        assert!(s.wavenumber().windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn spectrometer_short_header() {
        let err = parse_spectrometer("a\nb\n".as_bytes(), &RamanShiftConfig::default());
        assert!(err.is_err());
    }

    #[test]
    fn spectrometer_non_numeric_row() {
        let text = "1\n2\n3\n4\n5\n0,545,0,abc\n";
        assert!(parse_spectrometer(text.as_bytes(), &RamanShiftConfig::default()).is_err());
    }
}
