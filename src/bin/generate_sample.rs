use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, Float64Builder, Int64Array, ListBuilder, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use rusty_raman::synthetic::SyntheticSpectrum;

/// Raman bands (center cm⁻¹, sigma, relative amplitude) per sample.
const SAMPLES: [(&str, &[(f64, f64, f64)]); 3] = [
    ("Silicon", &[(520.0, 4.0, 1.0), (950.0, 12.0, 0.08)]),
    ("Polystyrene", &[(620.0, 5.0, 0.3), (1001.0, 3.5, 1.0), (1031.0, 4.0, 0.35), (1602.0, 6.0, 0.45)]),
    ("Calcite", &[(282.0, 6.0, 0.25), (712.0, 5.0, 0.2), (1086.0, 3.5, 1.0)]),
];

fn main() -> Result<()> {
    env_logger::init();

    let concentrations = [0.1, 0.5, 1.0, 2.0, 5.0];
    let operators = ["Alice", "Bob"];

    let mut all_x: Vec<Vec<f64>> = Vec::new();
    let mut all_y: Vec<Vec<f64>> = Vec::new();
    let mut all_sample: Vec<&str> = Vec::new();
    let mut all_conc: Vec<f64> = Vec::new();
    let mut all_operator: Vec<&str> = Vec::new();
    let mut all_id: Vec<i64> = Vec::new();

    // Raman shift 200 → 1798 cm⁻¹, step 2
    let mut row_id: i64 = 0;
    for (sample, bands) in SAMPLES {
        for &conc in &concentrations {
            for &operator in &operators {
                // Fluorescence background: broad, rising towards high shift.
                let mut builder = SyntheticSpectrum::new(200.0, 2.0, 800)
                    .background(&[400.0, 150.0, 40.0, -10.0, 5.0])
                    .noise(2.0 + conc, row_id as u64);
                for &(center, sigma, amp) in bands {
                    builder = builder.peak(center, sigma, 300.0 * amp * conc);
                }
                let spectrum = builder
                    .build()
                    .with_context(|| format!("building {sample} spectrum"))?;

                all_x.push(spectrum.wavenumber().to_vec());
                all_y.push(spectrum.intensity().to_vec());
                all_sample.push(sample);
                all_conc.push(conc);
                all_operator.push(operator);
                all_id.push(row_id);
                row_id += 1;
            }
        }
    }

    let batch = build_batch(all_x, all_y, all_sample, all_conc, all_operator, all_id)?;

    let output_path = "sample_data.parquet";
    let file = std::fs::File::create(output_path).context("Failed to create output file")?;
    let mut writer =
        ArrowWriter::try_new(file, batch.schema(), None).context("Failed to create writer")?;
    writer.write(&batch).context("Failed to write batch")?;
    writer.close().context("Failed to close writer")?;

    println!("Wrote {row_id} spectra to {output_path}");
    Ok(())
}

fn list_array(rows: &[Vec<f64>]) -> arrow::array::ListArray {
    let mut builder = ListBuilder::new(Float64Builder::new());
    for row in rows {
        builder.values().append_slice(row);
        builder.append(true);
    }
    builder.finish()
}

fn build_batch(
    x: Vec<Vec<f64>>,
    y: Vec<Vec<f64>>,
    sample: Vec<&str>,
    concentration: Vec<f64>,
    operator: Vec<&str>,
    id: Vec<i64>,
) -> Result<RecordBatch> {
    let item = Arc::new(Field::new("item", DataType::Float64, true));
    let schema = Arc::new(Schema::new(vec![
        Field::new("x", DataType::List(item.clone()), false),
        Field::new("y", DataType::List(item), false),
        Field::new("sample", DataType::Utf8, false),
        Field::new("concentration", DataType::Float64, false),
        Field::new("operator", DataType::Utf8, false),
        Field::new("measurement_id", DataType::Int64, false),
    ]));

    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(list_array(&x)),
            Arc::new(list_array(&y)),
            Arc::new(StringArray::from(sample)),
            Arc::new(Float64Array::from(concentration)),
            Arc::new(StringArray::from(operator)),
            Arc::new(Int64Array::from(id)),
        ],
    )
    .context("Failed to create RecordBatch")
}
