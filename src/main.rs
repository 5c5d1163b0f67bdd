use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};

use rusty_raman::data::loader::{load_file, load_spectrometer_csv};
use rusty_raman::data::shift::RamanShiftConfig;
use rusty_raman::report::{write_peaks_csv, write_reports_json, write_spectrum_csv, PeakReport};
use rusty_raman::{Pipeline, PipelineConfig};

/// What `--stdout` writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StdoutTarget {
    Spectrum,
    Peaks,
}

impl std::str::FromStr for StdoutTarget {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "spectrum" => Ok(Self::Spectrum),
            "peaks" => Ok(Self::Peaks),
            other => bail!("Invalid --stdout value: {other} (expected spectrum or peaks)"),
        }
    }
}

#[derive(Debug, Default)]
struct Args {
    input: PathBuf,
    config: Option<PathBuf>,
    peaks: Option<PathBuf>,
    spectrum: Option<PathBuf>,
    report: Option<PathBuf>,
    stdout: Option<StdoutTarget>,
    spectrometer: bool,
    incident_nm: Option<f64>,
}

fn print_usage() {
    println!("Usage: rusty-raman INPUT [options]");
    println!("\nOptions:");
    println!("  --config <FILE>      Pipeline configuration (JSON)");
    println!("  --peaks <FILE>       Write the peak list as CSV");
    println!("  --spectrum <FILE>    Write the smoothed, baseline-corrected spectrum as CSV");
    println!("  --report <FILE>      Write a JSON report for every spectrum");
    println!("  --stdout <WHAT>      Write `spectrum` or `peaks` as CSV to standard output");
    println!("  --spectrometer       Read INPUT as a spectrometer export (wavelength in nm)");
    println!(
        "  --incident <NM>      Excitation wavelength for --spectrometer (default: {})",
        RamanShiftConfig::default().incident_nm
    );
    println!("\nLogging is controlled by RUST_LOG, e.g. RUST_LOG=debug.");
}

fn parse_arguments(argv: &[String]) -> Result<Option<Args>> {
    let mut args = Args::default();
    let mut input = None;

    let mut i = 0;
    while i < argv.len() {
        match argv[i].as_str() {
            "-h" | "--help" => return Ok(None),
            "--config" => {
                args.config = Some(value(argv, i, "--config")?.into());
                i += 2;
            }
            "--peaks" => {
                args.peaks = Some(value(argv, i, "--peaks")?.into());
                i += 2;
            }
            "--spectrum" => {
                args.spectrum = Some(value(argv, i, "--spectrum")?.into());
                i += 2;
            }
            "--report" => {
                args.report = Some(value(argv, i, "--report")?.into());
                i += 2;
            }
            "--stdout" => {
                args.stdout = Some(value(argv, i, "--stdout")?.parse()?);
                i += 2;
            }
            other if other.starts_with("--stdout=") => {
                args.stdout = Some(other["--stdout=".len()..].parse()?);
                i += 1;
            }
            "--incident" => {
                let v: f64 = value(argv, i, "--incident")?
                    .parse()
                    .context("Invalid --incident value")?;
                args.incident_nm = Some(v);
                i += 2;
            }
            "--spectrometer" => {
                args.spectrometer = true;
                i += 1;
            }
            other if other.starts_with('-') => bail!("Unknown option: {other}"),
            other => {
                if input.is_some() {
                    bail!("Unexpected argument: {other}");
                }
                input = Some(PathBuf::from(other));
                i += 1;
            }
        }
    }

    args.input = input.context("No input file given")?;
    Ok(Some(args))
}

fn value<'a>(argv: &'a [String], i: usize, flag: &str) -> Result<&'a String> {
    argv.get(i + 1)
        .with_context(|| format!("Missing value for {flag}"))
}

/// `out.csv` for a single spectrum, `out_3.csv` for the fourth of several.
fn indexed_path(path: &Path, index: usize, count: usize) -> PathBuf {
    if count <= 1 {
        return path.to_path_buf();
    }
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("out");
    let name = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stem}_{index}.{ext}"),
        None => format!("{stem}_{index}"),
    };
    path.with_file_name(name)
}

fn run(args: &Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    let pipeline = Pipeline::new(config)?;

    let dataset = if args.spectrometer {
        let mut shift = RamanShiftConfig::default();
        if let Some(nm) = args.incident_nm {
            shift.incident_nm = nm;
        }
        load_spectrometer_csv(&args.input, &shift)?
    } else {
        load_file(&args.input)?
    };
    log::info!("loaded {} spectra from {}", dataset.len(), args.input.display());

    if args.peaks.is_none()
        && args.spectrum.is_none()
        && args.report.is_none()
        && args.stdout.is_none()
    {
        log::warn!("no output selected; use --peaks, --spectrum, --report or --stdout");
    }

    let count = dataset.len();
    let mut reports = Vec::with_capacity(count);
    for (index, record) in dataset.records.into_iter().enumerate() {
        let output = pipeline
            .run(&record.spectrum)
            .with_context(|| format!("processing spectrum {index}"))?;

        if let Some(path) = &args.peaks {
            let path = indexed_path(path, index, count);
            let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
            write_peaks_csv(BufWriter::new(file), output.peaks())?;
        }
        if let Some(path) = &args.spectrum {
            let path = indexed_path(path, index, count);
            let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
            write_spectrum_csv(BufWriter::new(file), output.smoothed())?;
        }
        match args.stdout {
            Some(StdoutTarget::Peaks) => {
                write_peaks_csv(std::io::stdout().lock(), output.peaks())?;
            }
            Some(StdoutTarget::Spectrum) => {
                write_spectrum_csv(std::io::stdout().lock(), output.smoothed())?;
            }
            None => {}
        }
        reports.push(PeakReport::new(record.metadata, &output));
    }

    if let Some(path) = &args.report {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        write_reports_json(BufWriter::new(file), &reports)?;
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let result = parse_arguments(&argv).and_then(|args| match args {
        Some(args) => run(&args),
        None => {
            print_usage();
            Ok(())
        }
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
