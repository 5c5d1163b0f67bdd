use approx::{assert_abs_diff_eq, assert_relative_eq};

use rusty_raman::config::{
    BaselineConfig, Demodulation, DecompositionConfig, PeakConfig, PipelineConfig, SmoothingConfig,
};
use rusty_raman::error::{ConfigError, Error, FitError};
use rusty_raman::processing::baseline::BaselineEstimator;
use rusty_raman::processing::decompose::Decomposer;
use rusty_raman::processing::peaks::{merge, Peak, PeakDetector, PeakSource};
use rusty_raman::processing::smooth::SavitzkyGolay;
use rusty_raman::synthetic::SyntheticSpectrum;
use rusty_raman::{Pipeline, Spectrum};

fn raman_like() -> SyntheticSpectrum {
    SyntheticSpectrum::new(200.0, 1.0, 1000)
        .background(&[60.0, 25.0, -10.0, 4.0, 2.0])
        .peak(480.0, 6.0, 90.0)
        .peak(720.0, 4.0, 40.0)
        .peak(1010.0, 8.0, 120.0)
        .noise(0.2, 11)
}

#[test]
fn decomposition_reconstructs_its_input() {
    let spectrum = raman_like().build().unwrap();
    for demodulation in [Demodulation::Synchronous, Demodulation::Envelope] {
        let decomposer = Decomposer::new(DecompositionConfig {
            max_modes: 5,
            demodulation,
            ..Default::default()
        })
        .unwrap();
        let result = decomposer.decompose(spectrum.intensity()).unwrap();
        let scale = spectrum
            .intensity()
            .iter()
            .fold(0.0_f64, |m, v| m.max(v.abs()));
        for (r, x) in result.reconstruct().iter().zip(spectrum.intensity()) {
            assert!((r - x).abs() < 1e-6 * scale);
        }
    }
}

#[test]
fn baseline_recovered_regardless_of_peak_height() {
    for height in [5.0, 50.0, 500.0] {
        let synthetic = SyntheticSpectrum::new(100.0, 2.0, 600)
            .background(&[100.0, 30.0, -20.0, 5.0])
            .peak(400.0, 5.0, height)
            .peak(700.0, 8.0, 0.6 * height)
            .peak(1000.0, 4.0, 0.3 * height);
        let spectrum = synthetic.build().unwrap();
        let estimator = BaselineEstimator::new(BaselineConfig {
            degree: 3,
            ..Default::default()
        })
        .unwrap();
        let baseline = estimator.estimate(&spectrum).unwrap();
        for (fit, truth) in baseline
            .intensity()
            .iter()
            .zip(synthetic.background_curve())
        {
            assert_abs_diff_eq!(*fit, truth, epsilon = 0.05);
        }
    }
}

#[test]
fn smoothing_leaves_constants_alone() {
    for (window, order) in [(5, 2), (11, 3), (21, 6)] {
        let sg = SavitzkyGolay::new(SmoothingConfig {
            window,
            order,
            ..Default::default()
        })
        .unwrap();
        let out = sg.apply(&[-3.5; 64]).unwrap();
        assert_eq!(out.len(), 64);
        for v in out {
            assert_abs_diff_eq!(v, -3.5, epsilon = 1e-10);
        }
    }
}

#[test]
fn single_gaussian_recovered_by_full_pipeline() {
    let (center, sigma, amplitude) = (650.0, 8.0, 100.0);
    let spectrum = SyntheticSpectrum::new(200.0, 1.0, 1000)
        .background(&[50.0, 20.0, -8.0, 3.0, 1.0])
        .peak(center, sigma, amplitude)
        .noise(0.05, 5)
        .build()
        .unwrap();
    let config = PipelineConfig {
        peaks: PeakConfig {
            min_prominence: 5.0,
            min_separation: 40.0,
        },
        ..Default::default()
    };
    let out = Pipeline::new(config).unwrap().run(&spectrum).unwrap();

    let peaks = out.peaks().peaks();
    assert_eq!(peaks.len(), 1, "{peaks:?}");
    assert!((peaks[0].position - center).abs() <= 1.0);
    assert_relative_eq!(peaks[0].intensity, amplitude, max_relative = 0.02);
}

#[test]
fn three_bands_reported_at_smoothed_maxima() {
    let spectrum = raman_like().build().unwrap();
    let out = Pipeline::new(PipelineConfig::default())
        .unwrap()
        .run(&spectrum)
        .unwrap();

    let peaks = out.peaks().peaks();
    assert_eq!(peaks.len(), 3, "{peaks:?}");
    for (peak, center) in peaks.iter().zip([480.0, 720.0, 1010.0]) {
        assert!((peak.position - center).abs() <= 1.0, "{peak:?}");
    }

    let wavenumber = out.smoothed().wavenumber();
    let smoothed = out.smoothed().intensity();
    for peak in peaks {
        let i = wavenumber.iter().position(|&w| w == peak.position).unwrap();
        assert_eq!(peak.intensity, smoothed[i]);
        assert!(smoothed[i - 1] <= smoothed[i] && smoothed[i + 1] <= smoothed[i]);
    }
}

#[test]
fn peaks_closer_than_separation_collapse_deterministically() {
    let peak = |position: f64, intensity: f64, source| Peak {
        position,
        intensity,
        prominence: intensity,
        width: 4.0,
        source,
    };
    let a = peak(1000.0, 30.0, PeakSource::Mode(0));
    let b = peak(1004.0, 45.0, PeakSource::Residual);
    for input in [[a, b], [b, a]] {
        let merged = merge(input, 10.0);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged.peaks()[0], b);
    }

    let tie_low = peak(1000.0, 45.0, PeakSource::Mode(1));
    for input in [[tie_low, b], [b, tie_low]] {
        assert_eq!(merge(input, 10.0).peaks(), &[tie_low]);
    }
}

#[test]
fn close_gaussians_detected_once() {
    let x: Vec<f64> = (0..400).map(|i| 500.0 + i as f64).collect();
    let y: Vec<f64> = x
        .iter()
        .map(|&v| {
            50.0 * (-(v - 700.0).powi(2) / 8.0).exp() + 80.0 * (-(v - 706.0).powi(2) / 8.0).exp()
        })
        .collect();
    let detector = PeakDetector::new(PeakConfig {
        min_prominence: 1.0,
        min_separation: 10.0,
    })
    .unwrap();
    let peaks = detector.detect(&x, &y, PeakSource::Signal).unwrap();
    assert_eq!(peaks.positions(), vec![706.0]);
}

#[test]
fn pipeline_is_deterministic() {
    let spectrum = raman_like().build().unwrap();
    let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
    let first = pipeline.run(&spectrum).unwrap();
    let second = pipeline.run(&spectrum).unwrap();
    assert_eq!(first.peaks(), second.peaks());
    assert_eq!(first.decomposition(), second.decomposition());
    assert_eq!(first.baseline(), second.baseline());
}

#[test]
fn invalid_configurations_fail_before_work() {
    let even = PipelineConfig {
        smoothing: SmoothingConfig {
            window: 8,
            ..Default::default()
        },
        ..Default::default()
    };
    assert_eq!(
        Pipeline::new(even).unwrap_err(),
        Error::Config(ConfigError::EvenWindow(8))
    );

    let order = PipelineConfig {
        smoothing: SmoothingConfig {
            window: 5,
            order: 5,
            ..Default::default()
        },
        ..Default::default()
    };
    assert!(matches!(
        Pipeline::new(order),
        Err(Error::Config(ConfigError::OrderTooHigh { order: 5, window: 5 }))
    ));

    let threshold = PipelineConfig {
        decomposition: DecompositionConfig {
            residual_energy_threshold: 1.5,
            ..Default::default()
        },
        ..Default::default()
    };
    assert!(matches!(
        Pipeline::new(threshold),
        Err(Error::Config(ConfigError::OutOfRange { .. }))
    ));

    let short = Spectrum::new(vec![1.0, 2.0, 3.0, 4.0, 5.0], vec![0.0; 5]).unwrap();
    let degree = Pipeline::new(PipelineConfig {
        baseline: BaselineConfig {
            degree: 5,
            ..Default::default()
        },
        smoothing: SmoothingConfig {
            window: 3,
            order: 1,
            ..Default::default()
        },
        ..Default::default()
    })
    .unwrap();
    assert!(matches!(
        degree.run(&short),
        Err(Error::Fit(FitError::Underdetermined { degree: 5, .. }))
    ));
}
