#![allow(dead_code)]

use std::path::Path;

use bandgap_pipeline::{PipelineConfig, TaskSchema};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Roughly standard-normal noise.
fn noise(rng: &mut StdRng) -> f64 {
    (0..3).map(|_| rng.gen_range(-1.0..1.0)).sum::<f64>()
}

fn feature_header(n_features: usize) -> Vec<String> {
    (0..n_features).map(|j| format!("f{}", j)).collect()
}

/// `formula, band_gap, is_semiconductor, f0..`. The first `informative`
/// features are shifted by the label; every feature is offset and stretched
/// so raw values sit far from their standardized range.
pub fn write_classification(path: &Path, rows: usize, n_features: usize, informative: usize, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut w = csv::Writer::from_path(path).unwrap();
    let mut header = vec!["formula".to_string(), "band_gap".into(), "is_semiconductor".into()];
    header.extend(feature_header(n_features));
    w.write_record(&header).unwrap();

    for i in 0..rows {
        let label = rng.gen_bool(0.5);
        let gap = if label { 0.5 + 3.0 * rng.gen::<f64>() } else { 0.0 };
        let mut record = vec![format!("M{}", i), format!("{}", gap), (label as u8).to_string()];
        for j in 0..n_features {
            let shift = if j < informative { if label { 1.0 } else { -1.0 } } else { 0.0 };
            let v = 5.0 + 3.0 * (shift + noise(&mut rng));
            record.push(format!("{}", v));
        }
        w.write_record(&record).unwrap();
    }
    w.flush().unwrap();
}

/// `formula, band_gap, f0..`; the gap is a smooth function of f0 and f1.
pub fn write_regression(path: &Path, rows: usize, n_features: usize, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut w = csv::Writer::from_path(path).unwrap();
    let mut header = vec!["formula".to_string(), "band_gap".into()];
    header.extend(feature_header(n_features));
    w.write_record(&header).unwrap();

    for i in 0..rows {
        let feats: Vec<f64> = (0..n_features).map(|_| rng.gen_range(0.0..10.0)).collect();
        let gap = (0.3 * feats[0] + 0.1 * feats[1] + 0.05 * noise(&mut rng)).max(0.0);
        let mut record = vec![format!("M{}", i), format!("{}", gap)];
        record.extend(feats.iter().map(|v| format!("{}", v)));
        w.write_record(&record).unwrap();
    }
    w.flush().unwrap();
}

/// Config over small synthetic files with `n_features` columns, search off.
pub fn small_config(dir: &Path, n_features: usize) -> PipelineConfig {
    let classification_data = dir.join("train_classification.csv");
    let regression_data = dir.join("train_regression.csv");
    write_classification(&classification_data, 120, n_features, 3, 7);
    write_regression(&regression_data, 100, n_features, 8);

    PipelineConfig {
        classification_data,
        regression_data,
        classification_schema: TaskSchema {
            label_column: 2,
            feature_columns: 3..3 + n_features,
            split_seed: 15,
        },
        regression_schema: TaskSchema {
            label_column: 1,
            feature_columns: 2..2 + n_features,
            split_seed: 101,
        },
        use_search: false,
        models_dir: dir.join("models"),
        ..PipelineConfig::default()
    }
}
