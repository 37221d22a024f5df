//! `bandgap-train`: train, evaluate and save the classifier and regressor
//! of one model family.

use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

use bandgap_models::{HyperparameterSpace, ModelFamily};
use bandgap_pipeline::{
    train_and_save_models, FsArtifactStore, PipelineConfig, PipelineResult, TaskMetrics, TrainingSummary,
};
use clap::{ArgAction, Parser};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "bandgap-train")]
#[command(about = "Train and save band gap prediction models", version)]
struct Cli {
    /// Featurized classification dataset (CSV)
    #[arg(long = "classification_data", alias = "classification-data", default_value = "data/train_classification.csv")]
    classification_data: PathBuf,

    /// Featurized regression dataset (CSV)
    #[arg(long = "regression_data", alias = "regression-data", default_value = "data/train_regression.csv")]
    regression_data: PathBuf,

    /// Model family: RandomForest, GradientBoosting or XGBoost
    #[arg(long = "model_type", alias = "model-type", default_value = "RandomForest")]
    model_type: String,

    /// JSON search space for the classifier, e.g. '{"max_depth": [10, 20]}'
    #[arg(long = "classification_params", alias = "classification-params")]
    classification_params: Option<String>,

    /// JSON search space for the regressor
    #[arg(long = "regression_params", alias = "regression-params")]
    regression_params: Option<String>,

    /// Run the randomized hyperparameter search (true/false)
    #[arg(long = "use_grid_search", alias = "use-grid-search", default_value_t = true, action = ArgAction::Set)]
    use_grid_search: bool,

    /// Root directory for saved artifacts
    #[arg(long = "models_dir", alias = "models-dir", default_value = "models")]
    models_dir: PathBuf,

    /// Log level when RUST_LOG is not set
    #[arg(long = "log_level", alias = "log-level", default_value = "info")]
    log_level: String,
}

impl Cli {
    fn config(&self) -> PipelineResult<PipelineConfig> {
        let family: ModelFamily = self.model_type.parse()?;
        let space = |json: &Option<String>| -> PipelineResult<Option<HyperparameterSpace>> {
            Ok(json.as_deref().map(HyperparameterSpace::from_json_str).transpose()?)
        };
        Ok(PipelineConfig {
            family,
            classification_data: self.classification_data.clone(),
            regression_data: self.regression_data.clone(),
            classification_space: space(&self.classification_params)?,
            regression_space: space(&self.regression_params)?,
            use_search: self.use_grid_search,
            models_dir: self.models_dir.clone(),
            ..PipelineConfig::default()
        })
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn print_summary(summary: &TrainingSummary) {
    for outcome in [&summary.classification, &summary.regression] {
        println!("{} ({}):", outcome.task, outcome.provenance);
        match &outcome.metrics {
            TaskMetrics::Classification(m) => println!(
                "  accuracy {:.4}  precision {:.4}  recall {:.4}  f1 {:.4}",
                m.accuracy, m.precision, m.recall, m.f1
            ),
            TaskMetrics::Regression(m) => println!(
                "  r2 {:.4}  mae {:.4}  mse {:.4}  rmse {:.4}  explained variance {:.4}",
                m.r2, m.mae, m.mse, m.rmse, m.explained_variance
            ),
        }
    }
    println!("Artifacts written to {}", summary.artifacts.dir.display());
}

fn run(cli: &Cli) -> PipelineResult<TrainingSummary> {
    let config = cli.config()?;
    println!("Starting model training for {}", config.family);
    info!(?config, "configuration");
    let store = FsArtifactStore::new(&config.models_dir);
    train_and_save_models(&config, &store)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match run(&cli) {
        Ok(summary) => {
            print_summary(&summary);
            println!("Model training completed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {}", e);
            let mut source = e.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {}", cause);
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bandgap_pipeline::PipelineError;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["bandgap-train"]).unwrap();
        let config = cli.config().unwrap();
        assert_eq!(config.family, ModelFamily::RandomForest);
        assert!(config.use_search);
        assert_eq!(config.models_dir, PathBuf::from("models"));
        assert_eq!(config.classification_data, PathBuf::from("data/train_classification.csv"));
        assert!(config.classification_space.is_none());
    }

    #[test]
    fn test_underscore_and_hyphen_spellings() {
        let cli = Cli::try_parse_from([
            "bandgap-train",
            "--model_type",
            "xgboost",
            "--use-grid-search",
            "false",
            "--regression_params",
            r#"{"max_depth": [3, 4]}"#,
        ])
        .unwrap();
        let config = cli.config().unwrap();
        assert_eq!(config.family, ModelFamily::XGBoost);
        assert!(!config.use_search);
        assert_eq!(config.regression_space.unwrap().grid_len(), 2);
    }

    #[test]
    fn test_unknown_family() {
        let cli = Cli::try_parse_from(["bandgap-train", "--model_type", "SVM"]).unwrap();
        assert!(matches!(cli.config(), Err(PipelineError::UnknownFamily { .. })));
    }

    #[test]
    fn test_bad_params_json() {
        let cli = Cli::try_parse_from(["bandgap-train", "--classification_params", "[1,2]"]).unwrap();
        assert!(matches!(cli.config(), Err(PipelineError::Model(_))));
    }
}
