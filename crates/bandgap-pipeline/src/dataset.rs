use std::path::Path;

use bandgap_core::Tensor;
use bandgap_io::{read_csv_table, IoError};
use bandgap_models::Task;
use tracing::{debug, info};

use crate::config::TaskSchema;
use crate::error::{PipelineError, PipelineResult};

fn schema_error(path: &Path, reason: impl Into<String>) -> PipelineError {
    PipelineError::SchemaMismatch {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// Read a featurized CSV and slice it into `(features [n, p], labels [n])`
/// according to `schema`.
pub fn load_task_data(path: &Path, schema: &TaskSchema, task: Task) -> PipelineResult<(Tensor<f64>, Tensor<f64>)> {
    let table = read_csv_table(path).map_err(|source| PipelineError::DataLoad {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), rows = table.n_rows(), columns = table.headers.len(), "read table");

    let map_cell_error = |e: IoError| match e {
        IoError::ShortRow { row, len, .. } => schema_error(
            path,
            format!(
                "data row {} has {} columns, at least {} required",
                row + 1,
                len,
                schema.min_width()
            ),
        ),
        other => schema_error(path, other.to_string()),
    };

    let x = table
        .numeric_columns(schema.feature_columns.clone())
        .map_err(map_cell_error)?;
    let y = table
        .numeric_column(schema.label_column)
        .map_err(map_cell_error)?;

    if task == Task::Classification {
        if let Some((row, v)) = y
            .data()
            .iter()
            .enumerate()
            .find(|&(_, &v)| v != 0.0 && v != 1.0)
        {
            return Err(schema_error(
                path,
                format!("data row {}: label {} is not 0 or 1", row + 1, v),
            ));
        }
    }

    info!(
        path = %path.display(),
        task = %task,
        rows = table.n_rows(),
        features = schema.n_features(),
        "loaded dataset"
    );
    Ok((x, y))
}
