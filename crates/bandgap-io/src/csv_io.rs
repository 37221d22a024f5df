use std::fs::File;
use std::ops::Range;
use std::path::Path;

use bandgap_core::Tensor;

use crate::error::{IoError, IoResult};

/// A CSV file held as raw string cells. Rows may be ragged; width checks
/// happen when columns are extracted.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Read a CSV file with a header row into a [`CsvTable`].
pub fn read_csv_table(path: impl AsRef<Path>) -> IoResult<CsvTable> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| IoError::io(path, e))?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.to_string()).collect();
    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        rows.push(record.iter().map(|f| f.to_string()).collect());
    }

    if rows.is_empty() {
        return Err(IoError::EmptyTable(path.to_path_buf()));
    }
    Ok(CsvTable { headers, rows })
}

impl CsvTable {
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    fn cell(&self, row: usize, column: usize) -> IoResult<f64> {
        let cells = &self.rows[row];
        let raw = cells.get(column).ok_or(IoError::ShortRow {
            row,
            len: cells.len(),
            column,
        })?;
        raw.parse::<f64>().map_err(|_| IoError::NotNumeric {
            row,
            column,
            value: raw.clone(),
        })
    }

    /// Numeric matrix of shape `[rows, columns.len()]`.
    pub fn numeric_columns(&self, columns: Range<usize>) -> IoResult<Tensor<f64>> {
        let width = columns.len();
        let mut data = Vec::with_capacity(self.n_rows() * width);
        for row in 0..self.n_rows() {
            for column in columns.clone() {
                data.push(self.cell(row, column)?);
            }
        }
        Ok(Tensor::new(data, vec![self.n_rows(), width])?)
    }

    /// One numeric column as a vector of length `rows`.
    pub fn numeric_column(&self, column: usize) -> IoResult<Tensor<f64>> {
        let data = (0..self.n_rows())
            .map(|row| self.cell(row, column))
            .collect::<IoResult<Vec<f64>>>()?;
        Ok(Tensor::from_slice(&data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn test_read_and_slice() {
        let f = write("formula,gap,a,b\nSi,1.1,0.5,2\nNaCl,8.5,1.5,3\n");
        let table = read_csv_table(f.path()).unwrap();
        assert_eq!(table.headers, vec!["formula", "gap", "a", "b"]);
        assert_eq!(table.n_rows(), 2);

        let x = table.numeric_columns(2..4).unwrap();
        assert_eq!(x.shape_vec(), vec![2, 2]);
        assert_eq!(x.data(), &[0.5, 2.0, 1.5, 3.0]);
        assert_eq!(table.numeric_column(1).unwrap().data(), &[1.1, 8.5]);
    }

    #[test]
    fn test_non_numeric_cell() {
        let f = write("formula,gap\nSi,abc\n");
        let table = read_csv_table(f.path()).unwrap();
        assert!(matches!(
            table.numeric_column(1),
            Err(IoError::NotNumeric { row: 0, column: 1, .. })
        ));
        // the formula column is text
        assert!(table.numeric_column(0).is_err());
    }

    #[test]
    fn test_short_row() {
        let f = write("a,b,c\n1,2,3\n4,5\n");
        let table = read_csv_table(f.path()).unwrap();
        assert!(matches!(
            table.numeric_columns(0..3),
            Err(IoError::ShortRow { row: 1, len: 2, column: 2 })
        ));
    }

    #[test]
    fn test_header_only_is_empty() {
        let f = write("a,b\n");
        assert!(matches!(read_csv_table(f.path()), Err(IoError::EmptyTable(_))));
    }

    #[test]
    fn test_missing_file() {
        let err = read_csv_table("/nonexistent/train.csv").unwrap_err();
        assert!(matches!(err, IoError::Io { .. }));
    }
}
