pub mod csv_io;
pub mod error;
pub mod model_io;

pub use csv_io::{read_csv_table, CsvTable};
pub use error::{IoError, IoResult};
pub use model_io::{load_json, save_json};
