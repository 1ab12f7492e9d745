/// Чтение датасета и нарезка больших файлов

pub mod loader;
pub mod splitter;

pub use loader::{load_loans, read_csv, select_columns};
pub use splitter::{chunk_file_name, split_csv};
