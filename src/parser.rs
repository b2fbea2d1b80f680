/// Reads the tree table from delimited text.
mod tree_csv;

pub use tree_csv::{Columns, CsvParser};
