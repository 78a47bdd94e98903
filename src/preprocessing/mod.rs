pub mod cleaner;

pub use cleaner::{clean, clean_file, CleanOutcome};
