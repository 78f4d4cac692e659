mod executor;

pub use executor::{parse_queries_from_file, BulkExecutor, BulkResult, ProgressCallback};
