mod progress;
mod spinner;

pub use progress::{clear_bulk_progress_bar, set_bulk_progress_bar, ProgressWriterFactory};
pub use spinner::Spinner;
