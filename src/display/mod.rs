//! Terminal output for the CLI: styled tables, progress bars and colors.

pub mod progress;
pub mod tables;
pub mod theme;

pub use progress::{create_progress_bar, create_spinner, with_spinner};
pub use tables::{TableBuilder, create_match_table, create_summary_table};
pub use theme::{THEME, Theme};
