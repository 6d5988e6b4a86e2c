//! Utility functions for list formatting, sorting and paging.

pub mod format;
pub mod pager;

// Re-export commonly used functions at module level
pub use format::{cmp_ignore_case, signal_line, sort_pairs, sort_stocks, truncate_string};
pub use pager::Pager;
