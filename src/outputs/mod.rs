//! Report writers.
//!
//! # Submodules
//!
//! - [`json`]: writes the [`MarketWatchReport`](crate::models::MarketWatchReport)
//!   as JSON and reads it back for re-judging
//! - [`markdown`]: renders the report for editors
//!
//! # Output Structure
//!
//! ```text
//! json_output_dir/
//! └── 2025-10-06/
//!     └── market_watch.json
//!
//! markdown_output_dir/
//! └── 2025-10-06_market_watch.md
//! ```

pub mod json;
pub mod markdown;
