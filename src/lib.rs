//! xlsxfilter - Excel sheet to filtered CSV batch converter
//!
//! This crate converts the first sheet of an Excel file (XLSX) into a
//! semicolon-separated text file that keeps only the rows whose `CSV_State`
//! column equals `OK`. The result can be copied to a remote host with `scp`,
//! and the destination storage (Nextcloud user folders or group folders) is
//! re-indexed afterwards.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use xlsxfilter::{InputSpec, PipelineBuilder, RunLog};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pipeline = PipelineBuilder::new().build()?;
//!     let mut log = RunLog::in_memory();
//!
//!     let spec = InputSpec::new("/srv/data/alice/files/reports/x.xlsx", None);
//!     let report = pipeline.run(&spec, &mut log)?;
//!
//!     println!(
//!         "{}: kept {} of {} rows",
//!         report.output_path.display(),
//!         report.stats.retained,
//!         report.stats.total
//!     );
//!     Ok(())
//! }
//! ```
//!
//! # Filtering in memory
//!
//! ```rust
//! use xlsxfilter::{filter_rows, locate_column, RawTable};
//!
//! let raw = RawTable::new(vec![
//!     vec!["Name".into(), "CSV_State".into()],
//!     vec!["A".into(), "OK".into()],
//!     vec!["B".into(), "KO".into()],
//! ]);
//! let column = locate_column(&raw, "CSV_State").unwrap();
//! let (filtered, stats) = filter_rows(&raw, column, "OK").unwrap();
//!
//! assert_eq!(column, 2);
//! assert_eq!(filtered.rows.len(), 1);
//! assert_eq!((stats.total, stats.retained), (2, 1));
//! ```

mod api;
mod builder;
pub mod cli;
mod command;
mod config;
mod error;
mod filter;
mod format;
mod formatter;
mod log;
mod output;
mod parser;
mod remote;
mod security;
mod types;

// 公開API
pub use api::{ConverterKind, IndexTarget, StepOutcome};
pub use builder::{Pipeline, PipelineBuilder, RunReport};
pub use command::{CommandOutput, CommandRunner, SystemRunner};
pub use config::{
    Config, ConverterConfig, FilterConfig, IndexConfig, LogConfig, TransferConfig, CONFIG_ENV_VAR,
};
pub use error::FilterError;
pub use filter::{filter_rows, locate_column, row_matches};
pub use log::{Level, LogEntry, RunLog};
pub use output::{write_atomic, DelimitedWriter};
pub use parser::{ExternalConverter, SheetConverter, WorkbookConverter};
pub use remote::{
    classify_output, classify_path, index_command, transfer, transfer_command, trigger_index,
};
pub use security::SecurityConfig;
pub use types::{FilterStats, FilteredTable, InputSpec, RawTable, Record};
