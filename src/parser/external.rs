//! External Converter
//!
//! 外部の変換ツール（デフォルトは`xlsx2csv`）を起動してテーブルを得る変換器。
//! ツールの出力先は一時ファイルで、どの終了経路でもガードのドロップ時に削除されます。

use std::path::Path;

use crate::command::{expand_args, CommandRunner};
use crate::config::ConverterConfig;
use crate::error::FilterError;
use crate::log::{Level, RunLog};
use crate::parser::{parse_delimited, skip_leading, SheetConverter};
use crate::security::{check_input_size, SecurityConfig};
use crate::types::RawTable;

/// 外部ツールによる変換器
pub struct ExternalConverter<'a> {
    config: &'a ConverterConfig,
    security: &'a SecurityConfig,
    runner: &'a dyn CommandRunner,
}

impl<'a> ExternalConverter<'a> {
    pub fn new(
        config: &'a ConverterConfig,
        security: &'a SecurityConfig,
        runner: &'a dyn CommandRunner,
    ) -> Self {
        Self {
            config,
            security,
            runner,
        }
    }
}

impl SheetConverter for ExternalConverter<'_> {
    fn convert(&self, source: &Path, log: &mut RunLog) -> Result<RawTable, FilterError> {
        check_input_size(source, self.security)?;

        // ガードがスコープを抜けるとファイルは削除される
        let raw = tempfile::Builder::new()
            .prefix("xlsxfilter-")
            .suffix(".txt")
            .tempfile()?
            .into_temp_path();

        let sheet = (self.config.sheet_index + 1).to_string();
        let delimiter = self.config.delimiter.to_string();
        let input = source.to_string_lossy();
        let output = raw.to_string_lossy();
        let args = expand_args(
            &self.config.args,
            &[
                ("sheet", sheet.as_str()),
                ("delimiter", delimiter.as_str()),
                ("input", input.as_ref()),
                ("output", output.as_ref()),
            ],
        );

        log.info(format!(
            "Converting {} with {}",
            source.display(),
            self.config.program
        ));

        let result = self.runner.run(&self.config.program, &args).map_err(|e| {
            FilterError::Conversion {
                message: format!("failed to start '{}': {}", self.config.program, e),
                output: String::new(),
            }
        })?;

        if !result.success {
            log.log_output(Level::Error, &self.config.program, &result.output);
            return Err(FilterError::Conversion {
                message: format!("'{}' returned {}", self.config.program, result.status_text()),
                output: result.output,
            });
        }
        log.log_output(Level::Info, &self.config.program, &result.output);

        let text = std::fs::read(&raw)?;
        let records = parse_delimited(&text, self.config.delimiter as u8)?;
        Ok(skip_leading(records, self.config.skip_rows))
    }
}
