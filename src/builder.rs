//! Builder Module
//!
//! Fluent Builder APIを提供し、`Pipeline`インスタンスを段階的に構築する。
//! `Pipeline`は変換・列の特定・行フィルタ・転送・再インデックスを順に実行するファサードです。

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::api::{ConverterKind, StepOutcome};
use crate::command::{CommandRunner, SystemRunner};
use crate::config::Config;
use crate::error::FilterError;
use crate::filter::{filter_rows, locate_column};
use crate::log::RunLog;
use crate::output::write_atomic;
use crate::parser::{ExternalConverter, SheetConverter, WorkbookConverter};
use crate::remote::{transfer, trigger_index};
use crate::types::{derive_output_path, FilterStats, InputSpec, RawTable};

/// Fluent Builder APIを提供する構造体
///
/// すべての設定項目にデフォルト値が設定されており、必要な設定のみをオーバーライドできます。
///
/// # 使用例
///
/// ```rust,no_run
/// use xlsxfilter::{ConverterKind, InputSpec, PipelineBuilder, RunLog};
///
/// # fn main() -> Result<(), xlsxfilter::FilterError> {
/// let pipeline = PipelineBuilder::new()
///     .with_converter(ConverterKind::Builtin)
///     .with_index_enabled(false)
///     .build()?;
///
/// let mut log = RunLog::in_memory();
/// let report = pipeline.run(&InputSpec::new("report.xlsx", None), &mut log)?;
/// println!("kept {} of {}", report.stats.retained, report.stats.total);
/// # Ok(())
/// # }
/// ```
pub struct PipelineBuilder {
    /// 内部設定（構築中）
    config: Config,

    /// 外部コマンドの起動方法
    runner: Box<dyn CommandRunner>,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PipelineBuilder {
    /// デフォルト設定を持つビルダーインスタンスを生成する
    ///
    /// # デフォルト設定
    ///
    /// - 変換器: calamine（プロセス内）、最初のシート、先頭1行を読み飛ばす
    /// - 判定列: `CSV_State`、保持値: `OK`
    /// - 転送: `scp`
    /// - 再インデックス: `php occ`
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            runner: Box::new(SystemRunner),
        }
    }

    /// 設定全体を置き換える
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// 変換器の種類を指定する
    pub fn with_converter(mut self, kind: ConverterKind) -> Self {
        self.config.converter.kind = kind;
        self
    }

    /// 変換対象のシート（0始まり）を指定する
    pub fn with_sheet_index(mut self, index: usize) -> Self {
        self.config.converter.sheet_index = index;
        self
    }

    /// 先頭から読み飛ばす行数を指定する
    pub fn with_skip_rows(mut self, rows: usize) -> Self {
        self.config.converter.skip_rows = rows;
        self
    }

    /// 判定列の名前を指定する
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.config.filter.column = column.into();
        self
    }

    /// 行を残す値を指定する
    pub fn with_keep_value(mut self, value: impl Into<String>) -> Self {
        self.config.filter.keep_value = value.into();
        self
    }

    /// 再インデックスの有効・無効を指定する
    pub fn with_index_enabled(mut self, enabled: bool) -> Self {
        self.config.index.enabled = enabled;
        self
    }

    /// 外部コマンドの起動方法を差し替える
    pub fn with_runner(mut self, runner: Box<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// 設定を検証し、`Pipeline`インスタンスを生成する
    ///
    /// # 発生し得るエラー
    ///
    /// * `FilterError::Config(String)`: 設定の検証に失敗した場合
    pub fn build(self) -> Result<Pipeline, FilterError> {
        self.config.validate()?;
        Ok(Pipeline {
            config: self.config,
            runner: self.runner,
        })
    }
}

/// 1回の実行結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// 書き出した出力ファイル
    pub output_path: PathBuf,

    /// データ行の総数と保持数
    pub stats: FilterStats,

    /// リモートコピーの結果
    pub transfer: StepOutcome,

    /// 再インデックスの結果
    pub index: StepOutcome,
}

/// 変換処理のファサード
pub struct Pipeline {
    config: Config,
    runner: Box<dyn CommandRunner>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 入力パスを検証し、出力パスを返す
    ///
    /// 存在確認を先に行い、次に拡張子を確認します。一時ファイルは作成しません。
    pub fn output_path_for(&self, source: &Path) -> Result<PathBuf, FilterError> {
        if !source.is_file() {
            return Err(FilterError::NotFound(source.to_path_buf()));
        }
        let filter = &self.config.filter;
        derive_output_path(source, &filter.source_extension, &filter.output_extension).ok_or_else(
            || FilterError::Format {
                path: source.to_path_buf(),
                expected: filter.source_extension.clone(),
            },
        )
    }

    /// パイプライン全体を実行する
    ///
    /// # 処理フロー
    ///
    /// 1. 入力パスの検証と出力パスの決定
    /// 2. シートの変換
    /// 3. 判定列の特定
    /// 4. 行フィルタと出力ファイルの書き込み
    /// 5. リモートコピー（転送先がある場合のみ、失敗は警告）
    /// 6. 再インデックス（失敗・対象外は警告）
    ///
    /// 致命的エラーはERRORとしてログに記録してから返します。
    pub fn run(&self, spec: &InputSpec, log: &mut RunLog) -> Result<RunReport, FilterError> {
        let started = Instant::now();
        let result = self.run_steps(spec, log);
        match &result {
            Ok(report) => {
                tracing::debug!(elapsed_ms = started.elapsed().as_millis() as u64, "run finished");
                log.info(format!("Finished {}", report.output_path.display()));
            }
            Err(e) => {
                if let FilterError::Conversion { output, .. } = e {
                    tracing::debug!(%output, "converter output");
                }
                log.error(e.to_string());
            }
        }
        result
    }

    fn run_steps(&self, spec: &InputSpec, log: &mut RunLog) -> Result<RunReport, FilterError> {
        log.info(format!("Processing {}", spec.source_path.display()));

        // 1. 入力の検証
        let output_path = self.output_path_for(&spec.source_path)?;

        // 2. 変換
        let raw = self.convert(&spec.source_path, log)?;

        // 3. 判定列の特定
        let filter = &self.config.filter;
        let column = locate_column(&raw, &filter.column)?;
        log.info(format!("Column '{}' found at position {}", filter.column, column));

        // 4. フィルタと書き込み
        let (filtered, stats) = filter_rows(&raw, column, &filter.keep_value)?;
        drop(raw);
        log.info(format!(
            "Rows total: {}, rows with {}={}: {}",
            stats.total, filter.column, filter.keep_value, stats.retained
        ));
        write_atomic(&output_path, &filtered, self.config.delimiter_byte())?;
        log.info(format!("Wrote {}", output_path.display()));

        // 5. リモートコピー
        let transfer = match &spec.remote_destination {
            Some(destination) => transfer(
                &output_path,
                destination,
                &self.config.transfer,
                self.runner.as_ref(),
                log,
            ),
            None => StepOutcome::Skipped,
        };

        // 6. 再インデックス
        let index = trigger_index(&output_path, &self.config.index, self.runner.as_ref(), log);

        Ok(RunReport {
            output_path,
            stats,
            transfer,
            index,
        })
    }

    fn convert(&self, source: &Path, log: &mut RunLog) -> Result<RawTable, FilterError> {
        let converter = &self.config.converter;
        match converter.kind {
            ConverterKind::Builtin => WorkbookConverter::new(
                converter.sheet_index,
                converter.skip_rows,
                self.config.security.clone(),
            )
            .convert(source, log),
            ConverterKind::External => {
                ExternalConverter::new(converter, &self.config.security, self.runner.as_ref())
                    .convert(source, log)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let builder = PipelineBuilder::new();
        assert_eq!(builder.config, Config::default());
    }

    #[test]
    fn test_builder_method_chaining() {
        let builder = PipelineBuilder::new()
            .with_converter(ConverterKind::External)
            .with_sheet_index(2)
            .with_skip_rows(0)
            .with_column("Status")
            .with_keep_value("YES")
            .with_index_enabled(false);

        assert_eq!(builder.config.converter.kind, ConverterKind::External);
        assert_eq!(builder.config.converter.sheet_index, 2);
        assert_eq!(builder.config.converter.skip_rows, 0);
        assert_eq!(builder.config.filter.column, "Status");
        assert_eq!(builder.config.filter.keep_value, "YES");
        assert!(!builder.config.index.enabled);
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        match PipelineBuilder::new().with_column("").build() {
            Err(FilterError::Config(msg)) => assert!(msg.contains("filter.column")),
            other => panic!("Expected Config error, got {:?}", other),
        }
    }

    #[test]
    fn test_output_path_not_found() {
        let pipeline = PipelineBuilder::new().build().unwrap();
        match pipeline.output_path_for(Path::new("/nonexistent/report.xlsx")) {
            Err(FilterError::NotFound(path)) => {
                assert_eq!(path, PathBuf::from("/nonexistent/report.xlsx"))
            }
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_output_path_wrong_extension() {
        let file = tempfile::Builder::new().suffix(".ods").tempfile().unwrap();
        let pipeline = PipelineBuilder::new().build().unwrap();
        assert!(matches!(
            pipeline.output_path_for(file.path()),
            Err(FilterError::Format { .. })
        ));
    }

    #[test]
    fn test_output_path_derived() {
        let file = tempfile::Builder::new().suffix(".xlsx").tempfile().unwrap();
        let pipeline = PipelineBuilder::new().build().unwrap();
        let output = pipeline.output_path_for(file.path()).unwrap();
        assert_eq!(output.extension().unwrap(), "csv");
        assert_eq!(output.parent(), file.path().parent());
    }

    #[test]
    fn test_run_logs_fatal_error() {
        let pipeline = PipelineBuilder::new().build().unwrap();
        let mut log = RunLog::in_memory();
        let result = pipeline.run(&InputSpec::new("/nonexistent/in.xlsx", None), &mut log);

        assert!(matches!(result, Err(FilterError::NotFound(_))));
        let last = log.entries().last().unwrap();
        assert_eq!(last.level, crate::log::Level::Error);
        assert!(last.message.contains("not found"));
    }
}
