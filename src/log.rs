//! Run Log Module
//!
//! 実行ログ（RunLog）を提供するモジュール。
//! タイムスタンプとレベル付きの行を、日付ごとのログファイルと標準出力の両方へ追記します。
//! ロガーは起動時に一度だけ生成され、各ステップへ明示的に渡されます。

use std::fmt::{self, Write as _};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::config::LogConfig;
use crate::error::FilterError;

/// ログレベル
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        };
        f.write_str(label)
    }
}

/// ログの1行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub level: Level,
    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] [{}] {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.level,
            self.message
        )
    }
}

/// 追記専用の実行ログ
///
/// すべての行はメモリ上にも保持されるため、実行後に内容を確認できます。
pub struct RunLog {
    sinks: Vec<Box<dyn Write>>,
    entries: Vec<LogEntry>,
    path: Option<PathBuf>,
}

impl fmt::Debug for RunLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunLog")
            .field("sinks", &self.sinks.len())
            .field("entries", &self.entries.len())
            .field("path", &self.path)
            .finish()
    }
}

impl RunLog {
    /// 設定に従ってログファイルを開く
    ///
    /// ファイル名はテンプレートに現在日付を適用して決まり、親ディレクトリは必要に応じて作成されます。
    /// `echo_stdout`が有効なら標準出力にも書き出します。
    pub fn open(config: &LogConfig) -> Result<Self, FilterError> {
        let path = log_path_for(&config.file_template, &Local::now())?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        let mut sinks: Vec<Box<dyn Write>> = vec![Box::new(file)];
        if config.echo_stdout {
            sinks.push(Box::new(std::io::stdout()));
        }

        Ok(Self {
            sinks,
            entries: Vec::new(),
            path: Some(path),
        })
    }

    /// 任意の出力先を持つログを生成
    pub fn with_sinks(sinks: Vec<Box<dyn Write>>) -> Self {
        Self {
            sinks,
            entries: Vec::new(),
            path: None,
        }
    }

    /// メモリ上にのみ記録するログを生成
    pub fn in_memory() -> Self {
        Self::with_sinks(Vec::new())
    }

    /// ログファイルのパス（ファイルに書いていない場合は`None`）
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// 記録済みの行
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.log(Level::Info, message);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.log(Level::Warn, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.log(Level::Error, message);
    }

    /// 1行を追記する
    ///
    /// 出力先への書き込み失敗は処理を止めず、tracingで報告するだけです。
    pub fn log(&mut self, level: Level, message: impl Into<String>) {
        let entry = LogEntry {
            timestamp: Local::now(),
            level,
            message: message.into(),
        };
        let line = entry.to_string();

        for sink in self.sinks.iter_mut() {
            if let Err(e) = writeln!(sink, "{}", line).and_then(|_| sink.flush()) {
                tracing::warn!("failed to write log line: {}", e);
            }
        }

        self.entries.push(entry);
    }

    /// 外部コマンドの出力を1行ずつ記録する
    ///
    /// 空行は記録しません。
    pub fn log_output(&mut self, level: Level, label: &str, output: &str) {
        for line in output.lines().filter(|l| !l.trim().is_empty()) {
            self.log(level, format!("{}: {}", label, line));
        }
    }
}

/// テンプレートと日時からログファイルのパスを生成
///
/// 不正なstrftime指定子を含むテンプレートは`FilterError::Config`になります。
pub(crate) fn log_path_for(template: &str, now: &DateTime<Local>) -> Result<PathBuf, FilterError> {
    let mut rendered = String::new();
    write!(rendered, "{}", now.format(template)).map_err(|_| {
        FilterError::Config(format!("Invalid log file template: '{}'", template))
    })?;
    if rendered.is_empty() {
        return Err(FilterError::Config(format!(
            "Log file template renders to an empty path: '{}'",
            template
        )));
    }
    Ok(PathBuf::from(rendered))
}
