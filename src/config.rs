//! Configuration Module
//!
//! 実行時設定を定義するモジュール。
//! 設定はJSONファイル（環境変数`XLSXFILTER_CONFIG`で指定）から読み込まれ、
//! 省略された項目にはデフォルト値が使われます。

use std::path::Path;

use serde::Deserialize;

use crate::api::ConverterKind;
use crate::error::FilterError;
use crate::security::SecurityConfig;

/// 設定ファイルのパスを指定する環境変数
pub const CONFIG_ENV_VAR: &str = "XLSXFILTER_CONFIG";

/// 実行時設定のルート
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub converter: ConverterConfig,
    pub filter: FilterConfig,
    pub transfer: TransferConfig,
    pub index: IndexConfig,
    pub log: LogConfig,
    pub security: SecurityConfig,
}

/// 変換器の設定
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConverterConfig {
    /// 変換器の種類
    pub kind: ConverterKind,

    /// 変換対象シート（0始まり）
    pub sheet_index: usize,

    /// 先頭から読み飛ばす行数（シートのメタデータ行）
    pub skip_rows: usize,

    /// フィールド区切り文字
    pub delimiter: char,

    /// 外部変換ツールのプログラム名
    pub program: String,

    /// 外部変換ツールの引数テンプレート
    ///
    /// `{input}`, `{output}`, `{sheet}`（1始まり）, `{delimiter}`が置換されます。
    pub args: Vec<String>,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            kind: ConverterKind::Builtin,
            sheet_index: 0,
            skip_rows: 1,
            delimiter: ';',
            program: "xlsx2csv".to_string(),
            args: ["-s", "{sheet}", "-d", "{delimiter}", "{input}", "{output}"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// 行フィルタの設定
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterConfig {
    /// 判定に使う列名（完全一致）
    pub column: String,

    /// 行を残す値（完全一致）
    pub keep_value: String,

    /// 入力ファイルの必須拡張子
    pub source_extension: String,

    /// 出力ファイルの拡張子
    pub output_extension: String,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            column: "CSV_State".to_string(),
            keep_value: "OK".to_string(),
            source_extension: ".xlsx".to_string(),
            output_extension: ".csv".to_string(),
        }
    }
}

/// リモートコピーの設定
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransferConfig {
    /// コピーに使うプログラム
    pub program: String,

    /// ファイルと転送先の前に置く追加引数（例: `["-q", "-o", "BatchMode=yes"]`）
    pub args: Vec<String>,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            program: "scp".to_string(),
            args: Vec::new(),
        }
    }
}

/// 再インデックスコマンドの設定
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IndexConfig {
    /// 再インデックスを実行するか
    pub enabled: bool,

    /// コマンドのプログラム名（例: `php`, `sudo`, `ssh`）
    pub program: String,

    /// サブコマンドの前に置く引数（例: `["occ"]`）
    pub args: Vec<String>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            program: "php".to_string(),
            args: vec!["occ".to_string()],
        }
    }
}

/// 実行ログの設定
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// 日付ごとのログファイルのパステンプレート（chronoのstrftime形式）
    pub file_template: String,

    /// 標準出力にも書き出すか
    pub echo_stdout: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file_template: "xlsxfilter-%Y-%m-%d.log".to_string(),
            echo_stdout: true,
        }
    }
}

impl Config {
    /// JSON文字列から設定を読み込む
    pub fn from_json_str(text: &str) -> Result<Self, FilterError> {
        let config: Config = serde_json::from_str(text)
            .map_err(|e| FilterError::Config(format!("Invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// JSONファイルから設定を読み込む
    pub fn from_path(path: &Path) -> Result<Self, FilterError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            FilterError::Config(format!(
                "Failed to read configuration '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json_str(&text)
    }

    /// 環境変数`XLSXFILTER_CONFIG`が指すファイルから読み込む
    ///
    /// 環境変数が未設定の場合はデフォルト設定を返します。
    pub fn from_env() -> Result<Self, FilterError> {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) if !path.is_empty() => Self::from_path(Path::new(&path)),
            _ => Ok(Self::default()),
        }
    }

    /// 設定を検証する
    ///
    /// # 発生し得るエラー
    ///
    /// * `FilterError::Config(String)`:
    ///   * 列名・保持値・拡張子が空
    ///   * プログラム名が空
    ///   * ログファイルのテンプレートが空
    ///   * 区切り文字がASCIIでない、または改行・引用符
    ///   * 拡張子が`.`で始まる単一の拡張子（例: `.xlsx`）でない
    pub fn validate(&self) -> Result<(), FilterError> {
        let required = [
            ("filter.column", &self.filter.column),
            ("filter.keep_value", &self.filter.keep_value),
            ("filter.source_extension", &self.filter.source_extension),
            ("filter.output_extension", &self.filter.output_extension),
            ("converter.program", &self.converter.program),
            ("transfer.program", &self.transfer.program),
            ("index.program", &self.index.program),
            ("log.file_template", &self.log.file_template),
        ];
        for (name, value) in required {
            if value.is_empty() {
                return Err(FilterError::Config(format!("'{}' must not be empty", name)));
            }
        }

        let delimiter = self.converter.delimiter;
        if !delimiter.is_ascii() || matches!(delimiter, '\n' | '\r' | '"') {
            return Err(FilterError::Config(format!(
                "Invalid delimiter: {:?}",
                delimiter
            )));
        }

        for (name, value) in [
            ("filter.source_extension", &self.filter.source_extension),
            ("filter.output_extension", &self.filter.output_extension),
        ] {
            if !is_single_extension(value) {
                return Err(FilterError::Config(format!(
                    "'{}' must be a single extension such as '.xlsx': {:?}",
                    name, value
                )));
            }
        }

        if self.filter.source_extension == self.filter.output_extension {
            return Err(FilterError::Config(
                "Source and output extensions must differ".to_string(),
            ));
        }

        Ok(())
    }

    /// 区切り文字をバイトとして取得
    pub(crate) fn delimiter_byte(&self) -> u8 {
        // validate()でASCIIであることを確認済み
        self.converter.delimiter as u8
    }
}

/// `.`で始まり、それ以外に`.`とパス区切りを含まない拡張子か
fn is_single_extension(value: &str) -> bool {
    value
        .strip_prefix('.')
        .is_some_and(|rest| !rest.is_empty() && !rest.contains(['.', '/', '\\']))
}
