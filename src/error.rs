//! Error Types Module
//!
//! クレート全体で使用する構造化エラー型を定義するモジュール。
//! `thiserror`を使用して、エラーの自動変換とメッセージフォーマットを実現する。

use std::path::PathBuf;

use thiserror::Error;

/// xlsxfilterクレート全体で使用するエラー型
///
/// パイプラインの各ステップで発生するすべてのエラーを統一的に扱います。
/// `Transfer`と`Index`だけは非致命的エラーで、ログに警告として記録された後も
/// 処理は継続します。それ以外はすべて致命的で、終了コード1で終了します。
///
/// # 使用例
///
/// ```rust,no_run
/// use xlsxfilter::FilterError;
/// use std::fs::File;
///
/// fn open_input(path: &str) -> Result<(), FilterError> {
///     let _file = File::open(path)?;  // Ioエラーが自動的に変換される
///     Ok(())
/// }
/// ```
#[derive(Error, Debug)]
pub enum FilterError {
    /// コマンドライン引数が不正
    #[error("Usage error: {0}")]
    Usage(String),

    /// 入力ファイルが存在しない
    #[error("Input file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// 入力ファイルの拡張子が不正
    #[error("Input file must end with '{expected}': {}", .path.display())]
    Format {
        /// 入力パス
        path: PathBuf,
        /// 期待される拡張子
        expected: String,
    },

    /// 外部変換ツールが失敗した
    ///
    /// `output`には変換ツールの標準出力と標準エラー出力を結合した内容が入ります。
    #[error("Conversion failed: {message}")]
    Conversion {
        /// エラーの概要
        message: String,
        /// 変換ツールの出力
        output: String,
    },

    /// ヘッダー行に対象の列が見つからない
    #[error("Column '{0}' not found in header")]
    ColumnNotFound(String),

    /// I/O操作中に発生したエラー
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Excelファイルの解析中に発生したエラー（calamine由来）
    #[error("Failed to parse Excel file: {0}")]
    Parse(#[from] calamine::Error),

    /// XLSX（ZIPアーカイブ）の読み込みエラー
    #[error("ZIP error: {0}")]
    Zip(String),

    /// XLSX内部のXML解析エラー
    #[error("XML parse error: {0}")]
    Xml(String),

    /// 区切り文字テキストの読み書きエラー
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// 設定の検証に失敗したエラー
    #[error("Configuration error: {0}")]
    Config(String),

    /// セキュリティ制限に違反したエラー
    #[error("Security violation: {0}")]
    SecurityViolation(String),

    /// リモートコピーに失敗した（非致命的）
    #[error("Transfer failed: {0}")]
    Transfer(String),

    /// 再インデックスコマンドに失敗した（非致命的）
    #[error("Index command failed: {0}")]
    Index(String),
}

impl FilterError {
    /// 処理を中断すべきエラーかどうか
    pub fn is_fatal(&self) -> bool {
        !matches!(self, FilterError::Transfer(_) | FilterError::Index(_))
    }

    /// プロセスの終了コード
    pub fn exit_code(&self) -> i32 {
        if self.is_fatal() {
            1
        } else {
            0
        }
    }
}
