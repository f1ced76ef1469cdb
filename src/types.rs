//! Types Module
//!
//! クレート全体で使用する共通データ型を定義するモジュール。

use std::path::{Path, PathBuf};

/// 1レコード分のフィールド列
pub type Record = Vec<String>;

/// 検証済みの入力指定
///
/// 起動時に一度だけ検証され、以降は変更されません。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSpec {
    /// 変換元のExcelファイル
    pub source_path: PathBuf,

    /// リモートコピー先（`user@host:/path`形式など、検証せずにそのまま保持）
    pub remote_destination: Option<String>,
}

impl InputSpec {
    /// 新しい入力指定を生成
    pub fn new(source_path: impl Into<PathBuf>, remote_destination: Option<String>) -> Self {
        Self {
            source_path: source_path.into(),
            remote_destination,
        }
    }
}

/// 変換器が出力した未フィルタのテーブル
///
/// 最初のレコードがヘッダー（フィールド名）、以降がデータ行です。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    records: Vec<Record>,
}

impl RawTable {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    /// ヘッダー行（空テーブルの場合は`None`）
    pub fn header(&self) -> Option<&Record> {
        self.records.first()
    }

    /// ヘッダーを除くデータ行
    pub fn data_rows(&self) -> &[Record] {
        self.records.get(1..).unwrap_or(&[])
    }

    /// ヘッダーを除くデータ行数
    pub fn data_row_count(&self) -> usize {
        self.records.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }
}

/// フィルタ後のテーブル
///
/// ヘッダーは常に含まれ、データ行は元の順序を保ちます。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteredTable {
    pub header: Record,
    pub rows: Vec<Record>,
}

impl FilteredTable {
    /// ヘッダーとデータ行を出力順に列挙
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        std::iter::once(&self.header).chain(self.rows.iter())
    }
}

/// フィルタ処理の集計値
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    /// データ行の総数（ヘッダーを除く）
    pub total: usize,

    /// 保持されたデータ行数
    pub retained: usize,
}

/// 入力パスから出力パスを導出する
///
/// ファイル名末尾の`source_ext`を`target_ext`に置き換えます。
/// 末尾が一致しない場合、または拡張子しかないファイル名の場合は`None`を返します（大文字小文字を区別）。
/// 比較はバイト列で行うため、UTF-8でないファイル名も扱えます。
/// 拡張子はどちらも`.`で始まる単一の拡張子であること（`Config::validate`で検証済み）。
pub(crate) fn derive_output_path(input: &Path, source_ext: &str, target_ext: &str) -> Option<PathBuf> {
    let name = input.file_name()?.as_encoded_bytes();
    let suffix = source_ext.as_bytes();
    if name.len() <= suffix.len() || !name.ends_with(suffix) {
        return None;
    }
    let target = target_ext.strip_prefix('.')?;
    Some(input.with_extension(target))
}
