//! Parser Module
//!
//! Excelファイルを未フィルタのテーブル（RawTable）に変換する変換器を提供します。
//! calamineによるプロセス内変換と、外部ツールを起動する変換の2種類があります。

mod external;
mod styles;
mod workbook;

use std::path::Path;

use crate::error::FilterError;
use crate::log::RunLog;
use crate::types::{RawTable, Record};

pub use external::ExternalConverter;
pub use workbook::WorkbookConverter;

/// Excelファイルを区切り文字テキスト相当のテーブルに変換するトレイト
pub trait SheetConverter {
    /// 入力ファイルを変換する
    ///
    /// 入力パスの存在と拡張子は呼び出し元で検証済みであることを前提とします。
    fn convert(&self, source: &Path, log: &mut RunLog) -> Result<RawTable, FilterError>;
}

/// 先頭の`skip_rows`件を読み飛ばしてテーブルを作る
pub(crate) fn skip_leading(records: Vec<Record>, skip_rows: usize) -> RawTable {
    RawTable::new(records.into_iter().skip(skip_rows).collect())
}

/// 区切り文字テキストをレコード列に分解する
///
/// 引用符で囲まれたフィールド内の区切り文字・改行はフィールドの一部として扱います。
/// 行ごとのフィールド数は揃っていなくても構いません。
pub(crate) fn parse_delimited(text: &[u8], delimiter: u8) -> Result<Vec<Record>, FilterError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(text);

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result?;
        records.push(record.iter().map(str::to_string).collect());
    }
    Ok(records)
}
