//! Delimited Writer
//!
//! レコードを区切り文字テキストに変換する。

use std::io::Write;

use csv::{QuoteStyle, Terminator, WriterBuilder};

use crate::error::FilterError;
use crate::types::FilteredTable;

/// 区切り文字テキストのライター
///
/// 区切り文字・引用符・改行を含むフィールドだけを引用符で囲みます。
/// 行末は常に`\n`です。
#[derive(Debug, Clone, Copy)]
pub struct DelimitedWriter {
    delimiter: u8,
}

impl DelimitedWriter {
    pub fn new(delimiter: u8) -> Self {
        Self { delimiter }
    }

    /// テーブルをバイト列にする
    pub fn render(&self, table: &FilteredTable) -> Result<Vec<u8>, FilterError> {
        let mut writer = WriterBuilder::new()
            .delimiter(self.delimiter)
            .terminator(Terminator::Any(b'\n'))
            .quote_style(QuoteStyle::Necessary)
            .flexible(true)
            .from_writer(Vec::new());

        for record in table.records() {
            writer.write_record(record)?;
        }

        writer
            .into_inner()
            .map_err(|e| FilterError::Io(std::io::Error::other(e.to_string())))
    }

    /// テーブルを書き出し、書き込んだバイト数を返す
    pub fn write<W: Write>(&self, table: &FilteredTable, mut out: W) -> Result<u64, FilterError> {
        let bytes = self.render(table)?;
        out.write_all(&bytes)?;
        out.flush()?;
        Ok(bytes.len() as u64)
    }
}
