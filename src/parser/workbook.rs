//! Workbook Converter
//!
//! calamineを使用してワークブックの1シートをプロセス内でテーブルに変換します。

use std::io::{Cursor, Read};
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader, Sheets};
use zip::ZipArchive;

use crate::error::FilterError;
use crate::formatter::CellFormatter;
use crate::log::RunLog;
use crate::parser::styles::SheetStyles;
use crate::parser::{skip_leading, SheetConverter};
use crate::security::{check_archive, check_input_size, SecurityConfig};
use crate::types::{RawTable, Record};

/// calamineによる変換器
#[derive(Debug, Clone)]
pub struct WorkbookConverter {
    /// 変換対象シート（0始まり）
    sheet_index: usize,
    /// 先頭から読み飛ばす行数
    skip_rows: usize,
    /// 入力ファイルのセキュリティ制限
    security: SecurityConfig,
    formatter: CellFormatter,
}

impl WorkbookConverter {
    pub fn new(sheet_index: usize, skip_rows: usize, security: SecurityConfig) -> Self {
        Self {
            sheet_index,
            skip_rows,
            security,
            formatter: CellFormatter::new(),
        }
    }

    /// メモリ上のワークブックを変換する
    ///
    /// セルは`styles.xml`の表示書式を適用した文字列になります。
    ///
    /// # 戻り値
    ///
    /// * `Ok(RawTable)` - 先頭`skip_rows`行を除いたテーブル
    /// * `Err(FilterError::Parse)` - ワークブックが不正な場合
    /// * `Err(FilterError::SecurityViolation)` - ZIPアーカイブが制限を超える場合
    /// * `Err(FilterError::Config)` - XLSX以外の形式、またはシートインデックスが範囲外の場合
    pub fn convert_bytes(&self, buffer: &[u8]) -> Result<RawTable, FilterError> {
        // ZIPとして開けない場合はcalamineの解析エラーを報告する
        let mut archive = ZipArchive::new(Cursor::new(buffer)).ok();
        if let Some(archive) = archive.as_mut() {
            check_archive(archive, &self.security)?;
        }

        let sheets = open_workbook_auto_from_rs(Cursor::new(buffer))?;
        let mut workbook = match sheets {
            Sheets::Xlsx(workbook) => workbook,
            _ => {
                return Err(FilterError::Config(
                    "Only XLSX format is supported".to_string(),
                ))
            }
        };

        let total = workbook.sheet_names().len();
        let range = workbook
            .worksheet_range_at(self.sheet_index)
            .ok_or_else(|| {
                FilterError::Config(format!(
                    "Sheet index {} is out of range (total: {})",
                    self.sheet_index, total
                ))
            })?
            .map_err(|e| FilterError::Parse(e.into()))?;

        let styles = match archive.as_mut() {
            Some(archive) => SheetStyles::from_archive(archive, self.sheet_index)?,
            None => SheetStyles::default(),
        };

        Ok(skip_leading(
            self.render_rows(&range, &styles),
            self.skip_rows,
        ))
    }

    /// シートの全行を表示文字列のレコードに変換
    ///
    /// calamineの範囲は最初の非空セルから始まるため、先頭の空行・空列を補って
    /// シート上の位置と揃えます。書式はシート上の絶対位置で引きます。
    fn render_rows(&self, range: &Range<Data>, styles: &SheetStyles) -> Vec<Record> {
        let Some((start_row, start_col)) = range.start() else {
            return Vec::new();
        };
        let leading_cols = start_col as usize;
        let width = leading_cols + range.width();

        let mut records: Vec<Record> = (0..start_row).map(|_| vec![String::new(); width]).collect();
        for (row_offset, row) in range.rows().enumerate() {
            let sheet_row = start_row + row_offset as u32;
            let mut record = Vec::with_capacity(width);
            record.resize(leading_cols, String::new());
            record.extend(row.iter().enumerate().map(|(col_offset, cell)| {
                let format = styles.format_at(sheet_row, start_col + col_offset as u32);
                self.formatter.format_cell(cell, format, styles.is_1904())
            }));
            records.push(record);
        }
        records
    }
}

impl SheetConverter for WorkbookConverter {
    fn convert(&self, source: &Path, log: &mut RunLog) -> Result<RawTable, FilterError> {
        let size = check_input_size(source, &self.security)?;
        tracing::debug!(path = %source.display(), size, "reading workbook");

        let mut buffer = Vec::with_capacity(size as usize);
        std::fs::File::open(source)?.read_to_end(&mut buffer)?;

        let table = self.convert_bytes(&buffer).map_err(|e| {
            if let FilterError::Parse(ref inner) = e {
                log.error(format!("calamine: {}", inner));
            }
            e
        })?;

        log.info(format!(
            "Converted sheet {} of {} ({} rows after skipping {})",
            self.sheet_index + 1,
            source.display(),
            table.records().len(),
            self.skip_rows
        ));
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_invalid_bytes() {
        let converter = WorkbookConverter::new(0, 1, SecurityConfig::default());
        let result = converter.convert_bytes(b"not a workbook");
        assert!(result.is_err());
    }

    #[test]
    fn test_render_rows_empty_range() {
        let converter = WorkbookConverter::new(0, 0, SecurityConfig::default());
        let range: Range<Data> = Range::empty();
        assert!(converter.render_rows(&range, &SheetStyles::default()).is_empty());
    }

    #[test]
    fn test_render_rows_restores_offset() {
        let converter = WorkbookConverter::new(0, 0, SecurityConfig::default());
        let mut range: Range<Data> = Range::new((1, 1), (2, 2));
        range.set_value((1, 1), Data::String("Name".into()));
        range.set_value((1, 2), Data::String("CSV_State".into()));
        range.set_value((2, 1), Data::String("A".into()));
        range.set_value((2, 2), Data::String("OK".into()));

        let records = converter.render_rows(&range, &SheetStyles::default());
        assert_eq!(records.len(), 3);
        assert_eq!(records[0], vec!["", "", ""]);
        assert_eq!(records[1], vec!["", "Name", "CSV_State"]);
        assert_eq!(records[2], vec!["", "A", "OK"]);
    }
}
