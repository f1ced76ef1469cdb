//! Formatter Module
//!
//! セル値を表示文字列に変換するモジュール。
//! セルの表示書式があればそれを適用し、Excel上で見える形と同じ文字列にします。

use calamine::{Data, ExcelDateTime};
use chrono::Timelike;

use crate::format::{format_general, NumberFormat};

/// セルフォーマッター
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct CellFormatter;

impl CellFormatter {
    pub fn new() -> Self {
        Self
    }

    /// セル値をフォーマット
    ///
    /// `format`はセルの表示書式（`General`の場合は`None`）、`is_1904`はブックの日付システムです。
    ///
    /// # 書式がない場合の変換規則
    ///
    /// - 文字列: そのまま
    /// - 数値: `General`の表示（例: `3.0` → `3`、`1e20` → `1E+20`）
    /// - 論理値: `TRUE` / `FALSE`
    /// - 日付: `YYYY-MM-DD`、時刻を含む場合は`YYYY-MM-DD HH:MM:SS`
    /// - 期間: `H:MM:SS`
    /// - エラー値: Excelの表記（例: `#DIV/0!`）
    /// - 空セル: 空文字列
    pub fn format_cell(&self, cell: &Data, format: Option<&NumberFormat>, is_1904: bool) -> String {
        match (cell, format) {
            (Data::Int(i), None) => i.to_string(),
            (Data::Int(i), Some(format)) => format.format_number(*i as f64, is_1904),
            (Data::Float(f), None) => format_general(*f),
            (Data::Float(f), Some(format)) => format.format_number(*f, is_1904),
            (Data::String(s), None) => s.clone(),
            (Data::String(s), Some(format)) => format.format_text(s),
            (Data::DateTime(dt), Some(format)) => format.format_datetime(dt),
            (Data::DateTime(dt), None) => format_datetime_default(dt),
            (Data::Bool(b), _) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            (Data::DateTimeIso(s), _) | (Data::DurationIso(s), _) => s.clone(),
            (Data::Error(e), _) => e.to_string(),
            (Data::Empty, _) => String::new(),
        }
    }
}

/// 書式が取得できなかった日時セルの既定の表示
fn format_datetime_default(dt: &ExcelDateTime) -> String {
    if dt.is_duration() {
        return match dt.as_duration() {
            Some(duration) => format_duration(duration),
            None => format_general(dt.as_f64()),
        };
    }

    match dt.as_datetime() {
        Some(value) if dt.as_f64() >= 0.0 => {
            let value = value + chrono::Duration::milliseconds(500);
            if value.num_seconds_from_midnight() == 0 {
                value.format("%Y-%m-%d").to_string()
            } else {
                value.format("%Y-%m-%d %H:%M:%S").to_string()
            }
        }
        _ => format_general(dt.as_f64()),
    }
}

fn format_duration(duration: chrono::Duration) -> String {
    let total = (duration.num_milliseconds() as f64 / 1000.0).round() as i64;
    let sign = if total < 0 { "-" } else { "" };
    let total = total.abs();
    format!(
        "{}{}:{:02}:{:02}",
        sign,
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{CellErrorType, ExcelDateTimeType};

    fn plain(cell: &Data) -> String {
        CellFormatter::new().format_cell(cell, None, false)
    }

    fn date(value: f64, is_1904: bool) -> Data {
        Data::DateTime(ExcelDateTime::new(value, ExcelDateTimeType::DateTime, is_1904))
    }

    #[test]
    fn test_format_strings_verbatim() {
        assert_eq!(plain(&Data::String("OK".into())), "OK");
        assert_eq!(plain(&Data::String(" a;b ".into())), " a;b ");
        assert_eq!(plain(&Data::Empty), "");
    }

    #[test]
    fn test_format_numbers_general() {
        assert_eq!(plain(&Data::Int(42)), "42");
        assert_eq!(plain(&Data::Float(3.0)), "3");
        assert_eq!(plain(&Data::Float(-7.0)), "-7");
        assert_eq!(plain(&Data::Float(0.1)), "0.1");
        assert_eq!(plain(&Data::Float(1234.5)), "1234.5");
        assert_eq!(plain(&Data::Float(1e20)), "1E+20");
    }

    #[test]
    fn test_format_numbers_with_format() {
        let formatter = CellFormatter::new();
        let percent = NumberFormat::parse("0%");
        let padded = NumberFormat::parse("00000");
        assert_eq!(formatter.format_cell(&Data::Float(0.5), Some(&percent), false), "50%");
        assert_eq!(formatter.format_cell(&Data::Int(123), Some(&padded), false), "00123");
    }

    #[test]
    fn test_format_number_with_date_format_uses_epoch() {
        let formatter = CellFormatter::new();
        let format = NumberFormat::parse("yyyy-mm-dd");
        assert_eq!(
            formatter.format_cell(&Data::Float(45292.0), Some(&format), false),
            "2024-01-01"
        );
        assert_eq!(
            formatter.format_cell(&Data::Float(0.0), Some(&format), true),
            "1904-01-01"
        );
    }

    #[test]
    fn test_format_text_section() {
        let formatter = CellFormatter::new();
        let format = NumberFormat::parse("\"ID-\"@");
        assert_eq!(
            formatter.format_cell(&Data::String("7".into()), Some(&format), false),
            "ID-7"
        );
    }

    #[test]
    fn test_format_bool() {
        assert_eq!(plain(&Data::Bool(true)), "TRUE");
        assert_eq!(plain(&Data::Bool(false)), "FALSE");
    }

    #[test]
    fn test_format_error() {
        assert_eq!(plain(&Data::Error(CellErrorType::Div0)), "#DIV/0!");
        assert_eq!(plain(&Data::Error(CellErrorType::NA)), "#N/A");
    }

    #[test]
    fn test_default_dates() {
        // 2024-01-01 はシリアル値 45292
        assert_eq!(plain(&date(45292.0, false)), "2024-01-01");
        assert_eq!(plain(&date(1.0, false)), "1900-01-01");
        assert_eq!(plain(&date(61.0, false)), "1900-03-01");
        assert_eq!(plain(&date(45292.5, false)), "2024-01-01 12:00:00");
    }

    #[test]
    fn test_default_dates_1904_epoch() {
        assert_eq!(plain(&date(0.0, true)), "1904-01-01");
        // 1904年システムの43830は2024-01-01
        assert_eq!(plain(&date(43830.0, true)), "2024-01-01");
    }

    #[test]
    fn test_formatted_date_keeps_1904_epoch() {
        let formatter = CellFormatter::new();
        let format = NumberFormat::parse("dd/mm/yyyy");
        assert_eq!(
            formatter.format_cell(&date(0.0, true), Some(&format), true),
            "01/01/1904"
        );
    }

    #[test]
    fn test_negative_date_falls_back() {
        assert_eq!(plain(&date(-1.0, false)), "-1");
    }

    #[test]
    fn test_default_durations() {
        let duration = |v| Data::DateTime(ExcelDateTime::new(v, ExcelDateTimeType::TimeDelta, false));
        assert_eq!(plain(&duration(1.5)), "36:00:00");
        assert_eq!(plain(&duration(0.25)), "6:00:00");
        assert_eq!(plain(&duration(-0.5)), "-12:00:00");
    }

    #[test]
    fn test_format_iso_strings() {
        assert_eq!(
            plain(&Data::DateTimeIso("2024-01-02T03:04:05".into())),
            "2024-01-02T03:04:05"
        );
        assert_eq!(plain(&Data::DurationIso("PT1H".into())), "PT1H");
    }
}
