//! Filter Module
//!
//! ヘッダー行から判定列を探し、判定値に一致するデータ行だけを残すモジュール。

use crate::error::FilterError;
use crate::types::{FilterStats, FilteredTable, RawTable, Record};

/// ヘッダー行から列名に完全一致する最初の列の位置（1始まり）を返す
///
/// 大文字小文字を区別し、前後の空白も除去しません。
///
/// # 戻り値
///
/// * `Ok(usize)` - 1始まりの列位置
/// * `Err(FilterError::ColumnNotFound)` - 一致する列がない、またはテーブルが空の場合
pub fn locate_column(table: &RawTable, column: &str) -> Result<usize, FilterError> {
    table
        .header()
        .and_then(|header| header.iter().position(|field| field == column))
        .map(|index| index + 1)
        .ok_or_else(|| FilterError::ColumnNotFound(column.to_string()))
}

/// データ行が判定値に一致するか
///
/// 列数が足りない行は値がないものとして扱い、一致しません。
pub fn row_matches(row: &Record, column: usize, keep_value: &str) -> bool {
    column
        .checked_sub(1)
        .and_then(|index| row.get(index))
        .is_some_and(|value| value == keep_value)
}

/// ヘッダーと一致するデータ行だけを残したテーブルを作る
///
/// # 引数
///
/// * `table` - 未フィルタのテーブル（ヘッダーを含むこと）
/// * `column` - `locate_column`で得た1始まりの列位置
/// * `keep_value` - 行を残す値（完全一致）
pub fn filter_rows(
    table: &RawTable,
    column: usize,
    keep_value: &str,
) -> Result<(FilteredTable, FilterStats), FilterError> {
    let header = table
        .header()
        .cloned()
        .ok_or_else(|| FilterError::ColumnNotFound(format!("column #{}", column)))?;

    let rows: Vec<Record> = table
        .data_rows()
        .iter()
        .filter(|row| row_matches(row, column, keep_value))
        .cloned()
        .collect();

    let stats = FilterStats {
        total: table.data_row_count(),
        retained: rows.len(),
    };

    Ok((FilteredTable { header, rows }, stats))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(lines: &[&str]) -> RawTable {
        RawTable::new(
            lines
                .iter()
                .map(|line| line.split(';').map(str::to_string).collect())
                .collect(),
        )
    }

    #[test]
    fn test_locate_column() {
        let raw = table(&["Name;CSV_State;Date"]);
        assert_eq!(locate_column(&raw, "CSV_State").unwrap(), 2);
    }

    #[test]
    fn test_locate_column_first_match_wins() {
        let raw = table(&["CSV_State;x;CSV_State"]);
        assert_eq!(locate_column(&raw, "CSV_State").unwrap(), 1);
    }

    #[test]
    fn test_locate_column_is_exact() {
        for header in ["csv_state", " CSV_State", "CSV_State ", "CSV_States", "Name;Date"] {
            let raw = table(&[header]);
            match locate_column(&raw, "CSV_State") {
                Err(FilterError::ColumnNotFound(name)) => assert_eq!(name, "CSV_State"),
                other => panic!("header {:?}: expected ColumnNotFound, got {:?}", header, other),
            }
        }
    }

    #[test]
    fn test_locate_column_empty_table() {
        assert!(matches!(
            locate_column(&RawTable::default(), "CSV_State"),
            Err(FilterError::ColumnNotFound(_))
        ));
    }

    #[test]
    fn test_filter_rows_example() {
        let raw = table(&[
            "Name;CSV_State;Date",
            "A;OK;2024-01-01",
            "B;KO;2024-01-02",
            "C;OK;2024-01-03",
        ]);
        let column = locate_column(&raw, "CSV_State").unwrap();
        let (filtered, stats) = filter_rows(&raw, column, "OK").unwrap();

        assert_eq!(filtered.header, vec!["Name", "CSV_State", "Date"]);
        assert_eq!(
            filtered.rows,
            vec![vec!["A", "OK", "2024-01-01"], vec!["C", "OK", "2024-01-03"]]
        );
        assert_eq!(stats, FilterStats { total: 3, retained: 2 });
    }

    #[test]
    fn test_filter_rows_rejects_near_misses() {
        let raw = table(&["CSV_State", "ok", " OK", "OK ", "", "Ok", "OK"]);
        let (filtered, stats) = filter_rows(&raw, 1, "OK").unwrap();
        assert_eq!(filtered.rows, vec![vec!["OK"]]);
        assert_eq!(stats.total, 6);
        assert_eq!(stats.retained, 1);
    }

    #[test]
    fn test_ragged_rows_do_not_match() {
        let raw = table(&["Name;Date;CSV_State", "A;2024", "B", "C;2024;OK;extra"]);
        let (filtered, stats) = filter_rows(&raw, 3, "OK").unwrap();
        assert_eq!(filtered.rows, vec![vec!["C", "2024", "OK", "extra"]]);
        assert_eq!(stats, FilterStats { total: 3, retained: 1 });
    }

    #[test]
    fn test_header_only() {
        let raw = table(&["Name;CSV_State"]);
        let (filtered, stats) = filter_rows(&raw, 2, "OK").unwrap();
        assert!(filtered.rows.is_empty());
        assert_eq!(stats, FilterStats::default());
    }

    #[test]
    fn test_row_matches_zero_column() {
        let row = vec!["OK".to_string()];
        assert!(!row_matches(&row, 0, "OK"));
        assert!(row_matches(&row, 1, "OK"));
        assert!(!row_matches(&row, 2, "OK"));
    }
}
