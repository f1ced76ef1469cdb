//! Security Module
//!
//! 入力ファイルに対するセキュリティ制限を実装するモジュール。
//! 入力サイズの上限に加え、ZIP bomb攻撃とパストラバーサル攻撃への対策を提供します。

use std::io::{Read, Seek};
use std::path::Path;

use serde::Deserialize;
use zip::ZipArchive;

use crate::error::FilterError;

/// セキュリティ設定
///
/// ファイル処理時のセキュリティ制限を定義します。
/// 設定ファイルの`security`セクションから読み込まれ、未知のキーは拒否されます。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SecurityConfig {
    /// 入力ファイルの最大サイズ（バイト）
    /// デフォルト: 2GB (2_147_483_648 bytes)
    pub max_input_file_size: u64,
    /// ZIPアーカイブ内の最大ファイル数
    /// デフォルト: 10000
    pub max_file_count: usize,
    /// 単一エントリの展開後の最大サイズ（バイト）
    /// デフォルト: 100MB (104_857_600 bytes)
    pub max_file_size: u64,
    /// 展開後の合計最大サイズ（バイト）
    /// デフォルト: 1GB (1_073_741_824 bytes)
    pub max_decompressed_size: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_input_file_size: 2_147_483_648, // 2GB
            max_file_count: 10_000,
            max_file_size: 104_857_600,           // 100MB
            max_decompressed_size: 1_073_741_824, // 1GB
        }
    }
}

/// 入力ファイルのサイズを検証
///
/// ファイルを読み込む前にメタデータからサイズを取得し、上限を超えていれば拒否します。
///
/// # 戻り値
///
/// * `Ok(u64)` - ファイルサイズ（バイト）
/// * `Err(FilterError::SecurityViolation)` - 上限を超えている場合
pub(crate) fn check_input_size(path: &Path, config: &SecurityConfig) -> Result<u64, FilterError> {
    let size = std::fs::metadata(path)?.len();
    if size > config.max_input_file_size {
        return Err(FilterError::SecurityViolation(format!(
            "Input file size exceeds maximum: {} bytes (max: {} bytes)",
            size, config.max_input_file_size
        )));
    }
    Ok(size)
}

/// ZIPアーカイブの全エントリを検証
///
/// エントリ数、各エントリのパスと展開後サイズ、展開後サイズの合計を確認します。
pub(crate) fn check_archive<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    config: &SecurityConfig,
) -> Result<(), FilterError> {
    if archive.len() > config.max_file_count {
        return Err(FilterError::SecurityViolation(format!(
            "ZIP archive contains too many files: {} (max: {})",
            archive.len(),
            config.max_file_count
        )));
    }

    let mut total = 0u64;
    for i in 0..archive.len() {
        let entry = archive
            .by_index(i)
            .map_err(|e| FilterError::Zip(e.to_string()))?;

        let name = entry.name();
        validate_zip_path(name)
            .map_err(|e| FilterError::SecurityViolation(format!("Invalid ZIP path: {}", e)))?;

        let size = entry.size();
        if size > config.max_file_size {
            return Err(FilterError::SecurityViolation(format!(
                "File '{}' exceeds maximum size: {} bytes (max: {} bytes)",
                name, size, config.max_file_size
            )));
        }

        total = total.checked_add(size).ok_or_else(|| {
            FilterError::SecurityViolation(
                "Total decompressed size calculation overflow".to_string(),
            )
        })?;
        if total > config.max_decompressed_size {
            return Err(FilterError::SecurityViolation(format!(
                "Total decompressed size exceeds maximum: {} bytes (max: {} bytes)",
                total, config.max_decompressed_size
            )));
        }
    }
    Ok(())
}

/// ZIPエントリ名の検証
///
/// # 戻り値
///
/// * `Ok(())` - パスが安全な場合
/// * `Err(String)` - 空、絶対パス、`..`、`\`を含む場合
pub(crate) fn validate_zip_path(path: &str) -> Result<(), String> {
    if path.is_empty() {
        return Err("Empty path is not allowed".to_string());
    }
    let drive_letter = path
        .as_bytes()
        .get(..3)
        .is_some_and(|p| p[0].is_ascii_alphabetic() && p[1] == b':' && p[2] == b'\\');
    if path.starts_with('/') || drive_letter {
        return Err(format!("Absolute path is not allowed: {}", path));
    }
    if path.split('/').any(|segment| segment == "..") {
        return Err(format!("Path traversal detected: {}", path));
    }
    if path.contains('\\') {
        return Err(format!("Backslash in path is not allowed: {}", path));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    fn archive_with(entries: &[(&str, &[u8])]) -> ZipArchive<Cursor<Vec<u8>>> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in entries {
            writer
                .start_file(*name, zip::write::SimpleFileOptions::default())
                .unwrap();
            writer.write_all(data).unwrap();
        }
        let cursor = writer.finish().unwrap();
        ZipArchive::new(Cursor::new(cursor.into_inner())).unwrap()
    }

    #[test]
    fn test_default_limits() {
        let config = SecurityConfig::default();
        assert_eq!(config.max_input_file_size, 2_147_483_648);
        assert_eq!(config.max_file_count, 10_000);
        assert_eq!(config.max_file_size, 104_857_600);
        assert_eq!(config.max_decompressed_size, 1_073_741_824);
    }

    #[test]
    fn test_deserialize_partial_section() {
        let config: SecurityConfig =
            serde_json::from_str(r#"{ "max_file_count": 5 }"#).unwrap();
        assert_eq!(config.max_file_count, 5);
        assert_eq!(config.max_input_file_size, 2_147_483_648);
    }

    #[test]
    fn test_deserialize_rejects_unknown_key() {
        let result = serde_json::from_str::<SecurityConfig>(r#"{ "max_input_size": 5 }"#);
        let message = result.unwrap_err().to_string();
        assert!(message.contains("unknown field"), "{}", message);
    }

    #[test]
    fn test_check_input_size_within_limit() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"0123456789").unwrap();

        let size = check_input_size(file.path(), &SecurityConfig::default()).unwrap();
        assert_eq!(size, 10);
    }

    #[test]
    fn test_check_input_size_over_limit() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"0123456789").unwrap();
        let config = SecurityConfig {
            max_input_file_size: 4,
            ..Default::default()
        };

        match check_input_size(file.path(), &config) {
            Err(FilterError::SecurityViolation(msg)) => {
                assert!(msg.contains("exceeds maximum"));
            }
            other => panic!("Expected SecurityViolation, got {:?}", other),
        }
    }

    #[test]
    fn test_check_archive_accepts_small_archive() {
        let mut archive = archive_with(&[("xl/workbook.xml", b"<workbook/>")]);
        assert!(check_archive(&mut archive, &SecurityConfig::default()).is_ok());
    }

    #[test]
    fn test_check_archive_too_many_entries() {
        let mut archive = archive_with(&[("a.xml", b"a"), ("b.xml", b"b")]);
        let config = SecurityConfig {
            max_file_count: 1,
            ..Default::default()
        };
        match check_archive(&mut archive, &config) {
            Err(FilterError::SecurityViolation(msg)) => assert!(msg.contains("too many files")),
            other => panic!("Expected SecurityViolation, got {:?}", other),
        }
    }

    #[test]
    fn test_check_archive_entry_too_large() {
        let mut archive = archive_with(&[("xl/styles.xml", &[b'x'; 64])]);
        let config = SecurityConfig {
            max_file_size: 16,
            ..Default::default()
        };
        match check_archive(&mut archive, &config) {
            Err(FilterError::SecurityViolation(msg)) => assert!(msg.contains("xl/styles.xml")),
            other => panic!("Expected SecurityViolation, got {:?}", other),
        }
    }

    #[test]
    fn test_check_archive_total_too_large() {
        let mut archive = archive_with(&[("a.xml", &[b'a'; 10]), ("b.xml", &[b'b'; 10])]);
        let config = SecurityConfig {
            max_decompressed_size: 15,
            ..Default::default()
        };
        match check_archive(&mut archive, &config) {
            Err(FilterError::SecurityViolation(msg)) => {
                assert!(msg.contains("Total decompressed size"))
            }
            other => panic!("Expected SecurityViolation, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_zip_path_valid() {
        assert!(validate_zip_path("xl/workbook.xml").is_ok());
        assert!(validate_zip_path("xl/worksheets/sheet1.xml").is_ok());
        assert!(validate_zip_path("xl/file..name.xml").is_ok());
    }

    #[test]
    fn test_validate_zip_path_rejected() {
        assert!(validate_zip_path("").is_err());
        assert!(validate_zip_path("/etc/passwd").is_err());
        assert!(validate_zip_path("C:\\Windows\\system32").is_err());
        assert!(validate_zip_path("../etc/passwd").is_err());
        assert!(validate_zip_path("xl/../../etc/passwd").is_err());
        assert!(validate_zip_path("xl\\workbook.xml").is_err());
    }
}
