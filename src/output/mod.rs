//! Output Module
//!
//! フィルタ後のテーブルを区切り文字テキストとして書き出すモジュール。
//! 最終パスへの書き込みは、同じディレクトリの一時ファイルに書き切ってから置き換えるため、
//! 途中で失敗しても最終パスに不完全なファイルは残りません。

mod writer;

use std::path::Path;

use crate::error::FilterError;
use crate::types::FilteredTable;

pub use writer::DelimitedWriter;

/// テーブルを`path`にアトミックに書き出す
///
/// # 戻り値
///
/// * `Ok(u64)` - 書き込んだバイト数
/// * `Err(FilterError::Io)` - 一時ファイルの作成・書き込み・置き換えに失敗した場合
pub fn write_atomic(path: &Path, table: &FilteredTable, delimiter: u8) -> Result<u64, FilterError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut staged = tempfile::Builder::new()
        .prefix(".xlsxfilter-")
        .suffix(".part")
        .tempfile_in(dir)?;

    let written = DelimitedWriter::new(delimiter).write(table, staged.as_file_mut())?;
    staged.as_file().sync_all()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        staged
            .as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o644))?;
    }

    staged.persist(path).map_err(|e| FilterError::Io(e.error))?;
    tracing::debug!(path = %path.display(), bytes = written, "output persisted");
    Ok(written)
}
