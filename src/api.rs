//! Public API Types
//!
//! 公開APIで使用する列挙型を定義するモジュール。

use serde::Deserialize;

/// 変換器の種類
///
/// Excelファイルを区切り文字テキストに変換する方法を指定します。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum ConverterKind {
    /// calamineでプロセス内変換（デフォルト）
    #[default]
    Builtin,

    /// 外部の変換ツール（例: `xlsx2csv`）を起動
    ///
    /// ツールは一時ファイルに出力し、一時ファイルは実行終了時に必ず削除されます。
    External,
}

/// 再インデックス対象の分類結果
///
/// 出力パスの形から決まる3つの排他的な結果です。
/// グループフォルダの判定がユーザー領域の判定より優先されます。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexTarget {
    /// `/__groupfolders/<id>/files/<rel_path>`
    GroupFolder {
        /// 数値のグループフォルダID
        id: u64,
        /// `files/`以下の相対パス
        rel_path: String,
    },

    /// `/data/<user_id>/files/<rel_path>`
    User {
        /// ユーザー名
        user_id: String,
        /// `files/`以下の相対パス
        rel_path: String,
    },

    /// どちらの形にも一致しない
    Unrecognized,
}

impl IndexTarget {
    /// ユーザースキャンに渡すパス（`/<user_id>/files/<rel_path>`）
    pub fn user_scan_path(&self) -> Option<String> {
        match self {
            IndexTarget::User { user_id, rel_path } => {
                Some(format!("/{}/files/{}", user_id, rel_path))
            }
            _ => None,
        }
    }
}

/// 任意ステップ（転送・再インデックス）の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// 実行して成功した
    Done,

    /// 実行しなかった（転送先なし、パス形式不明など）
    Skipped,

    /// 実行したが失敗した（警告として記録済み）
    Failed(String),
}

impl StepOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, StepOutcome::Done)
    }
}
