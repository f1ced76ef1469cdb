//! Index Trigger
//!
//! 出力パスの形から再インデックス対象を判定し、対応するスキャンコマンドを発行する。

use std::path::Path;

use crate::api::{IndexTarget, StepOutcome};
use crate::command::CommandRunner;
use crate::config::IndexConfig;
use crate::error::FilterError;
use crate::log::RunLog;
use crate::remote::run_best_effort;

const GROUP_FOLDERS: &str = "__groupfolders";
const USER_DATA: &str = "data";
const FILES: &str = "files";

/// 出力パスを再インデックス対象に分類する
///
/// 1. `/__groupfolders/<数値ID>/files/<相対パス>` → `GroupFolder`
/// 2. `/data/<ユーザー>/files/<相対パス>` → `User`
/// 3. それ以外 → `Unrecognized`
///
/// 1が2より優先されます。同じ形が複数回現れる場合は最後の出現を使います。
pub fn classify_path(path: &Path) -> IndexTarget {
    let text = path.to_string_lossy();
    let segments: Vec<&str> = text.split('/').collect();

    if let Some((id, rel_path)) = find_last(&segments, GROUP_FOLDERS, is_numeric) {
        if let Ok(id) = id.parse() {
            return IndexTarget::GroupFolder { id, rel_path };
        }
    }

    if let Some((user_id, rel_path)) = find_last(&segments, USER_DATA, |s| !s.is_empty()) {
        return IndexTarget::User {
            user_id: user_id.to_string(),
            rel_path,
        };
    }

    IndexTarget::Unrecognized
}

/// 出力ファイルを再インデックス対象に分類する
///
/// まず出力パスそのもの（相対パスはカレントディレクトリを前置）で判定します。
/// `Unrecognized`の場合に限り、シンボリックリンクを解決した実パスで判定し直します。
pub fn classify_output(path: &Path) -> IndexTarget {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let target = classify_path(&absolute);
    if target != IndexTarget::Unrecognized {
        return target;
    }
    match std::fs::canonicalize(path) {
        Ok(real) => classify_path(&real),
        Err(_) => target,
    }
}

/// `/<anchor>/<key>/files/<rest>`の最後の出現を探す
///
/// 先頭セグメント（ルートより前）はアンカーとして扱いません。
fn find_last<'a>(
    segments: &[&'a str],
    anchor: &str,
    key_ok: impl Fn(&str) -> bool,
) -> Option<(&'a str, String)> {
    (1..segments.len()).rev().find_map(|i| {
        let window = segments.get(i..i + 3)?;
        if window[0] != anchor || !key_ok(window[1]) || window[2] != FILES {
            return None;
        }
        let rest = &segments[i + 3..];
        if rest.is_empty() || rest.iter().all(|s| s.is_empty()) {
            return None;
        }
        Some((window[1], rest.join("/")))
    })
}

fn is_numeric(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// 分類結果に対応するコマンド引数を組み立てる
///
/// `Unrecognized`の場合は`None`を返します。
pub fn index_command(target: &IndexTarget, config: &IndexConfig) -> Option<Vec<String>> {
    let mut args = config.args.clone();
    match target {
        IndexTarget::GroupFolder { id, rel_path } => {
            args.extend([
                "groupfolders:scan".to_string(),
                id.to_string(),
                "--path".to_string(),
                rel_path.clone(),
            ]);
        }
        IndexTarget::User { .. } => {
            let scan_path = target.user_scan_path()?;
            args.extend(["files:scan".to_string(), format!("--path={}", scan_path)]);
        }
        IndexTarget::Unrecognized => return None,
    }
    Some(args)
}

/// 出力パスに応じて再インデックスを発行する
///
/// パスの形が不明な場合は警告を記録してスキップし、コマンドの失敗も警告に留めます。
pub fn trigger_index(
    path: &Path,
    config: &IndexConfig,
    runner: &dyn CommandRunner,
    log: &mut RunLog,
) -> StepOutcome {
    if !config.enabled {
        log.info("Re-index disabled by configuration");
        return StepOutcome::Skipped;
    }

    let target = classify_output(path);
    let Some(args) = index_command(&target, config) else {
        log.warn(format!(
            "No re-index target recognized in {}; skipping scan",
            path.display()
        ));
        return StepOutcome::Skipped;
    };

    match &target {
        IndexTarget::GroupFolder { id, rel_path } => {
            log.info(format!("Scanning group folder {} path {}", id, rel_path))
        }
        _ => log.info(format!(
            "Scanning user path {}",
            target.user_scan_path().unwrap_or_default()
        )),
    }

    run_best_effort(runner, &config.program, &args, log, FilterError::Index)
}
