//! Remote Module
//!
//! 出力ファイルのリモートコピーと、保存先ストレージの再インデックスを扱うモジュール。
//! どちらもベストエフォートで、失敗は警告として記録されるだけです。

mod index;
mod transfer;

pub use index::{classify_output, classify_path, index_command, trigger_index};
pub use transfer::{transfer, transfer_command};

use crate::api::StepOutcome;
use crate::command::{CommandOutput, CommandRunner};
use crate::error::FilterError;
use crate::log::{Level, RunLog};

/// コマンドを1回だけ実行し、結果をログに記録する
///
/// `wrap`で失敗を非致命的エラー（`Transfer`または`Index`）に変換します。
pub(crate) fn run_best_effort(
    runner: &dyn CommandRunner,
    program: &str,
    args: &[String],
    log: &mut RunLog,
    wrap: fn(String) -> FilterError,
) -> StepOutcome {
    let failure = match runner.run(program, args) {
        Ok(CommandOutput {
            success: true,
            output,
            ..
        }) => {
            log.log_output(Level::Info, program, &output);
            return StepOutcome::Done;
        }
        Ok(result) => {
            log.log_output(Level::Warn, program, &result.output);
            wrap(format!("'{}' returned {}", program, result.status_text()))
        }
        Err(e) => wrap(format!("failed to start '{}': {}", program, e)),
    };

    debug_assert!(!failure.is_fatal());
    log.warn(failure.to_string());
    StepOutcome::Failed(failure.to_string())
}
