//! Transfer Notifier
//!
//! 出力ファイルをセキュアコピー（`scp`）でリモートへ送る。

use std::path::Path;

use crate::api::StepOutcome;
use crate::command::CommandRunner;
use crate::config::TransferConfig;
use crate::error::FilterError;
use crate::log::RunLog;
use crate::remote::run_best_effort;

/// コピーコマンドの引数を組み立てる
///
/// `[追加引数..., <ファイル>, <転送先>]`の順になります。
pub fn transfer_command(config: &TransferConfig, file: &Path, destination: &str) -> Vec<String> {
    let mut args = config.args.clone();
    args.push(file.to_string_lossy().into_owned());
    args.push(destination.to_string());
    args
}

/// 出力ファイルをリモートへコピーする
///
/// 失敗しても処理は継続し、`StepOutcome::Failed`を返します。
pub fn transfer(
    file: &Path,
    destination: &str,
    config: &TransferConfig,
    runner: &dyn CommandRunner,
    log: &mut RunLog,
) -> StepOutcome {
    log.info(format!("Copying {} to {}", file.display(), destination));
    let args = transfer_command(config, file, destination);
    let outcome = run_best_effort(runner, &config.program, &args, log, FilterError::Transfer);
    if outcome.is_done() {
        log.info(format!("Copied {} to {}", file.display(), destination));
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::Level;
    use crate::remote::testing::RecordingRunner;

    #[test]
    fn test_transfer_command() {
        let config = TransferConfig {
            program: "scp".into(),
            args: vec!["-q".into()],
        };
        let args = transfer_command(&config, Path::new("/srv/out.csv"), "bob@host:/inbox/");
        assert_eq!(args, vec!["-q", "/srv/out.csv", "bob@host:/inbox/"]);
    }

    #[test]
    fn test_transfer_success() {
        let runner = RecordingRunner::default();
        let mut log = RunLog::in_memory();

        let outcome = transfer(
            Path::new("/srv/out.csv"),
            "host:/inbox",
            &TransferConfig::default(),
            &runner,
            &mut log,
        );

        assert_eq!(outcome, StepOutcome::Done);
        let calls = runner.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "scp");
        assert_eq!(calls[0].1, vec!["/srv/out.csv", "host:/inbox"]);
        assert!(log.entries().iter().all(|e| e.level == Level::Info));
    }

    #[test]
    fn test_transfer_failure_is_warning() {
        let runner = RecordingRunner::failing(1);
        let mut log = RunLog::in_memory();

        let outcome = transfer(
            Path::new("/srv/out.csv"),
            "host:/inbox",
            &TransferConfig::default(),
            &runner,
            &mut log,
        );

        match outcome {
            StepOutcome::Failed(msg) => assert!(msg.contains("exit status 1")),
            other => panic!("Expected Failed, got {:?}", other),
        }
        assert!(log
            .entries()
            .iter()
            .any(|e| e.level == Level::Warn && e.message.starts_with("Transfer failed")));
        assert!(log.entries().iter().all(|e| e.level != Level::Error));
    }

    #[test]
    fn test_transfer_spawn_error_is_warning() {
        let runner = RecordingRunner::unspawnable();
        let mut log = RunLog::in_memory();

        let outcome = transfer(
            Path::new("out.csv"),
            "host:",
            &TransferConfig::default(),
            &runner,
            &mut log,
        );

        assert!(matches!(outcome, StepOutcome::Failed(ref m) if m.contains("failed to start")));
    }
}
