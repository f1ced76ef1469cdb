//! Command Module
//!
//! 外部コマンドの起動を抽象化するモジュール。
//! 変換ツール・リモートコピー・再インデックスはすべて`CommandRunner`経由で起動されるため、
//! テストでは記録用の実装に差し替えられます。

use std::process::Command;
use std::time::Instant;

/// 外部コマンドの実行結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// 終了ステータスが0だったか
    pub success: bool,

    /// 終了コード（シグナルで終了した場合は`None`）
    pub code: Option<i32>,

    /// 標準出力と標準エラー出力を結合したテキスト
    pub output: String,
}

impl CommandOutput {
    /// 成功した結果を生成
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            code: Some(0),
            output: output.into(),
        }
    }

    /// 指定した終了コードで失敗した結果を生成
    pub fn failed(code: i32, output: impl Into<String>) -> Self {
        Self {
            success: false,
            code: Some(code),
            output: output.into(),
        }
    }

    /// ログ用の終了状態の説明
    pub fn status_text(&self) -> String {
        match self.code {
            Some(code) => format!("exit status {}", code),
            None => "terminated by signal".to_string(),
        }
    }
}

/// 外部コマンドを同期的に起動するトレイト
///
/// タイムアウトはありません。コマンドが終了しない場合、呼び出し元もブロックし続けます。
pub trait CommandRunner {
    /// コマンドを実行し、終了まで待つ
    ///
    /// # 戻り値
    ///
    /// * `Ok(CommandOutput)` - コマンドが起動できた場合（終了コードに関わらず）
    /// * `Err(std::io::Error)` - コマンドを起動できなかった場合
    fn run(&self, program: &str, args: &[String]) -> std::io::Result<CommandOutput>;
}

/// `std::process::Command`でコマンドを起動する実装
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String]) -> std::io::Result<CommandOutput> {
        tracing::debug!(program, ?args, "spawning command");
        let started = Instant::now();

        let output = Command::new(program).args(args).output()?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        tracing::debug!(
            program,
            status = ?output.status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "command finished"
        );

        Ok(CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            output: text,
        })
    }
}

/// テンプレート中のプレースホルダを置換する
///
/// `{name}`形式のプレースホルダのみを置換し、それ以外の文字列はそのまま残します。
/// 置換は1回の走査で行うため、値に含まれる`{...}`は展開されません。
pub(crate) fn expand_args(template: &[String], vars: &[(&str, &str)]) -> Vec<String> {
    template.iter().map(|arg| expand_one(arg, vars)).collect()
}

fn expand_one(arg: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(arg.len());
    let mut rest = arg;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let candidate = &rest[open + 1..];
        let value = candidate.find('}').and_then(|close| {
            let name = &candidate[..close];
            vars.iter()
                .find(|(var, _)| *var == name)
                .map(|(_, value)| (*value, close))
        });
        match value {
            Some((value, close)) => {
                out.push_str(value);
                rest = &candidate[close + 1..];
            }
            None => {
                out.push('{');
                rest = candidate;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_text() {
        assert_eq!(CommandOutput::ok("").status_text(), "exit status 0");
        assert_eq!(CommandOutput::failed(3, "").status_text(), "exit status 3");
        let signalled = CommandOutput {
            success: false,
            code: None,
            output: String::new(),
        };
        assert_eq!(signalled.status_text(), "terminated by signal");
    }

    #[test]
    fn test_expand_args() {
        let template: Vec<String> = ["-s", "{sheet}", "-d", "{delimiter}", "{input}", "{output}"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let args = expand_args(
            &template,
            &[
                ("sheet", "1"),
                ("delimiter", ";"),
                ("input", "/in/a.xlsx"),
                ("output", "/tmp/raw.txt"),
            ],
        );
        assert_eq!(args, vec!["-s", "1", "-d", ";", "/in/a.xlsx", "/tmp/raw.txt"]);
    }

    #[test]
    fn test_expand_args_leaves_unknown_placeholders() {
        let template = vec!["--{unknown}".to_string(), "plain".to_string()];
        let args = expand_args(&template, &[("input", "x")]);
        assert_eq!(args, template);
    }

    #[test]
    fn test_expand_args_does_not_expand_substituted_values() {
        let template = vec!["{input}".to_string(), "{output}".to_string()];
        let args = expand_args(
            &template,
            &[("input", "/in/{output}.xlsx"), ("output", "/tmp/raw.txt")],
        );
        assert_eq!(args, vec!["/in/{output}.xlsx", "/tmp/raw.txt"]);
    }

    #[test]
    fn test_expand_args_mixed_text_and_braces() {
        let template = vec!["--file={input}:{{sheet}}".to_string(), "{".to_string()];
        let args = expand_args(&template, &[("input", "a.xlsx"), ("sheet", "2")]);
        assert_eq!(args, vec!["--file=a.xlsx:{2}", "{"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_captures_output() {
        let runner = SystemRunner;
        let result = runner
            .run("sh", &["-c".to_string(), "echo out; echo err 1>&2; exit 3".to_string()])
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.code, Some(3));
        assert!(result.output.contains("out"));
        assert!(result.output.contains("err"));
    }

    #[test]
    fn test_system_runner_missing_program() {
        let runner = SystemRunner;
        assert!(runner.run("xlsxfilter-no-such-program", &[]).is_err());
    }
}
