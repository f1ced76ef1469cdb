//! Command Line Module
//!
//! コマンドライン引数を解析して`InputSpec`を得るモジュール。

use std::ffi::OsString;
use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::Parser;

use crate::error::FilterError;
use crate::types::InputSpec;

/// 使用方法の1行表示
pub const USAGE: &str = "Usage: xlsxfilter <INPUT.xlsx> [--scp <DESTINATION>]";

/// Convert the first sheet of an Excel file into a filtered semicolon CSV.
///
/// Only rows whose CSV_State column equals OK are kept. The result is written
/// next to the input with a .csv extension, optionally copied with scp, and the
/// destination storage is re-indexed.
#[derive(Debug, Parser)]
#[command(name = "xlsxfilter", version)]
struct Cli {
    /// Excel file to convert (must end in .xlsx)
    input: PathBuf,

    /// Copy the filtered CSV to this scp destination (e.g. user@host:/path/)
    #[arg(long = "scp", value_name = "DESTINATION")]
    scp: Option<String>,
}

/// 引数解析の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// パイプラインを実行する
    Run(InputSpec),

    /// ヘルプやバージョンを表示して正常終了する
    Info(String),
}

/// プロセス引数（先頭はプログラム名）を解析する
///
/// # 戻り値
///
/// * `Ok(Invocation::Run)` - 入力パスと任意の転送先
/// * `Ok(Invocation::Info)` - `--help`/`--version`が指定された場合の表示内容
/// * `Err(FilterError::Usage)` - 入力パスがない、未知のフラグ、余分な引数など
pub fn parse_args<I, T>(args: I) -> Result<Invocation, FilterError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match Cli::try_parse_from(args) {
        Ok(cli) => Ok(Invocation::Run(InputSpec::new(cli.input, cli.scp))),
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            Ok(Invocation::Info(e.to_string()))
        }
        Err(e) => Err(FilterError::Usage(usage_message(&e))),
    }
}

/// clapのエラー表示から最初の行だけを取り出す
fn usage_message(error: &clap::Error) -> String {
    let rendered = error.to_string();
    let first = rendered.lines().next().unwrap_or_default();
    first.strip_prefix("error: ").unwrap_or(first).to_string()
}
