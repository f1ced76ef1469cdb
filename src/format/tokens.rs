//! FormatToken Module
//!
//! 表示書式（Number Format String）のトークン定義を提供します。

/// 数字プレースホルダの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Digit {
    /// `0`: 桁がなければ`0`で埋める
    Zero,
    /// `#`: 桁がなければ何も出さない
    Hash,
    /// `?`: 桁がなければ空白で埋める
    Space,
}

/// 書式トークン
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FormatToken {
    /// `General`
    General,

    /// 数字プレースホルダ1桁
    Digit(Digit),

    /// 小数点
    DecimalPoint,

    /// 千の位区切り（`,`）
    Thousands,

    /// パーセント記号（値を100倍する）
    Percent,

    /// 指数表記（`E+`は正の指数にも符号を付ける）
    Exponent { plus_sign: bool },

    /// 年（`yy` -> 2, `yyyy` -> 4）
    Year(usize),

    /// 月（`m`, `mm`, `mmm`, `mmmm`, `mmmmm`）
    Month(usize),

    /// 日（`d`, `dd`）と曜日（`ddd`, `dddd`）
    Day(usize),

    /// 時
    Hour(usize),

    /// 分
    Minute(usize),

    /// 秒
    Second(usize),

    /// 秒の小数部（`ss.00`の`00`）
    SubSecond(usize),

    /// 経過時間（`[h]`, `[mm]`, `[ss]`）
    ElapsedHours(usize),
    ElapsedMinutes(usize),
    ElapsedSeconds(usize),

    /// `AM/PM`（`short`は`A/P`）
    AmPm { short: bool },

    /// リテラル文字列
    Literal(String),

    /// テキストプレースホルダ（`@`）
    Text,
}

impl FormatToken {
    /// 日付・時刻のトークンか
    pub fn is_datetime(&self) -> bool {
        matches!(
            self,
            FormatToken::Year(_)
                | FormatToken::Month(_)
                | FormatToken::Day(_)
                | FormatToken::Hour(_)
                | FormatToken::Minute(_)
                | FormatToken::Second(_)
                | FormatToken::SubSecond(_)
                | FormatToken::ElapsedHours(_)
                | FormatToken::ElapsedMinutes(_)
                | FormatToken::ElapsedSeconds(_)
                | FormatToken::AmPm { .. }
        )
    }

    /// 経過時間のトークンか
    pub fn is_elapsed(&self) -> bool {
        matches!(
            self,
            FormatToken::ElapsedHours(_)
                | FormatToken::ElapsedMinutes(_)
                | FormatToken::ElapsedSeconds(_)
        )
    }

    /// 数値のトークンか
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FormatToken::Digit(_)
                | FormatToken::DecimalPoint
                | FormatToken::Thousands
                | FormatToken::Percent
                | FormatToken::Exponent { .. }
        )
    }
}
