//! FormatParser Module
//!
//! Excel Number Format Stringの構文解析と、数値・日時・文字列への適用を提供します。

use calamine::{ExcelDateTime, ExcelDateTimeType};
use chrono::{Datelike, NaiveDateTime, Timelike};

use super::sections::{FormatSection, NumericLayout, SectionKind};
use super::tokens::{Digit, FormatToken};

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// 解析済みの表示書式
///
/// 解析は失敗しません。解釈できない文字はリテラルとして扱います。
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NumberFormat {
    sections: Vec<FormatSection>,
}

impl NumberFormat {
    /// フォーマット文字列をパース
    pub fn parse(format_string: &str) -> Self {
        if format_string.trim().is_empty() {
            return Self::general();
        }

        let sections = split_sections(format_string)
            .iter()
            .enumerate()
            .filter_map(|(idx, s)| SectionKind::from_index(idx).map(|kind| parse_section(s, kind)))
            .collect();

        Self { sections }
    }

    /// `General`書式
    pub fn general() -> Self {
        let mut section = FormatSection::new(SectionKind::Positive);
        section.tokens.push(FormatToken::General);
        Self {
            sections: vec![section],
        }
    }

    /// `General`のみの書式か
    pub fn is_general(&self) -> bool {
        self.sections.len() == 1 && self.sections[0].tokens == [FormatToken::General]
    }

    /// 数値をフォーマット
    ///
    /// 日付書式の場合、`value`はシリアル値として`is_1904`のエポックで解釈します。
    pub fn format_number(&self, value: f64, is_1904: bool) -> String {
        if !value.is_finite() {
            return value.to_string();
        }
        let Some((section, signed)) = self.select_section(value) else {
            return format_general(value);
        };

        if section.is_datetime() {
            let datetime = ExcelDateTime::new(value, ExcelDateTimeType::DateTime, is_1904);
            return match datetime.as_datetime() {
                Some(dt) if value >= 0.0 => render_datetime(section, dt, value),
                _ => format_general(value),
            };
        }
        render_non_date(section, value, signed)
    }

    /// calamineが日時と判定したセル値をフォーマット
    ///
    /// エポック（1900年/1904年）は`ExcelDateTime`が保持しているものを使います。
    pub fn format_datetime(&self, datetime: &ExcelDateTime) -> String {
        let value = datetime.as_f64();
        if !value.is_finite() {
            return value.to_string();
        }
        let Some((section, signed)) = self.select_section(value) else {
            return format_general(value);
        };

        if section.is_datetime() {
            return match datetime.as_datetime() {
                Some(dt) if value >= 0.0 => render_datetime(section, dt, value),
                _ => format_general(value),
            };
        }
        render_non_date(section, value, signed)
    }

    /// 文字列をフォーマット
    ///
    /// 第4セクション、または`@`を含む単一セクションがある場合のみ適用します。
    pub fn format_text(&self, text: &str) -> String {
        let section = match self.sections.as_slice() {
            [single] if single.has_text() => single,
            [_, _, _, text_section, ..] => text_section,
            _ => return text.to_string(),
        };

        let mut out = String::new();
        for token in &section.tokens {
            match token {
                FormatToken::Text => out.push_str(text),
                FormatToken::Literal(s) => out.push_str(s),
                _ => {}
            }
        }
        out
    }

    /// 値に応じてセクションを選択
    ///
    /// 戻り値の`bool`は、負数に`-`を付けるかどうかです。
    /// 負数用のセクションが明示されている場合は絶対値を表示します。
    fn select_section(&self, value: f64) -> Option<(&FormatSection, bool)> {
        match self.sections.as_slice() {
            [first, negative, zero, ..] => Some(if value > 0.0 {
                (first, true)
            } else if value < 0.0 {
                (negative, false)
            } else {
                (zero, true)
            }),
            [first, negative] => Some(if value < 0.0 {
                (negative, false)
            } else {
                (first, true)
            }),
            [first] => Some((first, true)),
            [] => None,
        }
    }
}

/// `General`書式で数値を表示
///
/// 整数はそのまま、小数は有効数字10桁に丸めて末尾の0を除きます。
/// 絶対値が`1e11`以上または`1e-9`未満の場合は指数表記にします。
pub(crate) fn format_general(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    let abs = value.abs();
    if !(1e-9..1e11).contains(&abs) {
        let mut exponent = abs.log10().floor() as i32;
        let mut mantissa = abs / 10f64.powi(exponent);
        let mut digits = format!("{:.5}", mantissa);
        if digits.starts_with("10") {
            exponent += 1;
            mantissa /= 10.0;
            digits = format!("{:.5}", mantissa);
        }
        let sign = if value < 0.0 { "-" } else { "" };
        let exp_sign = if exponent < 0 { '-' } else { '+' };
        return format!(
            "{}{}E{}{:02}",
            sign,
            trim_fraction(digits),
            exp_sign,
            exponent.abs()
        );
    }

    if value.fract() == 0.0 {
        return format!("{}", value as i64);
    }

    let int_digits = (abs.log10().floor() as i32 + 1).max(1);
    let decimals = (10 - int_digits).max(0) as usize;
    trim_fraction(format!("{:.*}", decimals, value))
}

/// 小数部末尾の0と小数点を除く
fn trim_fraction(text: String) -> String {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text
    }
}

/// セクションに分割
///
/// ';'で区切ります。引用符・'['']'の内側と'\'でエスケープされた文字は区切りとみなしません。
/// 空のセクションも保持します（例: `0;;` は3セクション）。
fn split_sections(format_string: &str) -> Vec<String> {
    let mut sections = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut in_brackets = false;
    let mut escaped = false;

    for ch in format_string.chars() {
        if escaped {
            current.push(ch);
            escaped = false;
            continue;
        }
        match ch {
            '\\' if !in_quotes => {
                escaped = true;
                current.push(ch);
            }
            '"' => {
                in_quotes = !in_quotes;
                current.push(ch);
            }
            '[' if !in_quotes => {
                in_brackets = true;
                current.push(ch);
            }
            ']' if !in_quotes => {
                in_brackets = false;
                current.push(ch);
            }
            ';' if !in_quotes && !in_brackets => {
                sections.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    sections.push(current);
    sections
}

/// セクションをパース
fn parse_section(section_str: &str, kind: SectionKind) -> FormatSection {
    let mut section = FormatSection::new(kind);
    let chars: Vec<char> = section_str.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        match ch {
            '"' => {
                let end = chars[i + 1..]
                    .iter()
                    .position(|&c| c == '"')
                    .map_or(chars.len(), |p| i + 1 + p);
                let literal: String = chars[i + 1..end].iter().collect();
                if !literal.is_empty() {
                    section.tokens.push(FormatToken::Literal(literal));
                }
                i = end + 1;
                continue;
            }
            '\\' => {
                if let Some(next) = chars.get(i + 1) {
                    section.tokens.push(FormatToken::Literal(next.to_string()));
                }
                i += 2;
                continue;
            }
            '_' => {
                // 次の文字の幅の空白
                section.tokens.push(FormatToken::Literal(" ".to_string()));
                i += 2;
                continue;
            }
            '*' => {
                // 繰り返し文字（セル幅を埋める）は出力しない
                i += 2;
                continue;
            }
            '[' => {
                let end = chars[i + 1..]
                    .iter()
                    .position(|&c| c == ']')
                    .map_or(chars.len(), |p| i + 1 + p);
                let content: String = chars[i + 1..end].iter().collect();
                if let Some(token) = parse_bracket(&content) {
                    section.tokens.push(token);
                }
                i = end + 1;
                continue;
            }
            '0' => section.tokens.push(FormatToken::Digit(Digit::Zero)),
            '#' => section.tokens.push(FormatToken::Digit(Digit::Hash)),
            '?' => section.tokens.push(FormatToken::Digit(Digit::Space)),
            '.' => section.tokens.push(FormatToken::DecimalPoint),
            ',' => section.tokens.push(FormatToken::Thousands),
            '%' => section.tokens.push(FormatToken::Percent),
            '@' => section.tokens.push(FormatToken::Text),
            'E' | 'e' if matches!(chars.get(i + 1), Some('+') | Some('-')) => {
                section.tokens.push(FormatToken::Exponent {
                    plus_sign: chars[i + 1] == '+',
                });
                i += 2;
                continue;
            }
            'y' | 'Y' | 'm' | 'M' | 'd' | 'D' | 'h' | 'H' | 's' | 'S' => {
                let count = chars[i..]
                    .iter()
                    .take_while(|c| c.eq_ignore_ascii_case(&ch))
                    .count();
                let token = match ch.to_ascii_lowercase() {
                    'y' => FormatToken::Year(count),
                    'm' => FormatToken::Month(count),
                    'd' => FormatToken::Day(count),
                    'h' => FormatToken::Hour(count),
                    _ => FormatToken::Second(count),
                };
                section.tokens.push(token);
                i += count;
                continue;
            }
            'A' | 'a' if starts_with_ignore_case(&chars[i..], "AM/PM") => {
                section.tokens.push(FormatToken::AmPm { short: false });
                i += 5;
                continue;
            }
            'A' | 'a' if starts_with_ignore_case(&chars[i..], "A/P") => {
                section.tokens.push(FormatToken::AmPm { short: true });
                i += 3;
                continue;
            }
            'G' | 'g' if starts_with_ignore_case(&chars[i..], "General") => {
                section.tokens.push(FormatToken::General);
                i += 7;
                continue;
            }
            _ => section.tokens.push(FormatToken::Literal(ch.to_string())),
        }
        i += 1;
    }

    resolve_minutes(&mut section.tokens);
    resolve_sub_seconds(&mut section.tokens);
    section
}

fn starts_with_ignore_case(chars: &[char], pattern: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    chars.len() >= pattern.len()
        && chars
            .iter()
            .zip(&pattern)
            .all(|(a, b)| a.eq_ignore_ascii_case(b))
}

/// `[...]`の内容を解釈
///
/// 通貨記号（`[$€-407]`）はリテラル、`[h]`・`[mm]`・`[ss]`は経過時間になります。
/// 色・条件・ロケール指定は無視します。
fn parse_bracket(content: &str) -> Option<FormatToken> {
    if let Some(currency) = content.strip_prefix('$') {
        let symbol = currency.split('-').next().unwrap_or_default();
        return (!symbol.is_empty()).then(|| FormatToken::Literal(symbol.to_string()));
    }

    let lower = content.to_ascii_lowercase();
    let first = lower.chars().next()?;
    if matches!(first, 'h' | 'm' | 's') && lower.chars().all(|c| c == first) {
        let count = lower.len();
        return Some(match first {
            'h' => FormatToken::ElapsedHours(count),
            'm' => FormatToken::ElapsedMinutes(count),
            _ => FormatToken::ElapsedSeconds(count),
        });
    }
    None
}

/// 時の直後、または秒の直前にある`m`/`mm`を分とみなす
fn resolve_minutes(tokens: &mut [FormatToken]) {
    for i in 0..tokens.len() {
        let FormatToken::Month(count) = tokens[i] else {
            continue;
        };
        if count > 2 {
            continue;
        }

        let after_hour = tokens[..i]
            .iter()
            .rev()
            .find(|t| !matches!(t, FormatToken::Literal(_)))
            .is_some_and(|t| matches!(t, FormatToken::Hour(_) | FormatToken::ElapsedHours(_)));
        let before_second = tokens[i + 1..]
            .iter()
            .find(|t| !matches!(t, FormatToken::Literal(_)))
            .is_some_and(|t| {
                matches!(t, FormatToken::Second(_) | FormatToken::ElapsedSeconds(_))
            });

        if after_hour || before_second {
            tokens[i] = FormatToken::Minute(count);
        }
    }
}

/// 秒の直後の`.0`を秒の小数部とみなす
fn resolve_sub_seconds(tokens: &mut Vec<FormatToken>) {
    let mut i = 1;
    while i < tokens.len() {
        let after_second = matches!(
            tokens[i - 1],
            FormatToken::Second(_) | FormatToken::ElapsedSeconds(_)
        );
        if after_second && tokens[i] == FormatToken::DecimalPoint {
            let count = tokens[i + 1..]
                .iter()
                .take_while(|t| **t == FormatToken::Digit(Digit::Zero))
                .count();
            if count > 0 {
                tokens.splice(
                    i..i + 1 + count,
                    [
                        FormatToken::Literal(".".to_string()),
                        FormatToken::SubSecond(count),
                    ],
                );
                i += 2;
                continue;
            }
        }
        i += 1;
    }
}

/// 日付以外のセクションを適用
fn render_non_date(section: &FormatSection, value: f64, signed: bool) -> String {
    if section.is_numeric() {
        return render_numeric(section, value, signed);
    }

    let shown = if signed { value } else { value.abs() };
    let mut out = String::new();
    for token in &section.tokens {
        match token {
            FormatToken::General | FormatToken::Text => out.push_str(&format_general(shown)),
            FormatToken::Literal(s) => out.push_str(s),
            _ => {}
        }
    }
    out
}

/// 小数点以下`places`桁に四捨五入（0.5は0から遠い方へ）
fn round_half_away(value: f64, places: usize) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

/// 数値セクションを適用
fn render_numeric(section: &FormatSection, value: f64, signed: bool) -> String {
    let layout = section.numeric_layout();
    let places = layout.fraction.len();

    let mut scaled = value.abs() * 100f64.powi(layout.percent as i32)
        / 1000f64.powi(layout.scale_thousands as i32);
    let mut exponent = 0i32;
    if layout.exponent.is_some() && scaled != 0.0 {
        exponent = scaled.log10().floor() as i32;
        scaled /= 10f64.powi(exponent);
    }

    let mut rounded = format!("{:.*}", places, round_half_away(scaled, places));
    if layout.exponent.is_some() && rounded.starts_with("10") {
        exponent += 1;
        scaled /= 10.0;
        rounded = format!("{:.*}", places, round_half_away(scaled, places));
    }

    let (int_str, frac_str) = rounded.split_once('.').unwrap_or((rounded.as_str(), ""));
    let int_digits = if int_str == "0" { "" } else { int_str };
    let int_fills = fill_integer(&layout, int_digits);
    let frac_fills = fill_fraction(&layout, frac_str);

    let mut out = String::new();
    let mut int_index = 0;
    let mut frac_index = 0;
    let mut in_fraction = false;
    let mut in_exponent = false;
    let mut exponent_written = false;

    for token in &section.tokens {
        match token {
            FormatToken::Digit(_) if in_exponent => {
                if !exponent_written {
                    out.push_str(&format!(
                        "{:0width$}",
                        exponent.abs(),
                        width = layout.exponent_digits
                    ));
                    exponent_written = true;
                }
            }
            FormatToken::Digit(_) if in_fraction => {
                if let Some(fill) = frac_fills.get(frac_index) {
                    out.push_str(fill);
                }
                frac_index += 1;
            }
            FormatToken::Digit(_) => {
                if let Some(fill) = int_fills.get(int_index) {
                    out.push_str(fill);
                }
                int_index += 1;
            }
            FormatToken::DecimalPoint if !in_fraction && !in_exponent => {
                if layout.integer.is_empty() {
                    out.push_str(int_digits);
                }
                out.push('.');
                in_fraction = true;
            }
            FormatToken::DecimalPoint => out.push('.'),
            FormatToken::Exponent { plus_sign } => {
                out.push('E');
                if exponent < 0 {
                    out.push('-');
                } else if *plus_sign {
                    out.push('+');
                }
                in_fraction = false;
                in_exponent = true;
            }
            FormatToken::Percent => out.push('%'),
            FormatToken::Literal(s) => out.push_str(s),
            FormatToken::General => out.push_str(&format_general(value.abs())),
            _ => {}
        }
    }

    let nonzero = rounded.chars().any(|c| c.is_ascii_digit() && c != '0');
    if signed && value < 0.0 && nonzero {
        out.insert(0, '-');
    }
    out
}

/// 整数部の各プレースホルダに入る文字列を求める
///
/// 桁は右から順に割り当て、あふれた上位桁は先頭のプレースホルダに入れます。
/// 千の位区切りがある場合は、まとめて先頭のプレースホルダに入れます。
fn fill_integer(layout: &NumericLayout, digits: &str) -> Vec<String> {
    let count = layout.integer.len();
    let mut fills = vec![String::new(); count];
    if count == 0 {
        return fills;
    }

    let chars: Vec<char> = digits.chars().collect();
    for (i, placeholder) in layout.integer.iter().enumerate() {
        let from_right = count - 1 - i;
        if from_right < chars.len() {
            fills[i].push(chars[chars.len() - 1 - from_right]);
        } else {
            match placeholder {
                Digit::Zero => fills[i].push('0'),
                Digit::Space => fills[i].push(' '),
                Digit::Hash => {}
            }
        }
    }
    if chars.len() > count {
        let overflow: String = chars[..chars.len() - count].iter().collect();
        fills[0].insert_str(0, &overflow);
    }

    if layout.grouping {
        let joined = fills.concat();
        fills = vec![String::new(); count];
        fills[0] = group_thousands(&joined);
    }
    fills
}

/// 小数部の各プレースホルダに入る文字列を求める
///
/// `#`・`?`に当たる末尾の0は表示しません（`?`は空白）。
fn fill_fraction(layout: &NumericLayout, digits: &str) -> Vec<String> {
    let chars: Vec<char> = digits.chars().collect();
    let mut keep = chars.len().min(layout.fraction.len());
    while keep > 0 && layout.fraction[keep - 1] != Digit::Zero && chars[keep - 1] == '0' {
        keep -= 1;
    }

    layout
        .fraction
        .iter()
        .enumerate()
        .map(|(k, placeholder)| {
            if k < keep {
                chars[k].to_string()
            } else if *placeholder == Digit::Space {
                " ".to_string()
            } else {
                String::new()
            }
        })
        .collect()
}

/// 数字列に3桁ごとの','を入れる（先頭の空白はそのまま）
fn group_thousands(text: &str) -> String {
    let start = text.find(|c: char| c.is_ascii_digit()).unwrap_or(text.len());
    let (prefix, digits) = text.split_at(start);

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{}{}", prefix, grouped)
}

/// 日付・時刻セクションを適用
///
/// `serial`は経過時間（`[h]`など）の計算に使います。
fn render_datetime(section: &FormatSection, dt: NaiveDateTime, serial: f64) -> String {
    let has_sub_second = section
        .tokens
        .iter()
        .any(|t| matches!(t, FormatToken::SubSecond(_)));
    let dt = if has_sub_second {
        dt
    } else {
        (dt + chrono::Duration::milliseconds(500))
            .with_nanosecond(0)
            .unwrap_or(dt)
    };
    let twelve_hour = section.has_am_pm();
    let elapsed = (serial * 86_400.0).round() as i64;

    let mut out = String::new();
    for token in &section.tokens {
        match token {
            FormatToken::Year(n) if *n <= 2 => {
                out.push_str(&format!("{:02}", dt.year().rem_euclid(100)))
            }
            FormatToken::Year(_) => out.push_str(&format!("{:04}", dt.year())),
            FormatToken::Month(n) => {
                let name = MONTH_NAMES[dt.month0() as usize];
                match n {
                    1 => out.push_str(&dt.month().to_string()),
                    2 => out.push_str(&format!("{:02}", dt.month())),
                    3 => out.push_str(&name[..3]),
                    4 => out.push_str(name),
                    _ => out.push_str(&name[..1]),
                }
            }
            FormatToken::Day(n) => {
                let name = WEEKDAY_NAMES[dt.weekday().num_days_from_monday() as usize];
                match n {
                    1 => out.push_str(&dt.day().to_string()),
                    2 => out.push_str(&format!("{:02}", dt.day())),
                    3 => out.push_str(&name[..3]),
                    _ => out.push_str(name),
                }
            }
            FormatToken::Hour(n) => {
                let hour = if twelve_hour {
                    match dt.hour() % 12 {
                        0 => 12,
                        h => h,
                    }
                } else {
                    dt.hour()
                };
                push_padded(&mut out, hour, *n);
            }
            FormatToken::Minute(n) => push_padded(&mut out, dt.minute(), *n),
            FormatToken::Second(n) => push_padded(&mut out, dt.second(), *n),
            FormatToken::SubSecond(n) => {
                let width = (*n).min(9);
                let scale = 10u64.pow(width as u32);
                let digits = ((u64::from(dt.nanosecond()) * scale + 500_000_000) / 1_000_000_000)
                    .min(scale - 1);
                out.push_str(&format!("{:0width$}", digits, width = width));
            }
            FormatToken::ElapsedHours(n) => {
                out.push_str(&format!("{:0width$}", elapsed / 3600, width = *n))
            }
            FormatToken::ElapsedMinutes(n) => {
                out.push_str(&format!("{:0width$}", elapsed / 60, width = *n))
            }
            FormatToken::ElapsedSeconds(n) => {
                out.push_str(&format!("{:0width$}", elapsed, width = *n))
            }
            FormatToken::AmPm { short } => {
                let pm = dt.hour() >= 12;
                out.push_str(match (short, pm) {
                    (false, false) => "AM",
                    (false, true) => "PM",
                    (true, false) => "A",
                    (true, true) => "P",
                });
            }
            FormatToken::Literal(s) => out.push_str(s),
            FormatToken::Thousands => out.push(','),
            FormatToken::DecimalPoint => out.push('.'),
            FormatToken::Percent => out.push('%'),
            _ => {}
        }
    }
    out
}

fn push_padded(out: &mut String, value: u32, width: usize) {
    if width >= 2 {
        out.push_str(&format!("{:02}", value));
    } else {
        out.push_str(&value.to_string());
    }
}
