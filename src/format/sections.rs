//! FormatSection Module
//!
//! 表示書式のセクション（正数・負数・ゼロ・テキスト）と、数値セクションの桁構成を定義します。

use super::tokens::{Digit, FormatToken};

/// セクションの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SectionKind {
    Positive,
    Negative,
    Zero,
    Text,
}

impl SectionKind {
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(SectionKind::Positive),
            1 => Some(SectionKind::Negative),
            2 => Some(SectionKind::Zero),
            3 => Some(SectionKind::Text),
            _ => None,
        }
    }
}

/// 書式の1セクション
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FormatSection {
    pub kind: SectionKind,
    pub tokens: Vec<FormatToken>,
}

impl FormatSection {
    pub fn new(kind: SectionKind) -> Self {
        Self {
            kind,
            tokens: Vec::new(),
        }
    }

    /// 日付・時刻書式か
    pub fn is_datetime(&self) -> bool {
        self.tokens.iter().any(FormatToken::is_datetime)
    }

    /// 数値書式か（日付書式を除く）
    pub fn is_numeric(&self) -> bool {
        !self.is_datetime() && self.tokens.iter().any(FormatToken::is_numeric)
    }

    /// `General`を含むか
    pub fn has_general(&self) -> bool {
        self.tokens.contains(&FormatToken::General)
    }

    /// テキストプレースホルダ（`@`）を含むか
    pub fn has_text(&self) -> bool {
        self.tokens.contains(&FormatToken::Text)
    }

    /// 12時間表記か
    pub fn has_am_pm(&self) -> bool {
        self.tokens
            .iter()
            .any(|t| matches!(t, FormatToken::AmPm { .. }))
    }

    /// 数値セクションの桁構成を求める
    pub fn numeric_layout(&self) -> NumericLayout {
        let mut layout = NumericLayout::default();
        let mut region = Region::Integer;

        for (index, token) in self.tokens.iter().enumerate() {
            match token {
                FormatToken::Digit(digit) => match region {
                    Region::Integer => layout.integer.push(*digit),
                    Region::Fraction => layout.fraction.push(*digit),
                    Region::Exponent => layout.exponent_digits += 1,
                },
                FormatToken::DecimalPoint if region == Region::Integer => {
                    region = Region::Fraction;
                }
                FormatToken::Exponent { plus_sign } => {
                    layout.exponent = Some(*plus_sign);
                    region = Region::Exponent;
                }
                FormatToken::Thousands if region == Region::Integer => {
                    if self.digit_follows_in_integer(index) {
                        layout.grouping = true;
                    } else {
                        layout.scale_thousands += 1;
                    }
                }
                FormatToken::Percent => layout.percent += 1,
                _ => {}
            }
        }
        layout
    }

    /// `index`より後ろ、小数点より前に整数の桁プレースホルダがあるか
    fn digit_follows_in_integer(&self, index: usize) -> bool {
        self.tokens[index + 1..]
            .iter()
            .take_while(|t| {
                !matches!(
                    t,
                    FormatToken::DecimalPoint | FormatToken::Exponent { .. }
                )
            })
            .any(|t| matches!(t, FormatToken::Digit(_)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Region {
    Integer,
    Fraction,
    Exponent,
}

/// 数値セクションの桁構成
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct NumericLayout {
    /// 整数部のプレースホルダ（左から順）
    pub integer: Vec<Digit>,
    /// 小数部のプレースホルダ（左から順）
    pub fraction: Vec<Digit>,
    /// 指数表記（`Some(true)`は`E+`）
    pub exponent: Option<bool>,
    /// 指数部の最小桁数
    pub exponent_digits: usize,
    /// `%`の個数
    pub percent: usize,
    /// 千の位区切りを入れるか
    pub grouping: bool,
    /// 末尾の`,`による1000分の1倍の回数
    pub scale_thousands: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(tokens: Vec<FormatToken>) -> FormatSection {
        FormatSection {
            kind: SectionKind::Positive,
            tokens,
        }
    }

    #[test]
    fn test_kind_from_index() {
        assert_eq!(SectionKind::from_index(0), Some(SectionKind::Positive));
        assert_eq!(SectionKind::from_index(3), Some(SectionKind::Text));
        assert_eq!(SectionKind::from_index(4), None);
    }

    #[test]
    fn test_datetime_wins_over_numeric() {
        let s = section(vec![
            FormatToken::Second(2),
            FormatToken::Literal(".".to_string()),
            FormatToken::SubSecond(1),
        ]);
        assert!(s.is_datetime());
        assert!(!s.is_numeric());
    }

    #[test]
    fn test_layout_grouping_and_fraction() {
        // #,##0.00
        let s = section(vec![
            FormatToken::Digit(Digit::Hash),
            FormatToken::Thousands,
            FormatToken::Digit(Digit::Hash),
            FormatToken::Digit(Digit::Hash),
            FormatToken::Digit(Digit::Zero),
            FormatToken::DecimalPoint,
            FormatToken::Digit(Digit::Zero),
            FormatToken::Digit(Digit::Zero),
        ]);
        let layout = s.numeric_layout();
        assert!(layout.grouping);
        assert_eq!(layout.scale_thousands, 0);
        assert_eq!(layout.integer.len(), 4);
        assert_eq!(layout.fraction, vec![Digit::Zero, Digit::Zero]);
    }

    #[test]
    fn test_layout_trailing_comma_scales() {
        // 0,
        let s = section(vec![FormatToken::Digit(Digit::Zero), FormatToken::Thousands]);
        let layout = s.numeric_layout();
        assert!(!layout.grouping);
        assert_eq!(layout.scale_thousands, 1);
    }

    #[test]
    fn test_layout_exponent() {
        // 0.0E+00
        let s = section(vec![
            FormatToken::Digit(Digit::Zero),
            FormatToken::DecimalPoint,
            FormatToken::Digit(Digit::Zero),
            FormatToken::Exponent { plus_sign: true },
            FormatToken::Digit(Digit::Zero),
            FormatToken::Digit(Digit::Zero),
        ]);
        let layout = s.numeric_layout();
        assert_eq!(layout.exponent, Some(true));
        assert_eq!(layout.exponent_digits, 2);
        assert_eq!(layout.fraction.len(), 1);
    }
}
