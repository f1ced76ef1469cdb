//! Number Format Module
//!
//! Excelの表示書式（Number Format String）を解析し、セル値をExcel上の表示と同じ文字列にします。

mod parser;
mod sections;
mod tokens;

pub(crate) use parser::{format_general, NumberFormat};
