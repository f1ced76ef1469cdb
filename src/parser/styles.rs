//! Sheet Styles Reader
//!
//! XLSX内部のXMLから、calamineでは取得できないセルの表示書式（numFmtId / formatCode）と
//! 1904年エポックの設定を読み取るモジュール。

use std::collections::HashMap;
use std::io::{Read, Seek};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::FilterError;
use crate::format::NumberFormat;

/// 1シート分のスタイル情報
#[derive(Debug, Clone, Default)]
pub(crate) struct SheetStyles {
    /// 1904年エポックを使用するかどうか
    is_1904: bool,
    /// cellXfsのインデックス -> 表示書式（`General`は`None`）
    formats: Vec<Option<NumberFormat>>,
    /// (行, 列)（0始まり） -> cellXfsのインデックス
    ///
    /// `General`以外の書式を持つセルだけを保持します。
    cells: HashMap<(u32, u32), u32>,
}

impl SheetStyles {
    /// アーカイブから`sheet_index`番目（0始まり）のシートのスタイル情報を読み取る
    ///
    /// アーカイブのエントリ検証（`check_archive`）は呼び出し元で済ませておきます。
    /// `styles.xml`やシートXMLが存在しない場合は、書式なしとして扱います。
    pub fn from_archive<R: Read + Seek>(
        archive: &mut ZipArchive<R>,
        sheet_index: usize,
    ) -> Result<Self, FilterError> {
        let (is_1904, sheet_ids) = match read_entry(archive, "xl/workbook.xml")? {
            Some(xml) => parse_workbook(&xml)?,
            None => (false, Vec::new()),
        };

        let formats = match read_entry(archive, "xl/styles.xml")? {
            Some(xml) => parse_styles(&xml)?,
            None => Vec::new(),
        };
        if formats.iter().all(Option::is_none) {
            return Ok(Self {
                is_1904,
                formats,
                cells: HashMap::new(),
            });
        }

        let relationships = match read_entry(archive, "xl/_rels/workbook.xml.rels")? {
            Some(xml) => parse_relationships(&xml)?,
            None => HashMap::new(),
        };
        let sheet_path = sheet_ids
            .get(sheet_index)
            .and_then(|id| relationships.get(id))
            .map(|target| resolve_target(target))
            .unwrap_or_else(|| format!("xl/worksheets/sheet{}.xml", sheet_index + 1));
        tracing::debug!(sheet = %sheet_path, is_1904, "reading cell styles");

        let cells = match read_entry(archive, &sheet_path)? {
            Some(xml) => parse_cell_styles(&xml, &formats)?,
            None => HashMap::new(),
        };

        Ok(Self {
            is_1904,
            formats,
            cells,
        })
    }

    /// 1904年エポックを使用するかどうか
    pub fn is_1904(&self) -> bool {
        self.is_1904
    }

    /// セル（0始まりの行・列）の表示書式
    ///
    /// `General`のセルと、スタイルを持たないセルは`None`です。
    pub fn format_at(&self, row: u32, col: u32) -> Option<&NumberFormat> {
        let xf = self.cells.get(&(row, col))?;
        self.formats.get(*xf as usize)?.as_ref()
    }
}

/// アーカイブのエントリを読み込む（存在しない場合は`None`）
fn read_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<Vec<u8>>, FilterError> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(FilterError::Zip(e.to_string())),
    };
    let mut content = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut content)?;
    Ok(Some(content))
}

fn xml_error(e: impl std::fmt::Display) -> FilterError {
    FilterError::Xml(e.to_string())
}

/// 要素の属性値を取得（名前空間接頭辞は無視）
fn attribute(element: &BytesStart, name: &[u8]) -> Result<Option<String>, FilterError> {
    for attr in element.attributes() {
        let attr = attr.map_err(xml_error)?;
        if attr.key.local_name().as_ref() == name {
            // `unescape_value` is unavailable when quick-xml's `encoding` feature is
            // enabled (calamine enables it), so decode UTF-8 and unescape directly.
            let decoded = std::str::from_utf8(&attr.value).map_err(xml_error)?;
            let value = quick_xml::escape::unescape(decoded).map_err(xml_error)?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn parse_id(value: &str) -> Result<u32, FilterError> {
    value
        .trim()
        .parse()
        .map_err(|_| FilterError::Xml(format!("Invalid numeric attribute: {}", value)))
}

/// xl/workbook.xml の解析
///
/// `<workbookPr date1904="1"/>`と、シート順の`r:id`の一覧を返します。
fn parse_workbook(xml: &[u8]) -> Result<(bool, Vec<String>), FilterError> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut is_1904 = false;
    let mut sheet_ids = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"workbookPr" => {
                    is_1904 = attribute(&e, b"date1904")?
                        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));
                }
                b"sheet" => {
                    if let Some(id) = attribute(&e, b"id")? {
                        sheet_ids.push(id);
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok((is_1904, sheet_ids))
}

/// xl/_rels/workbook.xml.rels の解析（Id -> Target）
fn parse_relationships(xml: &[u8]) -> Result<HashMap<String, String>, FilterError> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut relationships = HashMap::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                if let (Some(id), Some(target)) =
                    (attribute(&e, b"Id")?, attribute(&e, b"Target")?)
                {
                    relationships.insert(id, target);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(relationships)
}

/// リレーションのTargetをアーカイブ内のパスに変換
///
/// `/`で始まる場合はアーカイブのルートから、それ以外は`xl/`からの相対パスです。
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target.trim_start_matches("./")),
    }
}

/// xl/styles.xml の解析
///
/// `<numFmts>`と`<cellXfs>`から、cellXfsのインデックスごとの表示書式を求めます。
fn parse_styles(xml: &[u8]) -> Result<Vec<Option<NumberFormat>>, FilterError> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut custom: HashMap<u32, String> = HashMap::new();
    let mut xf_formats: Vec<u32> = Vec::new();
    let mut in_cell_xfs = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"numFmt" => {
                    // <numFmt numFmtId="164" formatCode="0.000"/>
                    if let (Some(id), Some(code)) =
                        (attribute(&e, b"numFmtId")?, attribute(&e, b"formatCode")?)
                    {
                        custom.insert(parse_id(&id)?, code);
                    }
                }
                b"cellXfs" => in_cell_xfs = true,
                b"xf" if in_cell_xfs => {
                    // <xf numFmtId="164" fontId="0" fillId="0" borderId="0" applyNumberFormat="1"/>
                    let id = match attribute(&e, b"numFmtId")? {
                        Some(id) => parse_id(&id)?,
                        None => 0,
                    };
                    xf_formats.push(id);
                }
                _ => {}
            },
            Ok(Event::End(e)) if e.local_name().as_ref() == b"cellXfs" => {
                in_cell_xfs = false;
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(xf_formats
        .into_iter()
        .map(|id| {
            let code = custom
                .get(&id)
                .map(String::as_str)
                .or_else(|| builtin_format(id))?;
            Some(NumberFormat::parse(code)).filter(|format| !format.is_general())
        })
        .collect())
}

/// シートXMLの解析
///
/// `<c r="B3" s="2">`の`s`属性から、`General`以外の書式を持つセルの位置を集めます。
/// `r`属性が省略されている場合は、直前の行・セルの次の位置とみなします。
fn parse_cell_styles(
    xml: &[u8],
    formats: &[Option<NumberFormat>],
) -> Result<HashMap<(u32, u32), u32>, FilterError> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut cells = HashMap::new();
    let mut next_row = 0u32;
    let mut row = 0u32;
    let mut next_col = 0u32;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"row" => {
                    row = match attribute(&e, b"r")? {
                        Some(r) => parse_id(&r)?.saturating_sub(1),
                        None => next_row,
                    };
                    next_row = row + 1;
                    next_col = 0;
                }
                b"c" => {
                    let (cell_row, col) = match attribute(&e, b"r")?
                        .as_deref()
                        .and_then(parse_cell_ref)
                    {
                        Some(position) => position,
                        None => (row, next_col),
                    };
                    next_col = col + 1;

                    if let Some(style) = attribute(&e, b"s")? {
                        let style = parse_id(&style)?;
                        if formats.get(style as usize).is_some_and(Option::is_some) {
                            cells.insert((cell_row, col), style);
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(cells)
}

/// セル参照（例: `B3`）を0始まりの(行, 列)に変換
fn parse_cell_ref(reference: &str) -> Option<(u32, u32)> {
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    let col = letters.chars().try_fold(0u32, |acc, c| {
        acc.checked_mul(26)?
            .checked_add(c.to_ascii_uppercase() as u32 - 'A' as u32 + 1)
    })?;
    let row: u32 = digits.parse().ok()?;
    Some((row.checked_sub(1)?, col - 1))
}

/// ビルトイン書式ID（0-163）の書式文字列
fn builtin_format(id: u32) -> Option<&'static str> {
    match id {
        0 => Some("General"),
        1 => Some("0"),
        2 => Some("0.00"),
        3 => Some("#,##0"),
        4 => Some("#,##0.00"),
        5 => Some("$#,##0_);($#,##0)"),
        6 => Some("$#,##0_);[Red]($#,##0)"),
        7 => Some("$#,##0.00_);($#,##0.00)"),
        8 => Some("$#,##0.00_);[Red]($#,##0.00)"),
        9 => Some("0%"),
        10 => Some("0.00%"),
        11 => Some("0.00E+00"),
        12 => Some("# ?/?"),
        13 => Some("# ??/??"),
        14 => Some("mm-dd-yy"),
        15 => Some("d-mmm-yy"),
        16 => Some("d-mmm"),
        17 => Some("mmm-yy"),
        18 => Some("h:mm AM/PM"),
        19 => Some("h:mm:ss AM/PM"),
        20 => Some("h:mm"),
        21 => Some("h:mm:ss"),
        22 => Some("m/d/yy h:mm"),
        37 => Some("#,##0_);(#,##0)"),
        38 => Some("#,##0_);[Red](#,##0)"),
        39 => Some("#,##0.00_);(#,##0.00)"),
        40 => Some("#,##0.00_);[Red](#,##0.00)"),
        41 => Some("_(* #,##0_);_(* (#,##0);_(* \"-\"_);_(@_)"),
        42 => Some("_($* #,##0_);_($* (#,##0);_($* \"-\"_);_(@_)"),
        43 => Some("_(* #,##0.00_);_(* (#,##0.00);_(* \"-\"??_);_(@_)"),
        44 => Some("_($* #,##0.00_);_($* (#,##0.00);_($* \"-\"??_);_(@_)"),
        45 => Some("mm:ss"),
        46 => Some("[h]:mm:ss"),
        47 => Some("mm:ss.0"),
        48 => Some("##0.0E+0"),
        49 => Some("@"),
        _ => None,
    }
}
