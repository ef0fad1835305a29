use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{DashError, Result};

/// An untyped spreadsheet cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDateTime),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Text rendering used for headers and labels.
    pub fn as_label(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => {
                let s = s.trim();
                if s.is_empty() {
                    None
                } else {
                    Some(s.to_string())
                }
            }
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => Some(format!("{}", *n as i64)),
            Cell::Number(n) => Some(n.to_string()),
            Cell::Bool(b) => Some(b.to_string()),
            Cell::Date(dt) => Some(dt.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
}

/// A header row plus the data rows beneath it.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn width(&self) -> usize {
        self.headers.len()
    }

    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&Cell::Empty)
    }
}

impl Sheet {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    /// Read the sheet with the header row at `offset`, counted over non-blank
    /// rows only; rows above it are discarded. Width is the widest row from the
    /// header down, ignoring trailing empty cells. Blank header cells become
    /// `unnamed: N`.
    pub fn table(&self, offset: usize) -> Result<Table> {
        let filled: Vec<&Vec<Cell>> = self
            .rows
            .iter()
            .filter(|r| r.iter().any(|c| !c.is_empty()))
            .collect();
        let Some(header_row) = filled.get(offset) else {
            return Err(DashError::Other(format!(
                "sheet '{}' has no row {offset} to use as header",
                self.name
            )));
        };
        let width = filled[offset..]
            .iter()
            .map(|r| r.iter().rposition(|c| !c.is_empty()).map_or(0, |p| p + 1))
            .max()
            .unwrap_or(0);
        let headers = (0..width)
            .map(|i| {
                header_row
                    .get(i)
                    .and_then(Cell::as_label)
                    .unwrap_or_else(|| format!("unnamed: {i}"))
            })
            .collect();
        let rows = filled[offset + 1..].iter().map(|r| (*r).clone()).collect();
        Ok(Table { headers, rows })
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawWorkbook {
    pub sheets: Vec<Sheet>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Xlsx,
    Csv,
}

impl FileKind {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "xlsx" => Ok(Self::Xlsx),
            "csv" => Ok(Self::Csv),
            _ => Err(DashError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Parse the bytes of an uploaded report. `name` supplies the extension and,
/// for CSV, the single sheet's name (the file stem).
pub fn read_workbook(name: &Path, bytes: &[u8]) -> Result<RawWorkbook> {
    match FileKind::from_path(name)? {
        FileKind::Xlsx => read_xlsx(bytes),
        FileKind::Csv => {
            let stem = name
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("csv")
                .to_string();
            read_csv(&stem, bytes)
        }
    }
}

fn read_csv(sheet_name: &str, bytes: &[u8]) -> Result<RawWorkbook> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);
    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        rows.push(record.iter().map(csv_cell).collect());
    }
    Ok(RawWorkbook {
        sheets: vec![Sheet::new(sheet_name, rows)],
    })
}

/// Spellings of a missing value in exported CSV files.
const MISSING_MARKERS: &[&str] = &[
    "NaN", "nan", "-nan", "NA", "N/A", "n/a", "#N/A", "<NA>", "null", "NULL", "None",
];

fn csv_cell(field: &str) -> Cell {
    let trimmed = field.trim();
    if trimmed.is_empty() || MISSING_MARKERS.contains(&trimmed) {
        return Cell::Empty;
    }
    match trimmed.parse::<f64>() {
        Ok(n) if n.is_finite() => Cell::Number(n),
        Ok(_) => Cell::Empty,
        Err(_) => Cell::Text(trimmed.to_string()),
    }
}

#[cfg(feature = "xlsx")]
fn read_xlsx(bytes: &[u8]) -> Result<RawWorkbook> {
    use calamine::{Reader, Xlsx};

    let cursor = std::io::Cursor::new(bytes.to_vec());
    let mut workbook: Xlsx<_> =
        Xlsx::new(cursor).map_err(|e| DashError::Workbook(e.to_string()))?;

    let mut sheets = Vec::new();
    for name in workbook.sheet_names() {
        let range = match workbook.worksheet_range(&name) {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!(sheet = %name, error = %e, "skipping unreadable sheet");
                continue;
            }
        };
        // Ranges start at the first used cell; pad so column indices match the
        // sheet. Blank rows above are skipped by `Sheet::table` anyway.
        let (_, start_col) = range.start().unwrap_or((0, 0));
        let mut rows: Vec<Vec<Cell>> = Vec::new();
        for row in range.rows() {
            let mut cells = vec![Cell::Empty; start_col as usize];
            cells.extend(row.iter().map(xlsx_cell));
            rows.push(cells);
        }
        sheets.push(Sheet::new(name, rows));
    }
    Ok(RawWorkbook { sheets })
}

#[cfg(feature = "xlsx")]
fn xlsx_cell(data: &calamine::Data) -> Cell {
    use calamine::Data;
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => excel_serial_to_datetime(dt.as_f64())
            .map(Cell::Date)
            .unwrap_or(Cell::Empty),
        Data::DateTimeIso(s) => Cell::Text(s.clone()),
        Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(_) => Cell::Empty,
    }
}

#[cfg(not(feature = "xlsx"))]
fn read_xlsx(_bytes: &[u8]) -> Result<RawWorkbook> {
    Err(DashError::UnsupportedFormat(
        ".xlsx (built without the `xlsx` feature)".to_string(),
    ))
}

/// Excel serial day number to a timestamp. The epoch is 1899-12-30 to
/// absorb the 1900 leap-year bug.
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || !(1.0..=2_958_465.0).contains(&serial) {
        return None;
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let days = serial.trunc() as i64;
    let secs = ((serial.fract()) * 86_400.0).round() as i64;
    Some(base + chrono::Duration::days(days) + chrono::Duration::seconds(secs))
}

/// A small report workbook assembled in memory: a promo sheet with a title,
/// a blank row and the table starting in column B, a calls sheet and an
/// unrelated sheet. Date cells carry the built-in `m/d/yyyy` number format.
#[cfg(all(test, feature = "xlsx"))]
pub(crate) fn sales_report_xlsx() -> Vec<u8> {
    use std::io::{Cursor, Write};

    const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
    const REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
    const DOC_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

    fn inline(r: &str, s: &str) -> String {
        format!(r#"<c r="{r}" t="inlineStr"><is><t>{s}</t></is></c>"#)
    }
    fn date(r: &str, serial: u32) -> String {
        format!(r#"<c r="{r}" s="1"><v>{serial}</v></c>"#)
    }
    fn num(r: &str, v: f64) -> String {
        format!(r#"<c r="{r}"><v>{v}</v></c>"#)
    }
    fn row(n: u32, cells: &[String]) -> String {
        format!(r#"<row r="{n}">{}</row>"#, cells.concat())
    }
    fn xml(body: String) -> String {
        format!(r#"<?xml version="1.0" encoding="UTF-8"?>{body}"#)
    }
    fn worksheet(rows: &[String]) -> String {
        xml(format!(
            r#"<worksheet xmlns="{MAIN_NS}"><sheetData>{}</sheetData></worksheet>"#,
            rows.concat()
        ))
    }
    fn relationship(id: usize, kind: &str, target: &str) -> String {
        format!(r#"<Relationship Id="rId{id}" Type="{DOC_REL}/{kind}" Target="{target}"/>"#)
    }

    let sheets = [
        (
            "Промо",
            worksheet(&[
                row(1, &[inline("B1", "Списания за январь")]),
                row(3, &[inline("B3", "Дата"), inline("C3", "Кто"), inline("D3", "Сумма")]),
                row(4, &[date("B4", 45667), inline("C4", "Анна"), num("D4", 1500.0)]),
            ]),
        ),
        (
            "Звонки",
            worksheet(&[
                row(
                    1,
                    &[
                        inline("A1", "Дата"),
                        inline("B1", "Входящие"),
                        inline("C1", "Заказы"),
                        inline("D1", "Конверсия"),
                        inline("E1", "Кг"),
                    ],
                ),
                row(
                    2,
                    &[
                        date("A2", 45667),
                        num("B2", 100.0),
                        num("C2", 5.0),
                        inline("D2", "x"),
                        num("E2", 50.0),
                    ],
                ),
            ]),
        ),
        ("Склад", worksheet(&[row(1, &[inline("A1", "sku")])])),
    ];

    let sheet_entries: String = sheets
        .iter()
        .enumerate()
        .map(|(i, (name, _))| {
            let id = i + 1;
            format!(r#"<sheet name="{name}" sheetId="{id}" r:id="rId{id}"/>"#)
        })
        .collect();
    let mut rels: String = (1..=sheets.len())
        .map(|id| relationship(id, "worksheet", &format!("worksheets/sheet{id}.xml")))
        .collect();
    rels.push_str(&relationship(sheets.len() + 1, "styles", "styles.xml"));
    let content_types = concat!(
        r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
        r#"<Default Extension="xml" ContentType="application/xml"/>"#,
        r#"<Default Extension="rels" "#,
        r#"ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
        r#"<Override PartName="/xl/workbook.xml" ContentType="application/"#,
        r#"vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/></Types>"#,
    );

    let mut parts = vec![
        ("[Content_Types].xml".to_string(), xml(content_types.to_string())),
        (
            "_rels/.rels".to_string(),
            xml(format!(
                r#"<Relationships xmlns="{REL_NS}">{}</Relationships>"#,
                relationship(1, "officeDocument", "xl/workbook.xml")
            )),
        ),
        (
            "xl/workbook.xml".to_string(),
            xml(format!(
                r#"<workbook xmlns="{MAIN_NS}" xmlns:r="{DOC_REL}">{}</workbook>"#,
                format!("<sheets>{sheet_entries}</sheets>")
            )),
        ),
        (
            "xl/_rels/workbook.xml.rels".to_string(),
            xml(format!(r#"<Relationships xmlns="{REL_NS}">{rels}</Relationships>"#)),
        ),
        (
            "xl/styles.xml".to_string(),
            xml(format!(
                r#"<styleSheet xmlns="{MAIN_NS}"><cellXfs count="2">{}</cellXfs></styleSheet>"#,
                r#"<xf numFmtId="0"/><xf numFmtId="14" applyNumberFormat="1"/>"#
            )),
        ),
    ];
    for (i, (_, body)) in sheets.iter().enumerate() {
        parts.push((format!("xl/worksheets/sheet{}.xml", i + 1), body.clone()));
    }

    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
        let options = zip::write::SimpleFileOptions::default();
        for (path, body) in &parts {
            zip.start_file(path.as_str(), options).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }
    buf
}
