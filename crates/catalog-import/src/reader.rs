//! Spreadsheet reader: turns an uploaded CSV or XLS/XLSX file into a lazy
//! stream of [`RawRow`]s keyed by canonical header.

use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, Reader};

use crate::coerce::CellValue;
use crate::error::ReadError;
use crate::headers::canonical_header;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Accepted upload families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Delimited,
    Spreadsheet,
}

impl FileFormat {
    /// Picks the format from the file extension.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::UnsupportedFormat`] for anything other than
    /// `.csv`, `.xlsx`, `.xlsm`, or `.xls`.
    pub fn from_file_name(file_name: &str) -> Result<Self, ReadError> {
        let ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match ext.as_deref() {
            Some("csv") => Ok(Self::Delimited),
            Some("xlsx" | "xlsm" | "xls") => Ok(Self::Spreadsheet),
            _ => Err(ReadError::UnsupportedFormat {
                file_name: file_name.to_owned(),
            }),
        }
    }
}

/// A header cell as written in the file plus its canonical key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub raw: String,
    pub key: String,
}

/// One data row. `row_number` is the 1-based physical line (CSV) or sheet
/// row (XLSX) the data came from, so the header row is row 1.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub row_number: usize,
    fields: Vec<(String, CellValue)>,
}

impl RawRow {
    #[must_use]
    pub fn new(row_number: usize, fields: Vec<(String, CellValue)>) -> Self {
        Self { row_number, fields }
    }

    /// Looks up a cell by canonical header key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&CellValue> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Like [`RawRow::get`], with missing columns read as empty.
    #[must_use]
    pub fn cell(&self, key: &str) -> &CellValue {
        self.get(key).unwrap_or(&CellValue::Empty)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn is_blank(&self) -> bool {
        self.fields.iter().all(|(_, v)| v.is_empty())
    }
}

enum RowSource {
    Csv(csv::StringRecordsIntoIter<Cursor<Vec<u8>>>),
    Sheet {
        rows: std::vec::IntoIter<Vec<Data>>,
        next_row_number: usize,
    },
}

/// Lazy, finite, single-pass sequence of rows from one uploaded file.
pub struct RowStream {
    headers: Vec<Header>,
    columns: Vec<Option<usize>>,
    source: RowSource,
    pending: Option<RawRow>,
}

impl std::fmt::Debug for RowStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowStream")
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Opens an uploaded file, reads its header row, and checks that at least
/// one data row follows.
///
/// # Errors
///
/// - [`ReadError::UnsupportedFormat`] when the extension is not accepted.
/// - [`ReadError::EmptyOrMalformed`] when there is no header plus data row.
/// - [`ReadError::Csv`] / [`ReadError::Spreadsheet`] when decoding fails.
pub fn open(file_name: &str, bytes: Vec<u8>) -> Result<RowStream, ReadError> {
    match FileFormat::from_file_name(file_name)? {
        FileFormat::Delimited => open_csv(bytes),
        FileFormat::Spreadsheet => open_spreadsheet(bytes),
    }
}

fn open_csv(mut bytes: Vec<u8>) -> Result<RowStream, ReadError> {
    if bytes.starts_with(UTF8_BOM) {
        bytes.drain(..UTF8_BOM.len());
    }
    let delimiter = detect_delimiter(&bytes);

    let mut records = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .delimiter(delimiter)
        .from_reader(Cursor::new(bytes))
        .into_records();

    let header_record = loop {
        match records.next() {
            Some(record) => {
                let record = record?;
                if record.iter().any(|f| !strip_quotes(f).is_empty()) {
                    break record;
                }
            }
            None => return Err(ReadError::EmptyOrMalformed),
        }
    };

    let raw_headers: Vec<String> = header_record
        .iter()
        .map(|f| strip_quotes(f).to_owned())
        .collect();

    RowStream::start(&raw_headers, RowSource::Csv(records))
}

fn open_spreadsheet(bytes: Vec<u8>) -> Result<RowStream, ReadError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(ReadError::EmptyOrMalformed)??;

    let first_row_number = range.start().map_or(1, |(row, _)| row as usize + 1);
    let mut rows = range.rows().map(<[Data]>::to_vec).collect::<Vec<_>>().into_iter();

    let Some(header_cells) = rows.next() else {
        return Err(ReadError::EmptyOrMalformed);
    };
    let raw_headers: Vec<String> = header_cells
        .iter()
        .map(|c| cell_from_data(c).as_text().into_owned())
        .collect();

    RowStream::start(
        &raw_headers,
        RowSource::Sheet {
            rows,
            next_row_number: first_row_number + 1,
        },
    )
}

impl RowStream {
    fn start(raw_headers: &[String], source: RowSource) -> Result<Self, ReadError> {
        let mut headers = Vec::new();
        let mut columns = Vec::with_capacity(raw_headers.len());
        for raw in raw_headers {
            let key = canonical_header(raw);
            if key.is_empty() {
                columns.push(None);
            } else {
                columns.push(Some(headers.len()));
                headers.push(Header {
                    raw: raw.trim().to_owned(),
                    key,
                });
            }
        }

        let mut stream = Self {
            headers,
            columns,
            source,
            pending: None,
        };

        match stream.next_row()? {
            Some(first) => stream.pending = Some(first),
            None => return Err(ReadError::EmptyOrMalformed),
        }
        Ok(stream)
    }

    /// Headers in file order, blank header cells omitted.
    #[must_use]
    pub fn headers(&self) -> &[Header] {
        &self.headers
    }

    fn build_row(&self, row_number: usize, cells: Vec<CellValue>) -> RawRow {
        let mut fields = Vec::with_capacity(self.headers.len());
        for (idx, cell) in cells.into_iter().enumerate() {
            if let Some(Some(header_idx)) = self.columns.get(idx) {
                fields.push((self.headers[*header_idx].key.clone(), cell));
            }
        }
        RawRow::new(row_number, fields)
    }

    /// Pulls the next non-blank row from the underlying source.
    fn next_row(&mut self) -> Result<Option<RawRow>, ReadError> {
        loop {
            let (row_number, cells) = match &mut self.source {
                RowSource::Csv(records) => match records.next() {
                    None => return Ok(None),
                    Some(record) => {
                        let record = record?;
                        let line = record
                            .position()
                            .map_or(0, |p| usize::try_from(p.line()).unwrap_or(usize::MAX));
                        let cells = record
                            .iter()
                            .map(|f| CellValue::text(strip_quotes(f)))
                            .collect::<Vec<_>>();
                        (line, cells)
                    }
                },
                RowSource::Sheet {
                    rows,
                    next_row_number,
                } => match rows.next() {
                    None => return Ok(None),
                    Some(cells) => {
                        let row_number = *next_row_number;
                        *next_row_number += 1;
                        (row_number, cells.iter().map(cell_from_data).collect())
                    }
                },
            };

            let row = self.build_row(row_number, cells);
            if !row.is_blank() {
                return Ok(Some(row));
            }
        }
    }
}

impl Iterator for RowStream {
    type Item = Result<RawRow, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(row) = self.pending.take() {
            return Some(Ok(row));
        }
        self.next_row().transpose()
    }
}

/// `;` when the header line uses semicolons and no commas, `,` otherwise.
fn detect_delimiter(bytes: &[u8]) -> u8 {
    let first_line = bytes
        .split(|b| *b == b'\n')
        .find(|line| line.iter().any(|b| !b.is_ascii_whitespace()))
        .unwrap_or_default();

    if first_line.contains(&b';') && !first_line.contains(&b',') {
        b';'
    } else {
        b','
    }
}

fn strip_quotes(field: &str) -> &str {
    field.trim().trim_matches('"').trim()
}

fn cell_from_data(data: &Data) -> CellValue {
    match data {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::String(s) => CellValue::text(s),
        #[allow(clippy::cast_precision_loss)]
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        other => CellValue::text(&other.to_string()),
    }
}
