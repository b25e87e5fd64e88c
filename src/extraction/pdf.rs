//! Tabular extraction from PDF documents.
//!
//! Text-showing operators are collected together with their text-space position. Fragments
//! sharing a baseline form a row; the first multi-cell row of the first page is the
//! header, and every later fragment is assigned to the header column whose left edge
//! precedes it. Header rows repeated on later pages are skipped.

use std::path::Path;

use lopdf::content::Content;
use lopdf::{Document, Object, ObjectId};

use crate::error::{EtlError, EtlResult};
use crate::types::{DataSet, SourceKind, Value};

use super::http::HttpClient;

/// Fragments whose baselines differ by less than this belong to the same row.
const ROW_TOLERANCE: f32 = 2.0;
/// Slack allowed when a cell starts slightly left of its header.
const COLUMN_TOLERANCE: f32 = 1.5;

#[derive(Debug, Clone, PartialEq)]
struct Fragment {
    x: f32,
    y: f32,
    text: String,
}

#[derive(Debug)]
struct Layout {
    header: Vec<String>,
    starts: Vec<f32>,
}

/// Read a table from a PDF given as a URL (`http://`, `https://`) or a local path.
pub fn read_pdf_from_locator(locator: &str, http: &dyn HttpClient) -> EtlResult<DataSet> {
    let bytes = if locator.starts_with("http://") || locator.starts_with("https://") {
        let response = http.get(locator, &[])?;
        if !response.is_success() {
            return Err(EtlError::unavailable(
                locator,
                format!("GET returned status {}", response.status),
            ));
        }
        response.body
    } else {
        std::fs::read(Path::new(locator)).map_err(|e| EtlError::unavailable(locator, e))?
    };
    read_pdf_table(&bytes, locator)
}

/// Read the table spanning every page of an in-memory PDF.
///
/// `source_name` is used in error messages.
pub fn read_pdf_table(bytes: &[u8], source_name: &str) -> EtlResult<DataSet> {
    let doc = Document::load_mem(bytes)
        .map_err(|e| EtlError::format(source_name, format!("not a readable pdf: {e}")))?;
    if doc.is_encrypted() {
        return Err(EtlError::format(source_name, "pdf is encrypted"));
    }

    let mut layout: Option<Layout> = None;
    let mut rows: Vec<Vec<Value>> = Vec::new();

    for (page_num, page_id) in doc.get_pages() {
        let fragments = page_fragments(&doc, page_id).map_err(|e| {
            EtlError::format(source_name, format!("page {page_num}: {e}"))
        })?;
        for line in group_rows(fragments) {
            match &layout {
                None => {
                    if line.len() >= 2 {
                        layout = Some(Layout::from_header(line));
                    }
                }
                Some(layout) => {
                    if layout.is_header(&line) {
                        continue;
                    }
                    let row = layout.assign(&line);
                    if row.iter().any(|v| !v.is_null()) {
                        rows.push(row);
                    }
                }
            }
        }
    }

    let layout =
        layout.ok_or_else(|| EtlError::format(source_name, "no tabular content detected"))?;
    tracing::debug!(
        source = source_name,
        columns = layout.header.len(),
        rows = rows.len(),
        "extracted pdf table"
    );
    Ok(DataSet::from_columns(layout.header, rows).with_source(SourceKind::Pdf))
}

impl Layout {
    fn from_header(line: Vec<Fragment>) -> Self {
        let starts = line.iter().map(|f| f.x).collect();
        let header = line.into_iter().map(|f| f.text).collect();
        Self { header, starts }
    }

    fn is_header(&self, line: &[Fragment]) -> bool {
        line.len() == self.header.len() && line.iter().zip(&self.header).all(|(f, h)| &f.text == h)
    }

    fn column_for(&self, x: f32) -> usize {
        self.starts
            .iter()
            .rposition(|start| *start <= x + COLUMN_TOLERANCE)
            .unwrap_or(0)
    }

    fn assign(&self, line: &[Fragment]) -> Vec<Value> {
        let mut cells: Vec<Option<String>> = vec![None; self.header.len()];
        for fragment in line {
            let slot = &mut cells[self.column_for(fragment.x)];
            match slot {
                Some(existing) => {
                    existing.push(' ');
                    existing.push_str(&fragment.text);
                }
                None => *slot = Some(fragment.text.clone()),
            }
        }
        cells
            .into_iter()
            .map(|c| c.map(Value::Utf8).unwrap_or(Value::Null))
            .collect()
    }
}

/// Sort fragments top-to-bottom then left-to-right and split them into baseline rows.
fn group_rows(mut fragments: Vec<Fragment>) -> Vec<Vec<Fragment>> {
    fragments.sort_by(|a, b| b.y.total_cmp(&a.y).then(a.x.total_cmp(&b.x)));

    let mut rows: Vec<Vec<Fragment>> = Vec::new();
    let mut baseline = f32::NAN;
    for fragment in fragments {
        if rows.is_empty() || (baseline - fragment.y).abs() > ROW_TOLERANCE {
            baseline = fragment.y;
            rows.push(Vec::new());
        }
        if let Some(row) = rows.last_mut() {
            row.push(fragment);
        }
    }
    for row in &mut rows {
        row.sort_by(|a, b| a.x.total_cmp(&b.x));
    }
    rows
}

/// Walk a page's content stream tracking the text line matrix origin.
fn page_fragments(doc: &Document, page_id: ObjectId) -> lopdf::Result<Vec<Fragment>> {
    let content_bytes = doc.get_page_content(page_id)?;
    let content = Content::decode(&content_bytes)?;

    let mut fragments = Vec::new();
    let mut line = (0.0_f32, 0.0_f32);
    let mut leading = 0.0_f32;

    for operation in &content.operations {
        let ops = &operation.operands;
        match operation.operator.as_str() {
            "BT" => line = (0.0, 0.0),
            "Tm" if ops.len() == 6 => {
                if let (Some(e), Some(f)) = (number(&ops[4]), number(&ops[5])) {
                    line = (e, f);
                }
            }
            "Td" | "TD" if ops.len() == 2 => {
                if let (Some(tx), Some(ty)) = (number(&ops[0]), number(&ops[1])) {
                    if operation.operator == "TD" {
                        leading = -ty;
                    }
                    line = (line.0 + tx, line.1 + ty);
                }
            }
            "TL" if ops.len() == 1 => {
                if let Some(tl) = number(&ops[0]) {
                    leading = tl;
                }
            }
            "T*" => line.1 -= leading,
            "Tj" | "TJ" => push_fragment(&mut fragments, line, ops.first()),
            "'" => {
                line.1 -= leading;
                push_fragment(&mut fragments, line, ops.first());
            }
            "\"" => {
                line.1 -= leading;
                push_fragment(&mut fragments, line, ops.last());
            }
            _ => {}
        }
    }
    Ok(fragments)
}

fn push_fragment(out: &mut Vec<Fragment>, (x, y): (f32, f32), operand: Option<&Object>) {
    let Some(text) = operand.and_then(extract_string_from_object) else {
        return;
    };
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    out.push(Fragment {
        x,
        y,
        text: text.to_string(),
    });
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

/// Decode a string operand (or a `TJ` array of strings and kerning offsets).
fn extract_string_from_object(obj: &Object) -> Option<String> {
    match obj {
        Object::String(bytes, _) => {
            if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
                let utf16: Vec<u16> = bytes[2..]
                    .chunks_exact(2)
                    .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                    .collect();
                String::from_utf16(&utf16).ok()
            } else {
                Some(bytes.iter().map(|&b| b as char).collect())
            }
        }
        Object::Array(items) => {
            let joined: String = items.iter().filter_map(extract_string_from_object).collect();
            (!joined.is_empty()).then_some(joined)
        }
        _ => None,
    }
}
