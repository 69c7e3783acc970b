//! Reads a process page into a [`ProcessRecord`].

use paineel_core::{DocumentEntry, ProcessRecord, ProgressEntry};
use scraper::{ElementRef, Html, Selector};

const HEADER_ROWS: &str = "#tblCabecalho tr";
const DOCUMENT_ROWS: &str = "#tblDocumentos tr";
const PROGRESS_ROWS: &str = "tr[class*='andamento']";

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

/// Element text with whitespace runs collapsed to single spaces.
fn clean_text(element: &ElementRef) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn cells<'a>(row: &ElementRef<'a>, td: &Selector) -> Vec<ElementRef<'a>> {
    row.select(td).collect()
}

/// Distinct non-empty texts of the elements inside a cell, `"; "`-joined.
fn interested_parties(cell: &ElementRef) -> Option<String> {
    let any = selector("*")?;
    let mut parties: Vec<String> = Vec::new();
    for child in cell.select(&any) {
        let text = clean_text(&child);
        if !text.is_empty() && !parties.contains(&text) {
            parties.push(text);
        }
    }
    if parties.is_empty() {
        None
    } else {
        Some(parties.join("; "))
    }
}

/// Parse the process page. Missing tables yield empty fields, never an error.
///
/// `fallback_identifier` is used when the header has no `Processo` entry.
pub fn parse_record(html: &str, fallback_identifier: &str) -> ProcessRecord {
    let document = Html::parse_document(html);
    let mut record = ProcessRecord {
        identifier: fallback_identifier.trim().to_string(),
        ..ProcessRecord::default()
    };

    let (Some(td), Some(header_rows), Some(document_rows), Some(progress_rows)) = (
        selector("td"),
        selector(HEADER_ROWS),
        selector(DOCUMENT_ROWS),
        selector(PROGRESS_ROWS),
    ) else {
        return record;
    };

    for row in document.select(&header_rows) {
        let tds = cells(&row, &td);
        if tds.len() != 2 {
            continue;
        }
        let key = clean_text(&tds[0]).replace(':', "");
        let value = clean_text(&tds[1]);
        match key.trim().to_lowercase().as_str() {
            "processo" if !value.is_empty() => record.identifier = value,
            "tipo" => record.kind = value,
            "interessados" => {
                record.interested_parties = interested_parties(&tds[1]).unwrap_or(value);
            }
            _ => {}
        }
    }

    record.documents = document
        .select(&document_rows)
        .skip(1)
        .filter_map(|row| {
            let tds = cells(&row, &td);
            (tds.len() >= 6).then(|| DocumentEntry {
                number: clean_text(&tds[1]),
                kind: clean_text(&tds[2]),
                date: clean_text(&tds[3]),
                inclusion_date: clean_text(&tds[4]),
                unit: clean_text(&tds[5]),
            })
        })
        .collect();

    record.progress = document
        .select(&progress_rows)
        .filter_map(|row| {
            let tds = cells(&row, &td);
            (tds.len() == 3).then(|| ProgressEntry {
                date: clean_text(&tds[0]),
                unit: clean_text(&tds[1]),
                description: clean_text(&tds[2]),
            })
        })
        .collect();

    record
}
