//! HTML body of the monitoring report.

use chrono::{NaiveDate, NaiveDateTime};
use paineel_core::LedgerRow;
use paineel_monitor::{ChangeEvent, Notification};
use std::fmt::Write;

const DATE_FORMATS: [&str; 2] = ["%d/%m/%Y %H:%M:%S", "%d/%m/%Y %H:%M"];

const STYLE: &str = "\
body { font-family: Arial, sans-serif; margin: 20px; }
.header { color: #2c5aa0; border-bottom: 2px solid #2c5aa0; padding-bottom: 10px; }
.section { margin: 20px 0; }
.change { background-color: #e8f4f8; border-left: 4px solid #2c5aa0; padding: 10px; margin: 5px 0; }
.failure { background-color: #f8e8e8; border-left: 4px solid #d32f2f; padding: 10px; margin: 5px 0; }
.process { font-weight: bold; color: #1976d2; }
.kind { color: #666; font-style: italic; }
.timestamp { color: #888; font-size: 0.9em; }
table.details { border-collapse: collapse; margin-top: 5px; }
table.details th, table.details td { border: 1px solid #ddd; padding: 4px 8px; text-align: left; font-size: 0.9em; }
table.details th { background-color: #f0f0f0; }";

/// Escape text for inclusion in HTML.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Parse `dd/mm/YYYY[ HH:MM[:SS]]`.
pub fn parse_date(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%d/%m/%Y")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Re-align newline-joined ledger cells into entries, sort the entries by
/// the date in column `sort_by` (newest first, unparseable last) and join
/// each column back with `<br>`.
///
/// Cells are escaped; missing trailing values in shorter columns are left
/// blank.
pub fn organize_columns(cells: &[&str], sort_by: usize) -> Vec<String> {
    let columns: Vec<Vec<&str>> = cells
        .iter()
        .map(|cell| {
            cell.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .collect()
        })
        .collect();
    let total = columns.iter().map(Vec::len).max().unwrap_or(0);

    let mut entries: Vec<Vec<&str>> = (0..total)
        .map(|i| {
            columns
                .iter()
                .map(|col| col.get(i).copied().unwrap_or(""))
                .collect()
        })
        .collect();
    entries.sort_by_key(|entry| {
        std::cmp::Reverse(entry.get(sort_by).and_then(|v| parse_date(v)))
    });

    (0..columns.len())
        .map(|c| {
            entries
                .iter()
                .map(|entry| entry[c])
                .filter(|v| !v.is_empty())
                .map(escape)
                .collect::<Vec<_>>()
                .join("<br>")
        })
        .collect()
}

fn details(out: &mut String, identifier: &str, row: &LedgerRow) {
    let _ = write!(
        out,
        "<table class=\"details\">\
         <tr><th>{}</th><td>{}</td></tr>\
         <tr><th>{}</th><td>{}</td></tr>\
         <tr><th>{}</th><td>{}</td></tr>\
         </table>",
        LedgerRow::HEADER[0],
        escape(identifier),
        LedgerRow::HEADER[1],
        escape(&row.kind),
        LedgerRow::HEADER[2],
        escape(&row.interested_parties),
    );

    let documents = organize_columns(
        &[
            row.document_numbers.as_str(),
            row.document_types.as_str(),
            row.document_dates.as_str(),
            row.document_inclusion_dates.as_str(),
            row.document_units.as_str(),
        ],
        3,
    );
    let progress = organize_columns(
        &[
            row.progress_dates.as_str(),
            row.progress_units.as_str(),
            row.progress_descriptions.as_str(),
        ],
        0,
    );

    out.push_str("<table class=\"details\"><tr>");
    for header in &LedgerRow::HEADER[3..] {
        let _ = write!(out, "<th>{header}</th>");
    }
    out.push_str("</tr><tr>");
    for cell in documents.iter().chain(progress.iter()) {
        let _ = write!(out, "<td>{cell}</td>");
    }
    out.push_str("</tr></table>");
}

fn change(out: &mut String, event: &ChangeEvent) {
    let _ = write!(
        out,
        "<div class=\"change\"><span class=\"process\">{}</span><br>\
         <span class=\"kind\">{}: {}</span>",
        escape(&event.identifier),
        event.kind.label(),
        event.kind.description(),
    );
    details(out, &event.identifier, &event.row);
    out.push_str("</div>");
}

/// Full HTML document for `notification`.
pub fn render(notification: &Notification) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        "<html><head><meta charset=\"utf-8\"><style>{STYLE}</style></head><body>\
         <div class=\"header\"><h2>Relatório de Monitoramento SEI ANEEL</h2>\
         <div class=\"timestamp\">Gerado em: {}</div></div>",
        notification.generated_at.format("%d/%m/%Y às %H:%M:%S"),
    );

    if !notification.events.is_empty() {
        let _ = write!(
            out,
            "<div class=\"section\"><h3>Mudanças Detectadas ({})</h3>",
            notification.events.len()
        );
        for event in &notification.events {
            change(&mut out, event);
        }
        out.push_str("</div>");
    }

    if !notification.failed.is_empty() {
        let _ = write!(
            out,
            "<div class=\"section\"><h3>Processos com erro ou não localizados ({})</h3>",
            notification.failed.len()
        );
        for identifier in &notification.failed {
            let _ = write!(
                out,
                "<div class=\"failure\"><span class=\"process\">{}</span><br>\
                 <span class=\"kind\">Erro no processamento ou processo não localizado - \
                 requer atenção manual</span></div>",
                escape(identifier)
            );
        }
        out.push_str("</div>");
    }

    out.push_str(
        "<div class=\"section\"><p><small>Este é um email automático do sistema de \
         monitoramento SEI ANEEL.</small></p></div></body></html>",
    );
    out
}
