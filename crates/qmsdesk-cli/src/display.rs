//! Terminal rendering for board columns, document cards, and chat transcripts.

use std::collections::HashMap;

use qmsdesk_core::format::{format_file_size, format_timestamp};
use qmsdesk_core::{
    AiModel, ChatMessage, ChatSession, DocumentType, IndexedDocument, InterestGroup, Role,
    StructuredData, UploadedDocument, User, WorkflowStatus,
};

const MAX_LIST_ITEMS: usize = 10;
const NAME_WIDTH: usize = 44;
const EXCERPT_WIDTH: usize = 100;

// ── Board ──

/// One board column: header with count, then one line per document.
pub fn render_column(
    status: WorkflowStatus,
    docs: &[&UploadedDocument],
    type_names: &HashMap<i64, String>,
) -> Vec<String> {
    let mut lines = vec![format!("== {} ({}) ==", status.label(), docs.len())];
    if docs.is_empty() {
        lines.push("  (keine Dokumente)".to_string());
    }
    for doc in docs {
        let type_name = doc
            .document_type_name
            .as_deref()
            .or_else(|| type_names.get(&doc.document_type_id).map(String::as_str))
            .unwrap_or("-");
        lines.push(format!(
            "  #{:<5} {:<width$} Kap. {:<8} v{:<6} {:>9}  {}  [{}]",
            doc.id,
            truncate(doc.display_name(), NAME_WIDTH),
            doc.qm_chapter.as_deref().unwrap_or("-"),
            doc.version.as_deref().unwrap_or("-"),
            format_file_size(doc.file_size_bytes),
            format_timestamp(&doc.uploaded_at),
            type_name,
            width = NAME_WIDTH,
        ));
    }
    lines
}

/// Vertical card for a single document.
pub fn render_document_card(doc: &UploadedDocument) -> Vec<String> {
    let mut lines = vec![format!("=== {} ===", doc.display_name())];
    let mut field = |label: &str, value: String| lines.push(format!("  {label:<26} {value}"));

    field("ID", doc.id.to_string());
    field("Dateiname", doc.original_filename.clone());
    field("Gespeichert als", doc.filename.clone());
    field("Dokumenttyp", doc.document_type_id.to_string());
    if let Some(chapter) = &doc.qm_chapter {
        field("QM-Kapitel", chapter.clone());
    }
    if let Some(version) = &doc.version {
        field("Version", version.clone());
    }
    field("Dateityp", doc.file_type.clone());
    field("Größe", format_file_size(doc.file_size_bytes));
    if let Some(pages) = doc.page_count {
        field("Seiten", pages.to_string());
    }
    field("Hochgeladen", format_timestamp(&doc.uploaded_at));
    if let Some(status) = doc.workflow_status {
        field("Status", status.label().to_string());
    }
    lines
}

// ── Chat ──

pub fn render_sessions(sessions: &[ChatSession], current: Option<i64>) -> Vec<String> {
    if sessions.is_empty() {
        return vec!["(keine Chat-Sitzungen)".to_string()];
    }
    sessions
        .iter()
        .map(|s| {
            let marker = if Some(s.id) == current { "*" } else { " " };
            let activity = s.last_activity.as_deref().unwrap_or(&s.created_at);
            format!(
                "{marker} #{:<5} {:<32} {:>4} Nachrichten  {}",
                s.id,
                truncate(&s.session_name, 32),
                s.message_count,
                format_timestamp(activity)
            )
        })
        .collect()
}

pub fn render_message(msg: &ChatMessage) -> Vec<String> {
    let speaker = match msg.role {
        Role::User => "Sie",
        Role::Assistant => "Assistent",
    };
    let mut lines = vec![format!("{speaker}: {}", msg.content)];

    let sources = &msg.source_references;
    if !sources.is_empty() {
        lines.push(format!("  Quellen ({}):", sources.len()));
        for (i, src) in sources.iter().take(MAX_LIST_ITEMS).enumerate() {
            let mut head = format!(
                "    [{}] {}",
                i + 1,
                src.document_title
                    .clone()
                    .unwrap_or_else(|| format!("Dokument #{}", src.document_id))
            );
            if let Some(page) = src.page_number {
                head.push_str(&format!(", S. {page}"));
            }
            if let Some(score) = src.relevance_score {
                head.push_str(&format!(" ({:.0}%)", score * 100.0));
            }
            lines.push(head);
            lines.push(format!("        \"{}\"", truncate(src.excerpt.trim(), EXCERPT_WIDTH)));
        }
        if sources.len() > MAX_LIST_ITEMS {
            lines.push(format!("    ... und {} weitere", sources.len() - MAX_LIST_ITEMS));
        }
    }

    for block in &msg.structured_data {
        lines.extend(render_structured(block));
    }
    lines
}

pub fn render_structured(block: &StructuredData) -> Vec<String> {
    let mut lines = Vec::new();
    match block {
        StructuredData::Table {
            title,
            headers,
            rows,
        } => {
            if let Some(title) = title {
                lines.push(format!("  {title}"));
            }
            let widths = column_widths(headers, rows);
            lines.push(format!("  {}", pad_row(headers, &widths)));
            lines.push(format!(
                "  {}",
                widths
                    .iter()
                    .map(|w| "-".repeat(*w))
                    .collect::<Vec<_>>()
                    .join("-+-")
            ));
            for row in rows {
                lines.push(format!("  {}", pad_row(row, &widths)));
            }
        }
        StructuredData::KeyValue { title, entries } => {
            if let Some(title) = title {
                lines.push(format!("  {title}"));
            }
            for entry in entries {
                lines.push(format!("    {:<24} {}", format!("{}:", entry.key), entry.value));
            }
        }
        StructuredData::List { title, items } => {
            if let Some(title) = title {
                lines.push(format!("  {title}"));
            }
            for item in items {
                lines.push(format!("    - {item}"));
            }
        }
        StructuredData::Unknown => lines.push("  (Datenblock kann nicht angezeigt werden)".into()),
    }
    lines
}

// ── Admin lists ──

pub fn render_document_types(types: &[DocumentType]) -> Vec<String> {
    types
        .iter()
        .map(|t| {
            format!(
                "#{:<5} {:<8} {:<32} {}",
                t.id,
                t.code,
                truncate(&t.name, 32),
                t.description.as_deref().unwrap_or("")
            )
        })
        .collect()
}

pub fn render_interest_groups(groups: &[InterestGroup]) -> Vec<String> {
    groups
        .iter()
        .map(|g| {
            format!(
                "#{:<5} {:<8} {:<32} {}",
                g.id,
                g.code,
                truncate(&g.name, 32),
                if g.is_active { "aktiv" } else { "inaktiv" }
            )
        })
        .collect()
}

pub fn render_users(users: &[User]) -> Vec<String> {
    users
        .iter()
        .map(|u| {
            format!(
                "#{:<5} {:<28} {:<32} {}{}",
                u.id,
                truncate(&u.full_name, 28),
                u.email,
                u.organizational_unit.as_deref().unwrap_or("-"),
                if u.is_active { "" } else { " (inaktiv)" }
            )
        })
        .collect()
}

pub fn render_models(models: &[AiModel]) -> Vec<String> {
    models
        .iter()
        .map(|m| {
            format!(
                "#{:<5} {:<32} {:<12}{}",
                m.id,
                m.name,
                m.provider,
                if m.is_default { " (Standard)" } else { "" }
            )
        })
        .collect()
}

pub fn render_indexed(docs: &[IndexedDocument]) -> Vec<String> {
    docs.iter()
        .map(|d| {
            format!(
                "#{:<5} {:<44} {:>5} Abschnitte  {}",
                d.document_id,
                truncate(&d.title, 44),
                d.chunk_count,
                d.indexed_at.as_deref().map(format_timestamp).unwrap_or_default()
            )
        })
        .collect()
}

pub fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{line}");
    }
}

// ── Helpers ──

/// Shorten to `max` characters, ending in "..." when cut.
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let kept: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}

fn column_widths(headers: &[String], rows: &[Vec<String>]) -> Vec<usize> {
    let cols = rows.iter().map(Vec::len).chain([headers.len()]).max().unwrap_or(0);
    (0..cols)
        .map(|i| {
            rows.iter()
                .filter_map(|r| r.get(i))
                .chain(headers.get(i))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect()
}

fn pad_row(cells: &[String], widths: &[usize]) -> String {
    widths
        .iter()
        .enumerate()
        .map(|(i, w)| format!("{:<w$}", cells.get(i).map(String::as_str).unwrap_or(""), w = *w))
        .collect::<Vec<_>>()
        .join(" | ")
}
