use colored::Colorize;

use crate::api::Artwork;
use crate::grid::GridSnapshot;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "text" | "txt" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

pub fn infer_format_from_path(path: &str) -> Option<OutputFormat> {
    let lower = path.trim().to_lowercase();
    if lower.ends_with(".json") {
        return Some(OutputFormat::Json);
    }
    if lower.ends_with(".txt") {
        return Some(OutputFormat::Text);
    }
    None
}

fn one_line(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn cell(value: &str, width: usize) -> String {
    let flat = one_line(value);
    if flat.chars().count() <= width {
        return format!("{flat:<width$}");
    }
    let cut: String = flat.chars().take(width.saturating_sub(3)).collect();
    format!("{cut}...")
}

pub fn inscriptions_label(record: &Artwork) -> &str {
    match record.inscriptions.as_deref() {
        Some(text) if !text.is_empty() => text,
        _ => "N/A",
    }
}

pub fn total_pages(total_count: u64, page_size: u64) -> u64 {
    if page_size == 0 {
        return 0;
    }
    total_count.div_ceil(page_size)
}

/// Renders the visible page, the paginator line and the selection footer.
pub fn render_page_table(snapshot: &GridSnapshot) -> String {
    let mut out = String::new();
    let state = snapshot.view.page_state;

    out.push_str(&format!(
        "{}  {:>8}  {}  {}  {}  {:>6}  {:>6}  {}\n",
        "sel".bold(),
        "id".bold(),
        cell("Title", 32).bold(),
        cell("Artist", 28).bold(),
        cell("Origin", 14).bold(),
        "Start".bold(),
        "End".bold(),
        "Inscriptions".bold(),
    ));

    let rows = snapshot.view.visible_records();
    if rows.is_empty() {
        out.push_str(&format!("{}\n", "  (no artworks)".dimmed()));
    }
    for record in rows.iter() {
        let marker = if snapshot.selection.contains(record.id) {
            "[x]".green().bold()
        } else {
            "[ ]".normal()
        };
        out.push_str(&format!(
            "{}  {:>8}  {}  {}  {}  {:>6}  {:>6}  {}\n",
            marker,
            record.id,
            cell(&record.title, 32).white().bold(),
            cell(&record.artist_display, 28),
            cell(&record.place_of_origin, 14),
            record.date_start,
            record.date_end,
            cell(inscriptions_label(record), 24).dimmed(),
        ));
    }

    let sort = match state.sort_field() {
        Some(field) => format!(" :: sort {} {:?}", field.as_str(), state.sort_direction()),
        None => String::new(),
    };
    out.push_str(&format!(
        "\n:: Page {}/{} :: rows {} :: total {}{}{}\n",
        state.page_number().to_string().bold().blue(),
        total_pages(snapshot.view.total_count, state.page_size()),
        state.page_size(),
        snapshot.view.total_count,
        sort,
        if snapshot.loading() {
            " :: loading".yellow().to_string()
        } else {
            String::new()
        },
    ));
    out.push_str(&format!(":: {}\n", snapshot.footer().bold().green()));
    out
}

pub fn render_text(records: &[Artwork]) -> Vec<u8> {
    let mut out = String::new();
    for r in records {
        out.push_str(&format!("{}\t{}\n", r.id, one_line(&r.title)));
    }
    out.into_bytes()
}

pub fn render_json(records: &[Artwork]) -> Vec<u8> {
    serde_json::to_vec_pretty(records).unwrap_or_else(|_| b"[]\n".to_vec())
}

pub fn render(format: OutputFormat, records: &[Artwork]) -> Vec<u8> {
    match format {
        OutputFormat::Text => render_text(records),
        OutputFormat::Json => render_json(records),
    }
}
