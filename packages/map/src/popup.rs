//! Marker popup content.

use risk_map_dataset::Record;

/// Number of columns shown when neither an explicit subset nor all columns
/// are requested.
const FIRST_COLUMNS_LIMIT: usize = 6;

/// Lowercased names of columns preferred when nothing else qualifies.
const FALLBACK_COLUMNS: &[&str] = &["alamat", "nama pemilik", "penemu", "koordinat"];

const FALLBACK_LIMIT: usize = 3;

/// Which columns a popup lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopupColumns {
    /// Every column with a non-blank, non-`0` value.
    All,
    /// The first six non-blank columns.
    First,
    /// An explicit list; names missing from the dataset are ignored.
    Only(Vec<String>),
}

/// Escapes text for inclusion in HTML.
#[must_use]
pub fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn is_shown(value: &str) -> bool {
    !value.is_empty() && value != "0"
}

/// Picks the columns listed in a row's popup.
#[must_use]
pub fn select_columns<'a>(record: &Record<'a>, selection: &PopupColumns) -> Vec<&'a str> {
    let selected: Vec<&'a str> = match selection {
        PopupColumns::Only(names) => record
            .iter()
            .map(|(column, _)| column)
            .filter(|column| names.iter().any(|n| n == column))
            .collect(),
        PopupColumns::All => record
            .iter()
            .filter(|(_, value)| is_shown(&value.display_trimmed()))
            .map(|(column, _)| column)
            .collect(),
        PopupColumns::First => record
            .iter()
            .filter(|(_, value)| !value.is_blank())
            .map(|(column, _)| column)
            .take(FIRST_COLUMNS_LIMIT)
            .collect(),
    };

    if !selected.is_empty() {
        return selected;
    }

    let columns: Vec<&'a str> = record.iter().map(|(column, _)| column).collect();
    let mut fallback: Vec<&'a str> = columns
        .iter()
        .copied()
        .filter(|c| FALLBACK_COLUMNS.contains(&c.to_lowercase().as_str()))
        .take(FALLBACK_LIMIT)
        .collect();
    for column in columns.iter().copied().take(FALLBACK_LIMIT) {
        if !fallback.contains(&column) {
            fallback.push(column);
        }
    }
    fallback.truncate(FALLBACK_LIMIT);
    fallback
}

/// Returns `true` if `text` is an `http://` or `https://` URL, or a path
/// under `local_prefix`.
#[must_use]
pub fn is_link(text: &str, local_prefix: Option<&str>) -> bool {
    text.starts_with("http://")
        || text.starts_with("https://")
        || local_prefix.is_some_and(|prefix| text.starts_with(prefix))
}

/// Builds the popup panel for a row. Links (see [`is_link`]) become a
/// "Lihat Dokumentasi" anchor; blank and `0` values are skipped.
#[must_use]
pub fn popup_html(
    record: &Record<'_>,
    columns: &[&str],
    width: u32,
    local_prefix: Option<&str>,
) -> String {
    let mut html = format!(
        "<div style='padding:12px;font-family:Arial, sans-serif;max-width:{}px;'>\
         <h4 style='margin:0 0 12px 0;color:#1f2937;border-bottom:2px solid #3b82f6;padding-bottom:6px;'>Detail Informasi</h4>",
        width.saturating_sub(40)
    );

    for column in columns {
        let Some(value) = record.get(column) else {
            continue;
        };
        let text = value.display_trimmed();
        if !is_shown(&text) {
            continue;
        }
        let shown = if is_link(&text, local_prefix) {
            format!(
                "<a href=\"{}\" target=\"_blank\" style=\"color:#3b82f6;\">Lihat Dokumentasi</a>",
                html_escape(&text)
            )
        } else {
            html_escape(&text)
        };
        html.push_str(&format!(
            "<div style='margin-bottom:8px;padding:6px;background-color:#f8fafc;border-radius:4px;'>\
             <strong style='color:#374151;'>{}:</strong> <span style='color:#1f2937;'>{shown}</span></div>",
            html_escape(column)
        ));
    }

    html.push_str("</div>");
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use risk_map_dataset::{CellValue, Dataset};

    fn dataset(columns: &[&str], row: Vec<CellValue>) -> Dataset {
        Dataset::with_rows(columns.iter().map(ToString::to_string).collect(), vec![row]).unwrap()
    }

    #[test]
    fn all_skips_blank_and_zero() {
        let data = dataset(
            &["Nama", "No", "Catatan"],
            vec!["Budi".into(), CellValue::Number(0.0), " ".into()],
        );
        let record = data.row(0).unwrap();
        assert_eq!(select_columns(&record, &PopupColumns::All), vec!["Nama"]);
    }

    #[test]
    fn explicit_subset_ignores_unknown_columns() {
        let data = dataset(&["Nama", "Alamat"], vec!["Budi".into(), "Jl. A".into()]);
        let record = data.row(0).unwrap();
        let only = PopupColumns::Only(vec!["Alamat".to_string(), "Hilang".to_string()]);
        assert_eq!(select_columns(&record, &only), vec!["Alamat"]);
    }

    #[test]
    fn first_is_capped_at_six() {
        let columns = ["A", "B", "C", "D", "E", "F", "G"];
        let data = dataset(&columns, columns.iter().map(|c| (*c).into()).collect());
        let record = data.row(0).unwrap();
        assert_eq!(select_columns(&record, &PopupColumns::First).len(), 6);
    }

    #[test]
    fn falls_back_to_known_columns() {
        let data = dataset(
            &["Keterangan", "Alamat", "Penemu", "Lain"],
            vec![CellValue::Empty; 4],
        );
        let record = data.row(0).unwrap();
        assert_eq!(
            select_columns(&record, &PopupColumns::All),
            vec!["Alamat", "Penemu", "Keterangan"]
        );
    }

    #[test]
    fn links_and_escapes() {
        let data = dataset(
            &["Dokumentasi", "Nama"],
            vec!["https://drive.google.com/uc?id=1".into(), "<b>".into()],
        );
        let record = data.row(0).unwrap();
        let html = popup_html(&record, &["Dokumentasi", "Nama"], 450, None);
        assert!(html.contains("max-width:410px"));
        assert!(html.contains("Lihat Dokumentasi"));
        assert!(html.contains("&lt;b&gt;"));
    }

    #[test]
    fn only_urls_become_links() {
        assert!(is_link("http://example.com/a.png", None));
        assert!(is_link("https://drive.google.com/uc?id=1", None));
        assert!(!is_link("httpd-01", None));
        assert!(!is_link("/blobs/abc", None));
        assert!(is_link("/blobs/abc", Some("/blobs/")));
        assert!(!is_link("/etc/passwd", Some("/blobs/")));

        let data = dataset(&["Nama"], vec!["httpd-01".into()]);
        let record = data.row(0).unwrap();
        let html = popup_html(&record, &["Nama"], 450, None);
        assert!(html.contains("httpd-01"));
        assert!(!html.contains("<a href"));
    }

    #[test]
    fn local_paths_link_under_prefix() {
        let data = dataset(&["Dokumentasi"], vec!["/blobs/abc".into()]);
        let record = data.row(0).unwrap();
        let html = popup_html(&record, &["Dokumentasi"], 450, Some("/blobs/"));
        assert!(html.contains("<a href=\"/blobs/abc\""));
        assert!(html.contains("Lihat Dokumentasi"));
    }
}
