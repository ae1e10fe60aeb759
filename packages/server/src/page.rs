//! Server-rendered HTML pages.
//!
//! The index page holds the entry form on the left and the map, a
//! fallback legend, and a preview of the working copy on the right. The
//! form posts JSON to `/api/submit`, with files read as base64 in the
//! browser.

use risk_map_dataset::Dataset;
use risk_map_dataset::normalize::pretty;
use risk_map_form::render::{Control, FormField, FormLayout, LevelField};
use risk_map_map::legend::legend_body;
use risk_map_map::popup::html_escape;
use risk_map_risk_models::DEFAULT_COLOR;

/// Page title.
pub const TITLE: &str = "Peta Risiko Jaringan";

const STYLE: &str = r"
body { font-family: Arial, sans-serif; margin: 0; background: #f8fafc; color: #0f172a; }
header { padding: 12px 20px; background: #1e3a8a; color: #fff; display: flex; justify-content: space-between; align-items: center; }
main { display: flex; gap: 20px; padding: 20px; }
.form-col { flex: 1; min-width: 320px; }
.map-col { flex: 2; }
.field { margin-bottom: 12px; display: flex; flex-direction: column; gap: 4px; }
.field label { font-weight: 600; font-size: 13px; }
.field small { color: #64748b; }
.swatch { display: inline-block; width: 28px; height: 18px; border-radius: 4px; vertical-align: middle; box-shadow: 0 0 0 1px rgba(0,0,0,0.1); }
iframe { width: 100%; height: 560px; border: 1px solid #cbd5e1; border-radius: 8px; background: #fff; }
details { margin-top: 12px; background: #fff; padding: 10px; border-radius: 8px; }
table { border-collapse: collapse; font-size: 12px; width: 100%; }
th, td { border: 1px solid #e2e8f0; padding: 4px 6px; text-align: left; }
.preview { max-height: 320px; overflow: auto; margin-top: 12px; }
.notice { padding: 8px; border-radius: 6px; margin-top: 8px; }
.notice.ok { background: #dcfce7; }
.notice.warn { background: #fef9c3; }
.notice.error { background: #fee2e2; }
";

const SCRIPT: &str = r#"
function readBase64(file) {
  return new Promise((resolve, reject) => {
    const reader = new FileReader();
    reader.onload = () => resolve(String(reader.result).split(',')[1] || '');
    reader.onerror = () => reject(reader.error);
    reader.readAsDataURL(file);
  });
}

function showMessages(items) {
  const box = document.getElementById('messages');
  box.innerHTML = '';
  for (const [kind, text] of items) {
    const div = document.createElement('div');
    div.className = 'notice ' + kind;
    div.textContent = text;
    box.appendChild(div);
  }
}

const level = document.getElementById('level');
if (level) {
  level.addEventListener('change', () => {
    const option = level.options[level.selectedIndex];
    document.getElementById('swatch').style.background = option.dataset.color || DEFAULT_COLOR;
    document.getElementById('swatch-hex').textContent = option.dataset.color || '';
  });
}

document.getElementById('refresh').addEventListener('click', async () => {
  const resp = await fetch('/api/refresh', { method: 'POST' });
  if (resp.ok) { location.reload(); }
  else { showMessages([['error', (await resp.json()).error]]); }
});

document.getElementById('entry').addEventListener('submit', async (event) => {
  event.preventDefault();
  const form = event.target;
  const body = { level: level ? level.value : null, coordinates: form.coordinates.value, values: {}, uploads: [] };
  for (const input of form.querySelectorAll('[data-column]')) {
    const column = input.dataset.column;
    if (input.type === 'file') {
      if (input.files.length > 0) {
        const file = input.files[0];
        body.uploads.push({ column, fileName: file.name, data: await readBase64(file) });
      }
    } else {
      body.values[column] = input.value;
    }
  }

  const resp = await fetch('/api/submit', {
    method: 'POST',
    headers: { 'Content-Type': 'application/json' },
    body: JSON.stringify(body),
  });
  const json = await resp.json();
  if (!resp.ok) {
    showMessages([['error', json.error]]);
    return;
  }

  const items = [['ok', 'Data berhasil ditambahkan ke Google Sheets!']];
  for (const [column, value] of json.outcome.dateSummary) {
    items.push(['ok', column + ': ' + value]);
  }
  for (const notice of json.outcome.notices) {
    items.push(['warn', (notice.column ? notice.column + ': ' : '') + notice.message]);
  }
  showMessages(items);
  document.getElementById('map').contentWindow.location.reload();
});
"#;

fn level_field(level: &LevelField) -> String {
    let mut options = String::from("<option value=\"\">-- pilih --</option>");
    for (option, color) in level.options.iter().zip(&level.colors) {
        options.push_str(&format!(
            "<option value=\"{0}\" data-color=\"{1}\">{0}</option>",
            html_escape(option),
            html_escape(color)
        ));
    }
    format!(
        "<div class=\"field\"><label for=\"level\">{} *</label>\
         <select id=\"level\" required>{options}</select>\
         <div><span id=\"swatch\" class=\"swatch\" style=\"background:{DEFAULT_COLOR};\"></span> \
         <code id=\"swatch-hex\"></code></div></div>",
        html_escape(&level.column)
    )
}

fn field(field: &FormField) -> String {
    let column = html_escape(&field.column);
    let input = match &field.control {
        Control::Select { options, default } => {
            let options: String = options
                .iter()
                .map(|o| {
                    let selected = if default.as_deref() == Some(o.as_str()) {
                        " selected"
                    } else {
                        ""
                    };
                    format!("<option{selected}>{}</option>", html_escape(o))
                })
                .collect();
            format!("<select data-column=\"{column}\">{options}</select>")
        }
        Control::Date { default } => format!(
            "<input type=\"text\" data-column=\"{column}\" value=\"{}\" placeholder=\"DD/MM/YYYY\">",
            html_escape(default)
        ),
        Control::Text { help } => {
            let help = help
                .as_deref()
                .map(|h| format!("<small>{}</small>", html_escape(h)))
                .unwrap_or_default();
            format!("<input type=\"text\" data-column=\"{column}\">{help}")
        }
        Control::File { accept } => {
            let accept: Vec<String> = accept.iter().map(|e| format!(".{e}")).collect();
            format!(
                "<input type=\"file\" data-column=\"{column}\" accept=\"{}\">",
                accept.join(",")
            )
        }
    };
    format!("<div class=\"field\"><label>{column}</label>{input}</div>")
}

/// Tabular preview of the working copy.
#[must_use]
pub fn preview_table(dataset: &Dataset) -> String {
    let view = pretty(dataset);
    let mut html = String::from("<table><thead><tr>");
    for column in view.columns() {
        html.push_str(&format!("<th>{}</th>", html_escape(column)));
    }
    html.push_str("</tr></thead><tbody>");
    for record in view.records() {
        html.push_str("<tr>");
        for value in record.values() {
            html.push_str(&format!("<td>{}</td>", html_escape(&value.to_string())));
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table>");
    html
}

fn document(body: &str) -> String {
    format!(
        "<!DOCTYPE html><html lang=\"id\"><head><meta charset=\"utf-8\">\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
         <title>{TITLE}</title><style>{STYLE}</style></head><body>{body}</body></html>"
    )
}

/// The main page.
#[must_use]
pub fn index_page(layout: &FormLayout, dataset: &Dataset) -> String {
    let mut form = String::new();
    if let Some(level) = &layout.level {
        form.push_str(&level_field(level));
    }
    form.push_str(&format!(
        "<div class=\"field\"><label for=\"coordinates\">{}</label>\
         <input type=\"text\" id=\"coordinates\" name=\"coordinates\" placeholder=\"{}\">\
         <small>Contoh: {}</small></div>",
        html_escape(&layout.coordinate.label),
        html_escape(&layout.coordinate.example),
        html_escape(&layout.coordinate.example),
    ));
    for f in &layout.fields {
        form.push_str(&field(f));
    }

    let body = format!(
        "<header><h2 style=\"margin:0;\">{TITLE}</h2>\
         <button id=\"refresh\" type=\"button\">Refresh Data</button></header>\
         <main>\
         <section class=\"form-col\"><h3>Input Data Baru</h3>\
         <form id=\"entry\">{form}<button type=\"submit\">Simpan</button></form>\
         <div id=\"messages\"></div></section>\
         <section class=\"map-col\"><iframe id=\"map\" src=\"/map\" title=\"Peta\"></iframe>\
         <details><summary>Legenda</summary>{}</details>\
         <details open><summary>Data ({} baris)</summary><div class=\"preview\">{}</div></details>\
         </section></main>\
         <script>const DEFAULT_COLOR = \"{DEFAULT_COLOR}\";{SCRIPT}</script>",
        legend_body(),
        dataset.len(),
        preview_table(dataset),
    );
    document(&body)
}

/// Shown in place of the map when the dataset has no rows.
#[must_use]
pub fn no_data_page() -> String {
    document("<p style=\"padding:20px;\">Tidak ada data untuk dipetakan.</p>")
}

/// Shown when the dataset cannot be loaded.
#[must_use]
pub fn error_page(message: &str) -> String {
    document(&format!(
        "<header><h2 style=\"margin:0;\">{TITLE}</h2></header>\
         <main><div class=\"notice error\">Gagal memuat data: {}</div></main>",
        html_escape(message)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::NaiveDate;
    use risk_map_columns::Schema;
    use risk_map_dataset::CellValue;
    use risk_map_form::render::render_form;

    fn dataset() -> Dataset {
        Dataset::with_rows(
            ["Level Resiko", "Koordinat", "Nomer Surat Permohonan Pembungkusan", "Dokumentasi"]
                .iter()
                .map(ToString::to_string)
                .collect(),
            vec![vec![
                "High".into(),
                "-7.9, 112.6".into(),
                "0".into(),
                CellValue::Empty,
            ]],
        )
        .unwrap()
    }

    #[test]
    fn index_has_form_map_and_legend() {
        let data = dataset();
        let layout = render_form(
            &Schema::classify(data.columns()),
            &data,
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
        );
        let html = index_page(&layout, &data);

        assert!(html.contains("id=\"level\""));
        assert!(html.contains("<option value=\"High\" data-color=\"#ffaa00\">High</option>"));
        assert!(html.contains("src=\"/map\""));
        assert!(html.contains("type=\"file\" data-column=\"Dokumentasi\""));
        assert!(html.contains("Legenda"));
    }

    #[test]
    fn preview_blanks_zero_in_forced_text_columns() {
        let html = preview_table(&dataset());
        assert!(html.contains("<td>High</td>"));
        assert!(!html.contains("<td>0</td>"));
    }

    #[test]
    fn error_page_escapes_message() {
        let html = error_page("<bad>");
        assert!(html.contains("&lt;bad&gt;"));
    }
}
