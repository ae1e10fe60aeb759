//! Static legend: fill by risk level, shape by letter indicator, border by
//! wrapping indicator.

use risk_map_risk_models::RiskLevel;

/// Element id of the in-map legend overlay.
pub const LEGEND_ELEMENT_ID: &str = "map-legend";

/// Border examples shown in the legend.
const BORDER_ENTRIES: &[(&str, &str)] = &[
    ("#ff6b35", "Pengiriman Usulan"),
    ("#28a745", "Realisasi Pembungkusan"),
    ("#dc3545", "Belum Ada Tindak Lanjut"),
];

/// Inner legend content, shared by the map overlay and the page's fallback
/// legend.
#[must_use]
pub fn legend_body() -> String {
    let mut html = String::from(
        "<div style=\"font-weight:600;margin-bottom:6px;color:#111;\">Level Resiko (isi)</div>",
    );

    for level in RiskLevel::all() {
        html.push_str(&format!(
            "<div style=\"display:flex;align-items:center;gap:8px;margin-bottom:6px;\">\
             <div style=\"width:16px;height:12px;background:{};border-radius:3px;box-shadow:0 0 0 1px rgba(0,0,0,0.06);\"></div>\
             <div style=\"font-size:13px;color:#111;\">{level}</div></div>",
            level.hex()
        ));
    }

    html.push_str(
        "<div style=\"font-weight:600;margin-top:8px;margin-bottom:6px;color:#111;\">Indikator Surat (bentuk)</div>\
         <div style=\"display:flex;flex-direction:column;gap:6px;margin-top:6px;\">\
         <div style=\"display:flex;align-items:center;gap:8px;\"><svg width=\"16\" height=\"16\"><circle cx=\"8\" cy=\"8\" r=\"6\" fill=\"#444\"/></svg>\
         <div style=\"font-size:13px;\">Selesai Surat - (lingkaran)</div></div>\
         <div style=\"display:flex;align-items:center;gap:8px;\"><svg width=\"16\" height=\"16\" viewBox=\"0 0 16 16\"><polygon points=\"3,3 13,3 13,13 3,13\" fill=\"#444\"/></svg>\
         <div style=\"font-size:13px;\">Surat Himbauan - (persegi)</div></div></div>\
         <div style=\"font-weight:600;margin-top:8px;margin-bottom:6px;color:#111;\">Indikator Bungkus (border)</div>\
         <div style=\"display:flex;flex-direction:column;gap:6px;margin-top:6px;\">",
    );

    for (color, label) in BORDER_ENTRIES {
        html.push_str(&format!(
            "<div style=\"display:flex;align-items:center;gap:8px;\">\
             <div style=\"width:22px;height:14px;background:#fff;border:3px solid {color};\"></div>\
             <div style=\"font-size:13px;\">{label}</div></div>"
        ));
    }

    html.push_str("</div>");
    html
}

/// The floating overlay placed in the map's top-right corner.
#[must_use]
pub fn legend_overlay() -> String {
    format!(
        "<div id=\"{LEGEND_ELEMENT_ID}\" style=\"position:absolute;top:12px;right:12px;z-index:9999;\
         background:rgba(255,255,255,0.95);padding:10px;border-radius:8px;box-shadow:0 2px 6px rgba(0,0,0,0.12);\
         font-family:Arial, sans-serif;font-size:13px;max-width:220px;pointer-events:auto;\">\
         <div style=\"font-weight:700;margin-bottom:8px;color:#0f172a;\">Legenda Peta</div>{}</div>",
        legend_body()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_every_level_color() {
        let body = legend_body();
        for level in RiskLevel::all() {
            assert!(body.contains(level.hex()));
            assert!(body.contains(&level.to_string()));
        }
        assert!(body.contains("#dc3545"));
    }

    #[test]
    fn overlay_has_element_id() {
        assert!(legend_overlay().contains("id=\"map-legend\""));
    }
}
