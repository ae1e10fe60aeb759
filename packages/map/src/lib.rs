#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Map builder for observation datasets.
//!
//! [`build_map`] turns a [`Dataset`] into a [`RiskMap`]: one styled marker
//! per row with resolvable coordinates, centered on their mean, plus a
//! legend overlay. Row-level problems only degrade that row's styling;
//! a dataset without rows yields `None`.
//!
//! The map renders to a standalone Leaflet HTML document with
//! [`RiskMap::to_html`].

pub mod cache;
pub mod coords;
pub mod legend;
pub mod popup;
pub mod style;

use risk_map_columns::{ColumnRole, DerivedField, Schema};
use risk_map_dataset::Dataset;
use risk_map_risk_models::IndicatorFamily;
use serde::{Deserialize, Serialize};

use crate::popup::PopupColumns;
use crate::style::MarkerShape;

/// Leaflet release loaded by the rendered page.
const LEAFLET_VERSION: &str = "1.9.4";

/// Errors attaching elements to a map.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MapError {
    /// An element with the same id is already attached.
    #[error("Element '{id}' is already attached")]
    DuplicateElement {
        /// Element id.
        id: String,
    },

    /// The element has no content.
    #[error("Element '{id}' is empty")]
    EmptyElement {
        /// Element id.
        id: String,
    },
}

/// Display settings for a map build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapOptions {
    /// Column holding a preferred per-row hex color.
    pub color_column: String,
    /// Columns listed in popups.
    pub popup_columns: PopupColumns,
    /// Popup panel width in pixels.
    pub popup_width: u32,
    /// Popup panel height in pixels.
    pub popup_height: u32,
    /// Attach the legend overlay.
    pub show_legend: bool,
    /// Initial zoom level.
    pub zoom: u8,
    /// Path prefix of locally served files, linked in popups alongside
    /// `http(s)://` URLs.
    pub local_link_prefix: Option<String>,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            color_column: "Color".to_string(),
            popup_columns: PopupColumns::All,
            popup_width: 450,
            popup_height: 500,
            show_legend: true,
            zoom: 12,
            local_link_prefix: None,
        }
    }
}

/// Columns the map reads, located once per build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapColumns {
    /// Dedicated latitude column.
    pub latitude: Option<String>,
    /// Dedicated longitude column.
    pub longitude: Option<String>,
    /// Combined `"lat, lon"` column.
    pub coordinate: Option<String>,
    /// The row's own `Color`/`Warna` column.
    pub row_color: Option<String>,
    /// Caller-preferred color column, if present in the dataset.
    pub preferred_color: Option<String>,
    /// Risk level column.
    pub level: Option<String>,
    /// Letter indicator column (drives shape).
    pub letter_indicator: Option<String>,
    /// Wrapping indicator column (drives border).
    pub wrapping_indicator: Option<String>,
}

impl MapColumns {
    /// Locates the columns from a classified schema.
    #[must_use]
    pub fn locate(schema: &Schema, preferred_color: &str) -> Self {
        let first = |role| schema.first_with_role(role).map(ToString::to_string);
        Self {
            latitude: first(ColumnRole::Derived(DerivedField::Latitude)),
            longitude: first(ColumnRole::Derived(DerivedField::Longitude)),
            coordinate: first(ColumnRole::Derived(DerivedField::Coordinate)),
            row_color: first(ColumnRole::Derived(DerivedField::Color)),
            preferred_color: schema
                .role_of(preferred_color)
                .map(|_| preferred_color.to_string()),
            level: schema.level_column().map(ToString::to_string),
            letter_indicator: first(ColumnRole::Indicator(IndicatorFamily::Surat))
                .or_else(|| find_indicator(schema, "surat")),
            wrapping_indicator: first(ColumnRole::Indicator(IndicatorFamily::Bungkus))
                .or_else(|| find_indicator(schema, "bungkus")),
        }
    }
}

/// Any column mentioning both "indikator" and `keyword`.
fn find_indicator(schema: &Schema, keyword: &str) -> Option<String> {
    schema
        .columns()
        .iter()
        .map(|c| &c.name)
        .find(|name| {
            let lower = name.to_lowercase();
            lower.contains("indikator") && lower.contains(keyword)
        })
        .cloned()
}

/// One rendered point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lon: f64,
    /// Fill color.
    pub fill: String,
    /// Border color.
    pub border: String,
    /// Outline shape.
    pub shape: MarkerShape,
    /// Popup panel HTML.
    pub popup: String,
}

/// An extra HTML element attached to the page root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootElement {
    /// Unique element id.
    pub id: String,
    /// Element HTML.
    pub html: String,
}

/// A renderable map.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskMap {
    /// Initial center.
    pub center: (f64, f64),
    /// Initial zoom.
    pub zoom: u8,
    /// Markers in dataset order.
    pub markers: Vec<Marker>,
    /// Popup panel size in pixels.
    pub popup_size: (u32, u32),
    root_elements: Vec<RootElement>,
}

impl RiskMap {
    /// Creates an empty map.
    #[must_use]
    pub const fn new(center: (f64, f64), zoom: u8, popup_size: (u32, u32)) -> Self {
        Self {
            center,
            zoom,
            markers: Vec::new(),
            popup_size,
            root_elements: Vec::new(),
        }
    }

    /// Attaches an element to the page root.
    ///
    /// # Errors
    ///
    /// * [`MapError::DuplicateElement`] if `id` is already attached.
    /// * [`MapError::EmptyElement`] if `html` is blank.
    pub fn add_child(&mut self, id: &str, html: String) -> Result<(), MapError> {
        if self.root_elements.iter().any(|e| e.id == id) {
            return Err(MapError::DuplicateElement { id: id.to_string() });
        }
        if html.trim().is_empty() {
            return Err(MapError::EmptyElement { id: id.to_string() });
        }
        self.root_elements.push(RootElement {
            id: id.to_string(),
            html,
        });
        Ok(())
    }

    /// Elements attached to the page root.
    #[must_use]
    pub fn root_elements(&self) -> &[RootElement] {
        &self.root_elements
    }

    /// Renders a standalone Leaflet HTML document.
    #[must_use]
    pub fn to_html(&self) -> String {
        let markers = serde_json::to_string(&self.markers)
            .unwrap_or_else(|e| {
                log::warn!("Failed to serialize markers: {e}");
                "[]".to_string()
            })
            .replace("</", "<\\/");
        let (lat, lon) = self.center;
        let (width, height) = self.popup_size;
        let elements: String = self
            .root_elements
            .iter()
            .map(|e| e.html.as_str())
            .collect();

        format!(
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<link rel="stylesheet" href="https://unpkg.com/leaflet@{LEAFLET_VERSION}/dist/leaflet.css">
<script src="https://unpkg.com/leaflet@{LEAFLET_VERSION}/dist/leaflet.js"></script>
<style>html, body {{ margin: 0; height: 100%; }} #map {{ position: absolute; inset: 0; }}</style>
</head>
<body>
<div id="map"></div>
{elements}
<script>
const map = L.map("map").setView([{lat}, {lon}], {zoom});
L.tileLayer("https://{{s}}.tile.openstreetmap.org/{{z}}/{{x}}/{{y}}.png", {{
  maxZoom: 19,
  attribution: "&copy; OpenStreetMap contributors"
}}).addTo(map);
const markers = {markers};
for (const m of markers) {{
  const popup = L.popup({{ maxWidth: {width} }}).setContent(
    `<div style="width:{width}px;height:{height}px;overflow:auto;">${{m.popup}}</div>`
  );
  let marker;
  if (m.shape === "square") {{
    marker = L.marker([m.lat, m.lon], {{
      icon: L.divIcon({{
        className: "",
        iconSize: [20, 20],
        html: `<div style="width:14px;height:14px;background:${{m.fill}};opacity:0.9;border:3px solid ${{m.border}};"></div>`
      }})
    }});
  }} else {{
    marker = L.circleMarker([m.lat, m.lon], {{
      radius: 8, color: m.border, weight: 3, fill: true, fillColor: m.fill, fillOpacity: 0.9
    }});
  }}
  marker.bindPopup(popup).addTo(map);
}}
</script>
</body>
</html>
"#,
            zoom = self.zoom,
        )
    }
}

/// Result of [`build_map`]: the map plus whether the legend overlay made
/// it onto the map.
#[derive(Debug, Clone, PartialEq)]
pub struct MapBuild {
    /// The built map.
    pub map: RiskMap,
    /// `false` when the legend was requested but could not be attached.
    /// Callers should then show a legend outside the map.
    pub legend_attached: bool,
}

/// Attaches the legend overlay. Returns `false` if attaching failed.
pub fn attach_legend(map: &mut RiskMap) -> bool {
    match map.add_child(legend::LEGEND_ELEMENT_ID, legend::legend_overlay()) {
        Ok(()) => true,
        Err(e) => {
            log::warn!("Legend overlay not attached: {e}");
            false
        }
    }
}

/// Builds a map from every row of `dataset`.
///
/// Returns `None` for a dataset without rows. Rows whose coordinates cannot
/// be resolved are skipped.
#[must_use]
pub fn build_map(dataset: &Dataset, options: &MapOptions) -> Option<MapBuild> {
    if dataset.is_empty() {
        log::info!("Tidak ada data untuk dipetakan");
        return None;
    }

    let schema = Schema::classify(dataset.columns());
    let columns = MapColumns::locate(&schema, &options.color_column);

    let positioned: Vec<_> = dataset
        .records()
        .filter_map(|record| coords::resolve(&record, &columns).map(|p| (record, p)))
        .collect();
    let points: Vec<(f64, f64)> = positioned.iter().map(|(_, p)| *p).collect();

    let mut map = RiskMap::new(
        coords::centroid(&points),
        options.zoom,
        (options.popup_width, options.popup_height),
    );

    map.markers = positioned
        .iter()
        .map(|(record, (lat, lon))| {
            let (shape, border, fill) = style::style_for(record, &columns);
            let shown = popup::select_columns(record, &options.popup_columns);
            Marker {
                lat: *lat,
                lon: *lon,
                fill,
                border: border.to_string(),
                shape,
                popup: popup::popup_html(
                    record,
                    &shown,
                    options.popup_width,
                    options.local_link_prefix.as_deref(),
                ),
            }
        })
        .collect();

    log::debug!(
        "Built map with {} markers from {} rows",
        map.markers.len(),
        dataset.len()
    );

    let legend_attached = options.show_legend && attach_legend(&mut map);

    Some(MapBuild {
        map,
        legend_attached,
    })
}
