mod read;

use ahash::AHashMap;
use anyhow::{ensure, Result};
use geo::MultiPolygon;
use polars::{frame::DataFrame, prelude::DataType};

pub use read::{layer_path, load_layers, read_geojson, read_shapefile};

/// Column holding the P-code of admin level `k`.
#[inline] pub fn pcode_column(k: u8) -> String { format!("adm{k}_pcode") }

/// Column holding the name of admin level `k` in language slot `slot`.
#[inline]
pub fn name_column(k: u8, slot: usize) -> String {
    if slot == 0 { format!("adm{k}_name") } else { format!("adm{k}_name{slot}") }
}

/// Column holding the language tag of name slot `slot`.
#[inline]
pub fn lang_column(slot: usize) -> String {
    if slot == 0 { "lang".to_string() } else { format!("lang{slot}") }
}

/// The boundary features of one country at one admin level.
///
/// `geoms[i]`, `malformed[i]` and row `i` of `data` describe the same feature.
#[derive(Debug, Clone)]
pub struct BoundaryLayer {
    pub iso3: String,
    pub level: u8,
    pub geoms: Vec<MultiPolygon<f64>>,
    /// Source rings that were open or too short before parsing closed them.
    pub malformed: Vec<bool>,
    pub data: DataFrame,
}

impl BoundaryLayer {
    pub fn new(iso3: &str, level: u8, geoms: Vec<MultiPolygon<f64>>, data: DataFrame) -> Result<Self> {
        ensure!(data.width() == 0 || data.height() == geoms.len(),
            "[layer] {iso3} admin{level}: {} geometries but {} attribute rows", geoms.len(), data.height());
        let malformed = vec![false; geoms.len()];
        Ok(Self { iso3: iso3.to_ascii_uppercase(), level, geoms, malformed, data })
    }

    /// Mark features whose source rings were malformed.
    pub fn with_malformed(mut self, malformed: Vec<bool>) -> Result<Self> {
        ensure!(malformed.len() == self.geoms.len(),
            "[layer] {} admin{}: {} ring flags for {} geometries", self.iso3, self.level, malformed.len(), self.geoms.len());
        self.malformed = malformed;
        Ok(self)
    }

    #[inline] pub fn len(&self) -> usize { self.geoms.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.geoms.is_empty() }

    #[inline] pub fn has_column(&self, name: &str) -> bool { self.data.column(name).is_ok() }

    pub fn column_names(&self) -> Vec<String> {
        self.data.get_column_names().iter().map(|n| n.to_string()).collect()
    }

    /// A column as strings, one entry per feature, or `None` if it is absent.
    /// Non-string columns are rendered as text.
    pub fn text(&self, name: &str) -> Option<Vec<Option<String>>> {
        let col = self.data.column(name).ok()?;
        let col = if col.dtype() == &DataType::String { col.clone() } else { col.cast(&DataType::String).ok()? };
        let values = col.str().ok()?.into_iter().map(|v| v.map(str::to_string)).collect();
        Some(values)
    }

    /// Like `text`, but an absent column yields all nulls.
    pub fn text_or_null(&self, name: &str) -> Vec<Option<String>> {
        self.text(name).unwrap_or_else(|| vec![None; self.len()])
    }

    /// Number of null cells in a column (all of them if absent).
    pub fn null_count(&self, name: &str) -> usize {
        self.data.column(name).map(|c| c.null_count()).unwrap_or(self.len())
    }

    /// The feature's own-level P-codes.
    #[inline] pub fn pcodes(&self) -> Vec<Option<String>> { self.text_or_null(&pcode_column(self.level)) }

    /// Index of the first feature carrying each own-level P-code.
    pub fn pcode_index(&self) -> AHashMap<String, usize> {
        let mut index = AHashMap::new();
        for (i, pcode) in self.pcodes().into_iter().enumerate() {
            if let Some(pcode) = pcode.filter(|p| !p.trim().is_empty()) {
                index.entry(pcode).or_insert(i);
            }
        }
        index
    }

    /// Human-readable identifiers for features, used in findings.
    pub fn feature_ids(&self) -> Vec<String> {
        self.pcodes().into_iter().enumerate()
            .map(|(i, pcode)| pcode.filter(|p| !p.trim().is_empty()).unwrap_or_else(|| format!("#{i}")))
            .collect()
    }
}

/// The layer one level above `layer`, if loaded.
pub fn parent_layer<'a>(layers: &'a [BoundaryLayer], layer: &BoundaryLayer) -> Option<&'a BoundaryLayer> {
    let level = layer.level.checked_sub(1)?;
    layers.iter().find(|l| l.level == level)
}

/// For every feature of `layer`, the row of its declared parent in `parent`.
pub fn parent_rows(layer: &BoundaryLayer, parent: &BoundaryLayer) -> Vec<Option<usize>> {
    let index = parent.pcode_index();
    layer.text_or_null(&pcode_column(parent.level)).into_iter()
        .map(|p| p.and_then(|p| index.get(&p).copied()))
        .collect()
}
