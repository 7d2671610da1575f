//! Style document model
//!
//! Only the parts of a MapLibre-style document that decide which tiles are
//! needed are modelled: the source table, the ordered layer list and the
//! glyphs endpoint. Everything else a layer carries is kept verbatim in
//! `extra` for the loaders that need it.

use crate::core::constants::{DEFAULT_MAX_ZOOM, DEFAULT_MIN_ZOOM, DEFAULT_TILE_SIZE};
use crate::{Error, Result};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::Index;

/// Source type tag, closed over the families this crate schedules
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SourceKind {
    Raster,
    Vector,
    Geojson,
    /// Any type this build does not understand, with its original tag
    Unsupported(String),
}

impl SourceKind {
    /// Vector-family sources are tiled on workers and need referencing layers
    pub fn is_vector_family(&self) -> bool {
        matches!(self, Self::Vector | Self::Geojson)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Raster => "raster",
            Self::Vector => "vector",
            Self::Geojson => "geojson",
            Self::Unsupported(tag) => tag,
        }
    }
}

impl From<String> for SourceKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "raster" => Self::Raster,
            "vector" => Self::Vector,
            "geojson" => Self::Geojson,
            _ => Self::Unsupported(tag),
        }
    }
}

impl From<SourceKind> for String {
    fn from(kind: SourceKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the style's `sources` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceDescriptor {
    #[serde(rename = "type")]
    pub kind: SourceKind,
    /// TileJSON endpoint, resolved by the loader
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Tile URL templates with `{z}`, `{x}` and `{y}` placeholders
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tiles: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tile_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minzoom: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maxzoom: Option<u8>,
    /// Inline document or URL for GeoJSON sources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribution: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl SourceDescriptor {
    /// Bare descriptor of the given type with every parameter defaulted
    pub fn new(kind: SourceKind) -> Self {
        Self {
            kind,
            url: None,
            tiles: Vec::new(),
            tile_size: None,
            minzoom: None,
            maxzoom: None,
            data: None,
            attribution: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_tiles<I, S>(mut self, tiles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tiles = tiles.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_zoom_range(mut self, minzoom: u8, maxzoom: u8) -> Self {
        self.minzoom = Some(minzoom);
        self.maxzoom = Some(maxzoom);
        self
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size.unwrap_or(DEFAULT_TILE_SIZE)
    }

    pub fn min_zoom(&self) -> u8 {
        self.minzoom.unwrap_or(DEFAULT_MIN_ZOOM)
    }

    pub fn max_zoom(&self) -> u8 {
        self.maxzoom.unwrap_or(DEFAULT_MAX_ZOOM)
    }
}

/// One entry of the style's ordered `layers` list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleLayer {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl StyleLayer {
    pub fn new(id: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: Some(source.into()),
            kind: None,
            extra: serde_json::Map::new(),
        }
    }

    /// A layer that draws without a source, such as a background fill
    pub fn sourceless(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: None,
            kind: None,
            extra: serde_json::Map::new(),
        }
    }
}

/// The style's `sources` table, kept in document order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceTable {
    entries: Vec<(String, SourceDescriptor)>,
}

impl SourceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces an existing entry in place, otherwise appends
    pub fn insert(&mut self, key: String, source: SourceDescriptor) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = source,
            None => self.entries.push((key, source)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&SourceDescriptor> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, source)| source)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SourceDescriptor)> {
        self.entries.iter().map(|(key, source)| (key, source))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Index<&str> for SourceTable {
    type Output = SourceDescriptor;

    fn index(&self, key: &str) -> &SourceDescriptor {
        match self.get(key) {
            Some(source) => source,
            None => panic!("no source '{}' in style", key),
        }
    }
}

impl Serialize for SourceTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, source) in &self.entries {
            map.serialize_entry(key, source)?;
        }
        map.end()
    }
}

struct SourceTableVisitor;

impl<'de> Visitor<'de> for SourceTableVisitor {
    type Value = SourceTable;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of source ids to source descriptors")
    }

    fn visit_map<A>(self, mut access: A) -> std::result::Result<SourceTable, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut table = SourceTable::new();
        while let Some((key, source)) = access.next_entry::<String, SourceDescriptor>()? {
            table.insert(key, source);
        }
        Ok(table)
    }
}

impl<'de> Deserialize<'de> for SourceTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(SourceTableVisitor)
    }
}

/// Read-only style input
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Style {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u8>,
    #[serde(default)]
    pub sources: SourceTable,
    #[serde(default)]
    pub layers: Vec<StyleLayer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glyphs: Option<String>,
}

impl Style {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a style document from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(Error::Style)
    }

    /// Parse a style document from any reader
    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self> {
        serde_json::from_reader(reader).map_err(Error::Style)
    }

    pub fn with_source(mut self, key: impl Into<String>, source: SourceDescriptor) -> Self {
        self.sources.insert(key.into(), source);
        self
    }

    pub fn with_layer(mut self, layer: StyleLayer) -> Self {
        self.layers.push(layer);
        self
    }

    pub fn with_glyphs(mut self, glyphs: impl Into<String>) -> Self {
        self.glyphs = Some(glyphs.into());
        self
    }

    /// Layers drawing from `source_key`, in style order
    pub fn layers_for_source<'a>(
        &'a self,
        source_key: &'a str,
    ) -> impl Iterator<Item = &'a StyleLayer> + 'a {
        self.layers
            .iter()
            .filter(move |layer| layer.source.as_deref() == Some(source_key))
    }
}
