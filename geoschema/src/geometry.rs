//! Types de géométrie et résolution du type unique d'une collection

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

/// Type de géométrie GeoJSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum GeometryKind {
    Point,
    MultiPoint,
    LineString,
    MultiLineString,
    Polygon,
    MultiPolygon,
    GeometryCollection,
}

impl GeometryKind {
    /// Type d'une valeur de géométrie GeoJSON
    pub fn of(value: &geojson::Value) -> Self {
        match value {
            geojson::Value::Point(_) => Self::Point,
            geojson::Value::MultiPoint(_) => Self::MultiPoint,
            geojson::Value::LineString(_) => Self::LineString,
            geojson::Value::MultiLineString(_) => Self::MultiLineString,
            geojson::Value::Polygon(_) => Self::Polygon,
            geojson::Value::MultiPolygon(_) => Self::MultiPolygon,
            geojson::Value::GeometryCollection(_) => Self::GeometryCollection,
        }
    }

    /// Libellé GeoJSON (`"MultiPolygon"`, ...)
    pub fn label(self) -> &'static str {
        match self {
            Self::Point => "Point",
            Self::MultiPoint => "MultiPoint",
            Self::LineString => "LineString",
            Self::MultiLineString => "MultiLineString",
            Self::Polygon => "Polygon",
            Self::MultiPolygon => "MultiPolygon",
            Self::GeometryCollection => "GeometryCollection",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Some(match label {
            "Point" => Self::Point,
            "MultiPoint" => Self::MultiPoint,
            "LineString" => Self::LineString,
            "MultiLineString" => Self::MultiLineString,
            "Polygon" => Self::Polygon,
            "MultiPolygon" => Self::MultiPolygon,
            "GeometryCollection" => Self::GeometryCollection,
            _ => return None,
        })
    }

    /// Nom du type PostGIS utilisé dans `GEOMETRY(<type>, <srid>)`
    pub fn postgis_type(self) -> &'static str {
        match self {
            Self::Point => "POINT",
            Self::MultiPoint => "MULTIPOINT",
            Self::LineString => "LINESTRING",
            Self::MultiLineString => "MULTILINESTRING",
            Self::Polygon => "POLYGON",
            Self::MultiPolygon => "MULTIPOLYGON",
            Self::GeometryCollection => "GEOMETRYCOLLECTION",
        }
    }

    pub fn is_multi(self) -> bool {
        matches!(
            self,
            Self::MultiPoint | Self::MultiLineString | Self::MultiPolygon
        )
    }
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Type PostGIS de la colonne `geom`, `GEOMETRY` générique si aucun type n'a été résolu
pub fn postgis_type(kind: Option<GeometryKind>) -> &'static str {
    kind.map_or("GEOMETRY", GeometryKind::postgis_type)
}

/// Choisit un type unique pour toute la collection.
///
/// Priorité: polygones, puis lignes, puis points. Une famille présente
/// (variante simple ou multiple) donne toujours le type multiple, ce qui permet
/// de stocker les deux variantes dans la même table. Sinon le seul type
/// observé est conservé tel quel; `None` si aucune géométrie.
pub fn resolve_geometry_type(kinds: &BTreeSet<GeometryKind>) -> Option<GeometryKind> {
    use GeometryKind::*;

    let has = |single, multi| kinds.contains(&single) || kinds.contains(&multi);

    if has(Polygon, MultiPolygon) {
        Some(MultiPolygon)
    } else if has(LineString, MultiLineString) {
        Some(MultiLineString)
    } else if has(Point, MultiPoint) {
        Some(MultiPoint)
    } else {
        kinds.iter().next().copied()
    }
}
