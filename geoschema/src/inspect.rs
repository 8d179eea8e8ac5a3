//! Inspection d'un document GeoJSON: comptage, type de géométrie, propriétés

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::Path;

use geo::BoundingRect;
use geojson::{Feature, FeatureCollection, GeoJson, JsonObject};
use serde::Serialize;
use tracing::{debug, info};

use crate::encoding::{decode_text, default_encodings, SourceEncoding};
use crate::geometry::{resolve_geometry_type, GeometryKind};
use crate::InspectError;

/// Emprise d'une collection
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Extent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Extent {
    fn from_rect(rect: geo::Rect<f64>) -> Self {
        Self {
            min_x: rect.min().x,
            min_y: rect.min().y,
            max_x: rect.max().x,
            max_y: rect.max().y,
        }
    }

    fn merge(self, other: Self) -> Self {
        Self {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Coordonnées hors de la plage longitude/latitude
    pub fn looks_projected(&self) -> bool {
        self.min_x < -180.0 || self.max_x > 180.0 || self.min_y < -90.0 || self.max_y > 90.0
    }
}

/// Résultat de l'inspection d'un document
#[derive(Debug)]
pub struct Inspection {
    /// Nombre de features
    pub feature_count: usize,

    /// Types de géométrie distincts rencontrés
    pub geometry_types: BTreeSet<GeometryKind>,

    /// Type retenu pour la table (`None` si aucune géométrie)
    pub geometry_type: Option<GeometryKind>,

    /// Propriétés de la première feature, dans l'ordre du document
    pub properties: JsonObject,

    /// Emprise de toutes les géométries
    pub extent: Option<Extent>,

    /// Encodage utilisé pour décoder le fichier
    pub encoding: &'static str,

    /// Document complet
    pub collection: FeatureCollection,
}

impl Inspection {
    pub fn features(&self) -> &[Feature] {
        &self.collection.features
    }

    /// Résumé lisible (diagnostic uniquement)
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let types: Vec<&str> = self.geometry_types.iter().map(|k| k.label()).collect();

        let _ = writeln!(out, "GeoJSON Analysis:");
        let _ = writeln!(out, "Encoding: {}", self.encoding);
        let _ = writeln!(out, "Total features: {}", self.feature_count);
        let _ = writeln!(out, "Geometry types found: {}", types.join(", "));
        let _ = writeln!(
            out,
            "Selected geometry type for table: {}",
            self.geometry_type
                .map_or("None (generic GEOMETRY)", GeometryKind::label)
        );
        if let Some(e) = &self.extent {
            let _ = writeln!(
                out,
                "Extent: [{}, {}, {}, {}]",
                e.min_x, e.min_y, e.max_x, e.max_y
            );
        }
        let _ = writeln!(out, "Properties structure:");
        let _ = write!(
            out,
            "{}",
            serde_json::to_string_pretty(&self.properties).unwrap_or_else(|_| "{}".into())
        );
        out
    }
}

/// Inspecte un fichier GeoJSON
pub fn inspect_path(path: &Path) -> Result<Inspection, InspectError> {
    let bytes = std::fs::read(path).map_err(|e| InspectError::io(path, e))?;
    info!(path = %path.display(), bytes = bytes.len(), "Inspecting GeoJSON");
    inspect_bytes(&bytes)
}

/// Inspecte un contenu brut avec la liste d'encodages par défaut
pub fn inspect_bytes(bytes: &[u8]) -> Result<Inspection, InspectError> {
    inspect_bytes_with(bytes, &default_encodings())
}

/// Inspecte un contenu brut en essayant les encodages dans l'ordre donné
pub fn inspect_bytes_with(
    bytes: &[u8],
    encodings: &[SourceEncoding],
) -> Result<Inspection, InspectError> {
    let (text, encoding) = decode_text(bytes, encodings)?;
    let collection = parse_collection(&text)?;
    Ok(inspect_collection(collection, encoding.label()))
}

/// Inspecte un texte déjà décodé
pub fn inspect_str(text: &str) -> Result<Inspection, InspectError> {
    let collection = parse_collection(text)?;
    Ok(inspect_collection(collection, "UTF-8"))
}

fn parse_collection(text: &str) -> Result<FeatureCollection, InspectError> {
    match text.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(fc) => Ok(fc),
        GeoJson::Feature(_) => Err(InspectError::NotACollection("Feature")),
        GeoJson::Geometry(_) => Err(InspectError::NotACollection("Geometry")),
    }
}

/// Analyse une collection déjà parsée
pub fn inspect_collection(collection: FeatureCollection, encoding: &'static str) -> Inspection {
    let mut geometry_types = BTreeSet::new();
    let mut extent: Option<Extent> = None;

    for feature in &collection.features {
        let Some(geometry) = &feature.geometry else {
            continue;
        };
        geometry_types.insert(GeometryKind::of(&geometry.value));

        if let Some(rect) = geometry_extent(geometry) {
            extent = Some(match extent {
                Some(e) => e.merge(rect),
                None => rect,
            });
        }
    }

    let properties = collection
        .features
        .first()
        .and_then(|f| f.properties.clone())
        .unwrap_or_default();

    let geometry_type = resolve_geometry_type(&geometry_types);
    debug!(
        features = collection.features.len(),
        types = ?geometry_types,
        resolved = ?geometry_type,
        "Collection inspected"
    );

    Inspection {
        feature_count: collection.features.len(),
        geometry_types,
        geometry_type,
        properties,
        extent,
        encoding,
        collection,
    }
}

fn geometry_extent(geometry: &geojson::Geometry) -> Option<Extent> {
    let geom = geo::Geometry::<f64>::try_from(geometry.clone()).ok()?;
    geom.bounding_rect().map(Extent::from_rect)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(x: f64, y: f64, props: &str) -> String {
        format!(
            r#"{{"type":"Feature","geometry":{{"type":"Point","coordinates":[{x},{y}]}},"properties":{props}}}"#
        )
    }

    fn collection(features: &[String]) -> String {
        format!(
            r#"{{"type":"FeatureCollection","features":[{}]}}"#,
            features.join(",")
        )
    }

    #[test]
    fn test_inspect_points() {
        let doc = collection(&[
            point(1.0, 2.0, r#"{"label":"A"}"#),
            point(3.0, 4.0, r#"{"label":"B"}"#),
            point(-1.0, 0.5, r#"{"label":"C"}"#),
        ]);
        let inspection = inspect_str(&doc).unwrap();

        assert_eq!(inspection.feature_count, 3);
        assert_eq!(
            inspection.geometry_types,
            BTreeSet::from([GeometryKind::Point])
        );
        assert_eq!(inspection.geometry_type, Some(GeometryKind::MultiPoint));
        assert_eq!(inspection.properties.get("label").unwrap(), "A");
        assert_eq!(
            inspection.extent,
            Some(Extent {
                min_x: -1.0,
                min_y: 0.5,
                max_x: 3.0,
                max_y: 4.0
            })
        );
        assert!(!inspection.extent.unwrap().looks_projected());
    }

    #[test]
    fn test_mixed_polygons() {
        let doc = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{},"geometry":{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,0]]]}},
            {"type":"Feature","properties":{},"geometry":{"type":"MultiPolygon","coordinates":[[[[0,0],[2,0],[2,2],[0,0]]]]}}
        ]}"#;
        let inspection = inspect_str(doc).unwrap();
        assert_eq!(inspection.geometry_types.len(), 2);
        assert_eq!(inspection.geometry_type, Some(GeometryKind::MultiPolygon));
    }

    #[test]
    fn test_null_geometry_and_properties() {
        let doc = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","geometry":null,"properties":null}
        ]}"#;
        let inspection = inspect_str(doc).unwrap();
        assert_eq!(inspection.feature_count, 1);
        assert!(inspection.geometry_types.is_empty());
        assert_eq!(inspection.geometry_type, None);
        assert!(inspection.properties.is_empty());
        assert!(inspection.extent.is_none());
    }

    #[test]
    fn test_empty_collection() {
        let inspection = inspect_str(r#"{"type":"FeatureCollection","features":[]}"#).unwrap();
        assert_eq!(inspection.feature_count, 0);
        assert_eq!(inspection.geometry_type, None);
    }

    #[test]
    fn test_not_a_collection() {
        let err = inspect_str(r#"{"type":"Point","coordinates":[1,2]}"#).unwrap_err();
        assert!(matches!(err, InspectError::NotACollection("Geometry")));
    }

    #[test]
    fn test_parse_error() {
        let err = inspect_str("{not json").unwrap_err();
        assert!(matches!(err, InspectError::Parse(_)));
    }

    #[test]
    fn test_projected_extent() {
        let doc = collection(&[point(500000.0, 4649776.0, "{}")]);
        let inspection = inspect_str(&doc).unwrap();
        assert!(inspection.extent.unwrap().looks_projected());
    }

    #[test]
    fn test_summary() {
        let doc = collection(&[point(1.0, 2.0, r#"{"label":"A","n":1}"#)]);
        let summary = inspect_str(&doc).unwrap().summary();
        assert!(summary.contains("Total features: 1"));
        assert!(summary.contains("Geometry types found: Point"));
        assert!(summary.contains("Selected geometry type for table: MultiPoint"));
        assert!(summary.contains("\"label\": \"A\""));
    }

    #[test]
    fn test_latin1_bytes() {
        let mut bytes = br#"{"type":"FeatureCollection","features":[{"type":"Feature","geometry":null,"properties":{"nom":"Gen"#.to_vec();
        bytes.push(0xE8); // è en Latin-1
        bytes.extend_from_slice(br#"ve"}}]}"#);

        let inspection = inspect_bytes(&bytes).unwrap();
        assert_eq!(inspection.encoding, "ISO-8859-1");
        assert_eq!(inspection.properties.get("nom").unwrap(), "Genève");
    }
}
