//! Tests d'intégration: fichiers GeoJSON sur disque → schéma → DDL

use std::io::Write;

use geoschema::{
    inspect_path, resolve_source_srid, GeometryKind, InspectError, SridOrigin, TableSchema,
};

fn write_fixture(dir: &tempfile::TempDir, name: &str, content: &[u8]) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content).unwrap();
    path
}

#[test]
fn test_file_to_ddl() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(
        &dir,
        "utah-dams.geojson",
        br#"{
            "type": "FeatureCollection",
            "crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::26912"}},
            "features": [
                {"type": "Feature",
                 "properties": {"NAME": "Strawberry", "TYPE": "Earth", "HEIGHT": 72, "AREA": 1.5, "ACTIVE": true},
                 "geometry": {"type": "Polygon", "coordinates": [[[450000,4440000],[451000,4440000],[451000,4441000],[450000,4440000]]]}},
                {"type": "Feature",
                 "properties": {"NAME": "Jordanelle", "TYPE": "Rockfill", "HEIGHT": 90, "AREA": 2.25, "ACTIVE": false},
                 "geometry": {"type": "MultiPolygon", "coordinates": [[[[460000,4450000],[461000,4450000],[461000,4451000],[460000,4450000]]]]}}
            ]
        }"#,
    );

    let inspection = inspect_path(&path).unwrap();
    assert_eq!(inspection.feature_count, 2);
    assert_eq!(inspection.geometry_type, Some(GeometryKind::MultiPolygon));
    assert!(inspection.extent.unwrap().looks_projected());

    let srid = resolve_source_srid(None, &inspection.collection);
    assert_eq!(srid.srid, 26912);
    assert_eq!(srid.origin, SridOrigin::Detected);

    let table = geoschema::ident::sanitize_table_name("utah-dams").unwrap();
    let schema = TableSchema::from_properties(
        "public",
        &table,
        &inspection.properties,
        inspection.geometry_type,
        4326,
    )
    .unwrap();

    let ddl_path = schema.write_ddl(dir.path()).unwrap();
    let ddl = std::fs::read_to_string(ddl_path).unwrap();
    assert!(ddl.contains("\"public\".\"utah_dams\""));
    assert!(ddl.contains("\"NAME\" TEXT"));
    assert!(ddl.contains("\"HEIGHT\" INTEGER"));
    assert!(ddl.contains("\"AREA\" NUMERIC"));
    assert!(ddl.contains("\"ACTIVE\" BOOLEAN"));
    assert!(ddl.contains("geom GEOMETRY(MULTIPOLYGON, 4326)"));
}

#[test]
fn test_cp1252_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut content =
        br#"{"type":"FeatureCollection","features":[{"type":"Feature","geometry":{"type":"Point","coordinates":[2.35,48.85]},"properties":{"nom":"Orl"#
            .to_vec();
    content.push(0xE9);
    content.extend_from_slice(br#"ans"}}]}"#);
    let path = write_fixture(&dir, "latin.geojson", &content);

    let inspection = inspect_path(&path).unwrap();
    assert_ne!(inspection.encoding, "UTF-8");
    assert_eq!(inspection.properties["nom"], "Orléans");
}

#[test]
fn test_missing_file() {
    let err = inspect_path(std::path::Path::new("/nonexistent/file.geojson")).unwrap_err();
    assert!(matches!(err, InspectError::Io { .. }));
    assert!(err.to_string().contains("/nonexistent/file.geojson"));
}

#[test]
fn test_invalid_document() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(&dir, "broken.geojson", br#"{"type":"FeatureCollection","features":["#);
    let err = inspect_path(&path).unwrap_err();
    assert!(matches!(err, InspectError::Parse(_)));
}
