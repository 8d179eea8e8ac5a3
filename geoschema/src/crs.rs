//! Détection du système de coordonnées source

use std::sync::OnceLock;

use geojson::FeatureCollection;
use regex::Regex;
use serde::Serialize;

/// WGS 84, utilisé par défaut en source comme en cible
pub const DEFAULT_SRID: u32 = 4326;

/// Provenance du SRID source retenu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SridOrigin {
    /// Fourni explicitement par l'appelant
    Explicit,
    /// Lu dans le bloc `crs` du document
    Detected,
    /// Aucune information: WGS 84 supposé
    Defaulted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SridResolution {
    pub srid: u32,
    pub origin: SridOrigin,
}

fn epsg_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // EPSG:3857, urn:ogc:def:crs:EPSG::3857, urn:ogc:def:crs:EPSG:6.6:3857
    RE.get_or_init(|| {
        Regex::new(r"(?i)EPSG:(?:[0-9.]*:)?([0-9]+)\s*$").expect("static EPSG regex is valid")
    })
}

/// Extrait le code EPSG d'un nom de CRS
pub fn epsg_from_name(name: &str) -> Option<u32> {
    epsg_regex()
        .captures(name)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Lit le bloc `{"type": "name", "properties": {"name": "...EPSG:<code>"}}`
pub fn detect_source_srid(collection: &FeatureCollection) -> Option<u32> {
    let crs = collection.foreign_members.as_ref()?.get("crs")?;
    if crs.get("type")?.as_str()? != "name" {
        return None;
    }
    let name = crs.get("properties")?.get("name")?.as_str()?;
    epsg_from_name(name)
}

/// SRID explicite, sinon détecté dans le document, sinon 4326
pub fn resolve_source_srid(explicit: Option<u32>, collection: &FeatureCollection) -> SridResolution {
    if let Some(srid) = explicit {
        return SridResolution {
            srid,
            origin: SridOrigin::Explicit,
        };
    }

    match detect_source_srid(collection) {
        Some(srid) => SridResolution {
            srid,
            origin: SridOrigin::Detected,
        },
        None => SridResolution {
            srid: DEFAULT_SRID,
            origin: SridOrigin::Defaulted,
        },
    }
}
