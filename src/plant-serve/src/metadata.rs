//! Species metadata loaded once from a JSON document.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use log::{info, warn};
use reqwest::Url;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Public base URL of the object store.
pub const PUBLIC_STORAGE_URL: &str = "https://storage.googleapis.com";

/// Descriptive record for one species.
///
/// The document is edited by hand, so known fields accept loose shapes: a
/// numeric string for the level, `null` or a single string for the photos.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeciesRecord {
    #[serde(
        rename = "descripcion",
        default,
        deserialize_with = "loose_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<String>,

    #[serde(
        rename = "otros_detalles",
        default,
        deserialize_with = "loose_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub other_details: Option<String>,

    /// Game level from which the species is shown
    #[serde(
        rename = "dificultad",
        default,
        deserialize_with = "loose_level",
        skip_serializing_if = "Option::is_none"
    )]
    pub difficulty: Option<u32>,

    /// Absolute URLs or object keys inside the bucket
    #[serde(rename = "fotos", default, deserialize_with = "loose_photos")]
    pub photos: Vec<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

fn loose_text<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

fn loose_level<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<u32>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn loose_photos<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Vec<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        Value::String(s) => vec![s],
        _ => Vec::new(),
    })
}

/// Lookup key normalization: literal `%20` becomes a space, surrounding
/// whitespace is dropped, and the result is lower-cased.
pub fn normalize_name(name: &str) -> String {
    name.replace("%20", " ").trim().to_lowercase()
}

/// Expand an object key into its public URL. Anything that already starts
/// with `http` is returned as is.
pub fn expand_photo_url(bucket: &str, photo: &str) -> String {
    if photo.starts_with("http") {
        photo.to_owned()
    } else {
        format!("{}/{}/{}", PUBLIC_STORAGE_URL, bucket, photo)
    }
}

/// Path of the detail page for `name`, with the name percent-encoded as a
/// single segment.
pub fn species_path(name: &str) -> String {
    let Ok(mut url) = Url::parse("http://localhost/planta") else {
        return format!("/planta/{}", name.replace(' ', "%20"));
    };
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.push(name);
    }

    url.path().to_owned()
}

#[derive(Debug, Default)]
pub struct MetadataStore {
    bucket: String,
    raw: Map<String, Value>,
    records: HashMap<String, SpeciesRecord>,
}

impl MetadataStore {
    pub fn empty(bucket: &str) -> Self {
        MetadataStore {
            bucket: bucket.to_owned(),
            ..Default::default()
        }
    }

    /// Only a document that is not a JSON object is an error. A record that
    /// cannot be read is logged and left out of lookups, but stays in
    /// [`MetadataStore::raw`].
    pub fn from_json_str(bucket: &str, json: &str) -> Result<Self> {
        let raw: Map<String, Value> = serde_json::from_str(json)
            .map_err(|e| Error::BadInput(format!("species document is not a JSON object: {}", e)))?;

        let mut records = HashMap::with_capacity(raw.len());
        for (name, value) in &raw {
            match SpeciesRecord::deserialize(value) {
                Ok(record) => {
                    records.insert(name.to_lowercase(), record);
                }
                Err(e) => warn!("Skipping species '{}': {}", name, e),
            }
        }

        Ok(MetadataStore {
            bucket: bucket.to_owned(),
            raw,
            records,
        })
    }

    pub fn load(bucket: &str, path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::AssetMissing(format!("{}: {}", path.display(), e)))?;

        let store = Self::from_json_str(bucket, &json)?;
        info!("Loaded {} species from {}", store.len(), path.display());

        Ok(store)
    }

    /// Like [`MetadataStore::load`], but an unreadable document leaves the
    /// service running with no species.
    pub fn load_or_empty(bucket: &str, path: &Path) -> Self {
        Self::load(bucket, path).unwrap_or_else(|e| {
            warn!("Species metadata unavailable, continuing without it: {}", e);
            Self::empty(bucket)
        })
    }

    /// Record for `name` with its photo references expanded to URLs.
    pub fn get(&self, name: &str) -> Option<SpeciesRecord> {
        let mut record = self.records.get(&normalize_name(name))?.clone();
        record.photos = record
            .photos
            .iter()
            .map(|photo| expand_photo_url(&self.bucket, photo))
            .collect();

        Some(record)
    }

    /// The document exactly as loaded, key casing included
    pub fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn normalize_is_idempotent() {
        let inputs = [
            "Rosa%20canina",
            "  ROSA canina ",
            "%20rosa%20",
            "%%2020",
            "%2%200",
            "",
            "   ",
            "Ñandú%20Grande",
        ];

        for input in inputs {
            let once = normalize_name(input);
            assert_eq!(normalize_name(&once), once, "input {:?}", input);
        }

        assert_eq!(normalize_name(" Rosa%20Canina "), "rosa canina");
        assert_eq!(normalize_name("%20rosa%20"), "rosa");
    }

    #[test]
    fn photo_expansion_is_idempotent() {
        let expanded = expand_photo_url("bucket", "rosa/a.jpg");
        assert_eq!(expanded, "https://storage.googleapis.com/bucket/rosa/a.jpg");
        assert_eq!(expand_photo_url("bucket", &expanded), expanded);

        let foreign = "http://example.org/b.png";
        assert_eq!(expand_photo_url("bucket", foreign), foreign);
    }

    #[test]
    fn species_path_encodes_one_segment() {
        assert_eq!(species_path("Rosa canina"), "/planta/Rosa%20canina");
        assert_eq!(species_path("a/b?c#d%"), "/planta/a%2Fb%3Fc%23d%25");
    }

    #[test]
    fn lookup_is_case_and_space_insensitive() {
        let store =
            MetadataStore::from_json_str("demo", r#"{"Rosa canina": {"fotos": ["a.jpg"]}}"#)
                .unwrap();

        let record = store.get("rosa canina").unwrap();
        assert_eq!(record.photos, vec!["https://storage.googleapis.com/demo/a.jpg"]);

        assert!(store.get("Rosa%20Canina").is_some());
        assert!(store.get("rosa").is_none());
    }

    #[test]
    fn lookups_do_not_mutate_the_store() {
        let store =
            MetadataStore::from_json_str("demo", r#"{"Rosa canina": {"fotos": ["a.jpg"]}}"#)
                .unwrap();

        let first = store.get("rosa canina").unwrap();
        let second = store.get("rosa canina").unwrap();
        assert_eq!(first, second);
        assert_eq!(store.raw()["Rosa canina"]["fotos"][0], "a.jpg");
    }

    #[test]
    fn known_fields_and_extras_are_kept() {
        let json = r#"{
            "Zea mays": {
                "descripcion": "Maize",
                "otros_detalles": "Americas",
                "dificultad": 2,
                "fotos": ["https://cdn.example/zea.jpg"],
                "familia": "Poaceae"
            }
        }"#;
        let store = MetadataStore::from_json_str("demo", json).unwrap();
        let record = store.get("ZEA MAYS").unwrap();

        assert_eq!(record.description.as_deref(), Some("Maize"));
        assert_eq!(record.other_details.as_deref(), Some("Americas"));
        assert_eq!(record.difficulty, Some(2));
        assert_eq!(record.photos, vec!["https://cdn.example/zea.jpg"]);
        assert_eq!(record.extra["familia"], "Poaceae");
    }

    #[test]
    fn loose_records_do_not_hide_the_rest() {
        let json = r#"{
            "Rosa canina": {"descripcion": "Rosal silvestre", "dificultad": 1, "fotos": ["a.jpg"]},
            "Zea mays": {"dificultad": "2", "fotos": null},
            "Pinus pinea": {"fotos": "pino.jpg", "descripcion": 7},
            "Salvia officinalis": "pendiente"
        }"#;
        let store = MetadataStore::from_json_str("demo", json).unwrap();

        assert_eq!(store.raw().len(), 4);
        assert_eq!(store.len(), 3);

        let rosa = store.get("rosa canina").unwrap();
        assert_eq!(rosa.photos, vec!["https://storage.googleapis.com/demo/a.jpg"]);

        let zea = store.get("zea mays").unwrap();
        assert_eq!(zea.difficulty, Some(2));
        assert!(zea.photos.is_empty());

        let pino = store.get("pinus pinea").unwrap();
        assert_eq!(pino.photos, vec!["https://storage.googleapis.com/demo/pino.jpg"]);
        assert_eq!(pino.description.as_deref(), Some("7"));

        assert!(store.get("salvia officinalis").is_none());
        assert_eq!(store.raw()["Salvia officinalis"], "pendiente");
    }

    #[test]
    fn non_object_document_is_rejected() {
        let err = MetadataStore::from_json_str("demo", "[1, 2]").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::BadInput);
    }

    #[test]
    fn missing_file_degrades_to_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetadataStore::load_or_empty("demo", &dir.path().join("plantas.json"));
        assert!(store.is_empty());

        let path = dir.path().join("plantas.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, r#"{{"Rosa canina": {{}}}}"#).unwrap();

        let store = MetadataStore::load_or_empty("demo", &path);
        assert_eq!(store.len(), 1);
        assert!(store.get("rosa canina").unwrap().photos.is_empty());
    }
}
