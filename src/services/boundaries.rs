use crate::error::{AppError, Result};
use crate::models::{BoundingBox, MunicipalityBoundary};
use async_trait::async_trait;
use geo::BoundingRect;
use geojson::{feature::Id, Feature, GeoJson};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Static municipality polygons, loaded at most once per process.
#[async_trait]
pub trait BoundaryStore: Send + Sync {
    async fn all_municipalities(&self) -> Result<Arc<[MunicipalityBoundary]>>;
}

/// Reads a GeoJSON FeatureCollection from disk on first use. Each feature
/// needs a `name` property and an id (`id` property or feature id).
pub struct GeoJsonBoundaryStore {
    path: PathBuf,
    boundaries: OnceCell<Arc<[MunicipalityBoundary]>>,
}

impl GeoJsonBoundaryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        GeoJsonBoundaryStore {
            path: path.into(),
            boundaries: OnceCell::new(),
        }
    }

    async fn load(&self) -> Result<Arc<[MunicipalityBoundary]>> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            AppError::BoundaryData(format!("Failed to read {}: {}", self.path.display(), e))
        })?;

        let boundaries = parse_boundaries(&raw)?;
        tracing::info!(
            municipalities = boundaries.len(),
            "Loaded {} municipality boundaries from {}",
            boundaries.len(),
            self.path.display()
        );

        Ok(boundaries.into())
    }
}

#[async_trait]
impl BoundaryStore for GeoJsonBoundaryStore {
    async fn all_municipalities(&self) -> Result<Arc<[MunicipalityBoundary]>> {
        self.boundaries
            .get_or_try_init(|| self.load())
            .await
            .map(Arc::clone)
    }
}

/// Parse a boundary FeatureCollection. Unusable features are skipped with a
/// warning; a document that is not a FeatureCollection is an error.
pub fn parse_boundaries(raw: &str) -> Result<Vec<MunicipalityBoundary>> {
    let geojson: GeoJson = raw
        .parse()
        .map_err(|e| AppError::BoundaryData(format!("Invalid GeoJSON: {}", e)))?;

    let GeoJson::FeatureCollection(collection) = geojson else {
        return Err(AppError::BoundaryData(
            "Boundary dataset must be a FeatureCollection".to_string(),
        ));
    };

    let total = collection.features.len();
    let boundaries: Vec<MunicipalityBoundary> = collection
        .features
        .into_iter()
        .enumerate()
        .filter_map(|(idx, feature)| match to_boundary(feature) {
            Ok(boundary) => Some(boundary),
            Err(reason) => {
                tracing::warn!("Skipping boundary feature #{}: {}", idx, reason);
                None
            }
        })
        .collect();

    if boundaries.len() < total {
        tracing::warn!(
            "{} of {} boundary features were unusable",
            total - boundaries.len(),
            total
        );
    }

    Ok(boundaries)
}

fn property_string(feature: &Feature, key: &str) -> Option<String> {
    match feature.property(key)? {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn to_boundary(feature: Feature) -> std::result::Result<MunicipalityBoundary, String> {
    let name = property_string(&feature, "name").ok_or("missing name property")?;
    let id = property_string(&feature, "id")
        .or_else(|| match &feature.id {
            Some(Id::String(s)) => Some(s.clone()),
            Some(Id::Number(n)) => Some(n.to_string()),
            None => None,
        })
        .ok_or_else(|| format!("{}: missing id", name))?;

    let geometry = feature
        .geometry
        .ok_or_else(|| format!("{}: missing geometry", name))?;
    let geometry = geo::Geometry::<f64>::try_from(geometry)
        .map_err(|e| format!("{}: unsupported geometry: {}", name, e))?;
    let bbox = geometry
        .bounding_rect()
        .map(BoundingBox::from)
        .ok_or_else(|| format!("{}: empty geometry", name))?;

    Ok(MunicipalityBoundary {
        id,
        name,
        geometry,
        bbox,
    })
}
