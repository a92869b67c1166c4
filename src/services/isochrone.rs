use crate::error::Result;
use crate::models::{
    Budget, BoundingBox, Coordinates, IntersectingMunicipality, IsochroneResult,
    MunicipalityBoundary,
};
use crate::services::boundaries::BoundaryStore;
use crate::services::isoline::{to_feature_collection, IsolineClient, IsolineRange};
use crate::services::upstream::with_deadline;
use geo::{BoundingRect, Centroid, InteriorPoint, Intersects};
use geojson::FeatureCollection;
use std::sync::Arc;
use std::time::Duration;

/// Budget → reachable region → municipalities it touches.
pub struct IsochroneService {
    isoline: Arc<dyn IsolineClient>,
    boundaries: Arc<dyn BoundaryStore>,
    timeout: Duration,
}

impl IsochroneService {
    pub fn new(
        isoline: Arc<dyn IsolineClient>,
        boundaries: Arc<dyn BoundaryStore>,
        timeout: Duration,
    ) -> Self {
        IsochroneService {
            isoline,
            boundaries,
            timeout,
        }
    }

    pub async fn intersecting_municipalities(
        &self,
        origin: Coordinates,
        budget: &Budget,
    ) -> Result<IsochroneResult> {
        let boundaries = self.boundaries.all_municipalities().await?;

        let range = IsolineRange::from(budget);
        let raw = with_deadline(
            "Isoline",
            self.timeout,
            self.isoline.isoline(&origin, range),
        )
        .await?;
        let region = to_feature_collection(&raw)?;

        let municipalities = intersect(&region, &boundaries);

        tracing::info!(
            features = region.features.len(),
            municipalities = municipalities.len(),
            "Isochrone from ({:.4}, {:.4}): {} region features, {} municipalities",
            origin.lat,
            origin.lng,
            region.features.len(),
            municipalities.len()
        );

        Ok(IsochroneResult {
            region,
            municipalities,
        })
    }
}

struct RegionShape {
    geometry: geo::Geometry<f64>,
    bbox: BoundingBox,
}

fn region_shapes(region: &FeatureCollection) -> Vec<RegionShape> {
    region
        .features
        .iter()
        .enumerate()
        .filter_map(|(idx, feature)| {
            let geometry = feature.geometry.clone()?;
            let geometry = match geo::Geometry::<f64>::try_from(geometry) {
                Ok(g) => g,
                Err(e) => {
                    tracing::warn!("Region feature #{} is not convertible: {}", idx, e);
                    return None;
                }
            };
            let bbox = geometry.bounding_rect().map(BoundingBox::from)?;
            Some(RegionShape { geometry, bbox })
        })
        .collect()
}

/// Representative point of a municipality: centroid, else a point on its surface.
fn center_of(boundary: &MunicipalityBoundary) -> Option<Coordinates> {
    let point = boundary
        .geometry
        .centroid()
        .or_else(|| boundary.geometry.interior_point())?;

    Some(Coordinates {
        lat: point.y(),
        lng: point.x(),
    })
}

/// Municipalities touching at least one region feature, in dataset order.
/// Region features that cannot be converted never match.
pub fn intersect(
    region: &FeatureCollection,
    boundaries: &[MunicipalityBoundary],
) -> Vec<IntersectingMunicipality> {
    let shapes = region_shapes(region);
    if shapes.is_empty() {
        return Vec::new();
    }

    boundaries
        .iter()
        .filter(|boundary| {
            shapes.iter().any(|shape| {
                shape.bbox.intersects(&boundary.bbox)
                    && shape.geometry.intersects(&boundary.geometry)
            })
        })
        .filter_map(|boundary| match center_of(boundary) {
            Some(center) => Some(IntersectingMunicipality {
                id: boundary.id.clone(),
                name: boundary.name.clone(),
                center,
                bbox: boundary.bbox,
            }),
            None => {
                tracing::warn!(
                    "No representative point for {} ({}), skipping",
                    boundary.name,
                    boundary.id
                );
                None
            }
        })
        .collect()
}
