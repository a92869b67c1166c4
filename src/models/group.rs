use crate::models::{Coordinates, PointOfInterest};
use serde::{Deserialize, Serialize};

/// A municipality found while sampling around the origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateMunicipality {
    pub id: String,
    pub name: String,
    pub location: Coordinates,
}

/// A candidate whose real driving cost fell inside the tolerance band.
/// `metric` is minutes for time budgets and kilometers for distance budgets.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedMunicipality {
    pub municipality: CandidateMunicipality,
    pub metric: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorSource {
    TextSearch,
    NearbySearch,
    MunicipalityLocation,
}

/// Seat-of-government point used as the center of the attraction search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CivicAnchor {
    pub location: Coordinates,
    pub source: AnchorSource,
}

impl CivicAnchor {
    pub fn fallback(location: Coordinates) -> Self {
        CivicAnchor {
            location,
            source: AnchorSource::MunicipalityLocation,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MunicipalitySummary {
    pub id: String,
    pub name: String,
    pub location: Coordinates,
    pub metric: f64,
}

impl From<&RankedMunicipality> for MunicipalitySummary {
    fn from(ranked: &RankedMunicipality) -> Self {
        MunicipalitySummary {
            id: ranked.municipality.id.clone(),
            name: ranked.municipality.name.clone(),
            location: ranked.municipality.location,
            metric: ranked.metric,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityGroup {
    pub municipality: MunicipalitySummary,
    pub anchor: CivicAnchor,
    pub spots: Vec<PointOfInterest>,
}
