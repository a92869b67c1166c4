pub mod budget;
pub mod coordinates;
pub mod group;
pub mod isochrone;
pub mod place;

pub use budget::{Budget, BudgetKind, ToleranceBand};
pub use coordinates::Coordinates;
pub use group::{
    AnchorSource, CandidateMunicipality, CityGroup, CivicAnchor, MunicipalitySummary,
    RankedMunicipality,
};
pub use isochrone::{BoundingBox, IntersectingMunicipality, IsochroneResult, MunicipalityBoundary};
pub use place::{PlaceCandidate, PlaceDetails, PlaceReview, PointOfInterest};
