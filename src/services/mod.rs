pub mod boundaries;
pub mod discovery;
pub mod distance_matrix;
pub mod flexpolyline;
pub mod isochrone;
pub mod isoline;
pub mod places;
pub mod upstream;
