// Tabular data model and CSV normalization.
// Produces the immutable, index-addressable tables everything downstream reads.

pub mod model;
pub mod normalize;

pub use model::{LocationRow, NormalizedTable};
pub use normalize::normalize;
