//! Pure catalog logic shared by the storage and service layers: force vocabulary, the text query
//! grammar, facet aggregation, and the subscription tier model. Nothing here performs I/O.

pub mod facets;
pub mod force;
pub mod query;
pub mod tier;

pub use orion_config::Feature;
