pub mod model;
pub mod relevance;
pub mod scan_detector;
pub mod schema;
