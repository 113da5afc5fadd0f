//! Business discovery over a scrollable search surface.

pub mod clean;
pub mod paginator;
pub mod query;

pub use paginator::{ExtractionCapability, PageStep, PaginatorSettings, SearchPaginator};
pub use query::QueryGenerator;
