//! Shared types for the Zacks collector
//! Job configuration, endpoint overrides and the normalized record shapes

pub mod config;
pub mod records;

pub use config::{Config, Endpoints, JobKind, ParamBlock, ScrapeJob};
pub use records::{
    Column, DividendsRow, EarningsRow, EspRow, GuidanceRow, ReleaseRow, RevisionsRow, SplitsRow,
    Tabular,
};
