//! Zacks collector core
//! Session handling, screener queries, dataset fetchers, normalization and export

pub mod catalog;
pub mod error;
pub mod export;
pub mod fetcher;
pub mod jobs;
pub mod normalize;
pub mod params;
pub mod query;
pub mod runner;
pub mod session;

pub use error::{Result, ScrapeError};
pub use export::ExportFormat;
pub use jobs::{Job, JobReport};
pub use query::{build, EncodedQuery, FilterSpec, QueryBuilder};
pub use runner::{run_all, run_job, RunSummary};
pub use session::{Session, SessionState};
