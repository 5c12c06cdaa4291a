//! SiteAcquire - website content acquisition.
//!
//! Fetches a site's pages through progressively more expensive strategies
//! (direct HTTP, browser-disguised HTTP, remote fast-scrape, remote headless
//! render), extracts structured content, and accepts the first result that
//! passes a quality gate. Blocked sites can be retried through identity
//! rotation or archive sources, and batches run with bounded concurrency.

pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod extract;
pub mod models;
pub mod scrapers;

pub use config::{Config, Settings};
pub use context::AcquireContext;
pub use error::{AcquireError, Result};
pub use extract::QualityGate;
pub use models::{
    Acquired, AcquisitionOutcome, EscalationResult, FallbackAttempt, FallbackKind, FallbackResult,
    RawContent, ScrapedContent, SiteProbe,
};
pub use scrapers::{EscalationController, FallbackManager, Orchestrator};
