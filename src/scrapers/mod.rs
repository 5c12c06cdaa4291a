//! Content acquisition: strategies, escalation, fallbacks and batch fan-out.

pub mod budget;
pub mod escalation;
pub mod fallback;
pub mod http_client;
pub mod legacy;
pub mod orchestrator;
pub mod probes;
pub mod strategies;

pub use budget::budget_for;
pub use escalation::{normalize_url, EscalationController};
pub use fallback::{AlternativeSourceConfig, FallbackConfig, FallbackManager, SourceKind};
pub use http_client::{HttpClient, HttpClientConfig};
pub use legacy::LegacyFetcher;
pub use orchestrator::{BatchOutcome, BatchSummary, Orchestrator, DEFAULT_MAX_CONCURRENCY};
pub use probes::probe_site;
pub use strategies::{
    AcquisitionStrategy, BrowserStrategy, DirectStrategy, FastScrapeClient, FastScrapeStrategy,
    RenderClient, RenderStrategy, StrategyKind,
};
