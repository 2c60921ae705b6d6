//! User-facing flows for KrishiMitra+.
//!
//! This crate ties the service clients and the recommendation renderer
//! together into the flows the CLI drives: disease diagnosis, weather
//! advisory (with polling), assistant chat and the market dashboard.

pub mod advisory;
pub mod chat;
pub mod diagnosis;
pub mod market;
pub mod progress;

pub use advisory::{
    AdvisoryFlow, AdvisoryReport, AdvisoryRequest, AdvisoryTarget, ResolvedLocation,
    WeatherPoller, favorable_alert,
};
pub use chat::{ChatMessage, Conversation, SUGGESTIONS, Sender};
pub use diagnosis::{Diagnosis, DiagnosisOutcome, diagnose};
pub use market::{MarketDashboard, MarketFlow, Panel};
pub use progress::{ProgressReporter, SilentProgress};
