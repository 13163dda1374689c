//! Three-stage refusal screening and density classification.
//!
//! Stage 1 screens airlines, stage 2 drills into routes of passing airlines,
//! stage 3 weighs passing routes against passenger volume and classifies them
//! relative to a threshold derived from the reliable routes of the same run.

pub mod density;
pub mod history;
pub mod publish;
pub mod screening;
pub mod session;
pub mod threshold;

pub use density::PartnerMap;
pub use session::{AnalysisError, AnalysisResults, AnalysisSession, SessionState};
