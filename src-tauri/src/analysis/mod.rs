//! Posture analysis: data model, remote client, and simulated fallback.

pub mod client;
pub mod fallback;
pub mod source;
pub mod timeline;
pub mod types;

pub use client::{PostureApiClient, ProbeResult, VideoUpload};
pub use source::{AnalysisSource, FrameAnalyzer, SharedSource, VideoAnalyzer};
pub use timeline::{AnalysisTimeline, TimelineSummary};
pub use types::*;
