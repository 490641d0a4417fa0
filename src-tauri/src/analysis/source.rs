//! Where analysis comes from: the remote service, or nowhere (offline).

use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

use super::client::{PostureApiClient, VideoUpload};
use super::types::{AnalysisResult, FrameAnalysis};
use crate::error::PostureProError;

/// Analyzes one encoded camera frame.
pub trait FrameAnalyzer: Send + Sync + 'static {
    fn analyze_frame(
        &self,
        jpeg: Vec<u8>,
    ) -> impl Future<Output = Result<FrameAnalysis, PostureProError>> + Send;
}

/// Analyzes a whole uploaded video.
pub trait VideoAnalyzer: Send + Sync {
    fn analyze_video(
        &self,
        video: VideoUpload,
    ) -> impl Future<Output = Result<Vec<AnalysisResult>, PostureProError>> + Send;
}

/// Production analysis strategy.
///
/// `Simulated` never touches the network; every call reports
/// [`PostureProError::Offline`] so callers take their fallback branch.
#[derive(Debug, Clone)]
pub enum AnalysisSource {
    Remote(PostureApiClient),
    Simulated,
}

impl AnalysisSource {
    pub fn is_offline(&self) -> bool {
        matches!(self, AnalysisSource::Simulated)
    }

    pub fn client(&self) -> Option<&PostureApiClient> {
        match self {
            AnalysisSource::Remote(client) => Some(client),
            AnalysisSource::Simulated => None,
        }
    }
}

impl FrameAnalyzer for AnalysisSource {
    async fn analyze_frame(&self, jpeg: Vec<u8>) -> Result<FrameAnalysis, PostureProError> {
        match self {
            AnalysisSource::Remote(client) => client.analyze_frame(jpeg).await,
            AnalysisSource::Simulated => Err(PostureProError::Offline),
        }
    }
}

impl VideoAnalyzer for AnalysisSource {
    async fn analyze_video(
        &self,
        video: VideoUpload,
    ) -> Result<Vec<AnalysisResult>, PostureProError> {
        match self {
            AnalysisSource::Remote(client) => client.analyze_video(video).await,
            AnalysisSource::Simulated => Err(PostureProError::Offline),
        }
    }
}

/// Swappable source shared between the pipelines and the commands that
/// reconfigure them.
#[derive(Debug, Clone)]
pub struct SharedSource(Arc<RwLock<AnalysisSource>>);

impl SharedSource {
    pub fn new(source: AnalysisSource) -> Self {
        Self(Arc::new(RwLock::new(source)))
    }

    pub fn current(&self) -> AnalysisSource {
        self.0.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn replace(&self, source: AnalysisSource) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = source;
    }
}

impl FrameAnalyzer for SharedSource {
    async fn analyze_frame(&self, jpeg: Vec<u8>) -> Result<FrameAnalysis, PostureProError> {
        let source = self.current();
        source.analyze_frame(jpeg).await
    }
}

impl VideoAnalyzer for SharedSource {
    async fn analyze_video(
        &self,
        video: VideoUpload,
    ) -> Result<Vec<AnalysisResult>, PostureProError> {
        let source = self.current();
        source.analyze_video(video).await
    }
}
