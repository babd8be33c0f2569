//! Engine jobs: incremental segmentation, incremental enrichment and the
//! daily decay sweep.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use skilltrail_core::enrichment::SessionEnricher;
use skilltrail_core::sessions::SessionBuildService;
use skilltrail_core::skills::SkillProgressService;
use skilltrail_domain::Result;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::engine_scheduler::EngineJob;

pub struct SessionBuildJob {
    service: Arc<SessionBuildService>,
}

impl SessionBuildJob {
    pub fn new(service: Arc<SessionBuildService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl EngineJob for SessionBuildJob {
    fn name(&self) -> &'static str {
        "session_build"
    }

    async fn run(&self, cancel: CancellationToken) -> Result<()> {
        let outcome = self.service.build_incremental(Utc::now(), &cancel).await?;
        if outcome.written() > 0 || outcome.failed > 0 {
            info!(
                created = outcome.created,
                failed = outcome.failed,
                cancelled = outcome.cancelled,
                "scheduled session build"
            );
        }
        Ok(())
    }
}

pub struct EnrichmentJob {
    enricher: Arc<SessionEnricher>,
}

impl EnrichmentJob {
    pub fn new(enricher: Arc<SessionEnricher>) -> Self {
        Self { enricher }
    }
}

#[async_trait]
impl EngineJob for EnrichmentJob {
    fn name(&self) -> &'static str {
        "session_enrichment"
    }

    async fn run(&self, cancel: CancellationToken) -> Result<()> {
        let outcome = self.enricher.enrich_incremental(Utc::now(), &cancel).await?;
        if outcome.scanned > 0 {
            info!(
                enriched = outcome.enriched,
                generated = outcome.generated,
                fallback = outcome.fallback,
                failed = outcome.failed,
                "scheduled enrichment"
            );
        }
        Ok(())
    }
}

pub struct DecayJob {
    progress: Arc<SkillProgressService>,
}

impl DecayJob {
    pub fn new(progress: Arc<SkillProgressService>) -> Self {
        Self { progress }
    }
}

#[async_trait]
impl EngineJob for DecayJob {
    fn name(&self) -> &'static str {
        "skill_decay"
    }

    async fn run(&self, _cancel: CancellationToken) -> Result<()> {
        let decayed = self.progress.decay_sweep(Utc::now()).await?;
        info!(decayed, "scheduled decay sweep");
        Ok(())
    }
}
