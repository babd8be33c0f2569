//! Engine wiring.
//!
//! `SkillTrailEngine::open` turns a validated [`Config`] into a ready
//! object graph: the SQLite pool and schema, one repository per port, the
//! core services sharing them, and the optional OpenAI summarizer.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use skilltrail_core::enrichment::{MemoryRetriever, SessionEnricher};
use skilltrail_core::evidence::EvidenceLinker;
use skilltrail_core::sessions::{DateLocks, SessionBuildService, SessionRepository};
use skilltrail_core::skills::{DiffAnalysisRecorder, SkillProgressService};
use skilltrail_domain::{ClaimEvidence, Config, Result, SkillTrailError};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::database::{
    DbManager, SqliteEventStore, SqliteSessionRepository, SqliteSkillActivityRepository,
    SqliteSkillRepository,
};
use crate::integrations::openai::OpenAISessionSummarizer;
use crate::scheduling::{
    DecayJob, EngineScheduler, EngineSchedulerConfig, EnrichmentJob, ScheduledJob,
    SessionBuildJob,
};

pub struct SkillTrailEngine {
    config: Config,
    db: Arc<DbManager>,
    events: Arc<SqliteEventStore>,
    sessions: Arc<SqliteSessionRepository>,
    builder: Arc<SessionBuildService>,
    enricher: Arc<SessionEnricher>,
    progress: Arc<SkillProgressService>,
    recorder: Arc<DiffAnalysisRecorder>,
    linker: Arc<EvidenceLinker>,
}

impl SkillTrailEngine {
    /// Open the database, apply migrations and wire every service.
    #[instrument(skip(config), fields(db_path = %config.database.path))]
    pub fn open(config: Config) -> Result<Self> {
        Self::open_with_retriever(config, None)
    }

    /// Like [`open`](Self::open), with a retrieval backend for enrichment.
    pub fn open_with_retriever(
        config: Config,
        retriever: Option<Arc<dyn MemoryRetriever>>,
    ) -> Result<Self> {
        config.validate()?;

        let db = Arc::new(DbManager::from_config(&config.database)?);
        db.run_migrations()?;

        let events = Arc::new(SqliteEventStore::new(Arc::clone(&db)));
        let sessions = Arc::new(SqliteSessionRepository::new(Arc::clone(&db)));
        let skills = Arc::new(SqliteSkillRepository::new(Arc::clone(&db)));
        let ledger = Arc::new(SqliteSkillActivityRepository::new(Arc::clone(&db)));

        let builder = Arc::new(
            SessionBuildService::new(
                events.clone(),
                events.clone(),
                events.clone(),
                sessions.clone(),
                config.segmentation.clone(),
            )
            .with_locks(Arc::new(DateLocks::new())),
        );

        let progress =
            Arc::new(SkillProgressService::new(skills, ledger, config.skills.clone()));

        let mut enricher = SessionEnricher::new(
            sessions.clone(),
            events.clone(),
            events.clone(),
            events.clone(),
            Arc::clone(&progress),
            config.enrichment.clone(),
        );
        if config.llm.is_enabled() {
            let summarizer = OpenAISessionSummarizer::from_config(&config.llm)?;
            enricher = enricher.with_summarizer(Arc::new(summarizer));
        } else {
            info!("llm.api_key not set; summaries use the rule-based fallback");
        }
        if let Some(retriever) = retriever {
            enricher = enricher.with_retriever(retriever);
        }

        let recorder = Arc::new(DiffAnalysisRecorder::new(events.clone(), Arc::clone(&progress)));
        let linker = Arc::new(EvidenceLinker::new(events.clone(), &config.linker));

        info!("skilltrail engine ready");
        Ok(Self {
            config,
            db,
            events,
            sessions,
            builder,
            enricher: Arc::new(enricher),
            progress,
            recorder,
            linker,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn database(&self) -> &Arc<DbManager> {
        &self.db
    }

    /// Evidence tables, for collectors appending raw events.
    pub fn events(&self) -> &Arc<SqliteEventStore> {
        &self.events
    }

    pub fn sessions(&self) -> &Arc<SqliteSessionRepository> {
        &self.sessions
    }

    pub fn session_builder(&self) -> &Arc<SessionBuildService> {
        &self.builder
    }

    pub fn enricher(&self) -> &Arc<SessionEnricher> {
        &self.enricher
    }

    pub fn skill_progress(&self) -> &Arc<SkillProgressService> {
        &self.progress
    }

    pub fn diff_analysis(&self) -> &Arc<DiffAnalysisRecorder> {
        &self.recorder
    }

    pub fn evidence_linker(&self) -> &Arc<EvidenceLinker> {
        &self.linker
    }

    /// Link claims against the current sessions started in `[start, end)`.
    pub async fn link_claims_in_period(
        &self,
        claims: &[String],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        top_k: Option<usize>,
    ) -> Result<Vec<ClaimEvidence>> {
        if start > end {
            return Err(SkillTrailError::InvalidInput(format!(
                "period start {start} is after end {end}"
            )));
        }
        let sessions = self.sessions.get_by_time_range(start, end).await?;
        self.linker.link_claims(claims, &sessions, top_k).await
    }

    /// Rebuild `date` and enrich the new version right away.
    #[instrument(skip(self))]
    pub async fn rebuild_and_enrich(&self, date: NaiveDate) -> Result<()> {
        let cancel = CancellationToken::new();
        let rebuild = self.builder.rebuild_for_date(date, &cancel).await?;
        if !rebuild.bumped {
            return Ok(());
        }
        let outcome = self
            .enricher
            .enrich_date(date, Some(self.config.enrichment.date_limit), Utc::now(), &cancel)
            .await?;
        if outcome.failed > 0 {
            warn!(%date, failed = outcome.failed, "some rebuilt sessions were not enriched");
        }
        Ok(())
    }

    /// Scheduler with the three engine jobs registered from `scheduler`
    /// config. Not started.
    pub fn scheduler(&self) -> EngineScheduler {
        let schedule = &self.config.scheduler;
        EngineScheduler::new(EngineSchedulerConfig::from(schedule))
            .with_job(ScheduledJob::new(
                schedule.session_cron.clone(),
                Arc::new(SessionBuildJob::new(Arc::clone(&self.builder))),
            ))
            .with_job(ScheduledJob::new(
                schedule.enrichment_cron.clone(),
                Arc::new(EnrichmentJob::new(Arc::clone(&self.enricher))),
            ))
            .with_job(ScheduledJob::new(
                schedule.decay_cron.clone(),
                Arc::new(DecayJob::new(Arc::clone(&self.progress))),
            ))
    }
}
