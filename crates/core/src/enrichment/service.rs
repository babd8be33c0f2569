//! Session semantic enricher
//!
//! Fills in summary, category and the skill/evidence index of sessions that
//! lack them. Skills are taken strictly from diffs that already carry an
//! analysis, so every skill tag traces back to a specific diff. Text
//! generation is optional; without it (or when it fails) a deterministic
//! summary is produced so the pipeline never waits on an external service.

use std::collections::BTreeMap;
use std::sync::Arc;

use ahash::AHashMap as HashMap;
use chrono::{DateTime, NaiveDate, Utc};
use skilltrail_domain::{
    resolve_skill_key, AppUsage, BrowserDigest, BrowserVisitEvidence, CodeChangeEvidence,
    DiffDigest, EnrichmentConfig, GeneratedSessionSummary, MemorySnippet, RagRef, Result,
    Session, SessionCategory, SessionSemanticUpdate, SessionSummaryContext,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::fallback::{fallback_category, fallback_summary, FallbackFacts};
use super::ports::{MemoryRetriever, SessionSummarizer};
use crate::sessions::SessionRepository;
use crate::skills::SkillProgressService;
use crate::tracking::{BrowserEventSource, DiffRepository, WindowEventSource};
use crate::utils::time::inclusive_end;

/// Counters reported by one enrichment run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentOutcome {
    /// Sessions selected for enrichment.
    pub scanned: usize,
    /// Sessions that received a partial update.
    pub enriched: usize,
    /// Sessions whose stored fields already matched.
    pub unchanged: usize,
    pub failed: usize,
    /// Summaries written by the text-generation collaborator.
    pub generated: usize,
    /// Summaries written by the rule-based fallback.
    pub fallback: usize,
    pub cancelled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SummarySource {
    Existing,
    Generated,
    Fallback,
}

/// Evidence resolved for one session.
#[derive(Debug, Default)]
struct SessionEvidence {
    diffs: Vec<CodeChangeEvidence>,
    browser: Vec<BrowserVisitEvidence>,
    apps: Vec<AppUsage>,
}

/// A skill named by the session's analysed diffs.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RankedSkill {
    key: String,
    name: String,
    diffs: usize,
}

/// Populates summaries and evidence indexes of persisted sessions.
pub struct SessionEnricher {
    sessions: Arc<dyn SessionRepository>,
    windows: Arc<dyn WindowEventSource>,
    diffs: Arc<dyn DiffRepository>,
    browser: Arc<dyn BrowserEventSource>,
    progress: Arc<SkillProgressService>,
    summarizer: Option<Arc<dyn SessionSummarizer>>,
    retriever: Option<Arc<dyn MemoryRetriever>>,
    config: EnrichmentConfig,
}

impl SessionEnricher {
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        windows: Arc<dyn WindowEventSource>,
        diffs: Arc<dyn DiffRepository>,
        browser: Arc<dyn BrowserEventSource>,
        progress: Arc<SkillProgressService>,
        config: EnrichmentConfig,
    ) -> Self {
        Self {
            sessions,
            windows,
            diffs,
            browser,
            progress,
            summarizer: None,
            retriever: None,
            config,
        }
    }

    pub fn with_summarizer(mut self, summarizer: Arc<dyn SessionSummarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    pub fn with_retriever(mut self, retriever: Arc<dyn MemoryRetriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    /// Enrich up to `batch_limit` sessions that started within the lookback
    /// window ending at `now`.
    #[instrument(skip(self, cancel))]
    pub async fn enrich_incremental(
        &self,
        now: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<EnrichmentOutcome> {
        let start = now - self.config.lookback();
        let due: Vec<Session> = self
            .sessions
            .get_by_time_range(start, inclusive_end(now))
            .await?
            .into_iter()
            .filter(Session::needs_enrichment)
            .take(self.config.batch_limit)
            .collect();

        self.enrich_sessions(due, now, cancel).await
    }

    /// Enrich the current sessions of `date`, typically after a rebuild.
    #[instrument(skip(self, cancel))]
    pub async fn enrich_date(
        &self,
        date: NaiveDate,
        limit: Option<usize>,
        now: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<EnrichmentOutcome> {
        let due: Vec<Session> = self
            .sessions
            .get_by_date(date)
            .await?
            .into_iter()
            .filter(Session::needs_enrichment)
            .take(limit.unwrap_or(self.config.date_limit))
            .collect();

        self.enrich_sessions(due, now, cancel).await
    }

    async fn enrich_sessions(
        &self,
        sessions: Vec<Session>,
        now: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<EnrichmentOutcome> {
        let mut outcome = EnrichmentOutcome { scanned: sessions.len(), ..Default::default() };

        for session in &sessions {
            if cancel.is_cancelled() {
                outcome.cancelled = true;
                break;
            }

            match self.enrich_session(session, now).await {
                Ok((changed, source)) => {
                    if changed {
                        outcome.enriched += 1;
                    } else {
                        outcome.unchanged += 1;
                    }
                    match source {
                        SummarySource::Generated => outcome.generated += 1,
                        SummarySource::Fallback => outcome.fallback += 1,
                        SummarySource::Existing => {}
                    }
                }
                Err(err) => {
                    warn!(error = %err, session_id = session.id, "session enrichment failed");
                    outcome.failed += 1;
                }
            }
        }

        info!(
            scanned = outcome.scanned,
            enriched = outcome.enriched,
            failed = outcome.failed,
            generated = outcome.generated,
            fallback = outcome.fallback,
            cancelled = outcome.cancelled,
            "enrichment run finished"
        );
        Ok(outcome)
    }

    /// Returns whether the session row changed and where its summary came
    /// from.
    async fn enrich_session(
        &self,
        session: &Session,
        now: DateTime<Utc>,
    ) -> Result<(bool, SummarySource)> {
        let evidence = self.gather_evidence(session).await?;
        let skills = rank_skills(&evidence.diffs);
        let top_domains = rank_domains(&evidence.browser, self.config.max_domains);

        let mut metadata = session.metadata.clone();
        metadata.set_diff_ids(&evidence.diffs.iter().map(|d| d.id).collect::<Vec<_>>());
        metadata.set_browser_event_ids(&evidence.browser.iter().map(|b| b.id).collect::<Vec<_>>());
        metadata.set_skill_keys(&skills.iter().map(|s| s.key.clone()).collect::<Vec<_>>());
        metadata.set_top_domains(&top_domains);

        let has_diffs = !evidence.diffs.is_empty();
        let has_browser = !evidence.browser.is_empty();
        let mut update = SessionSemanticUpdate::default();
        let mut source = SummarySource::Existing;

        if session.summary.trim().is_empty() {
            if let Some((generated, memories)) = self.generate(session, &evidence, &skills).await {
                update.summary = Some(generated.summary.trim().to_string());
                update.category = generated
                    .category
                    .parse::<SessionCategory>()
                    .ok()
                    .map(|category| category.to_string());
                let tags: Vec<String> = generated
                    .tags
                    .iter()
                    .map(|tag| tag.trim().to_string())
                    .filter(|tag| !tag.is_empty())
                    .collect();
                if !tags.is_empty() {
                    metadata.set_tags(&tags);
                }
                if !memories.is_empty() {
                    metadata.set_rag_refs(&memories.iter().map(rag_ref).collect::<Vec<_>>());
                }
                source = SummarySource::Generated;
            } else {
                let top_skills: Vec<String> = skills
                    .iter()
                    .take(self.config.max_summary_skills)
                    .map(|s| s.name.clone())
                    .collect();
                let languages = rank_languages(&evidence.diffs, self.config.max_summary_skills);
                update.summary = Some(fallback_summary(&FallbackFacts {
                    top_skills: &top_skills,
                    languages: &languages,
                    primary_app: &session.primary_app,
                    top_domains: &top_domains,
                }));
                source = SummarySource::Fallback;
            }
        }

        if update.category.is_none() && session.category.trim().is_empty() {
            update.category = Some(fallback_category(has_diffs, has_browser).to_string());
        }

        let skill_names: Vec<String> = skills.iter().map(|s| s.name.clone()).collect();
        if skill_names != session.skills_involved {
            update.skills_involved = Some(skill_names);
        }
        if metadata != session.metadata {
            update.metadata = Some(metadata);
        }

        // Experience is granted before the session is marked enriched, so a
        // failure here leaves the session due for the next run.
        self.progress.apply_diff_evidence(&evidence.diffs, now).await?;

        if update.is_empty() {
            debug!(session_id = session.id, "session already up to date");
            return Ok((false, source));
        }
        self.sessions.update_semantic_fields(session.id, &update).await?;
        Ok((true, source))
    }

    /// Resolve diffs and visits from the stored index, or by time range when
    /// the index is missing.
    async fn gather_evidence(&self, session: &Session) -> Result<SessionEvidence> {
        let start = session.start_time;
        let end = inclusive_end(session.end_time);

        let diff_ids = session.metadata.diff_ids();
        let diffs = if diff_ids.is_empty() {
            self.diffs.get_diffs(start, end).await?
        } else {
            self.diffs.get_diffs_by_ids(&diff_ids).await?
        };

        let browser_ids = session.metadata.browser_event_ids();
        let browser = if browser_ids.is_empty() {
            self.browser.get_browser_events(start, end).await?
        } else {
            self.browser.get_browser_events_by_ids(&browser_ids).await?
        };

        let windows = self.windows.get_window_events(start, end).await?;
        let mut dwell: HashMap<String, i64> = HashMap::new();
        for event in &windows {
            *dwell.entry(event.app_name.clone()).or_insert(0) += event.duration_ms.max(0);
        }
        let mut apps: Vec<AppUsage> = dwell
            .into_iter()
            .filter(|(_, duration_ms)| *duration_ms > 0)
            .map(|(app_name, duration_ms)| AppUsage { app_name, duration_ms })
            .collect();
        apps.sort_by(|a, b| {
            b.duration_ms.cmp(&a.duration_ms).then_with(|| a.app_name.cmp(&b.app_name))
        });
        apps.truncate(self.config.max_apps);

        Ok(SessionEvidence { diffs, browser, apps })
    }

    async fn generate(
        &self,
        session: &Session,
        evidence: &SessionEvidence,
        skills: &[RankedSkill],
    ) -> Option<(GeneratedSessionSummary, Vec<MemorySnippet>)> {
        let summarizer = self.summarizer.as_ref().filter(|s| s.is_configured())?;

        let memories = self.retrieve_memories(session, evidence, skills).await;
        let context = self.build_context(session, evidence, skills, memories.clone());

        match summarizer.generate_session_summary(&context).await {
            Ok(generated) if !generated.summary.trim().is_empty() => Some((generated, memories)),
            Ok(_) => {
                warn!(session_id = session.id, "summarizer returned an empty summary");
                None
            }
            Err(err) => {
                warn!(
                    error = %err,
                    session_id = session.id,
                    "summary generation failed; using fallback"
                );
                None
            }
        }
    }

    async fn retrieve_memories(
        &self,
        session: &Session,
        evidence: &SessionEvidence,
        skills: &[RankedSkill],
    ) -> Vec<MemorySnippet> {
        let Some(retriever) = self.retriever.as_ref() else {
            return Vec::new();
        };
        if self.config.max_memory_snippets == 0 {
            return Vec::new();
        }

        let mut terms: Vec<&str> = vec![session.primary_app.as_str()];
        terms.extend(skills.iter().map(|s| s.name.as_str()));
        terms.extend(
            evidence.diffs.iter().take(self.config.max_diffs).map(|d| d.file_name.as_str()),
        );
        let query =
            terms.into_iter().filter(|t| !t.trim().is_empty()).collect::<Vec<_>>().join(" ");
        if query.is_empty() {
            return Vec::new();
        }

        match retriever.query(&query, self.config.max_memory_snippets).await {
            Ok(mut snippets) => {
                snippets.truncate(self.config.max_memory_snippets);
                snippets
            }
            Err(err) => {
                warn!(error = %err, session_id = session.id, "memory retrieval failed");
                Vec::new()
            }
        }
    }

    fn build_context(
        &self,
        session: &Session,
        evidence: &SessionEvidence,
        skills: &[RankedSkill],
        memories: Vec<MemorySnippet>,
    ) -> SessionSummaryContext {
        SessionSummaryContext {
            session_id: session.id,
            date: session.date,
            time_range: session.time_range.clone(),
            primary_app: session.primary_app.clone(),
            apps: evidence.apps.iter().take(self.config.max_apps).cloned().collect(),
            diffs: evidence
                .diffs
                .iter()
                .take(self.config.max_diffs)
                .map(|diff| DiffDigest {
                    file_name: diff.file_name.clone(),
                    language: diff.language.clone(),
                    lines_added: diff.lines_added,
                    lines_deleted: diff.lines_deleted,
                    insight: diff.ai_insight.clone(),
                })
                .collect(),
            browser: evidence
                .browser
                .iter()
                .take(self.config.max_browser_items)
                .map(|visit| BrowserDigest {
                    domain: visit.domain.clone(),
                    title: visit.title.clone(),
                })
                .collect(),
            skills: skills.iter().map(|s| s.name.clone()).collect(),
            memories,
        }
    }
}

fn rag_ref(snippet: &MemorySnippet) -> RagRef {
    RagRef {
        ref_type: snippet.snippet_type.clone(),
        date: snippet.date.clone(),
        similarity: snippet.similarity,
    }
}

/// Skills named by analysed diffs, most frequently named first.
fn rank_skills(diffs: &[CodeChangeEvidence]) -> Vec<RankedSkill> {
    let mut by_key: BTreeMap<String, RankedSkill> = BTreeMap::new();
    for diff in diffs {
        let mut seen_in_diff = Vec::new();
        for name in &diff.skills_detected {
            let Some(key) = resolve_skill_key(name).map(|key| key.into_key()) else {
                continue;
            };
            if seen_in_diff.contains(&key) {
                continue;
            }
            seen_in_diff.push(key.clone());
            by_key
                .entry(key.clone())
                .or_insert_with(|| RankedSkill { key, name: name.trim().to_string(), diffs: 0 })
                .diffs += 1;
        }
    }

    let mut ranked: Vec<RankedSkill> = by_key.into_values().collect();
    ranked.sort_by(|a, b| b.diffs.cmp(&a.diffs).then_with(|| a.key.cmp(&b.key)));
    ranked
}

fn rank_domains(visits: &[BrowserVisitEvidence], limit: usize) -> Vec<String> {
    rank_by_count(visits.iter().map(|visit| visit.domain.trim().to_lowercase()), limit)
}

fn rank_languages(diffs: &[CodeChangeEvidence], limit: usize) -> Vec<String> {
    rank_by_count(diffs.iter().map(|diff| diff.language.trim().to_lowercase()), limit)
}

fn rank_by_count(values: impl Iterator<Item = String>, limit: usize) -> Vec<String> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for value in values.filter(|v| !v.is_empty()) {
        *counts.entry(value).or_insert(0) += 1;
    }
    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().take(limit).map(|(value, _)| value).collect()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn diff(id: i64, language: &str, skills: &[&str]) -> CodeChangeEvidence {
        CodeChangeEvidence {
            id,
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
            file_path: format!("src/{id}.rs"),
            file_name: format!("{id}.rs"),
            language: language.into(),
            lines_added: 1,
            lines_deleted: 0,
            diff_content: String::new(),
            ai_insight: None,
            skills_detected: skills.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    #[test]
    fn test_rank_skills_counts_each_diff_once() {
        let diffs = vec![
            diff(1, "rust", &["Rust", "rust", "Tokio"]),
            diff(2, "rust", &["Rust"]),
            diff(3, "sql", &["SQL"]),
        ];

        let ranked = rank_skills(&diffs);

        assert_eq!(ranked[0].key, "rust");
        assert_eq!(ranked[0].diffs, 2);
        let keys: Vec<_> = ranked.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, ["rust", "sql", "tokio"]);
    }

    #[test]
    fn test_rank_by_count_breaks_ties_alphabetically() {
        let values = ["b", "a", "b", "c", "a"].into_iter().map(String::from);
        assert_eq!(rank_by_count(values, 2), vec!["a", "b"]);
    }

    #[test]
    fn test_unanalysed_diffs_contribute_no_skills() {
        assert!(rank_skills(&[diff(1, "rust", &[])]).is_empty());
    }
}
