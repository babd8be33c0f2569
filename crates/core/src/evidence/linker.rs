//! Evidence linker - maps free-text claims back to supporting sessions
//!
//! Matching is purely lexical. Each session becomes one lower-cased
//! document (category, primary app, summary, skills and the file names of
//! its diffs) and claims are scored token by token against it.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use skilltrail_domain::{ClaimEvidence, EvidenceSessionRef, LinkerConfig, Result, Session};
use tracing::debug;

use super::tokenizer::tokenize;
use crate::tracking::DiffRepository;

const SUBSTRING_SCORE: u32 = 1;
const SKILL_MATCH_SCORE: u32 = 2;

/// Searchable view of one session.
#[derive(Debug, Clone)]
struct SessionDocument {
    session: Session,
    text: String,
    skills: HashSet<String>,
}

impl SessionDocument {
    fn evidence_bonus(&self) -> u32 {
        u32::from(self.session.has_diff_evidence()) + u32::from(self.session.has_browser_evidence())
    }

    /// Diff +2, browser +1, non-empty summary +1.
    fn richness(&self) -> u32 {
        2 * u32::from(self.session.has_diff_evidence())
            + u32::from(self.session.has_browser_evidence())
            + u32::from(!self.session.summary.trim().is_empty())
    }

    fn token_score(&self, tokens: &[String]) -> u32 {
        tokens
            .iter()
            .map(|token| {
                let mut score = 0;
                if self.text.contains(token.as_str()) {
                    score += SUBSTRING_SCORE;
                }
                if self.skills.contains(token) {
                    score += SKILL_MATCH_SCORE;
                }
                score
            })
            .sum()
    }
}

/// Higher score first, then the most recent session, then the higher id.
fn by_score_then_recency(a: (u32, &Session), b: (u32, &Session)) -> Ordering {
    b.0.cmp(&a.0)
        .then_with(|| b.1.end_time.cmp(&a.1.end_time))
        .then_with(|| b.1.id.cmp(&a.1.id))
}

/// Pre-built documents for a fixed set of sessions.
#[derive(Debug, Clone, Default)]
pub struct LinkCorpus {
    documents: Vec<SessionDocument>,
}

impl LinkCorpus {
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Sessions supporting `claim`, best first, at most `top_k`.
    ///
    /// When no session matches a token, the most evidence-rich sessions are
    /// returned instead so a claim is never left without references.
    pub fn rank(&self, claim: &str, top_k: usize) -> Vec<EvidenceSessionRef> {
        if top_k == 0 || self.documents.is_empty() {
            return Vec::new();
        }

        let tokens = tokenize(claim);
        let mut scored: Vec<(u32, &Session)> = self
            .documents
            .iter()
            .filter_map(|doc| {
                let score = doc.token_score(&tokens);
                (score > 0).then(|| (score + doc.evidence_bonus(), &doc.session))
            })
            .collect();

        if scored.is_empty() {
            debug!(tokens = tokens.len(), "no lexical match; ranking by evidence richness");
            scored = self.documents.iter().map(|doc| (doc.richness(), &doc.session)).collect();
        }

        scored.sort_by(|a, b| by_score_then_recency(*a, *b));
        scored
            .into_iter()
            .take(top_k)
            .map(|(_, session)| EvidenceSessionRef::from(session))
            .collect()
    }
}

/// Sessions with the given ids, in the given order. Unknown and repeated
/// ids are skipped.
pub fn explicit_refs(sessions: &[Session], ids: &[i64]) -> Vec<EvidenceSessionRef> {
    let by_id: HashMap<i64, &Session> =
        sessions.iter().map(|session| (session.id, session)).collect();
    let mut seen = HashSet::new();
    ids.iter()
        .filter(|id| seen.insert(**id))
        .filter_map(|id| by_id.get(id))
        .map(|session| EvidenceSessionRef::from(*session))
        .collect()
}

/// Links claims to the sessions of a period.
pub struct EvidenceLinker {
    diffs: Arc<dyn DiffRepository>,
    default_top_k: usize,
}

impl EvidenceLinker {
    pub fn new(diffs: Arc<dyn DiffRepository>, config: &LinkerConfig) -> Self {
        Self { diffs, default_top_k: config.default_top_k }
    }

    pub fn default_top_k(&self) -> usize {
        self.default_top_k
    }

    /// Build documents for `sessions`, resolving all diff file names in a
    /// single batch read.
    pub async fn build_corpus(&self, sessions: &[Session]) -> Result<LinkCorpus> {
        let mut diff_ids: Vec<i64> =
            sessions.iter().flat_map(|session| session.metadata.diff_ids()).collect();
        diff_ids.sort_unstable();
        diff_ids.dedup();

        let file_names: HashMap<i64, String> = if diff_ids.is_empty() {
            HashMap::new()
        } else {
            self.diffs
                .get_diffs_by_ids(&diff_ids)
                .await?
                .into_iter()
                .map(|diff| (diff.id, diff.file_name))
                .collect()
        };

        let documents = sessions
            .iter()
            .map(|session| {
                let mut parts = vec![
                    session.category.as_str(),
                    session.primary_app.as_str(),
                    session.summary.as_str(),
                ];
                parts.extend(session.skills_involved.iter().map(String::as_str));
                let ids = session.metadata.diff_ids();
                parts.extend(ids.iter().filter_map(|id| file_names.get(id)).map(String::as_str));

                let skills = session
                    .skills_involved
                    .iter()
                    .map(|name| name.trim().to_lowercase())
                    .chain(session.metadata.skill_keys())
                    .filter(|name| !name.is_empty())
                    .collect();

                SessionDocument {
                    session: session.clone(),
                    text: parts.join(" ").to_lowercase(),
                    skills,
                }
            })
            .collect();

        Ok(LinkCorpus { documents })
    }

    pub async fn link_claim(
        &self,
        claim: &str,
        sessions: &[Session],
        top_k: Option<usize>,
    ) -> Result<ClaimEvidence> {
        let corpus = self.build_corpus(sessions).await?;
        Ok(ClaimEvidence {
            claim: claim.to_string(),
            sessions: corpus.rank(claim, top_k.unwrap_or(self.default_top_k)),
        })
    }

    /// Link several claims against one shared corpus.
    pub async fn link_claims(
        &self,
        claims: &[String],
        sessions: &[Session],
        top_k: Option<usize>,
    ) -> Result<Vec<ClaimEvidence>> {
        let corpus = self.build_corpus(sessions).await?;
        let k = top_k.unwrap_or(self.default_top_k);
        Ok(claims
            .iter()
            .map(|claim| ClaimEvidence { claim: claim.clone(), sessions: corpus.rank(claim, k) })
            .collect())
    }

    /// Honour explicit session references when any of them exist in the
    /// period; otherwise fall back to lexical linking.
    pub async fn resolve_claim(
        &self,
        claim: &str,
        explicit_ids: &[i64],
        sessions: &[Session],
        top_k: Option<usize>,
    ) -> Result<ClaimEvidence> {
        let explicit = explicit_refs(sessions, explicit_ids);
        if !explicit.is_empty() {
            return Ok(ClaimEvidence { claim: claim.to_string(), sessions: explicit });
        }
        self.link_claim(claim, sessions, top_k).await
    }
}
