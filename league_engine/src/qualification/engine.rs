//! Rank-range selection over final standings.

use std::collections::{HashMap, HashSet};

use tracing::Span;

use super::models::{QualificationOutcome, QualificationRule, QualificationType};
use crate::tournament::TournamentStructure;
use crate::ranking::TournamentRanking;

/// Selects teams from final standings according to qualification rules
#[derive(Debug, Clone)]
pub struct QualificationEngine {
    span: Span,
}

impl QualificationEngine {
    pub fn new(span: Span) -> Self {
        Self { span }
    }

    /// Teams selected by each active rule.
    ///
    /// `sorted` must be in standings order. Rules run by `(min_rank, id)`; a team
    /// already selected by an earlier rule is not selected again. A rule limited
    /// to a group counts positions within that group only.
    pub fn select(
        &self,
        sorted: &[TournamentRanking],
        rules: &[QualificationRule],
    ) -> Vec<QualificationOutcome> {
        let mut active: Vec<&QualificationRule> = rules.iter().filter(|r| r.is_active).collect();
        if active.is_empty() {
            self.span
                .in_scope(|| tracing::warn!("no active qualification rules, nothing to apply"));
            return Vec::new();
        }
        active.sort_by_key(|r| (r.min_rank, r.id));

        let mut taken = HashSet::new();
        let mut outcomes = Vec::with_capacity(active.len());
        for rule in active {
            let (team_ids, ranking_ids): (Vec<_>, Vec<_>) = sorted
                .iter()
                .filter(|r| rule.group.is_none() || r.group == rule.group)
                .enumerate()
                .filter(|(index, _)| rule.covers(index + 1))
                .filter(|(_, r)| taken.insert(r.team_id))
                .map(|(_, r)| (r.team_id, r.id))
                .unzip();

            let outcome = QualificationOutcome {
                rule_id: rule.id,
                qualification_type: rule.qualification_type,
                to_tournament: rule.to_tournament,
                team_ids,
                ranking_ids,
            };

            self.span.in_scope(|| {
                tracing::debug!(
                    rule_id = rule.id,
                    kind = %rule.qualification_type,
                    min_rank = rule.min_rank,
                    max_rank = rule.max_rank,
                    selected = outcome.team_ids.len(),
                    "qualification rule applied"
                )
            });
            outcomes.push(outcome);
        }

        outcomes
    }
}

/// Trim outcomes so that no qualification type sends on more teams than the
/// structure allows. Earlier outcomes keep their teams first.
pub fn cap_outcomes(outcomes: &mut [QualificationOutcome], structure: &TournamentStructure) {
    let mut sent: HashMap<QualificationType, usize> = HashMap::new();
    for outcome in outcomes.iter_mut() {
        let Some(cap) = structure.entrant_cap(outcome.qualification_type) else {
            continue;
        };
        let used = sent.entry(outcome.qualification_type).or_default();
        let keep = cap.saturating_sub(*used).min(outcome.team_ids.len());
        outcome.team_ids.truncate(keep);
        outcome.ranking_ids.truncate(keep);
        *used += keep;
    }
}

/// Set `qualified` / `relegated` on the rankings selected by `outcomes`
pub fn apply_flags(rankings: &mut [TournamentRanking], outcomes: &[QualificationOutcome]) {
    for outcome in outcomes {
        for ranking in rankings
            .iter_mut()
            .filter(|r| outcome.ranking_ids.contains(&r.id))
        {
            if outcome.qualification_type.marks_qualified() {
                ranking.qualified = true;
            } else {
                ranking.relegated = true;
            }
        }
    }
}
