//! Qualification rule data models.

use serde::{Deserialize, Serialize};

use crate::ranking::RankingId;
use crate::tournament::{TeamId, TournamentError, TournamentId, TournamentResult};

/// Qualification rule ID type
pub type QualificationRuleId = i64;

/// What happens to the teams a rule selects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualificationType {
    Promotion,
    Relegation,
    Qualification,
    Playoff,
    Playout,
}

impl QualificationType {
    /// Whether selected rankings are flagged as qualified
    pub fn marks_qualified(self) -> bool {
        matches!(
            self,
            QualificationType::Promotion | QualificationType::Qualification | QualificationType::Playoff
        )
    }

    /// Whether selected rankings are flagged as relegated
    pub fn marks_relegated(self) -> bool {
        !self.marks_qualified()
    }
}

impl std::fmt::Display for QualificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QualificationType::Promotion => write!(f, "promotion"),
            QualificationType::Relegation => write!(f, "relegation"),
            QualificationType::Qualification => write!(f, "qualification"),
            QualificationType::Playoff => write!(f, "playoff"),
            QualificationType::Playout => write!(f, "playout"),
        }
    }
}

impl std::str::FromStr for QualificationType {
    type Err = TournamentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "promotion" => Ok(QualificationType::Promotion),
            "relegation" => Ok(QualificationType::Relegation),
            "qualification" => Ok(QualificationType::Qualification),
            "playoff" => Ok(QualificationType::Playoff),
            "playout" => Ok(QualificationType::Playout),
            other => Err(TournamentError::InvalidQualificationRule(format!(
                "unknown qualification type '{other}'"
            ))),
        }
    }
}

/// Maps a range of final positions in one tournament to another tournament
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualificationRule {
    pub id: QualificationRuleId,
    pub from_tournament: TournamentId,
    pub to_tournament: TournamentId,
    /// First qualifying position, 1-based
    pub min_rank: u32,
    /// Last qualifying position, inclusive
    pub max_rank: u32,
    pub qualification_type: QualificationType,
    /// Restrict the rule to one group of the origin
    pub group: Option<String>,
    pub description: String,
    /// 0 for the same season, 1 for the next one
    pub season_offset: i32,
    pub is_active: bool,
}

impl QualificationRule {
    pub fn covers(&self, position: usize) -> bool {
        let position = u32::try_from(position).unwrap_or(u32::MAX);
        (self.min_rank..=self.max_rank).contains(&position)
    }
}

/// Qualification rule before it is stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualificationRuleDraft {
    pub to_tournament: TournamentId,
    pub min_rank: u32,
    pub max_rank: u32,
    pub qualification_type: QualificationType,
    pub group: Option<String>,
    pub description: String,
    pub season_offset: i32,
    pub is_active: bool,
}

impl QualificationRuleDraft {
    /// Active same-season rule for positions `min_rank..=max_rank`
    pub fn new(
        to_tournament: TournamentId,
        min_rank: u32,
        max_rank: u32,
        qualification_type: QualificationType,
    ) -> Self {
        Self {
            to_tournament,
            min_rank,
            max_rank,
            qualification_type,
            group: None,
            description: String::new(),
            season_offset: 0,
            is_active: true,
        }
    }

    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_season_offset(mut self, season_offset: i32) -> Self {
        self.season_offset = season_offset;
        self
    }

    /// Check the rank range and that the rule does not point back at its origin.
    ///
    /// # Errors
    ///
    /// * `TournamentError::InvalidQualificationRule` - Bad range or self-reference
    pub fn validate(&self, from_tournament: Option<TournamentId>) -> TournamentResult<()> {
        if self.min_rank == 0 {
            return Err(TournamentError::InvalidQualificationRule(
                "ranks start at 1".to_string(),
            ));
        }
        if self.min_rank > self.max_rank {
            return Err(TournamentError::InvalidQualificationRule(format!(
                "min rank {} is after max rank {}",
                self.min_rank, self.max_rank
            )));
        }
        if from_tournament == Some(self.to_tournament) {
            return Err(TournamentError::InvalidQualificationRule(
                "a tournament cannot qualify teams into itself".to_string(),
            ));
        }
        Ok(())
    }

    /// Attach the stored identity
    pub fn into_rule(self, id: QualificationRuleId, from_tournament: TournamentId) -> QualificationRule {
        QualificationRule {
            id,
            from_tournament,
            to_tournament: self.to_tournament,
            min_rank: self.min_rank,
            max_rank: self.max_rank,
            qualification_type: self.qualification_type,
            group: self.group,
            description: self.description,
            season_offset: self.season_offset,
            is_active: self.is_active,
        }
    }
}

/// Teams selected by one rule, in standings order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualificationOutcome {
    pub rule_id: QualificationRuleId,
    pub qualification_type: QualificationType,
    pub to_tournament: TournamentId,
    pub team_ids: Vec<TeamId>,
    pub ranking_ids: Vec<RankingId>,
}

/// Result of applying every qualification rule of a tournament
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualificationReport {
    pub tournament_id: TournamentId,
    pub outcomes: Vec<QualificationOutcome>,
    /// Playoff tournament started from this report, if any
    pub playoff: Option<TournamentId>,
}

impl QualificationReport {
    pub fn empty(tournament_id: TournamentId) -> Self {
        Self {
            tournament_id,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Teams selected for `qualification_type`, across all rules
    pub fn teams_for(&self, qualification_type: QualificationType) -> Vec<TeamId> {
        self.outcomes
            .iter()
            .filter(|o| o.qualification_type == qualification_type)
            .flat_map(|o| o.team_ids.iter().copied())
            .collect()
    }
}
