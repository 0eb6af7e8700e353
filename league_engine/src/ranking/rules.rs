//! Scoring rules and the points table they resolve to.

use serde::{Deserialize, Serialize};

use crate::tournament::{TournamentError, TournamentId, TournamentResult};

/// Scoring rule ID type
pub type RuleId = i64;

/// Kind of result a scoring rule awards points for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    PointWin,
    PointDraw,
    PointLoss,
    ExtraTimeWin,
    ExtraTimeLoss,
    ShootoutWin,
    ShootoutLoss,
}

impl RuleType {
    pub const ALL: [RuleType; 7] = [
        RuleType::PointWin,
        RuleType::PointDraw,
        RuleType::PointLoss,
        RuleType::ExtraTimeWin,
        RuleType::ExtraTimeLoss,
        RuleType::ShootoutWin,
        RuleType::ShootoutLoss,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleType::PointWin => "point_win",
            RuleType::PointDraw => "point_draw",
            RuleType::PointLoss => "point_loss",
            RuleType::ExtraTimeWin => "extra_time_win",
            RuleType::ExtraTimeLoss => "extra_time_loss",
            RuleType::ShootoutWin => "shootout_win",
            RuleType::ShootoutLoss => "shootout_loss",
        }
    }
}

impl std::fmt::Display for RuleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RuleType {
    type Err = TournamentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        RuleType::ALL
            .into_iter()
            .find(|rule| rule.as_str() == key)
            .ok_or_else(|| TournamentError::UnknownRuleType(s.to_string()))
    }
}

/// A per-tournament scoring rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringRule {
    pub id: RuleId,
    pub tournament_id: TournamentId,
    pub rule_type: RuleType,
    pub value: i32,
    /// Lower numbers are applied first
    pub priority: u32,
    pub is_active: bool,
    pub description: String,
}

/// Scoring rule before it is stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringRuleDraft {
    pub rule_type: RuleType,
    pub value: i32,
    pub priority: u32,
    pub is_active: bool,
    pub description: String,
}

impl ScoringRuleDraft {
    /// Active rule with default priority
    pub fn new(rule_type: RuleType, value: i32) -> Self {
        Self {
            rule_type,
            value,
            priority: 0,
            is_active: true,
            description: String::new(),
        }
    }

    /// Parse a `rule_type=value` pair, e.g. `point_win=3`.
    ///
    /// # Errors
    ///
    /// * `TournamentError::UnknownRuleType` - Rule type is not recognised
    /// * `TournamentError::InvalidRuleValue` - Value is not an integer
    pub fn parse(input: &str) -> TournamentResult<Self> {
        let (rule_type, value) = input
            .split_once('=')
            .ok_or_else(|| TournamentError::UnknownRuleType(input.to_string()))?;
        let rule_type: RuleType = rule_type.parse()?;
        let value = parse_integer(rule_type, &serde_json::Value::String(value.trim().to_string()))?;
        Ok(Self::new(rule_type, value))
    }

    /// Build a rule from an untyped JSON value, rejecting non-integer values.
    pub fn from_json(rule_type: RuleType, value: &serde_json::Value) -> TournamentResult<Self> {
        Ok(Self::new(rule_type, parse_integer(rule_type, value)?))
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}

fn parse_integer(rule_type: RuleType, value: &serde_json::Value) -> TournamentResult<i32> {
    let invalid = |reason: String| TournamentError::InvalidRuleValue { rule_type, reason };

    let wide = match value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| invalid(format!("{n} is not an integer")))?,
        serde_json::Value::String(s) => s
            .parse::<i64>()
            .map_err(|_| invalid(format!("'{s}' is not an integer")))?,
        other => return Err(invalid(format!("expected an integer, got {other}"))),
    };

    i32::try_from(wide).map_err(|_| invalid(format!("{wide} is out of range")))
}

/// Points awarded per result kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsTable {
    pub win: i32,
    pub draw: i32,
    pub loss: i32,
    pub extra_time_win: i32,
    pub extra_time_loss: i32,
    pub shootout_win: i32,
    pub shootout_loss: i32,
}

impl Default for PointsTable {
    fn default() -> Self {
        Self {
            win: 3,
            draw: 1,
            loss: 0,
            extra_time_win: 2,
            extra_time_loss: 1,
            shootout_win: 2,
            shootout_loss: 1,
        }
    }
}

impl PointsTable {
    /// Points for a rule type
    pub fn value(&self, rule_type: RuleType) -> i32 {
        match rule_type {
            RuleType::PointWin => self.win,
            RuleType::PointDraw => self.draw,
            RuleType::PointLoss => self.loss,
            RuleType::ExtraTimeWin => self.extra_time_win,
            RuleType::ExtraTimeLoss => self.extra_time_loss,
            RuleType::ShootoutWin => self.shootout_win,
            RuleType::ShootoutLoss => self.shootout_loss,
        }
    }

    fn set(&mut self, rule_type: RuleType, value: i32) {
        let slot = match rule_type {
            RuleType::PointWin => &mut self.win,
            RuleType::PointDraw => &mut self.draw,
            RuleType::PointLoss => &mut self.loss,
            RuleType::ExtraTimeWin => &mut self.extra_time_win,
            RuleType::ExtraTimeLoss => &mut self.extra_time_loss,
            RuleType::ShootoutWin => &mut self.shootout_win,
            RuleType::ShootoutLoss => &mut self.shootout_loss,
        };
        *slot = value;
    }

    /// Overlay active explicit rules on top of `defaults`.
    ///
    /// Rules are applied in priority order, so for a rule type the first active
    /// rule with the lowest priority wins.
    pub fn resolve(defaults: PointsTable, rules: &[ScoringRule]) -> PointsTable {
        let mut active: Vec<&ScoringRule> = rules.iter().filter(|r| r.is_active).collect();
        active.sort_by_key(|r| (r.priority, r.id));

        let mut table = defaults;
        let mut seen = Vec::with_capacity(active.len());
        for rule in active {
            if seen.contains(&rule.rule_type) {
                continue;
            }
            seen.push(rule.rule_type);
            table.set(rule.rule_type, rule.value);
        }
        table
    }
}
