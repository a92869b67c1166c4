use crate::constants::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BudgetKind {
    Time,
    Distance,
}

impl fmt::Display for BudgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BudgetKind::Time => write!(f, "time"),
            BudgetKind::Distance => write!(f, "distance"),
        }
    }
}

impl FromStr for BudgetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "time" => Ok(BudgetKind::Time),
            "distance" => Ok(BudgetKind::Distance),
            _ => Err(format!(
                "Invalid budget mode: {}. Use 'time' or 'distance'",
                s
            )),
        }
    }
}

/// A travel constraint: either a driving-time ceiling or a driving-distance
/// ceiling, never both.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Budget {
    Time { minutes: f64 },
    Distance { km: f64 },
}

impl Budget {
    pub fn new(kind: BudgetKind, value: f64) -> Result<Self, String> {
        match kind {
            BudgetKind::Time => Self::time(value),
            BudgetKind::Distance => Self::distance(value),
        }
    }

    pub fn time(minutes: f64) -> Result<Self, String> {
        if !minutes.is_finite() || !(MIN_BUDGET_VALUE..=MAX_TIME_BUDGET_MINUTES).contains(&minutes)
        {
            return Err(format!(
                "Invalid time budget: {} (must be between {} and {} minutes)",
                minutes,
                MIN_BUDGET_VALUE,
                MAX_TIME_BUDGET_MINUTES
            ));
        }
        Ok(Budget::Time { minutes })
    }

    pub fn distance(km: f64) -> Result<Self, String> {
        if !km.is_finite() || !(MIN_BUDGET_VALUE..=MAX_DISTANCE_BUDGET_KM).contains(&km) {
            return Err(format!(
                "Invalid distance budget: {} (must be between {} and {} km)",
                km,
                MIN_BUDGET_VALUE,
                MAX_DISTANCE_BUDGET_KM
            ));
        }
        Ok(Budget::Distance { km })
    }

    pub fn kind(&self) -> BudgetKind {
        match self {
            Budget::Time { .. } => BudgetKind::Time,
            Budget::Distance { .. } => BudgetKind::Distance,
        }
    }

    /// Minutes for time budgets, kilometers for distance budgets.
    pub fn value(&self) -> f64 {
        match *self {
            Budget::Time { minutes } => minutes,
            Budget::Distance { km } => km,
        }
    }

    pub fn tolerance(&self) -> ToleranceBand {
        ToleranceBand::around(self)
    }
}

/// Accepted range of real driving cost around a budget value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToleranceBand {
    pub lower: f64,
    pub upper: f64,
}

impl ToleranceBand {
    pub fn around(budget: &Budget) -> Self {
        let margin = match budget.kind() {
            BudgetKind::Time => TIME_TOLERANCE_MINUTES,
            BudgetKind::Distance => DISTANCE_TOLERANCE_KM,
        };
        let value = budget.value();

        ToleranceBand {
            lower: (value - margin).max(0.0),
            upper: value + margin,
        }
    }

    pub fn contains(&self, metric: f64) -> bool {
        (self.lower..=self.upper).contains(&metric)
    }
}
