//! Action Catalog: the eight discrete nutrition adjustments the learner picks from.
//!
//! Each action is a fixed multiplicative effect over nutrient fields.
//! Fields an action does not name pass through unchanged.

use crate::error::AgentError;
use organtwin_core::{Nutrient, NutrientVector};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    IncreaseProtein,
    ReduceSugar,
    BoostFiber,
    LowerSodium,
    BalanceCarbs,
    AddHealthyFats,
    ImproveHydration,
    Maintain,
}

impl ActionKind {
    /// Catalog order. The learner's output index maps onto this.
    pub const ALL: [ActionKind; 8] = [
        ActionKind::IncreaseProtein,
        ActionKind::ReduceSugar,
        ActionKind::BoostFiber,
        ActionKind::LowerSodium,
        ActionKind::BalanceCarbs,
        ActionKind::AddHealthyFats,
        ActionKind::ImproveHydration,
        ActionKind::Maintain,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ActionKind::IncreaseProtein => "Increase Protein & Repair",
            ActionKind::ReduceSugar => "Reduce Sugar & Inflammation",
            ActionKind::BoostFiber => "Boost Fiber & Gut Health",
            ActionKind::LowerSodium => "Lower Sodium & Blood Pressure",
            ActionKind::BalanceCarbs => "Balance Carbs & Energy",
            ActionKind::AddHealthyFats => "Add Healthy Fats",
            ActionKind::ImproveHydration => "Improve Hydration",
            ActionKind::Maintain => "Maintain Current Pattern",
        }
    }

    /// Multiplicative factors applied by this action.
    pub fn effects(self) -> &'static [(Nutrient, f64)] {
        match self {
            ActionKind::IncreaseProtein => &[(Nutrient::Protein, 1.2), (Nutrient::Calories, 1.05)],
            ActionKind::ReduceSugar => &[(Nutrient::Sugar, 0.8), (Nutrient::Carbs, 0.9)],
            ActionKind::BoostFiber => &[(Nutrient::Fiber, 1.3), (Nutrient::Carbs, 1.05)],
            ActionKind::LowerSodium => &[(Nutrient::Sodium, 0.7)],
            ActionKind::BalanceCarbs => &[
                (Nutrient::Carbs, 0.9),
                (Nutrient::Protein, 1.1),
                (Nutrient::Fat, 1.1),
            ],
            ActionKind::AddHealthyFats => &[(Nutrient::Fat, 1.2), (Nutrient::Calories, 1.05)],
            ActionKind::ImproveHydration => &[(Nutrient::Calories, 0.95)],
            ActionKind::Maintain => &[],
        }
    }

    pub fn apply(self, nutrients: &NutrientVector) -> NutrientVector {
        let mut out = *nutrients;
        for &(nutrient, factor) in self.effects() {
            *out.get_mut(nutrient) *= factor;
        }
        out
    }

    fn sentence(self, after: &NutrientVector) -> String {
        match self {
            ActionKind::IncreaseProtein => {
                format!("Raise protein to {:.1}g to support tissue repair", after.protein)
            }
            ActionKind::ReduceSugar => {
                format!("Cut sugar to {:.1}g to ease inflammation", after.sugar)
            }
            ActionKind::BoostFiber => {
                format!("Bring fiber up to {:.1}g for gut health", after.fiber)
            }
            ActionKind::LowerSodium => {
                format!("Lower sodium to {:.1}mg for blood pressure", after.sodium)
            }
            ActionKind::BalanceCarbs => format!(
                "Balance carbs ({:.1}g) against protein ({:.1}g)",
                after.carbs, after.protein
            ),
            ActionKind::AddHealthyFats => {
                format!("Add healthy fats up to {:.1}g", after.fat)
            }
            ActionKind::ImproveHydration => format!(
                "Drink more water and trim calories to {:.1}kcal",
                after.calories
            ),
            ActionKind::Maintain => "Current nutrition pattern is working, keep it".to_string(),
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One nutrient an action touches, before and after.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NutrientChange {
    pub nutrient: Nutrient,
    pub before: f64,
    pub after: f64,
}

/// What the learner suggests, with the numbers the text refers to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub action: usize,
    pub kind: ActionKind,
    pub label: String,
    pub changes: Vec<NutrientChange>,
    pub text: String,
}

/// The fixed, ordered action list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionCatalog {
    actions: Vec<ActionKind>,
}

impl Default for ActionCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl ActionCatalog {
    pub fn standard() -> Self {
        Self {
            actions: ActionKind::ALL.to_vec(),
        }
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<ActionKind, AgentError> {
        self.actions
            .get(index)
            .copied()
            .ok_or(AgentError::UnknownAction {
                index,
                len: self.actions.len(),
            })
    }

    pub fn labels(&self) -> Vec<String> {
        self.actions.iter().map(|a| a.label().to_string()).collect()
    }

    pub fn apply(&self, index: usize, nutrients: &NutrientVector) -> Result<NutrientVector, AgentError> {
        Ok(self.get(index)?.apply(nutrients))
    }

    pub fn recommendation(
        &self,
        index: usize,
        nutrients: &NutrientVector,
    ) -> Result<Recommendation, AgentError> {
        let kind = self.get(index)?;
        let after = kind.apply(nutrients);
        let changes = kind
            .effects()
            .iter()
            .map(|&(nutrient, _)| NutrientChange {
                nutrient,
                before: nutrients.get(nutrient),
                after: after.get(nutrient),
            })
            .collect();
        Ok(Recommendation {
            action: index,
            kind,
            label: kind.label().to_string(),
            changes,
            text: kind.sentence(&after),
        })
    }
}
