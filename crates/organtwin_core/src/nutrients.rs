//! Nutrient vectors: the per-meal stimulus fed into the organ twin.
//!
//! Nine named fields, each a non-negative amount. Missing fields deserialize
//! to zero, so a partial meal description contributes nothing for the
//! nutrients it leaves out.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the nine tracked nutrients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Nutrient {
    Calories,
    Carbs,
    Protein,
    Fat,
    Sugar,
    Fiber,
    Sodium,
    Calcium,
    Iron,
}

impl Nutrient {
    /// Canonical order, used by the state encoder and all reports.
    pub const ALL: [Nutrient; 9] = [
        Nutrient::Calories,
        Nutrient::Carbs,
        Nutrient::Protein,
        Nutrient::Fat,
        Nutrient::Sugar,
        Nutrient::Fiber,
        Nutrient::Sodium,
        Nutrient::Calcium,
        Nutrient::Iron,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Nutrient::Calories => "calories",
            Nutrient::Carbs => "carbs",
            Nutrient::Protein => "protein",
            Nutrient::Fat => "fat",
            Nutrient::Sugar => "sugar",
            Nutrient::Fiber => "fiber",
            Nutrient::Sodium => "sodium",
            Nutrient::Calcium => "calcium",
            Nutrient::Iron => "iron",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|n| n.name().eq_ignore_ascii_case(name.trim()))
    }

    /// Divisor applied before sensitivity weighting in the organ model.
    /// Daily limits for sodium/sugar, daily targets for fiber and calories.
    pub fn impact_divisor(self) -> f64 {
        match self {
            Nutrient::Sodium => 2300.0,
            Nutrient::Sugar => 50.0,
            Nutrient::Fiber => 25.0,
            Nutrient::Protein => 100.0,
            Nutrient::Calories => 2000.0,
            Nutrient::Fat => 100.0,
            _ => 100.0,
        }
    }

    /// Divisor applied when the nutrient becomes a learner feature.
    pub fn feature_scale(self) -> f64 {
        match self {
            Nutrient::Calories => 1000.0,
            Nutrient::Carbs => 200.0,
            Nutrient::Protein => 100.0,
            Nutrient::Fat => 100.0,
            Nutrient::Sugar => 100.0,
            Nutrient::Fiber => 50.0,
            Nutrient::Sodium => 5000.0,
            Nutrient::Calcium => 2000.0,
            Nutrient::Iron => 50.0,
        }
    }

    /// Display unit for recommendations.
    pub fn unit(self) -> &'static str {
        match self {
            Nutrient::Calories => "kcal",
            Nutrient::Sodium | Nutrient::Calcium | Nutrient::Iron => "mg",
            _ => "g",
        }
    }
}

impl fmt::Display for Nutrient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Nutrient {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| format!("unknown nutrient: {}", s))
    }
}

/// Nutrient amounts for one meal, per the 100g reference portion.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NutrientVector {
    pub calories: f64,
    pub carbs: f64,
    pub protein: f64,
    pub fat: f64,
    pub sugar: f64,
    pub fiber: f64,
    pub sodium: f64,
    pub calcium: f64,
    pub iron: f64,
}

impl NutrientVector {
    /// A moderate mixed meal, used when the caller has nothing better.
    pub fn typical_meal() -> Self {
        Self {
            calories: 300.0,
            carbs: 45.0,
            protein: 20.0,
            fat: 12.0,
            sugar: 8.0,
            fiber: 6.0,
            sodium: 500.0,
            calcium: 200.0,
            iron: 3.0,
        }
    }

    pub fn get(&self, nutrient: Nutrient) -> f64 {
        match nutrient {
            Nutrient::Calories => self.calories,
            Nutrient::Carbs => self.carbs,
            Nutrient::Protein => self.protein,
            Nutrient::Fat => self.fat,
            Nutrient::Sugar => self.sugar,
            Nutrient::Fiber => self.fiber,
            Nutrient::Sodium => self.sodium,
            Nutrient::Calcium => self.calcium,
            Nutrient::Iron => self.iron,
        }
    }

    pub fn get_mut(&mut self, nutrient: Nutrient) -> &mut f64 {
        match nutrient {
            Nutrient::Calories => &mut self.calories,
            Nutrient::Carbs => &mut self.carbs,
            Nutrient::Protein => &mut self.protein,
            Nutrient::Fat => &mut self.fat,
            Nutrient::Sugar => &mut self.sugar,
            Nutrient::Fiber => &mut self.fiber,
            Nutrient::Sodium => &mut self.sodium,
            Nutrient::Calcium => &mut self.calcium,
            Nutrient::Iron => &mut self.iron,
        }
    }

    pub fn set(&mut self, nutrient: Nutrient, value: f64) {
        *self.get_mut(nutrient) = value;
    }

    /// Builder-style setter.
    pub fn with(mut self, nutrient: Nutrient, value: f64) -> Self {
        self.set(nutrient, value);
        self
    }

    /// Amount divided by the organ-model divisor. Negative or non-finite
    /// amounts count as zero.
    pub fn normalized(&self, nutrient: Nutrient) -> f64 {
        intake(self.get(nutrient)) / nutrient.impact_divisor()
    }

    /// Amount divided by the learner feature scale.
    pub fn feature(&self, nutrient: Nutrient) -> f64 {
        intake(self.get(nutrient)) / nutrient.feature_scale()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Nutrient, f64)> + '_ {
        Nutrient::ALL.iter().map(move |&n| (n, self.get(n)))
    }
}

#[inline]
fn intake(v: f64) -> f64 {
    if v.is_finite() {
        v.max(0.0)
    } else {
        0.0
    }
}
