//! Organ Registry: static per-organ configuration.
//!
//! The registry is pure data. It is built once from [`OrganSpec`]s (either the
//! built-in table or a `[[registry.organs]]` list in the config file) and
//! validated up front: weights must sum to 1.0 and every sensitivity must name
//! one of the nine tracked nutrients. A malformed registry is rejected, never
//! silently normalized.

use crate::error::RegistryError;
use crate::nutrients::Nutrient;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Tolerance for the weight-sum check.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// How a metric is clamped around its baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Pressure, creatinine and inflammation style readings: baseline x 0.5..1.5.
    Regulatory,
    /// Capacity style readings: baseline x 0.3..1.2.
    Functional,
}

impl MetricKind {
    /// Classify a metric by name when the config does not say.
    pub fn infer(metric: &str) -> Self {
        const REGULATORY: [&str; 3] = ["pressure", "creatinine", "inflammation"];
        if REGULATORY.iter().any(|k| metric.contains(k)) {
            MetricKind::Regulatory
        } else {
            MetricKind::Functional
        }
    }

    /// Clamp range for a metric with the given baseline.
    pub fn bounds(self, baseline: f64) -> (f64, f64) {
        match self {
            MetricKind::Regulatory => (baseline * 0.5, baseline * 1.5),
            MetricKind::Functional => (baseline * 0.3, baseline * 1.2),
        }
    }
}

/// Raw metric entry as written in configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricSpec {
    pub name: String,
    pub baseline: f64,
    #[serde(default)]
    pub kind: Option<MetricKind>,
}

/// Raw organ entry as written in configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganSpec {
    pub name: String,
    #[serde(default)]
    pub system: String,
    #[serde(default)]
    pub function: String,
    pub weight: f64,
    #[serde(default)]
    pub sensitivity: BTreeMap<String, f64>,
    #[serde(default)]
    pub metrics: Vec<MetricSpec>,
}

/// A validated metric definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricDefinition {
    pub name: String,
    pub baseline: f64,
    pub kind: MetricKind,
}

/// A validated organ definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrganDefinition {
    pub name: String,
    pub system: String,
    pub function: String,
    /// Share of overall health. Positive; all weights sum to 1.0.
    pub weight: f64,
    /// Signed coefficients: positive = harmful, negative = beneficial.
    pub sensitivity: Vec<(Nutrient, f64)>,
    pub metrics: Vec<MetricDefinition>,
}

impl OrganDefinition {
    pub fn sensitivity_to(&self, nutrient: Nutrient) -> f64 {
        self.sensitivity
            .iter()
            .find(|(n, _)| *n == nutrient)
            .map(|(_, s)| *s)
            .unwrap_or(0.0)
    }
}

/// The fixed set of organs tracked by a twin, in canonical order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrganRegistry {
    organs: Vec<OrganDefinition>,
}

impl OrganRegistry {
    /// Validate raw specs into a registry.
    pub fn from_specs(specs: &[OrganSpec]) -> Result<Self, RegistryError> {
        if specs.is_empty() {
            return Err(RegistryError::Empty);
        }

        let mut seen = HashSet::new();
        let mut organs = Vec::with_capacity(specs.len());
        for spec in specs {
            if !seen.insert(spec.name.as_str()) {
                return Err(RegistryError::DuplicateOrgan(spec.name.clone()));
            }
            if !spec.weight.is_finite() || spec.weight <= 0.0 {
                return Err(RegistryError::InvalidWeight {
                    organ: spec.name.clone(),
                    weight: spec.weight,
                });
            }

            let mut sensitivity = Vec::with_capacity(spec.sensitivity.len());
            for (key, &coef) in &spec.sensitivity {
                let nutrient =
                    Nutrient::from_name(key).ok_or_else(|| RegistryError::UnknownNutrient {
                        organ: spec.name.clone(),
                        nutrient: key.clone(),
                    })?;
                if !coef.is_finite() {
                    return Err(RegistryError::InvalidSensitivity {
                        organ: spec.name.clone(),
                        nutrient: key.clone(),
                    });
                }
                sensitivity.push((nutrient, coef));
            }
            sensitivity.sort_by_key(|(n, _)| *n);

            let mut metrics = Vec::with_capacity(spec.metrics.len());
            for m in &spec.metrics {
                // Zero is allowed; deviation reporting guards it.
                if !m.baseline.is_finite() || m.baseline < 0.0 {
                    return Err(RegistryError::InvalidBaseline {
                        organ: spec.name.clone(),
                        metric: m.name.clone(),
                        baseline: m.baseline,
                    });
                }
                metrics.push(MetricDefinition {
                    name: m.name.clone(),
                    baseline: m.baseline,
                    kind: m.kind.unwrap_or_else(|| MetricKind::infer(&m.name)),
                });
            }

            organs.push(OrganDefinition {
                name: spec.name.clone(),
                system: spec.system.clone(),
                function: spec.function.clone(),
                weight: spec.weight,
                sensitivity,
                metrics,
            });
        }

        let total: f64 = organs.iter().map(|o| o.weight).sum();
        if (total - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(RegistryError::WeightSum(total));
        }

        Ok(Self { organs })
    }

    /// The built-in ten-organ registry, built straight from the typed table.
    pub fn standard() -> Self {
        Self {
            organs: STANDARD_ORGANS.iter().map(BuiltinOrgan::definition).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.organs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.organs.is_empty()
    }

    pub fn organs(&self) -> &[OrganDefinition] {
        &self.organs
    }

    pub fn iter(&self) -> impl Iterator<Item = &OrganDefinition> {
        self.organs.iter()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.organs.iter().position(|o| o.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&OrganDefinition> {
        self.organs.iter().find(|o| o.name == name)
    }

    pub fn weights(&self) -> impl Iterator<Item = f64> + '_ {
        self.organs.iter().map(|o| o.weight)
    }
}

impl Default for OrganRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

/// A built-in organ, typed so it needs no validation.
struct BuiltinOrgan {
    name: &'static str,
    system: &'static str,
    function: &'static str,
    weight: f64,
    sensitivity: &'static [(Nutrient, f64)],
    metrics: &'static [(&'static str, f64)],
}

impl BuiltinOrgan {
    fn definition(&self) -> OrganDefinition {
        let mut sensitivity = self.sensitivity.to_vec();
        sensitivity.sort_by_key(|(n, _)| *n);
        OrganDefinition {
            name: self.name.to_string(),
            system: self.system.to_string(),
            function: self.function.to_string(),
            weight: self.weight,
            sensitivity,
            metrics: self
                .metrics
                .iter()
                .map(|&(name, baseline)| MetricDefinition {
                    name: name.to_string(),
                    baseline,
                    kind: MetricKind::infer(name),
                })
                .collect(),
        }
    }

    fn spec(&self) -> OrganSpec {
        OrganSpec {
            name: self.name.to_string(),
            system: self.system.to_string(),
            function: self.function.to_string(),
            weight: self.weight,
            sensitivity: self
                .sensitivity
                .iter()
                .map(|(n, s)| (n.name().to_string(), *s))
                .collect(),
            metrics: self
                .metrics
                .iter()
                .map(|&(name, baseline)| MetricSpec {
                    name: name.to_string(),
                    baseline,
                    kind: None,
                })
                .collect(),
        }
    }
}

const STANDARD_ORGANS: [BuiltinOrgan; 10] = [
    BuiltinOrgan {
        name: "heart",
        system: "Cardiovascular",
        function: "Blood circulation & oxygen transport",
        weight: 0.14,
        sensitivity: &[(Nutrient::Sodium, 0.8), (Nutrient::Fat, 0.6), (Nutrient::Fiber, -0.4)],
        metrics: &[
            ("blood_pressure", 120.0),
            ("cardiac_output", 5.0),
            ("oxygen_delivery", 95.0),
            ("arterial_stiffness", 15.0),
        ],
    },
    BuiltinOrgan {
        name: "lungs",
        system: "Respiratory",
        function: "Gas exchange & oxygenation",
        weight: 0.11,
        sensitivity: &[(Nutrient::Sugar, 0.7), (Nutrient::Iron, -0.3), (Nutrient::Fiber, -0.2)],
        metrics: &[
            ("oxygen_saturation", 98.0),
            ("lung_capacity", 4.5),
            ("airway_resistance", 2.1),
            ("inflammation_markers", 1.2),
        ],
    },
    BuiltinOrgan {
        name: "brain",
        system: "Neurological",
        function: "Cognition, memory, coordination",
        weight: 0.14,
        sensitivity: &[(Nutrient::Sugar, 0.6), (Nutrient::Fat, -0.2), (Nutrient::Protein, -0.3)],
        metrics: &[
            ("cognitive_score", 92.0),
            ("blood_flow", 750.0),
            ("neurotransmitters", 88.0),
            ("inflammation", 1.5),
        ],
    },
    BuiltinOrgan {
        name: "kidneys",
        system: "Renal",
        function: "Filtration & waste removal",
        weight: 0.09,
        sensitivity: &[(Nutrient::Sodium, 0.9), (Nutrient::Protein, 0.4), (Nutrient::Calcium, 0.2)],
        metrics: &[
            ("gfr", 95.0),
            ("creatinine", 0.9),
            ("electrolyte_balance", 92.0),
            ("toxin_clearance", 88.0),
        ],
    },
    BuiltinOrgan {
        name: "pancreas",
        system: "Endocrine",
        function: "Blood sugar regulation & digestion",
        weight: 0.09,
        sensitivity: &[(Nutrient::Sugar, 0.9), (Nutrient::Fiber, -0.6), (Nutrient::Carbs, 0.3)],
        metrics: &[
            ("insulin_sensitivity", 85.0),
            ("beta_cell_function", 78.0),
            ("enzyme_production", 90.0),
            ("inflammation", 2.1),
        ],
    },
    BuiltinOrgan {
        name: "liver",
        system: "Metabolic",
        function: "Detoxification & metabolism",
        weight: 0.11,
        sensitivity: &[(Nutrient::Sugar, 0.8), (Nutrient::Protein, -0.3), (Nutrient::Fat, 0.3)],
        metrics: &[
            ("detox_rate", 88.0),
            ("fat_content", 18.0),
            ("enzyme_levels", 92.0),
            ("inflammation", 1.8),
        ],
    },
    BuiltinOrgan {
        name: "gut",
        system: "Digestive",
        function: "Digestion & nutrient absorption",
        weight: 0.09,
        sensitivity: &[(Nutrient::Fiber, -0.7), (Nutrient::Sugar, 0.6)],
        metrics: &[
            ("microbiome_diversity", 65.0),
            ("absorption_rate", 78.0),
            ("barrier_integrity", 82.0),
            ("inflammation", 2.3),
        ],
    },
    BuiltinOrgan {
        name: "skin",
        system: "Integumentary",
        function: "Protection & temperature regulation",
        weight: 0.05,
        sensitivity: &[(Nutrient::Sugar, 0.3), (Nutrient::Protein, -0.2)],
        metrics: &[
            ("hydration", 85.0),
            ("elasticity", 75.0),
            ("barrier_function", 80.0),
        ],
    },
    BuiltinOrgan {
        name: "immune",
        system: "Immune",
        function: "Pathogen defense & immune regulation",
        weight: 0.09,
        sensitivity: &[(Nutrient::Sugar, 0.4), (Nutrient::Protein, -0.3), (Nutrient::Iron, -0.3)],
        metrics: &[
            ("immune_response", 78.0),
            ("antibody_levels", 82.0),
            ("inflammation_control", 75.0),
        ],
    },
    BuiltinOrgan {
        name: "muscles",
        system: "Musculoskeletal",
        function: "Movement & metabolism",
        weight: 0.09,
        sensitivity: &[(Nutrient::Protein, -0.5), (Nutrient::Calcium, -0.3), (Nutrient::Iron, -0.2)],
        metrics: &[
            ("strength", 85.0),
            ("endurance", 78.0),
            ("recovery_rate", 72.0),
        ],
    },
];

/// Raw specs for the built-in registry. Exposed so a config file can start
/// from them and tweak a few entries.
pub fn standard_specs() -> Vec<OrganSpec> {
    STANDARD_ORGANS.iter().map(BuiltinOrgan::spec).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_registry_is_valid() {
        let registry = OrganRegistry::standard();
        assert_eq!(registry.len(), 10);
        let total: f64 = registry.weights().sum();
        assert!((total - 1.0).abs() < WEIGHT_SUM_TOLERANCE);
        assert_eq!(registry.organs()[0].name, "heart");
        assert_eq!(registry.organs()[9].name, "muscles");
    }

    #[test]
    fn test_standard_table_passes_validation() {
        let validated = OrganRegistry::from_specs(&standard_specs()).unwrap();
        assert_eq!(validated, OrganRegistry::standard());
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let mut specs = standard_specs();
        specs[0].weight += 0.1;
        match OrganRegistry::from_specs(&specs) {
            Err(RegistryError::WeightSum(total)) => assert!((total - 1.1).abs() < 1e-9),
            other => panic!("expected WeightSum, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_nutrient_is_fatal() {
        let mut specs = standard_specs();
        specs[1].sensitivity.insert("antioxidants".to_string(), -0.5);
        assert_eq!(
            OrganRegistry::from_specs(&specs),
            Err(RegistryError::UnknownNutrient {
                organ: "lungs".to_string(),
                nutrient: "antioxidants".to_string(),
            })
        );
    }

    #[test]
    fn test_duplicate_and_empty_rejected() {
        assert_eq!(OrganRegistry::from_specs(&[]), Err(RegistryError::Empty));
        let mut specs = standard_specs();
        specs[2].name = "heart".to_string();
        assert_eq!(
            OrganRegistry::from_specs(&specs),
            Err(RegistryError::DuplicateOrgan("heart".to_string()))
        );
    }

    #[test]
    fn test_negative_baseline_rejected() {
        let mut specs = standard_specs();
        specs[0].metrics[0].baseline = -1.0;
        assert!(matches!(
            OrganRegistry::from_specs(&specs),
            Err(RegistryError::InvalidBaseline { .. })
        ));
    }

    #[test]
    fn test_metric_kind_inference() {
        assert_eq!(MetricKind::infer("blood_pressure"), MetricKind::Regulatory);
        assert_eq!(MetricKind::infer("creatinine"), MetricKind::Regulatory);
        assert_eq!(MetricKind::infer("inflammation_markers"), MetricKind::Regulatory);
        assert_eq!(MetricKind::infer("gfr"), MetricKind::Functional);
        assert_eq!(MetricKind::Regulatory.bounds(100.0), (50.0, 150.0));
        let (lo, hi) = MetricKind::Functional.bounds(100.0);
        assert!((lo - 30.0).abs() < 1e-9 && (hi - 120.0).abs() < 1e-9);
    }

    #[test]
    fn test_sensitivity_lookup() {
        let registry = OrganRegistry::standard();
        let heart = registry.get("heart").unwrap();
        assert_eq!(heart.sensitivity_to(Nutrient::Sodium), 0.8);
        assert_eq!(heart.sensitivity_to(Nutrient::Iron), 0.0);
    }
}
