//! organtwin_bench: trajectory tests for the organ twin and its learner.
//!
//! Validates behavior over many simulated meals:
//! - A day of the no-op action leaves every meal untouched
//! - Diet contrast (salty vs. heart-friendly) separates heart trajectories
//! - Daily interventions without meals only ever improve health
//! - Long learner runs keep epsilon, replay and sync invariants

use organtwin_agent::ActionKind;
use organtwin_core::{MealOutcome, NutrientVector, OrganTwin, SimulationError};

/// Feed `meal` to the twin `days × meals_per_day` times, optionally through an action.
pub fn simulate_days(
    twin: &mut OrganTwin,
    meal: &NutrientVector,
    action: Option<ActionKind>,
    portion_grams: f64,
    days: u32,
    meals_per_day: u32,
) -> Result<Vec<MealOutcome>, SimulationError> {
    let mut outcomes = Vec::with_capacity((days * meals_per_day) as usize);
    for day in 0..days {
        for n in 0..meals_per_day {
            let fed = match action {
                Some(kind) => kind.apply(meal),
                None => *meal,
            };
            let label = format!("day {} meal {}", day + 1, n + 1);
            outcomes.push(twin.advance(&fed, portion_grams, &label)?);
        }
    }
    Ok(outcomes)
}
