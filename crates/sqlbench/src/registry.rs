//! Scenario registry.
//!
//! Scenarios are the cross-product of strategies, query shapes and limits,
//! built once and run in registry order.

use crate::config::DEFAULT_LIMITS;
use crate::query::QueryShape;
use crate::strategy::StrategyKind;

/// One benchmark case: a strategy bound to a query shape and a limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    strategy: StrategyKind,
    shape: QueryShape,
    limit: u64,
    label: String,
}

impl Scenario {
    pub fn new(strategy: StrategyKind, shape: QueryShape, limit: u64) -> Self {
        let label = match shape {
            QueryShape::Tickets => format!("{}-{}", strategy, limit),
            QueryShape::Ids => format!("{}-{}-{}", strategy, shape, limit),
        };
        Self {
            strategy,
            shape,
            limit,
            label,
        }
    }

    pub fn strategy(&self) -> StrategyKind {
        self.strategy
    }

    pub fn shape(&self) -> QueryShape {
        self.shape
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Deterministic label, stable across runs.
    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Ordered set of scenarios to run.
#[derive(Debug, Clone, Default)]
pub struct ScenarioRegistry {
    scenarios: Vec<Scenario>,
}

impl ScenarioRegistry {
    /// Build the cross-product, strategy-major, dropping duplicate inputs.
    pub fn new(strategies: &[StrategyKind], shapes: &[QueryShape], limits: &[u64]) -> Self {
        let strategies = dedup(strategies);
        let shapes = dedup(shapes);
        let limits = dedup(limits);

        let mut scenarios = Vec::with_capacity(strategies.len() * shapes.len() * limits.len());
        for &strategy in &strategies {
            for &shape in &shapes {
                for &limit in &limits {
                    scenarios.push(Scenario::new(strategy, shape, limit));
                }
            }
        }

        Self { scenarios }
    }

    /// Every strategy against the ticket query at the default limits.
    pub fn standard() -> Self {
        Self::new(&StrategyKind::ALL, &[QueryShape::Tickets], &DEFAULT_LIMITS)
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    pub fn iter(&self) -> impl Iterator<Item = &Scenario> {
        self.scenarios.iter()
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}

fn dedup<T: PartialEq + Copy>(items: &[T]) -> Vec<T> {
    let mut out = Vec::with_capacity(items.len());
    for &item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::{Binding, Library};

    #[test]
    fn test_standard_cross_product() {
        let registry = ScenarioRegistry::standard();
        assert_eq!(registry.len(), StrategyKind::ALL.len() * DEFAULT_LIMITS.len());

        let labels: Vec<_> = registry.iter().take(4).map(Scenario::label).collect();
        assert_eq!(labels, ["no-arg-1", "no-arg-100", "no-arg-1000", "no-arg-10000"]);
    }

    #[test]
    fn test_labels_are_unique_and_stable() {
        let build = || {
            ScenarioRegistry::new(&StrategyKind::ALL, &QueryShape::ALL, &[1, 100])
                .iter()
                .map(|s| s.label().to_string())
                .collect::<Vec<_>>()
        };
        let labels = build();
        let mut unique = labels.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), labels.len());
        assert_eq!(labels, build());
    }

    #[test]
    fn test_ids_label() {
        let scenario = Scenario::new(
            StrategyKind::LibrarySelectInto(Library::Sqlx, Binding::Args),
            QueryShape::Ids,
            1000,
        );
        assert_eq!(scenario.label(), "sqlx-select-args-ids-1000");
    }

    #[test]
    fn test_duplicates_collapse() {
        let registry = ScenarioRegistry::new(
            &[StrategyKind::NoArgQuery, StrategyKind::NoArgQuery],
            &[QueryShape::Tickets],
            &[10, 10, 1],
        );
        let labels: Vec<_> = registry.iter().map(Scenario::label).collect();
        assert_eq!(labels, ["no-arg-10", "no-arg-1"]);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(ScenarioRegistry::new(&[], &QueryShape::ALL, &[1]).is_empty());
    }
}
