use itertools::Itertools;
use serde_json::Value;
use std::cmp::Ordering;

use crate::model::{Entity, FilterAndSortCriteria, FilterOp, SortDirection};

/// Applies filter and sort criteria to entities in memory.
///
/// Criteria combine conjunctively; the values inside one criterion are
/// alternatives. Sorting follows the order in which sort criteria appear,
/// with records lacking the field placed last.
pub struct CriteriaEvaluator;

impl CriteriaEvaluator {
    /// Filter, sort and page a set of entities
    pub fn apply(
        entities: Vec<Entity>,
        criteria: &[FilterAndSortCriteria],
        start_index: usize,
        max_results: Option<usize>,
    ) -> Vec<Entity> {
        let sorts: Vec<&FilterAndSortCriteria> = criteria.iter().filter(|c| c.sort.is_some()).collect();

        let matching = entities
            .into_iter()
            .filter(|entity| Self::matches(entity, criteria))
            .sorted_by(|a, b| Self::compare_entities(a, b, &sorts))
            .skip(start_index);

        match max_results {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        }
    }

    /// Whether an entity satisfies every filtering criterion
    pub fn matches(entity: &Entity, criteria: &[FilterAndSortCriteria]) -> bool {
        criteria
            .iter()
            .filter(|c| c.is_filter())
            .all(|c| Self::matches_criterion(entity, c))
    }

    fn matches_criterion(entity: &Entity, criterion: &FilterAndSortCriteria) -> bool {
        let actual = Self::field_values(entity, &criterion.field);

        match criterion.op {
            FilterOp::IsNull => actual.iter().all(|v| v.is_null()),
            FilterOp::NotNull => actual.iter().any(|v| !v.is_null()),
            FilterOp::Ne => criterion
                .values
                .iter()
                .all(|expected| !actual.iter().any(|a| Self::values_equal(a, expected))),
            op => criterion.values.iter().any(|expected| {
                actual.iter().any(|a| match op {
                    FilterOp::Eq => Self::values_equal(a, expected),
                    FilterOp::Gt => Self::compare_values(a, expected) == Some(Ordering::Greater),
                    FilterOp::Gte => matches!(
                        Self::compare_values(a, expected),
                        Some(Ordering::Greater | Ordering::Equal)
                    ),
                    FilterOp::Lt => Self::compare_values(a, expected) == Some(Ordering::Less),
                    FilterOp::Lte => matches!(
                        Self::compare_values(a, expected),
                        Some(Ordering::Less | Ordering::Equal)
                    ),
                    FilterOp::Contains => match (a, expected) {
                        (Value::String(s), Value::String(needle)) => {
                            s.to_lowercase().contains(&needle.to_lowercase())
                        }
                        _ => false,
                    },
                    FilterOp::Ne | FilterOp::IsNull | FilterOp::NotNull => false,
                })
            }),
        }
    }

    /// Values of a field; `id` and `type` address the record itself
    fn field_values(entity: &Entity, field: &str) -> Vec<Value> {
        match field {
            "id" => vec![Value::String(entity.id.clone())],
            "type" => vec![Value::String(entity.entity_type.clone())],
            _ => entity
                .find_property(field)
                .map(|p| p.value.values().into_iter().cloned().collect())
                .unwrap_or_default(),
        }
    }

    fn compare_entities(a: &Entity, b: &Entity, sorts: &[&FilterAndSortCriteria]) -> Ordering {
        for criterion in sorts {
            let left = Self::field_values(a, &criterion.field).into_iter().next();
            let right = Self::field_values(b, &criterion.field).into_iter().next();

            let ordering = match (left.filter(|v| !v.is_null()), right.filter(|v| !v.is_null())) {
                (None, None) => Ordering::Equal,
                // missing values sort last regardless of direction
                (None, Some(_)) => return Ordering::Greater,
                (Some(_), None) => return Ordering::Less,
                (Some(l), Some(r)) => Self::compare_values(&l, &r).unwrap_or(Ordering::Equal),
            };

            let ordering = match criterion.sort {
                Some(SortDirection::Desc) => ordering.reverse(),
                _ => ordering,
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }

    fn values_equal(left: &Value, right: &Value) -> bool {
        left == right || Self::compare_values(left, right) == Some(Ordering::Equal)
    }

    /// Order two JSON scalars. Numbers and numeric strings compare
    /// numerically, other strings lexicographically.
    pub fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
        match (left, right) {
            (Value::Number(l), Value::Number(r)) => l.as_f64()?.partial_cmp(&r.as_f64()?),
            (Value::String(l), Value::String(r)) => match (l.parse::<f64>(), r.parse::<f64>()) {
                (Ok(lf), Ok(rf)) => lf.partial_cmp(&rf),
                _ => Some(l.cmp(r)),
            },
            (Value::Number(l), Value::String(r)) => l.as_f64()?.partial_cmp(&r.parse::<f64>().ok()?),
            (Value::String(l), Value::Number(r)) => l.parse::<f64>().ok()?.partial_cmp(&r.as_f64()?),
            (Value::Bool(l), Value::Bool(r)) => Some(l.cmp(r)),
            _ => None,
        }
    }
}
