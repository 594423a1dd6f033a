use crate::model::{Id, UserContext};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Contains,
    IsNull,
    NotNull,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Filter and/or sort instruction for one field. A record matches when any
/// of `values` satisfies `op`; a criterion without values filters nothing
/// (unless the operator is a null check).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterAndSortCriteria {
    pub field: String,
    #[serde(default = "default_op")]
    pub op: FilterOp,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortDirection>,
}

fn default_op() -> FilterOp {
    FilterOp::Eq
}

impl FilterAndSortCriteria {
    pub fn new(field: impl Into<String>, op: FilterOp, values: Vec<serde_json::Value>) -> Self {
        Self {
            field: field.into(),
            op,
            values,
            sort: None,
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self::new(field, FilterOp::Eq, vec![value.into()])
    }

    pub fn any_of<V: Into<serde_json::Value>>(field: impl Into<String>, values: Vec<V>) -> Self {
        Self::new(field, FilterOp::Eq, values.into_iter().map(Into::into).collect())
    }

    pub fn sort_by(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::Eq,
            values: Vec::new(),
            sort: Some(direction),
        }
    }

    pub fn sorted(mut self, direction: SortDirection) -> Self {
        self.sort = Some(direction);
        self
    }

    /// Whether this criterion restricts the result set
    pub fn is_filter(&self) -> bool {
        !self.values.is_empty() || matches!(self.op, FilterOp::IsNull | FilterOp::NotNull)
    }
}

/// Metadata-driven request naming a target type plus optional criteria.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistencePackageRequest {
    pub ceiling_type: String,
    #[serde(default)]
    pub criteria: Vec<FilterAndSortCriteria>,
    /// Opaque tokens handed through to the persistence collaborator
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_criteria: Vec<String>,
    #[serde(default)]
    pub start_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<usize>,
    #[serde(default)]
    pub context: UserContext,
}

impl PersistencePackageRequest {
    pub fn new(ceiling_type: impl Into<String>, context: UserContext) -> Self {
        Self {
            ceiling_type: ceiling_type.into(),
            criteria: Vec::new(),
            custom_criteria: Vec::new(),
            start_index: 0,
            max_results: None,
            context,
        }
    }

    pub fn with_criteria(mut self, criteria: FilterAndSortCriteria) -> Self {
        self.criteria.push(criteria);
        self
    }

    pub fn page(mut self, start_index: usize, max_results: usize) -> Self {
        self.start_index = start_index;
        self.max_results = Some(max_results);
        self
    }
}

/// Address of one item in a sub-collection. For map-like collections the
/// entry is found by `prior_key`, then by `item_id`; `current_key` is only
/// consulted when neither of those is given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionItemKey {
    pub item_id: Id,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prior_key: Option<String>,
}

impl CollectionItemKey {
    pub fn new(item_id: impl Into<Id>) -> Self {
        Self {
            item_id: item_id.into(),
            current_key: None,
            prior_key: None,
        }
    }

    /// Empty keys are treated as absent
    pub fn with_current_key(mut self, key: Option<&str>) -> Self {
        self.current_key = key.filter(|k| !k.is_empty()).map(str::to_string);
        self
    }

    /// Empty prior keys are treated as absent
    pub fn with_prior_key(mut self, key: Option<&str>) -> Self {
        self.prior_key = key.filter(|k| !k.is_empty()).map(str::to_string);
        self
    }

    pub fn has_item_id(&self) -> bool {
        !self.item_id.is_empty()
    }

    /// The current key, when the item is addressed by nothing else
    pub fn fallback_key(&self) -> Option<&str> {
        if self.prior_key.is_none() && !self.has_item_id() {
            self.current_key.as_deref()
        } else {
            None
        }
    }
}
