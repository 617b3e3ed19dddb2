//! Data sources - Read-only queries over existing deployments
//!
//! `golden_gate_deployments` lists the deployments of a compartment,
//! narrowed on the service side by display name and lifecycle state and on
//! the client side by `filter` blocks. `golden_gate_deployment` reads one
//! deployment by id.

use cirrus_core::LifecycleState;
use cirrus_core::resource::{State, Value};
use regex::Regex;

pub const GOLDEN_GATE_DEPLOYMENTS: &str = "golden_gate_deployments";

/// Arguments of the `golden_gate_deployments` data source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeploymentsQuery {
    pub compartment_id: String,
    pub display_name: Option<String>,
    pub state: Option<LifecycleState>,
    pub filters: Vec<Filter>,
}

impl DeploymentsQuery {
    pub fn new(compartment_id: impl Into<String>) -> Self {
        Self {
            compartment_id: compartment_id.into(),
            ..Default::default()
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn with_state(mut self, state: LifecycleState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }
}

/// A `filter` block: keeps items whose attribute `name` matches any of `values`
///
/// Values are compared exactly unless `regex` is set. All filters of a query
/// must match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub name: String,
    pub values: Vec<String>,
    pub regex: bool,
}

impl Filter {
    pub fn new(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            values,
            regex: false,
        }
    }

    pub fn with_regex(mut self) -> Self {
        self.regex = true;
        self
    }

    pub(crate) fn compile(&self) -> Result<CompiledFilter, regex::Error> {
        let patterns = if self.regex {
            self.values
                .iter()
                .map(|value| Regex::new(value))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            vec![]
        };
        Ok(CompiledFilter {
            filter: self.clone(),
            patterns,
        })
    }
}

pub(crate) struct CompiledFilter {
    filter: Filter,
    patterns: Vec<Regex>,
}

impl CompiledFilter {
    pub(crate) fn matches(&self, state: &State) -> bool {
        state
            .attributes
            .get(&self.filter.name)
            .is_some_and(|value| self.matches_value(value))
    }

    fn matches_value(&self, value: &Value) -> bool {
        let text = match value {
            Value::String(s) => s.clone(),
            Value::Int(i) => i.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::List(items) => return items.iter().any(|item| self.matches_value(item)),
            Value::Map(_) => return false,
        };
        if self.filter.regex {
            self.patterns.iter().any(|pattern| pattern.is_match(&text))
        } else {
            self.filter.values.contains(&text)
        }
    }
}
