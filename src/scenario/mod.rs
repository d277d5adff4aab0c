//! Scenario registry: named foreground programs and their documented
//! outputs.
//!
//! # Module structure
//!
//! | Sub-module | Contents |
//! |---|---|
//! | [`builtin`] | the built-in demos and task scenarios |

pub mod builtin;

use crate::error::{TurnstileError, TurnstileResult};
use crate::task::Program;

/// A foreground program plus what the driver needs to run it.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Scenario {
    /// Registry key, also used as the label of the trace line.
    pub name: String,
    #[cfg_attr(feature = "serialize", serde(default))]
    pub description: String,
    pub program: Program,
    /// Raise the shared flag before running, so the ticker has something to
    /// report on its first check.
    #[cfg_attr(feature = "serialize", serde(default = "primed_default"))]
    pub primed: bool,
    /// Trace lines this scenario is known to produce. The first is the line
    /// under the default configuration.
    #[cfg_attr(feature = "serialize", serde(default))]
    pub documented: Vec<String>,
}

#[cfg(feature = "serialize")]
fn primed_default() -> bool {
    true
}

impl Scenario {
    /// A primed scenario with no description or documented outputs.
    pub fn new(name: impl Into<String>, program: Program) -> Self {
        Scenario {
            name: name.into(),
            description: String::new(),
            program,
            primed: true,
            documented: Vec::new(),
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn unprimed(mut self) -> Self {
        self.primed = false;
        self
    }

    pub fn documented(mut self, line: impl Into<String>) -> Self {
        self.documented.push(line.into());
        self
    }

    /// Whether `line` is one of the documented outputs.
    pub fn is_documented(&self, line: &str) -> bool {
        self.documented.iter().any(|d| d == line)
    }
}

/// Ordered collection of scenarios. Iteration follows registration order.
#[derive(Debug, Clone, Default)]
pub struct ScenarioRegistry {
    scenarios: Vec<Scenario>,
}

impl ScenarioRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in scenario.
    pub fn builtin() -> Self {
        ScenarioRegistry {
            scenarios: builtin::all(),
        }
    }

    /// Add a scenario after validating its program.
    pub fn register(&mut self, scenario: Scenario) -> TurnstileResult<()> {
        if self.contains(&scenario.name) {
            return Err(TurnstileError::DuplicateScenario(scenario.name));
        }
        scenario.program.validate()?;
        tracing::debug!(name = %scenario.name, "scenario registered");
        self.scenarios.push(scenario);
        Ok(())
    }

    pub fn get(&self, name: &str) -> TurnstileResult<&Scenario> {
        self.scenarios
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| TurnstileError::UnknownScenario(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.scenarios.iter().any(|s| s.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.scenarios.iter().map(|s| s.name.as_str()).collect()
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

    /// Parse a JSON array of scenarios into a new registry.
    #[cfg(feature = "serialize")]
    pub fn from_json(json: &str) -> TurnstileResult<Self> {
        let scenarios: Vec<Scenario> = serde_json::from_str(json)
            .map_err(|e| TurnstileError::Serialization(e.to_string()))?;
        let mut registry = Self::new();
        for scenario in scenarios {
            registry.register(scenario)?;
        }
        Ok(registry)
    }

    /// Register every scenario from a JSON array on top of this registry.
    #[cfg(feature = "serialize")]
    pub fn extend_from_json(&mut self, json: &str) -> TurnstileResult<()> {
        for scenario in Self::from_json(json)?.scenarios {
            self.register(scenario)?;
        }
        Ok(())
    }

    #[cfg(feature = "serialize")]
    pub fn to_json(&self) -> TurnstileResult<String> {
        serde_json::to_string_pretty(&self.scenarios)
            .map_err(|e| TurnstileError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests;
