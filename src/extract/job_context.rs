use serde::Deserialize;
use serde_json::Value;

use crate::error::{ExtractError, Result};

use super::fragment::literal;

/// Path from the job message root to the `{k, v}` list of `github` context variables.
const CONTEXT_VARIABLES_PATH: [&str; 3] = ["contextData", "github", "d"];

/// Job-level data announced by the worker's job message.
#[derive(Debug, Clone)]
pub struct JobContext {
    pub run_id: String,
    pub main_repository: String,
    pub steps: Vec<StepDefinition>,
}

/// A step declared by the job message.
#[derive(Debug, Clone, PartialEq)]
pub struct StepDefinition {
    pub id: String,
    pub name: String,
    /// `None` when the step declares no `inputs` at all.
    pub inputs: Option<Vec<InputPair>>,
}

/// One entry of a step's `inputs.map`. Either side is `None` when it is not a literal.
#[derive(Debug, Clone, PartialEq)]
pub struct InputPair {
    pub key: Option<String>,
    pub value: Option<String>,
}

#[derive(Deserialize)]
struct RawStep {
    id: String,
    #[serde(default)]
    name: String,
    inputs: Option<RawMapToken>,
}

#[derive(Deserialize)]
struct RawMapToken {
    #[serde(default)]
    map: Vec<RawMapEntry>,
}

#[derive(Deserialize)]
struct RawMapEntry {
    #[serde(default)]
    key: Value,
    #[serde(default)]
    value: Value,
}

impl From<RawStep> for StepDefinition {
    fn from(raw: RawStep) -> Self {
        let inputs = raw.inputs.map(|token| {
            token
                .map
                .iter()
                .map(|entry| InputPair {
                    key: literal(&entry.key),
                    value: literal(&entry.value),
                })
                .collect()
        });

        Self {
            id: raw.id,
            name: raw.name,
            inputs,
        }
    }
}

impl StepDefinition {
    /// Literal `(key, value)` inputs in declaration order, skipping entries
    /// where either side is missing or empty.
    pub fn literal_inputs(&self) -> Vec<(String, String)> {
        self.inputs
            .iter()
            .flatten()
            .filter_map(|pair| match (&pair.key, &pair.value) {
                (Some(key), Some(value)) if !key.is_empty() && !value.is_empty() => {
                    Some((key.clone(), value.clone()))
                }
                _ => None,
            })
            .collect()
    }

    /// The `repository` input, if the step declares one.
    pub fn repository_input(&self) -> Option<&InputPair> {
        self.inputs
            .iter()
            .flatten()
            .find(|pair| pair.key.as_deref() == Some("repository"))
    }
}

impl JobContext {
    /// Extracts the job context from the first fragment of a worker log.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::MissingField`] when the context variables, the
    /// `run_id` or `repository` variables, or the `steps` list are absent, and
    /// [`ExtractError::Json`] when a step entry is not shaped like a step.
    pub fn from_fragment(fragment: &Value) -> Result<Self> {
        let variables = context_variables(fragment)?;
        let run_id = context_value(variables, "run_id")?;
        let main_repository = context_value(variables, "repository")?;

        let steps = fragment
            .get("steps")
            .ok_or_else(|| ExtractError::missing("steps"))?;
        let steps: Vec<RawStep> = serde_json::from_value(steps.clone())?;

        Ok(Self {
            run_id,
            main_repository,
            steps: steps.into_iter().map(StepDefinition::from).collect(),
        })
    }

    pub fn step(&self, id: &str) -> Option<&StepDefinition> {
        self.steps.iter().find(|step| step.id == id)
    }
}

fn context_variables(fragment: &Value) -> Result<&[Value]> {
    let mut node = fragment;
    for segment in CONTEXT_VARIABLES_PATH {
        node = node
            .get(segment)
            .ok_or_else(|| ExtractError::missing(CONTEXT_VARIABLES_PATH.join(".")))?;
    }

    node.as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| ExtractError::missing(CONTEXT_VARIABLES_PATH.join(".")))
}

/// Looks up a context variable by key. Non-string values are rendered as JSON.
fn context_value(variables: &[Value], key: &str) -> Result<String> {
    let value = variables
        .iter()
        .find(|entry| entry.get("k").and_then(Value::as_str) == Some(key))
        .and_then(|entry| entry.get("v"))
        .ok_or_else(|| ExtractError::missing(key))?;

    Ok(match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}
