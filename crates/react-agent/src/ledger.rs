//! Per-query plan and progress bookkeeping
//!
//! Tracks the model's planned steps, the steps already executed, and the
//! results those steps produced. Results are exposed to later tool arguments
//! through `$step_name$` markers.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;
use tracing::debug;

use crate::response::{write_steps, Step};

/// `$name$` where the name is any run of characters other than `$` and whitespace
static VARIABLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$([^$\s]+)\$").expect("valid variable regex"));

/// Output format for [`StepLedger::render`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LedgerFormat {
    #[default]
    Xml,
    Json,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StepLedger {
    to_do: Vec<Step>,
    done: Vec<Step>,
    #[serde(skip)]
    variables: BTreeMap<String, String>,
}

impl StepLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn to_do(&self) -> &[Step] {
        &self.to_do
    }

    pub fn done(&self) -> &[Step] {
        &self.done
    }

    pub fn variables(&self) -> &BTreeMap<String, String> {
        &self.variables
    }

    pub fn variable(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }

    pub fn is_done(&self, name: &str) -> bool {
        self.done.iter().any(|step| step.name == name)
    }

    /// First step still on the plan
    pub fn next_planned(&self) -> Option<&Step> {
        self.to_do.first()
    }

    /// Move a step to `done` with its result and expose the result as a variable.
    ///
    /// A planned step with the same name is taken off `to_do`; an unplanned
    /// one is appended as is. Re-running a step name overwrites its variable.
    pub fn record_completed(&mut self, step: Step, result: impl Into<String>) {
        let result = result.into();

        let mut completed = match self.to_do.iter().position(|s| s.name == step.name) {
            Some(index) => self.to_do.remove(index),
            None => {
                debug!(step = %step.name, "Recording unplanned step");
                step
            }
        };
        completed.result = Some(result.clone());

        if let Some(previous) = self.variables.insert(completed.name.clone(), result) {
            debug!(step = %completed.name, previous_len = previous.len(), "Step re-run, result replaced");
        }
        self.done.push(completed);
    }

    /// Replace the plan, dropping steps that are already done
    pub fn merge_plan(&mut self, steps: &[Step]) {
        self.to_do = steps
            .iter()
            .filter(|step| !self.is_done(&step.name))
            .map(|step| Step {
                result: None,
                ..step.clone()
            })
            .collect();
    }

    /// Replace `$name$` markers with step results; unknown names stay verbatim
    pub fn interpolate(&self, text: &str) -> String {
        VARIABLE
            .replace_all(text, |caps: &Captures| match self.variables.get(&caps[1]) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }

    /// Serialize the plan and progress for a prompt
    pub fn render(&self, format: LedgerFormat) -> String {
        match format {
            LedgerFormat::Xml => {
                let mut out = write_steps("to_do", &self.to_do);
                out.push_str(&write_steps("done", &self.done));
                out
            }
            LedgerFormat::Json => format!("{:#}", serde_json::json!(self)),
        }
    }
}
