//! Explanatory content per test
//!
//! Content is presentation material only. The decision table and fallback
//! logic never read it, and a test with no content still renders.

use crate::catalog::TestId;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Content for one test; every part is optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContentBundle {
    #[serde(alias = "Explanation")]
    pub explanation: Option<String>,
    #[serde(alias = "Requirements")]
    pub requirements: Option<String>,
    #[serde(alias = "Example Context")]
    pub example: Option<String>,
    /// Link to a video walkthrough
    pub video: Option<String>,
    /// e.g. "Parametric"
    #[serde(alias = "Test Type")]
    pub test_type: Option<String>,
}

/// Rendered content with gaps filled in
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentView {
    pub test: TestId,
    pub name: &'static str,
    pub explanation: String,
    pub requirements: String,
    pub example: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_type: Option<String>,
    /// False when any text part was substituted
    pub complete: bool,
}

/// Content keyed by test
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentLibrary {
    bundles: BTreeMap<TestId, ContentBundle>,
}

impl ContentLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, test: TestId, bundle: ContentBundle) {
        self.bundles.insert(test, bundle);
    }

    pub fn get(&self, test: TestId) -> Option<&ContentBundle> {
        self.bundles.get(&test)
    }

    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }

    /// Parse a JSON object keyed by test id
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("content must be a JSON object keyed by test id")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read content file: {}", path.display()))?;
        Self::from_json_str(&content)
            .with_context(|| format!("failed to parse content file: {}", path.display()))
    }

    /// View of a test's content; never fails
    pub fn describe(&self, test: TestId) -> ContentView {
        let bundle = self.bundles.get(&test).cloned().unwrap_or_default();
        let explanation = tidy(bundle.explanation);
        let requirements = tidy(bundle.requirements);
        let example = tidy(bundle.example);
        // Blank text counts as missing
        let complete = explanation.is_some() && requirements.is_some() && example.is_some();
        let missing = |part: &str| format!("No {} available for {}.", part, test.name());

        ContentView {
            test,
            name: test.name(),
            explanation: explanation.unwrap_or_else(|| missing("explanation")),
            requirements: requirements.unwrap_or_else(|| missing("requirements")),
            example: example.unwrap_or_else(|| missing("example")),
            video: bundle.video,
            test_type: bundle.test_type,
            complete,
        }
    }
}

/// Strip the indentation of multi-line text blocks
fn tidy(text: Option<String>) -> Option<String> {
    let text = text?;
    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    let joined = lines.join("\n");
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
