//! Run input

use crate::types::Identifier;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Label used when a request has no project label
const DEFAULT_PROJECT: &str = "tracking";

/// One batch of identifiers to track
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRequest {
    /// Label naming the merged output (`<project>-POD.pdf`)
    #[serde(default)]
    pub project: String,
    /// Identifiers in processing order
    pub identifiers: Vec<Identifier>,
    /// Optional ship date narrowing carrier queries to one day
    #[serde(default)]
    pub reference_date: Option<NaiveDate>,
}

impl RunRequest {
    /// Create a request without a reference date
    pub fn new<I, T>(project: impl Into<String>, identifiers: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Identifier>,
    {
        Self {
            project: project.into(),
            identifiers: identifiers.into_iter().map(Into::into).collect(),
            reference_date: None,
        }
    }

    /// Restrict carrier queries to shipments from `date`
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    /// Project label, defaulted when blank
    pub fn project_label(&self) -> &str {
        match self.project.trim() {
            "" => DEFAULT_PROJECT,
            label => label,
        }
    }

    /// Reference date as shown to users (`m/d/Y`)
    pub fn date_label(&self) -> String {
        match self.reference_date {
            Some(date) => date.format("%-m/%-d/%Y").to_string(),
            None => "No date filter".to_string(),
        }
    }
}

/// Trim identifiers, drop blanks, and drop repeats of an earlier identifier
///
/// Returns the identifiers to process and the duplicates that were dropped.
pub(crate) fn normalize_identifiers(raw: &[Identifier]) -> (Vec<Identifier>, Vec<Identifier>) {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(raw.len());
    let mut duplicates = Vec::new();

    for identifier in raw {
        let trimmed = identifier.as_str().trim();
        if trimmed.is_empty() {
            continue;
        }
        let identifier = Identifier::from(trimmed);
        if seen.insert(identifier.clone()) {
            unique.push(identifier);
        } else {
            duplicates.push(identifier);
        }
    }

    (unique, duplicates)
}
