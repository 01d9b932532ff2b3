// Copyright (c) 2024-2025 PlanLens Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Document-level error types
//!
//! Only a few things can go wrong with an EXPLAIN document: the text is not
//! JSON at all, it is JSON without a usable root `Plan` object, or it is
//! text-format output without a single plan line. Missing optional fields
//! are never errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Short message reported when the input is not JSON.
pub const PARSE_ERROR_MESSAGE: &str = "Failed to parse EXPLAIN JSON";

/// Short message reported when the input has no root `Plan` object.
pub const STRUCTURAL_ERROR_MESSAGE: &str = "Invalid EXPLAIN JSON: Plan node not found.";

/// Short message reported when EXPLAIN text holds no plan line.
pub const EMPTY_TEXT_MESSAGE: &str = "No plan found in EXPLAIN output";

const PARSE_GUIDANCE: &str = "Paste valid JSON from EXPLAIN (FORMAT JSON).";

const EMPTY_TEXT_GUIDANCE: &str = "Paste the output of EXPLAIN or EXPLAIN ANALYZE, starting at the top plan line.";

const STRUCTURAL_GUIDANCE: &str = "Provide output from EXPLAIN (FORMAT JSON) or EXPLAIN (ANALYZE, FORMAT JSON). The root should be an array and its first element must contain a \"Plan\" object.";

/// Errors raised while turning raw text into a plan document
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("Failed to parse EXPLAIN JSON: {detail}")]
    Parse { detail: String },

    #[error("Invalid EXPLAIN JSON: Plan node not found.")]
    Structural,

    #[error("No plan found in EXPLAIN output")]
    EmptyText,
}

impl PlanError {
    /// Stable one-line message suitable for a heading
    pub fn message(&self) -> &'static str {
        match self {
            PlanError::Parse { .. } => PARSE_ERROR_MESSAGE,
            PlanError::Structural => STRUCTURAL_ERROR_MESSAGE,
            PlanError::EmptyText => EMPTY_TEXT_MESSAGE,
        }
    }

    /// Longer explanation for the user
    pub fn detail(&self) -> String {
        match self {
            PlanError::Parse { detail } if detail.is_empty() => PARSE_GUIDANCE.to_string(),
            PlanError::Parse { detail } => format!("{}\n{}", detail, PARSE_GUIDANCE),
            PlanError::Structural => STRUCTURAL_GUIDANCE.to_string(),
            PlanError::EmptyText => EMPTY_TEXT_GUIDANCE.to_string(),
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            PlanError::Parse { .. } => FailureKind::Parse,
            PlanError::Structural | PlanError::EmptyText => FailureKind::Structural,
        }
    }
}

impl From<serde_json::Error> for PlanError {
    fn from(error: serde_json::Error) -> Self {
        PlanError::Parse {
            detail: error.to_string(),
        }
    }
}

/// Which document-level check failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureKind {
    Parse,
    Structural,
}

/// Error folded into plan metadata so consumers can render an error state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanFailure {
    pub kind: FailureKind,
    pub message: String,
    pub detail: String,
}

impl From<&PlanError> for PlanFailure {
    fn from(error: &PlanError) -> Self {
        Self {
            kind: error.kind(),
            message: error.message().to_string(),
            detail: error.detail(),
        }
    }
}
