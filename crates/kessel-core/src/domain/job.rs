//! Job requests and their handler category.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::Sequence;
use crate::error::QueueError;

/// Handler category of a job. Opaque to the queue, but never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JobType(String);

impl JobType {
    pub fn new(s: impl Into<String>) -> Result<Self, QueueError> {
        let s = s.into();
        if s.trim().is_empty() {
            return Err(QueueError::validation("job type must not be empty"));
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for JobType {
    type Error = QueueError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<JobType> for String {
    fn from(value: JobType) -> Self {
        value.0
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A unit of work submitted to the queue.
///
/// `priority`, `visible_at` and `expires_at` steer dequeue selection; every
/// other field is carried through untouched. `sequence` is assigned by the
/// queue on enqueue and cannot be supplied by callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRequest {
    #[serde(rename = "type")]
    job_type: JobType,

    payload: serde_json::Value,

    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    reference: Option<String>,

    /// Lower value wins. `None` sorts after every prioritized job.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    priority: Option<i32>,

    /// Not eligible for dequeue before this instant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    visible_at: Option<DateTime<Utc>>,

    /// Discarded once this instant is reached.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,

    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    sequence: Option<Sequence>,
}

impl JobRequest {
    pub fn new(job_type: JobType, payload: serde_json::Value) -> Self {
        Self {
            job_type,
            payload,
            reference: None,
            priority: None,
            visible_at: None,
            expires_at: None,
            sequence: None,
        }
    }

    pub fn with_ref(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_visible_at(mut self, at: DateTime<Utc>) -> Self {
        self.visible_at = Some(at);
        self
    }

    pub fn with_expires_at(mut self, at: DateTime<Utc>) -> Self {
        self.expires_at = Some(at);
        self
    }

    pub fn job_type(&self) -> &JobType {
        &self.job_type
    }

    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    pub fn priority(&self) -> Option<i32> {
        self.priority
    }

    pub fn visible_at(&self) -> Option<DateTime<Utc>> {
        self.visible_at
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// `None` until the job has been accepted by a queue.
    pub fn sequence(&self) -> Option<Sequence> {
        self.sequence
    }

    pub(crate) fn assign_sequence(&mut self, sequence: Sequence) {
        self.sequence = Some(sequence);
    }
}
