//! Visibility policy: is a job eligible for dequeue right now?

use chrono::{DateTime, Utc};

use crate::domain::JobRequest;

/// Outcome of the delay and expiration gates for one job at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// May be handed out.
    Eligible,

    /// `now < visible_at`. Becomes eligible on its own once time passes.
    Delayed,

    /// `now >= expires_at`. Terminal: the job must be discarded.
    Expired,
}

impl Visibility {
    /// Evaluate both gates. Expiration wins when both apply, since a job that
    /// expires before its delay elapses can never run.
    pub fn of(job: &JobRequest, now: DateTime<Utc>) -> Self {
        if job.expires_at().is_some_and(|at| now >= at) {
            Visibility::Expired
        } else if job.visible_at().is_some_and(|at| now < at) {
            Visibility::Delayed
        } else {
            Visibility::Eligible
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::JobType;
    use chrono::{Duration, TimeZone};
    use rstest::rstest;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn job(visible_in_ms: Option<i64>, expires_in_ms: Option<i64>) -> JobRequest {
        let mut job = JobRequest::new(JobType::new("t").unwrap(), serde_json::json!({}));
        if let Some(ms) = visible_in_ms {
            job = job.with_visible_at(now() + Duration::milliseconds(ms));
        }
        if let Some(ms) = expires_in_ms {
            job = job.with_expires_at(now() + Duration::milliseconds(ms));
        }
        job
    }

    #[rstest]
    #[case::no_gates(None, None, Visibility::Eligible)]
    #[case::delay_in_future(Some(500), None, Visibility::Delayed)]
    #[case::delay_elapsed(Some(-1), None, Visibility::Eligible)]
    #[case::delay_exactly_now(Some(0), None, Visibility::Eligible)]
    #[case::expiry_in_future(None, Some(1_000), Visibility::Eligible)]
    #[case::expiry_passed(None, Some(-1), Visibility::Expired)]
    #[case::expiry_exactly_now(None, Some(0), Visibility::Expired)]
    #[case::expired_while_delayed(Some(500), Some(-1), Visibility::Expired)]
    fn gates(
        #[case] visible_in_ms: Option<i64>,
        #[case] expires_in_ms: Option<i64>,
        #[case] expected: Visibility,
    ) {
        assert_eq!(Visibility::of(&job(visible_in_ms, expires_in_ms), now()), expected);
    }
}
