//! Shared contract checks for `QueueBackend` implementations.
//!
//! Any backend's tests can call these with a fresh instance to check it keeps
//! the same observable behavior as the in-memory engine. Every check starts by
//! truncating the backend. Times are placed a year away from the wall clock so
//! the checks hold for any clock close to real time.

use chrono::{Duration, Utc};
use serde_json::json;

use crate::domain::{JobRequest, JobType};
use crate::ports::QueueBackend;

fn job(reference: &str) -> JobRequest {
    let job_type = JobType::new("contract").expect("static job type");
    JobRequest::new(job_type, json!({ "ref": reference })).with_ref(reference)
}

async fn reset(backend: &dyn QueueBackend) {
    backend.truncate().await.expect("truncate");
    assert!(backend.is_empty().await.expect("is_empty"));
}

async fn take_ref(backend: &dyn QueueBackend) -> Option<String> {
    let reservation = backend.dequeue().await.expect("dequeue")?;
    let reference = reservation.job().reference().map(String::from);
    reservation.commit().await.expect("commit");
    reference
}

pub async fn run_all(backend: &dyn QueueBackend) {
    empty_queue_dequeues_nothing(backend).await;
    enqueue_is_acknowledged(backend).await;
    priority_then_fifo(backend).await;
    reservation_hides_the_job(backend).await;
    commit_is_permanent(backend).await;
    rollback_restores_the_job(backend).await;
    expired_jobs_are_skipped(backend).await;
    delayed_jobs_are_withheld(backend).await;
    truncate_clears_everything(backend).await;
}

pub async fn empty_queue_dequeues_nothing(backend: &dyn QueueBackend) {
    reset(backend).await;
    assert!(backend.dequeue().await.expect("dequeue").is_none());
    assert_eq!(backend.size().await.expect("size"), 0);
}

pub async fn enqueue_is_acknowledged(backend: &dyn QueueBackend) {
    reset(backend).await;
    let first = backend.enqueue(job("a")).await.expect("enqueue");
    let second = backend.enqueue(job("b")).await.expect("enqueue");

    assert_eq!(first.reference(), Some("a"));
    assert!(first.sequence().is_some());
    assert!(first.sequence() < second.sequence());
    assert_eq!(backend.size().await.expect("size"), 2);
    assert!(!backend.is_empty().await.expect("is_empty"));
}

pub async fn priority_then_fifo(backend: &dyn QueueBackend) {
    reset(backend).await;
    backend.enqueue(job("none-1")).await.expect("enqueue");
    backend.enqueue(job("ten").with_priority(10)).await.expect("enqueue");
    backend.enqueue(job("one").with_priority(1)).await.expect("enqueue");
    backend.enqueue(job("none-2")).await.expect("enqueue");
    backend.enqueue(job("ten-b").with_priority(10)).await.expect("enqueue");

    let mut order = Vec::new();
    while let Some(reference) = take_ref(backend).await {
        order.push(reference);
    }
    assert_eq!(order, vec!["one", "ten", "ten-b", "none-1", "none-2"]);
}

pub async fn reservation_hides_the_job(backend: &dyn QueueBackend) {
    reset(backend).await;
    backend.enqueue(job("a")).await.expect("enqueue");

    let reservation = backend.dequeue().await.expect("dequeue").expect("a job");
    assert_eq!(reservation.job().reference(), Some("a"));
    assert_eq!(backend.size().await.expect("size"), 0);
    assert!(backend.dequeue().await.expect("dequeue").is_none());

    reservation.rollback().await.expect("rollback");
}

pub async fn commit_is_permanent(backend: &dyn QueueBackend) {
    reset(backend).await;
    backend.enqueue(job("a")).await.expect("enqueue");

    let reservation = backend.dequeue().await.expect("dequeue").expect("a job");
    reservation.commit().await.expect("commit");

    assert!(backend.dequeue().await.expect("dequeue").is_none());
    assert!(backend.is_empty().await.expect("is_empty"));
}

pub async fn rollback_restores_the_job(backend: &dyn QueueBackend) {
    reset(backend).await;
    backend.enqueue(job("a")).await.expect("enqueue");
    backend.enqueue(job("b")).await.expect("enqueue");

    let a = backend.dequeue().await.expect("dequeue").expect("a job");
    let sequence = a.job().sequence();
    a.rollback().await.expect("rollback");
    assert_eq!(backend.size().await.expect("size"), 2);

    let again = backend.dequeue().await.expect("dequeue").expect("a job");
    assert_eq!(again.job().reference(), Some("a"));
    assert_eq!(again.job().sequence(), sequence);
    again.commit().await.expect("commit");
}

pub async fn expired_jobs_are_skipped(backend: &dyn QueueBackend) {
    reset(backend).await;
    let year = Duration::days(365);
    backend
        .enqueue(job("expired").with_expires_at(Utc::now() - year))
        .await
        .expect("enqueue");
    backend
        .enqueue(job("not expired").with_expires_at(Utc::now() + year))
        .await
        .expect("enqueue");

    assert_eq!(take_ref(backend).await.as_deref(), Some("not expired"));
    assert_eq!(take_ref(backend).await, None);
}

pub async fn delayed_jobs_are_withheld(backend: &dyn QueueBackend) {
    reset(backend).await;
    backend
        .enqueue(job("delayed").with_visible_at(Utc::now() + Duration::days(365)))
        .await
        .expect("enqueue");
    backend.enqueue(job("ready")).await.expect("enqueue");

    assert_eq!(take_ref(backend).await.as_deref(), Some("ready"));
    assert_eq!(take_ref(backend).await, None);
    assert_eq!(backend.size().await.expect("size"), 1);
}

pub async fn truncate_clears_everything(backend: &dyn QueueBackend) {
    reset(backend).await;
    backend.enqueue(job("a")).await.expect("enqueue");
    backend.enqueue(job("b")).await.expect("enqueue");
    let reserved = backend.dequeue().await.expect("dequeue").expect("a job");

    backend.truncate().await.expect("truncate");
    assert!(backend.is_empty().await.expect("is_empty"));
    assert!(backend.dequeue().await.expect("dequeue").is_none());

    reserved.rollback().await.expect("stale rollback");
    assert!(backend.dequeue().await.expect("dequeue").is_none());
}
