//! Waiting for long-running jobs to reach a terminal status

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use log::{debug, info, warn};
use serde::Serialize;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::Mutex;

use super::error::JobError;
use super::status::{JobDescriptor, JobSnapshot, JobStatus, JobStatusPoller};
use crate::config::JobSettings;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(600);

/// How a wait should behave on timeout and failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitOptions {
    /// Overrides the waiter's default timeout. Zero counts as unset.
    pub timeout: Option<Duration>,
    pub infinite_wait: bool,
    pub raise_on_timeout: bool,
    pub raise_on_failure: bool,
    /// Attach the last snapshot to the outcome
    pub want_snapshot: bool,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            infinite_wait: false,
            raise_on_timeout: true,
            raise_on_failure: false,
            want_snapshot: false,
        }
    }
}

impl WaitOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn infinite(mut self) -> Self {
        self.infinite_wait = true;
        self
    }

    pub fn raise_on_timeout(mut self, raise: bool) -> Self {
        self.raise_on_timeout = raise;
        self
    }

    pub fn raise_on_failure(mut self, raise: bool) -> Self {
        self.raise_on_failure = raise;
        self
    }

    pub fn want_snapshot(mut self, want: bool) -> Self {
        self.want_snapshot = want;
        self
    }

    fn attach(&self, snapshot: JobSnapshot) -> Option<JobSnapshot> {
        self.want_snapshot.then_some(snapshot)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "snapshot", rename_all = "snake_case")]
pub enum WaitOutcome {
    Succeeded(Option<JobSnapshot>),
    Failed(Option<JobSnapshot>),
    TimedOut(Option<JobSnapshot>),
}

impl WaitOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, WaitOutcome::Succeeded(_))
    }

    pub fn snapshot(&self) -> Option<&JobSnapshot> {
        match self {
            WaitOutcome::Succeeded(s) | WaitOutcome::Failed(s) | WaitOutcome::TimedOut(s) => {
                s.as_ref()
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WaitOutcome::Succeeded(_) => "succeeded",
            WaitOutcome::Failed(_) => "failed",
            WaitOutcome::TimedOut(_) => "timed_out",
        }
    }
}

/// Polls jobs at a fixed interval until they finish or the budget runs out
#[derive(Clone)]
pub struct JobWaiter {
    poller: Arc<dyn JobStatusPoller>,
    poll_interval: Duration,
    default_timeout: Duration,
}

impl JobWaiter {
    pub fn new(poller: Arc<dyn JobStatusPoller>) -> Self {
        Self {
            poller,
            poll_interval: DEFAULT_POLL_INTERVAL,
            default_timeout: DEFAULT_WAIT_TIMEOUT,
        }
    }

    pub fn from_settings(poller: Arc<dyn JobStatusPoller>, settings: &JobSettings) -> Self {
        Self::new(poller)
            .with_poll_interval(Duration::from_secs(settings.poll_interval_secs))
            .with_default_timeout(Duration::from_secs(settings.default_timeout_secs))
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn poller(&self) -> &Arc<dyn JobStatusPoller> {
        &self.poller
    }

    /// Wait for `job` to reach a terminal status.
    ///
    /// The first poll happens immediately. Between polls the waiter sleeps the
    /// poll interval, and a sleep that would take the total past the timeout is
    /// never started: the wait ends as timed out instead.
    pub async fn wait(
        &self,
        job: &JobDescriptor,
        options: &WaitOptions,
    ) -> Result<WaitOutcome, JobError> {
        let timeout = options
            .timeout
            .filter(|t| !t.is_zero())
            .unwrap_or(self.default_timeout);
        let mut waited = Duration::ZERO;

        let mut snapshot = self.poller.poll(job).await?;
        info!("Waiting for {} (status {})", job, snapshot.status);

        while !snapshot.is_terminal() {
            if !options.infinite_wait && waited.saturating_add(self.poll_interval) > timeout {
                warn!("Gave up on {} after {}s", job, waited.as_secs());
                if options.raise_on_timeout {
                    return Err(JobError::WaitTimeout {
                        job: job.clone(),
                        waited_secs: waited.as_secs(),
                    });
                }
                return Ok(WaitOutcome::TimedOut(options.attach(snapshot)));
            }

            tokio::time::sleep(self.poll_interval).await;
            waited = waited.saturating_add(self.poll_interval);
            snapshot = self.poller.poll(job).await?;
            debug!("{} is {} after {}s", job, snapshot.status, waited.as_secs());
        }

        match snapshot.status {
            JobStatus::Completed => {
                info!("{} completed after {}s", job, waited.as_secs());
                Ok(WaitOutcome::Succeeded(options.attach(snapshot)))
            }
            JobStatus::Failed if options.raise_on_failure => Err(JobError::JobFailed {
                job: job.clone(),
                snapshot: Box::new(snapshot),
            }),
            JobStatus::Failed => {
                warn!("{} failed after {}s", job, waited.as_secs());
                Ok(WaitOutcome::Failed(options.attach(snapshot)))
            }
            JobStatus::Submitted => Err(JobError::ProtocolError {
                job: job.clone(),
                status: snapshot.status.to_string(),
            }),
        }
    }

    /// Run `wait` to completion on the calling thread.
    ///
    /// Inside a multi-threaded runtime the worker is handed over with
    /// `block_in_place`; outside any runtime a private current-thread runtime
    /// is used. A current-thread runtime cannot be blocked and is an error.
    pub fn wait_blocking(
        &self,
        job: &JobDescriptor,
        options: &WaitOptions,
    ) -> Result<WaitOutcome, JobError> {
        match Handle::try_current() {
            Ok(handle) => match handle.runtime_flavor() {
                RuntimeFlavor::MultiThread => {
                    tokio::task::block_in_place(|| handle.block_on(self.wait(job, options)))
                }
                flavor => Err(JobError::Runtime(format!(
                    "cannot block on a job wait inside a {:?} runtime, use wait() instead",
                    flavor
                ))),
            },
            Err(_) => {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .map_err(|e| JobError::Runtime(e.to_string()))?;
                runtime.block_on(self.wait(job, options))
            }
        }
    }

    /// Wait for several jobs concurrently on the current task.
    ///
    /// All waits run to completion even when some of them fail. The first
    /// error in label order is then returned; otherwise every label maps to
    /// its outcome.
    pub async fn wait_many(
        &self,
        jobs: &BTreeMap<String, JobDescriptor>,
        options: &WaitOptions,
    ) -> Result<BTreeMap<String, WaitOutcome>, JobError> {
        let results = Mutex::new(BTreeMap::new());

        join_all(jobs.iter().map(|(label, job)| {
            let results = &results;
            async move {
                let result = self.wait(job, options).await;
                results.lock().await.insert(label.clone(), result);
            }
        }))
        .await;

        let mut outcomes = BTreeMap::new();
        let mut first_error = None;
        for (label, result) in results.into_inner() {
            match result {
                Ok(outcome) => {
                    outcomes.insert(label, outcome);
                }
                Err(e) if first_error.is_none() => first_error = Some(e),
                Err(e) => warn!("Wait for {} also failed: {}", label, e),
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(outcomes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use serde_json::json;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex as StdMutex;
    use tokio::time::Instant;

    #[derive(Debug, Clone)]
    struct Step {
        status: &'static str,
        delay: Duration,
    }

    fn steps(statuses: &[&'static str]) -> Vec<Step> {
        statuses
            .iter()
            .map(|&status| Step {
                status,
                delay: Duration::ZERO,
            })
            .collect()
    }

    /// Replays a scripted status sequence per job id; the last step repeats.
    #[derive(Default)]
    struct ScriptedPoller {
        scripts: StdMutex<HashMap<String, VecDeque<Step>>>,
        polls: StdMutex<Vec<(String, Instant)>>,
    }

    impl ScriptedPoller {
        fn with_job(self, job_id: &str, script: Vec<Step>) -> Self {
            self.scripts
                .lock()
                .unwrap()
                .insert(job_id.to_string(), script.into());
            self
        }

        fn poll_times(&self, job_id: &str) -> Vec<Instant> {
            self.polls
                .lock()
                .unwrap()
                .iter()
                .filter(|(id, _)| id == job_id)
                .map(|(_, at)| *at)
                .collect()
        }
    }

    #[async_trait]
    impl JobStatusPoller for ScriptedPoller {
        async fn poll(&self, job: &JobDescriptor) -> Result<JobSnapshot, JobError> {
            let step = {
                let mut scripts = self.scripts.lock().unwrap();
                let Some(script) = scripts.get_mut(&job.job_id) else {
                    return Err(JobError::JobNotFound { job: job.clone() });
                };
                if script.len() > 1 {
                    script.pop_front().unwrap()
                } else {
                    script.front().cloned().unwrap()
                }
            };
            self.polls
                .lock()
                .unwrap()
                .push((job.job_id.clone(), Instant::now()));

            if !step.delay.is_zero() {
                tokio::time::sleep(step.delay).await;
            }
            JobSnapshot::from_payload(job, json!({"id": job.job_id, "status": step.status}))
        }
    }

    fn waiter(poller: Arc<ScriptedPoller>) -> JobWaiter {
        JobWaiter::new(poller)
    }

    fn job(id: &str) -> JobDescriptor {
        JobDescriptor::new(7, id)
    }

    #[tokio::test(start_paused = true)]
    async fn test_converges_after_n_plus_one_polls() {
        for pending in 0..5usize {
            let mut script = vec!["submitted"; pending];
            script.push("completed");
            let poller = Arc::new(ScriptedPoller::default().with_job("j", steps(&script)));

            let started = Instant::now();
            let outcome = waiter(poller.clone())
                .wait(&job("j"), &WaitOptions::default())
                .await
                .unwrap();

            assert_eq!(outcome, WaitOutcome::Succeeded(None));
            assert_eq!(poller.poll_times("j").len(), pending + 1);
            assert_eq!(started.elapsed(), DEFAULT_POLL_INTERVAL * pending as u32);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_never_sleeps_past_budget() {
        let poller = Arc::new(ScriptedPoller::default().with_job("j", steps(&["submitted"])));
        let options = WaitOptions::default()
            .with_timeout(Duration::from_secs(12))
            .raise_on_timeout(false)
            .want_snapshot(true);

        let started = Instant::now();
        let outcome = waiter(poller.clone()).wait(&job("j"), &options).await.unwrap();

        let offsets: Vec<u64> = poller
            .poll_times("j")
            .iter()
            .map(|at| at.duration_since(started).as_secs())
            .collect();
        assert_eq!(offsets, vec![0, 5, 10]);

        match outcome {
            WaitOutcome::TimedOut(Some(snapshot)) => assert_eq!(snapshot.status, JobStatus::Submitted),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_raises_by_default() {
        let poller = Arc::new(ScriptedPoller::default().with_job("j", steps(&["submitted"])));
        let options = WaitOptions::default().with_timeout(Duration::from_secs(10));

        let err = waiter(poller.clone()).wait(&job("j"), &options).await.unwrap_err();
        match err {
            JobError::WaitTimeout { waited_secs, .. } => assert_eq!(waited_secs, 10),
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(poller.poll_times("j").len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_timeout_applies() {
        let poller = Arc::new(ScriptedPoller::default().with_job("j", steps(&["submitted"])));
        let started = Instant::now();

        let err = waiter(poller.clone())
            .wait(&job("j"), &WaitOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, JobError::WaitTimeout { waited_secs: 600, .. }));
        assert_eq!(started.elapsed(), DEFAULT_WAIT_TIMEOUT);
        assert_eq!(poller.poll_times("j").len(), 121);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_timeout_falls_back_to_default() {
        let poller = Arc::new(ScriptedPoller::default().with_job("j", steps(&["submitted"])));
        let options = WaitOptions::default()
            .with_timeout(Duration::ZERO)
            .raise_on_timeout(false);
        let started = Instant::now();

        let outcome = waiter(poller.clone()).wait(&job("j"), &options).await.unwrap();

        assert_eq!(outcome, WaitOutcome::TimedOut(None));
        assert_eq!(started.elapsed(), DEFAULT_WAIT_TIMEOUT);
        assert_eq!(poller.poll_times("j").len(), 121);
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_poll_interval_times_out_without_overflow() {
        let poller = Arc::new(ScriptedPoller::default().with_job("j", steps(&["submitted"])));
        let waiter = JobWaiter::new(poller.clone()).with_poll_interval(Duration::MAX);
        let options = WaitOptions::default().raise_on_timeout(false);

        let outcome = waiter.wait(&job("j"), &options).await.unwrap();

        assert_eq!(outcome, WaitOutcome::TimedOut(None));
        assert_eq!(poller.poll_times("j").len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_infinite_wait_ignores_timeout() {
        let mut script = vec!["submitted"; 200];
        script.push("completed");
        let poller = Arc::new(ScriptedPoller::default().with_job("j", steps(&script)));
        let options = WaitOptions::default()
            .with_timeout(Duration::from_secs(1))
            .infinite();

        let outcome = waiter(poller.clone()).wait(&job("j"), &options).await.unwrap();
        assert!(outcome.is_success());
        assert_eq!(poller.poll_times("j").len(), 201);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_signaling_modes() {
        let failing = || {
            Arc::new(ScriptedPoller::default().with_job("j", steps(&["submitted", "failed"])))
        };

        let outcome = waiter(failing())
            .wait(&job("j"), &WaitOptions::default())
            .await
            .unwrap();
        assert_eq!(outcome, WaitOutcome::Failed(None));

        let outcome = waiter(failing())
            .wait(&job("j"), &WaitOptions::default().want_snapshot(true))
            .await
            .unwrap();
        assert_eq!(outcome.snapshot().map(|s| s.status), Some(JobStatus::Failed));

        let err = waiter(failing())
            .wait(&job("j"), &WaitOptions::default().raise_on_failure(true))
            .await
            .unwrap_err();
        match err {
            JobError::JobFailed { snapshot, .. } => assert_eq!(snapshot.body["id"], "j"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_job_fails_without_looping() {
        let poller = Arc::new(ScriptedPoller::default());
        let started = Instant::now();

        let err = waiter(poller)
            .wait(&job("missing"), &WaitOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, JobError::JobNotFound { .. }));
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_protocol_error_mid_wait_propagates() {
        let poller = Arc::new(
            ScriptedPoller::default().with_job("j", steps(&["submitted", "exploded"])),
        );
        let err = waiter(poller)
            .wait(&job("j"), &WaitOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, JobError::ProtocolError { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_many_isolates_randomly_interleaved_jobs() {
        for seed in 0..20u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut poller = ScriptedPoller::default();
            let mut expected = BTreeMap::new();

            for i in 0..5 {
                let id = format!("job-{}", i);
                let pending = rng.gen_range(0..6usize);
                let terminal = if rng.gen_bool(0.5) { "completed" } else { "failed" };
                let script: Vec<Step> = std::iter::repeat_n("submitted", pending)
                    .chain(std::iter::once(terminal))
                    .map(|status| Step {
                        status,
                        delay: Duration::from_millis(rng.gen_range(0..3000)),
                    })
                    .collect();
                poller = poller.with_job(&id, script);
                expected.insert(id, (pending + 1, terminal));
            }

            let poller = Arc::new(poller);
            let jobs: BTreeMap<String, JobDescriptor> = expected
                .keys()
                .map(|id| (format!("label-{}", id), job(id)))
                .collect();

            let outcomes = waiter(poller.clone())
                .wait_many(&jobs, &WaitOptions::default().want_snapshot(true))
                .await
                .unwrap();

            assert_eq!(outcomes.len(), jobs.len());
            for (label, descriptor) in &jobs {
                let (polls, terminal) = expected[&descriptor.job_id];
                let outcome = &outcomes[label];
                let snapshot = outcome.snapshot().unwrap();

                assert_eq!(snapshot.body["id"], descriptor.job_id.as_str(), "seed {}", seed);
                assert_eq!(snapshot.status.as_str(), terminal, "seed {}", seed);
                assert_eq!(outcome.is_success(), terminal == "completed");
                assert_eq!(poller.poll_times(&descriptor.job_id).len(), polls, "seed {}", seed);
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_many_reports_first_error_after_all_finish() {
        let poller = Arc::new(
            ScriptedPoller::default()
                .with_job("slow", steps(&["submitted", "submitted", "submitted", "completed"])),
        );
        let jobs: BTreeMap<String, JobDescriptor> = [
            ("a-slow", job("slow")),
            ("b-missing", job("missing-b")),
            ("c-missing", job("missing-c")),
        ]
        .into_iter()
        .map(|(label, job)| (label.to_string(), job))
        .collect();

        let err = waiter(poller.clone())
            .wait_many(&jobs, &WaitOptions::default())
            .await
            .unwrap_err();

        match err {
            JobError::JobNotFound { job } => assert_eq!(job.job_id, "missing-b"),
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(poller.poll_times("slow").len(), 4);
    }

    #[test]
    fn test_wait_blocking_without_runtime() {
        let poller = Arc::new(ScriptedPoller::default().with_job("j", steps(&["submitted", "completed"])));
        let outcome = waiter(poller)
            .with_poll_interval(Duration::from_millis(10))
            .wait_blocking(&job("j"), &WaitOptions::default())
            .unwrap();
        assert!(outcome.is_success());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_wait_blocking_inside_multi_thread_runtime() {
        let poller = Arc::new(ScriptedPoller::default().with_job("j", steps(&["submitted", "completed"])));
        let outcome = waiter(poller)
            .with_poll_interval(Duration::from_millis(10))
            .wait_blocking(&job("j"), &WaitOptions::default())
            .unwrap();
        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn test_wait_blocking_inside_current_thread_runtime_is_refused() {
        let poller = Arc::new(ScriptedPoller::default().with_job("j", steps(&["completed"])));
        let err = waiter(poller)
            .wait_blocking(&job("j"), &WaitOptions::default())
            .unwrap_err();
        assert!(matches!(err, JobError::Runtime(_)));
    }
}
