//! Interval scheduler for the reminder sweeps and housekeeping jobs.
//!
//! Each registered job runs on its own tokio task. A failing run is logged
//! and counted; the job keeps its schedule. Shutdown is signalled over a
//! watch channel and awaited with a timeout.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use domain::AuditError;

const HOUR: u64 = 3600;
const DAY: u64 = 24 * HOUR;

/// How often a job runs. Periods count from scheduler start, not from
/// wall-clock midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobFrequency {
    Seconds(u64),
    Hourly,
    Daily,
    Weekly,
}

impl JobFrequency {
    pub fn period(&self) -> Duration {
        let secs = match self {
            JobFrequency::Seconds(secs) => (*secs).max(1),
            JobFrequency::Hourly => HOUR,
            JobFrequency::Daily => DAY,
            JobFrequency::Weekly => 7 * DAY,
        };
        Duration::from_secs(secs)
    }

    /// Parses `jobs.reminder_frequency`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "hourly" => Some(JobFrequency::Hourly),
            "daily" => Some(JobFrequency::Daily),
            "weekly" => Some(JobFrequency::Weekly),
            _ => None,
        }
    }
}

/// Why a job run failed.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error(transparent)]
    Audit(#[from] AuditError),

    #[error("{0}")]
    Other(String),
}

#[async_trait::async_trait]
pub trait Job: Send + Sync {
    /// Stable name, used in logs and metric labels.
    fn name(&self) -> &'static str;

    fn frequency(&self) -> JobFrequency;

    /// Whether the first run happens at start instead of one period later.
    fn run_on_start(&self) -> bool {
        false
    }

    async fn execute(&self) -> Result<(), JobError>;
}

/// Runs a job once, logging and recording the outcome. Returns whether the
/// run succeeded.
pub async fn run_once(job: &dyn Job) -> bool {
    let name = job.name();
    let started = Instant::now();
    debug!(job = name, "Job starting");

    let result = job.execute().await;
    let elapsed = started.elapsed();
    metrics::histogram!("audit_job_duration_seconds", "job" => name)
        .record(elapsed.as_secs_f64());

    match result {
        Ok(()) => {
            metrics::counter!("audit_job_runs_total", "job" => name, "outcome" => "success")
                .increment(1);
            info!(job = name, elapsed_ms = elapsed.as_millis() as u64, "Job finished");
            true
        }
        Err(e) => {
            metrics::counter!("audit_job_runs_total", "job" => name, "outcome" => "failure")
                .increment(1);
            error!(
                job = name,
                elapsed_ms = elapsed.as_millis() as u64,
                error = %e,
                "Job failed"
            );
            false
        }
    }
}

pub struct JobScheduler {
    jobs: Vec<Arc<dyn Job>>,
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl JobScheduler {
    pub fn new() -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            jobs: Vec::new(),
            shutdown,
            handles: Vec::new(),
        }
    }

    pub fn register<J: Job + 'static>(&mut self, job: J) {
        info!(job = job.name(), frequency = ?job.frequency(), "Job registered");
        self.jobs.push(Arc::new(job));
    }

    pub fn job_names(&self) -> Vec<&'static str> {
        self.jobs.iter().map(|j| j.name()).collect()
    }

    /// Spawns one task per registered job.
    pub fn start(&mut self) {
        info!(jobs = self.jobs.len(), "Starting job scheduler");
        for job in &self.jobs {
            let job = Arc::clone(job);
            let shutdown = self.shutdown.subscribe();
            self.handles.push(tokio::spawn(run_job(job, shutdown)));
        }
    }

    /// Signals every job to stop after its current run.
    pub fn shutdown(&self) {
        info!("Stopping job scheduler");
        self.shutdown.send_replace(true);
    }

    /// Waits for job tasks to end, giving up after `timeout`.
    pub async fn wait_for_shutdown(self, timeout: Duration) {
        let handles = self.handles;
        let join_all = async {
            for handle in handles {
                if let Err(e) = handle.await {
                    warn!(error = %e, "Job task ended abnormally");
                }
            }
        };

        match tokio::time::timeout(timeout, join_all).await {
            Ok(()) => info!("Job scheduler stopped"),
            Err(_) => warn!(timeout_secs = timeout.as_secs(), "Job scheduler shutdown timed out"),
        }
    }
}

impl Default for JobScheduler {
    fn default() -> Self {
        Self::new()
    }
}

async fn run_job(job: Arc<dyn Job>, mut shutdown: watch::Receiver<bool>) {
    let name = job.name();
    let mut interval = tokio::time::interval(job.frequency().period());
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // interval's first tick completes immediately
    if !job.run_on_start() {
        interval.tick().await;
    }

    loop {
        tokio::select! {
            _ = interval.tick() => {
                run_once(job.as_ref()).await;
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    debug!(job = name, "Job stopped");
                    break;
                }
            }
        }
    }
}
