//! Worker configuration
//!
//! One explicit struct built once at process start and passed by reference
//! into the dispatcher and stages, with no ambient global state. Values come from
//! environment variables with sensible defaults so the worker runs with zero
//! setup.

use std::path::PathBuf;

use chrono::Weekday;
use chrono_tz::Tz;

/// Default bound on simultaneously running pipelines.
pub const DEFAULT_MAX_CONCURRENT_JOBS: usize = 5;

/// Default per-job wall-clock budget in seconds.
pub const DEFAULT_JOB_TIMEOUT_SECS: u64 = 300;

/// Queue poll timeout. Short so a shutdown signal is observed promptly.
pub const DEFAULT_QUEUE_POLL_SECS: u64 = 1;

/// Weekday policy that can force or encourage office presence.
#[derive(Debug, Clone)]
pub struct CompanyPolicy {
    /// Days where a full office day is required (flexibility disallowed).
    pub mandatory_office_days: Vec<Weekday>,
    /// Days with a partial office requirement, keyed by a reason shown to
    /// the user (e.g. a recurring team sync).
    pub team_collaboration_days: Vec<(Weekday, String)>,
    /// Minimum hours for any office visit to count.
    pub minimum_office_hours: f64,
}

impl Default for CompanyPolicy {
    fn default() -> Self {
        Self {
            mandatory_office_days: vec![Weekday::Tue, Weekday::Thu],
            team_collaboration_days: vec![(Weekday::Wed, "Engineering Team Sync".to_string())],
            minimum_office_hours: 4.0,
        }
    }
}

impl CompanyPolicy {
    pub fn is_mandatory_day(&self, weekday: Weekday) -> bool {
        self.mandatory_office_days.contains(&weekday)
    }

    pub fn collaboration_reason(&self, weekday: Weekday) -> Option<&str> {
        self.team_collaboration_days
            .iter()
            .find(|(day, _)| *day == weekday)
            .map(|(_, reason)| reason.as_str())
    }
}

/// Worker-wide configuration, constructed once in `main`.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub max_concurrent_jobs: usize,
    pub job_timeout_secs: u64,
    pub queue_poll_secs: u64,
    /// Queue name the dispatcher consumes from.
    pub job_queue: String,
    /// Channel name progress updates are published under.
    pub progress_channel: String,
    /// Job store location; `None` resolves to `~/.commuteplan/jobs.db`.
    pub db_path: Option<PathBuf>,
    /// Zone used when a request carries no resolvable `user_timezone`.
    /// Applies to the deterministic path only; the enrichment path must
    /// fail fast instead (see the orchestrator).
    pub default_timezone: Tz,
    pub policy: CompanyPolicy,
    /// Whether the enrichment planner should be attempted when configured.
    pub use_enrichment: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: DEFAULT_MAX_CONCURRENT_JOBS,
            job_timeout_secs: DEFAULT_JOB_TIMEOUT_SECS,
            queue_poll_secs: DEFAULT_QUEUE_POLL_SECS,
            job_queue: "commute_jobs".to_string(),
            progress_channel: "job_progress".to_string(),
            db_path: None,
            default_timezone: chrono_tz::UTC,
            policy: CompanyPolicy::default(),
            use_enrichment: false,
        }
    }
}

impl WorkerConfig {
    /// Build configuration from environment variables, falling back to
    /// defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(n) = env_parse::<usize>("MAX_CONCURRENT_JOBS") {
            if n > 0 {
                config.max_concurrent_jobs = n;
            }
        }
        if let Some(n) = env_parse::<u64>("JOB_TIMEOUT_SECONDS") {
            if n > 0 {
                config.job_timeout_secs = n;
            }
        }
        if let Ok(queue) = std::env::var("JOB_QUEUE") {
            if !queue.is_empty() {
                config.job_queue = queue;
            }
        }
        if let Ok(channel) = std::env::var("PROGRESS_CHANNEL") {
            if !channel.is_empty() {
                config.progress_channel = channel;
            }
        }
        if let Ok(path) = std::env::var("COMMUTEPLAN_DB_PATH") {
            if !path.is_empty() {
                config.db_path = Some(PathBuf::from(path));
            }
        }
        if let Ok(tz) = std::env::var("DEFAULT_TIMEZONE") {
            match tz.parse::<Tz>() {
                Ok(parsed) => config.default_timezone = parsed,
                Err(_) => log::warn!("Ignoring invalid DEFAULT_TIMEZONE: {}", tz),
            }
        }
        if let Ok(flag) = std::env::var("USE_ENRICHMENT_PLANNER") {
            config.use_enrichment = flag.eq_ignore_ascii_case("true");
        }

        config
    }

    /// Resolve the job store path (`~/.commuteplan/jobs.db` by default).
    pub fn resolve_db_path(&self) -> PathBuf {
        self.db_path.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_default()
                .join(".commuteplan")
                .join("jobs.db")
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
