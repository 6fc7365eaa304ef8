//! Shared per-job execution context.
//!
//! Bundles the collaborators (store, calendar, travel, progress sink), the
//! worker configuration, and the cooperative cancellation flag. Cheap to
//! clone; every job task gets its own copy. The `PlanningState` itself is
//! never shared; only the collaborators are.

use std::sync::Arc;

use tokio::sync::watch;

use crate::calendar::CalendarProvider;
use crate::config::WorkerConfig;
use crate::progress::ProgressSink;
use crate::store::JobStore;
use crate::travel::TravelEstimator;

#[derive(Clone)]
pub struct PlanContext {
    pub config: Arc<WorkerConfig>,
    pub store: Arc<parking_lot::Mutex<JobStore>>,
    pub calendar: Arc<dyn CalendarProvider>,
    pub travel: Arc<dyn TravelEstimator>,
    pub progress: Arc<dyn ProgressSink>,
    cancel: watch::Receiver<bool>,
}

impl PlanContext {
    pub fn new(
        config: Arc<WorkerConfig>,
        store: Arc<parking_lot::Mutex<JobStore>>,
        calendar: Arc<dyn CalendarProvider>,
        travel: Arc<dyn TravelEstimator>,
        progress: Arc<dyn ProgressSink>,
        cancel: watch::Receiver<bool>,
    ) -> Self {
        Self { config, store, calendar, travel, progress, cancel }
    }

    /// True once shutdown has been signalled. Stages check this between
    /// collaborator calls and abort without further side effects.
    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    pub fn cancel_receiver(&self) -> watch::Receiver<bool> {
        self.cancel.clone()
    }
}
