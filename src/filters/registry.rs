//! Per-class filter registry.

use crate::report::{Report, ReportKind};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// A callback invoked with every decoded report of its class.
pub type Filter = Arc<dyn Fn(&Report) + Send + Sync>;

/// Maps report classes to ordered callback lists.
///
/// Filters are appended, never removed. Dispatch invokes them in
/// registration order on the caller's thread.
pub struct FilterRegistry {
    /// Callbacks by report class.
    filters: RwLock<HashMap<String, Vec<Filter>>>,
}

impl FilterRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            filters: RwLock::new(HashMap::new()),
        }
    }

    /// Append a callback for `class`.
    pub fn add_filter<F>(&self, class: impl Into<String>, filter: F)
    where
        F: Fn(&Report) + Send + Sync + 'static,
    {
        let class = class.into();
        tracing::debug!(class = %class, "Registering filter");
        self.filters
            .write()
            .entry(class)
            .or_default()
            .push(Arc::new(filter));
    }

    /// Append a callback for the report type `T`.
    ///
    /// The callback receives the concrete report, so no matching on
    /// [`Report`] is needed.
    pub fn add_report_filter<T, F>(&self, filter: F)
    where
        T: ReportKind,
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.add_filter(T::CLASS, move |report: &Report| {
            if let Some(report) = T::from_report(report) {
                filter(report);
            }
        });
    }

    /// Whether anything listens to `class`.
    pub fn has_subscribers(&self, class: &str) -> bool {
        self.filters
            .read()
            .get(class)
            .is_some_and(|filters| !filters.is_empty())
    }

    /// Number of callbacks registered for `class`.
    pub fn subscriber_count(&self, class: &str) -> usize {
        self.filters.read().get(class).map_or(0, Vec::len)
    }

    /// Classes with at least one callback.
    pub fn classes(&self) -> Vec<String> {
        let mut classes: Vec<String> = self
            .filters
            .read()
            .iter()
            .filter(|(_, filters)| !filters.is_empty())
            .map(|(class, _)| class.clone())
            .collect();
        classes.sort();
        classes
    }

    /// Invoke every callback for `class` with `report`.
    ///
    /// A panicking callback is logged and skipped; the remaining callbacks
    /// still run. Returns how many callbacks completed.
    pub fn dispatch(&self, class: &str, report: &Report) -> usize {
        // Snapshot so callbacks may register filters without deadlocking.
        let filters: Vec<Filter> = match self.filters.read().get(class) {
            Some(filters) => filters.clone(),
            None => return 0,
        };

        let mut completed = 0;
        for (position, filter) in filters.iter().enumerate() {
            match panic::catch_unwind(AssertUnwindSafe(|| filter(report))) {
                Ok(()) => completed += 1,
                Err(payload) => {
                    tracing::warn!(
                        class = %class,
                        filter = position,
                        panic = %panic_message(payload.as_ref()),
                        "Filter panicked"
                    );
                }
            }
        }
        completed
    }
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
