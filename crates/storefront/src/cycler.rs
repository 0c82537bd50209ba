//! Rotating featured-category tag for the hero banner.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

/// Categories featured on the landing page, in display order.
pub const FEATURED_TAGS: [&str; 5] = [
    "Books",
    "Merchandise",
    "Courses",
    "Consultations",
    "Coaching",
];

pub const DEFAULT_PERIOD: Duration = Duration::from_secs(2);

/// Callback receiving the tag now on display.
pub type TagListener = Arc<dyn Fn(&str) + Send + Sync>;

/// Cycles through a fixed list of tags.
///
/// Nothing is shown until the first [`advance`](Self::advance); after the
/// last tag it wraps to the first. Each instance keeps its own position.
#[derive(Debug, Clone)]
pub struct TagCycler {
    tags: Arc<[String]>,
    period: Duration,
    position: Arc<Mutex<Option<usize>>>,
}

impl Default for TagCycler {
    fn default() -> Self {
        Self::new(FEATURED_TAGS.iter().map(ToString::to_string), DEFAULT_PERIOD)
    }
}

impl TagCycler {
    pub fn new(tags: impl IntoIterator<Item = String>, period: Duration) -> Self {
        Self {
            tags: tags.into_iter().collect(),
            period,
            position: Arc::new(Mutex::new(None)),
        }
    }

    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }

    /// The tag on display, if any.
    #[must_use]
    pub fn current(&self) -> Option<&str> {
        let index = (*self.position.lock().ok()?)?;
        self.tags.get(index).map(String::as_str)
    }

    /// Move to the next tag and return it. `None` for an empty list.
    pub fn advance(&self) -> Option<&str> {
        if self.tags.is_empty() {
            return None;
        }
        let mut position = self.position.lock().ok()?;
        let next = (*position).map_or(0, |i| (i + 1) % self.tags.len());
        *position = Some(next);
        drop(position);
        self.tags.get(next).map(String::as_str)
    }

    /// Show the first tag now and the next one every period.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn start(&self, listener: TagListener) -> CyclerHandle {
        let cycler = self.clone();
        let task = tokio::spawn(async move {
            let mut timer = tokio::time::interval(cycler.period);
            loop {
                timer.tick().await;
                if let Some(tag) = cycler.advance() {
                    debug!(tag, "Featured tag changed");
                    listener(tag);
                }
            }
        });
        CyclerHandle { task: Some(task) }
    }
}

/// Owns the timer of a running [`TagCycler`].
#[derive(Debug)]
#[must_use = "dropping a CyclerHandle stops the cycler"]
pub struct CyclerHandle {
    task: Option<JoinHandle<()>>,
}

impl CyclerHandle {
    pub fn cancel(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for CyclerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
