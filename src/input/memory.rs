use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use crate::core::Route;
use crate::error::{RouteError, RouteResult};
use super::RouteSource;

/// In-memory route source for testing without files
///
/// Clones share state, so a test can keep a handle and flip
/// [`MemoryRouteSource::set_failing`] after the source is handed to a session.
#[derive(Clone)]
pub struct MemoryRouteSource {
    route: Arc<Route>,
    failing: Arc<AtomicBool>,
    fetches: Arc<AtomicUsize>,
}

impl MemoryRouteSource {
    pub fn new(route: Route) -> Self {
        Self {
            route: Arc::new(route),
            failing: Arc::new(AtomicBool::new(false)),
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Make subsequent fetches fail
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of fetches attempted so far
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RouteSource for MemoryRouteSource {
    fn name(&self) -> &str {
        "memory"
    }

    async fn fetch(&self) -> RouteResult<Route> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        if self.failing.load(Ordering::SeqCst) {
            return Err(RouteError::Io {
                path: self.name().to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotConnected, "simulated fetch failure"),
            });
        }
        if self.route.is_empty() {
            return Err(RouteError::Empty);
        }

        Ok(self.route.as_ref().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Sample;
    use chrono::Utc;

    #[tokio::test]
    async fn test_memory_source_fetch_and_fail() {
        let source = MemoryRouteSource::new(vec![Sample::new(17.0, 78.0, Utc::now())]);
        let handle = source.clone();

        assert_eq!(source.fetch().await.unwrap().len(), 1);

        handle.set_failing(true);
        assert!(source.fetch().await.is_err());
        assert_eq!(handle.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_memory_source_empty() {
        let source = MemoryRouteSource::new(Vec::new());
        assert!(matches!(source.fetch().await, Err(RouteError::Empty)));
    }
}
