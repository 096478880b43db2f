use tracing::{error, info};
use crate::core::Route;
use crate::error::RouteResult;
use crate::input::RouteSource;

/// Holds the route source and the last route it successfully produced
pub struct RouteStore {
    source: Box<dyn RouteSource>,
    loaded: Route,
}

impl RouteStore {
    pub fn new(source: Box<dyn RouteSource>) -> Self {
        Self {
            source,
            loaded: Route::new(),
        }
    }

    /// Fetch the route from the source
    ///
    /// On failure the error is logged and the previously loaded route is
    /// kept. There is no retry.
    pub async fn load(&mut self) -> RouteResult<Route> {
        match self.source.fetch().await {
            Ok(route) => {
                info!("Loaded {} samples from {}", route.len(), self.source.name());
                self.loaded = route.clone();
                Ok(route)
            }
            Err(e) => {
                error!("Failed to load route from {}: {}", self.source.name(), e);
                Err(e)
            }
        }
    }

    /// Last successfully loaded route (empty before the first success)
    pub fn loaded(&self) -> &Route {
        &self.loaded
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }
}
