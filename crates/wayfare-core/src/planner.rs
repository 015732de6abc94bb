//! The client context tying the API, caches and session together.
//!
//! A `Planner` is built explicitly and owns one `CacheRegistry`; the managers
//! it exposes all share that registry. Dropping the planner drops its caches.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::{ApiError, TravelApi};
use crate::auth::{Session, SessionData};
use crate::cache::CacheRegistry;
use crate::managers::{ItineraryManager, PlaceManager, TripManager};

pub struct Planner {
    api: Arc<dyn TravelApi>,
    caches: Arc<CacheRegistry>,
    session: Mutex<Session>,
    pub trips: TripManager,
    pub places: PlaceManager,
    pub itineraries: ItineraryManager,
}

impl Planner {
    pub fn new(api: Arc<dyn TravelApi>, caches: Arc<CacheRegistry>, session: Session) -> Self {
        Self {
            trips: TripManager::new(api.clone(), caches.clone()),
            places: PlaceManager::new(api.clone(), caches.clone()),
            itineraries: ItineraryManager::new(api.clone(), caches.clone()),
            api,
            caches,
            session: Mutex::new(session),
        }
    }

    pub fn caches(&self) -> &Arc<CacheRegistry> {
        &self.caches
    }

    /// Pick up a saved, unexpired session. Returns whether one was found.
    pub async fn restore_session(&self) -> Result<bool> {
        let mut session = self.session.lock().await;
        if !session.load()? {
            return Ok(false);
        }
        self.api.set_token(session.token().map(str::to_string));
        debug!(username = ?session.username(), "Restored saved session");
        Ok(true)
    }

    /// Authenticate and persist the session. Caches are emptied first since
    /// anything in them belongs to whoever was signed in before.
    pub async fn login(&self, username: &str, password: &str) -> Result<SessionData> {
        self.caches.clear_all().await;
        let data = self
            .api
            .authenticate(username, password)
            .await
            .context("Login failed")?;

        self.api.set_token(Some(data.token.clone()));
        let mut session = self.session.lock().await;
        session.update(data.clone());
        session.save().context("Failed to save session")?;
        info!(username, "Signed in");
        Ok(data)
    }

    pub async fn is_signed_in(&self) -> bool {
        self.session.lock().await.is_valid()
    }

    pub async fn username(&self) -> Option<String> {
        self.session.lock().await.username().map(str::to_string)
    }

    /// Drop the token, the saved session and every cached value.
    pub async fn sign_out(&self) -> Result<()> {
        self.api.set_token(None);
        self.caches.clear_all().await;
        self.session
            .lock()
            .await
            .clear()
            .context("Failed to remove session file")?;
        info!("Signed out");
        Ok(())
    }

    /// Application-level reaction to a failed request. An unauthorized
    /// response means the session is dead and the cached data may belong to
    /// it, so the user is signed out and all caches are cleared.
    pub async fn handle_error(&self, err: &ApiError) {
        if !err.is_unauthorized() {
            return;
        }
        warn!("Request was unauthorized, signing out");
        if let Err(e) = self.sign_out().await {
            warn!(error = %e, "Failed to complete sign-out");
        }
    }

    /// Pass a result through, applying [`Planner::handle_error`] on failure.
    pub async fn guard<T>(&self, result: Result<T, ApiError>) -> Result<T, ApiError> {
        if let Err(ref err) = result {
            self.handle_error(err).await;
        }
        result
    }

    pub async fn clear_caches(&self) {
        self.caches.clear_all().await;
    }

    pub async fn sweep_caches(&self) -> usize {
        self.caches.sweep_all().await
    }

    /// Sweep expired entries every `every` until the handle is aborted.
    /// Bounds memory in long sessions; reads stay correct without it.
    pub fn spawn_sweeper(&self, every: Duration) -> JoinHandle<()> {
        let caches = self.caches.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            // The first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                caches.sweep_all().await;
            }
        })
    }
}
