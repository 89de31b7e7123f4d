use crate::EmptyPoolError;
use rand::seq::SliceRandom;
use rand::Rng;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Candidate base URLs for one site
///
/// Shared by every worker bound to the site. Selection takes a read lock and
/// removal a write lock; neither is held across an `.await`, so a removal only
/// affects later picks and never an in-flight request.
#[derive(Debug)]
pub struct EndpointPool {
    /// Site display name
    site: String,

    /// Endpoints still eligible for selection
    endpoints: RwLock<Vec<String>>,
}

impl EndpointPool {
    /// Creates a pool from a site's configured endpoints
    ///
    /// Duplicates are dropped, keeping the first occurrence.
    pub fn new(site: impl Into<String>, endpoints: impl IntoIterator<Item = String>) -> Self {
        let mut unique: Vec<String> = Vec::new();
        for endpoint in endpoints {
            if !unique.contains(&endpoint) {
                unique.push(endpoint);
            }
        }

        Self {
            site: site.into(),
            endpoints: RwLock::new(unique),
        }
    }

    /// The site this pool belongs to
    pub fn site(&self) -> &str {
        &self.site
    }

    /// Picks an endpoint uniformly at random
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The chosen base URL
    /// * `Err(EmptyPoolError)` - Every endpoint of the site has been removed
    pub fn pick_random(&self) -> Result<String, EmptyPoolError> {
        self.pick_with(&mut rand::thread_rng())
    }

    /// Picks an endpoint uniformly at random using the given source
    pub fn pick_with<R: Rng>(&self, rng: &mut R) -> Result<String, EmptyPoolError> {
        self.read()
            .choose(rng)
            .cloned()
            .ok_or_else(|| EmptyPoolError {
                site: self.site.clone(),
            })
    }

    /// Removes an endpoint permanently
    ///
    /// Removing an endpoint that is not (or no longer) present is a no-op.
    ///
    /// # Returns
    ///
    /// `true` if this call removed the endpoint
    pub fn remove(&self, endpoint: &str) -> bool {
        let mut endpoints = self.write();
        match endpoints.iter().position(|e| e == endpoint) {
            Some(index) => {
                endpoints.remove(index);
                true
            }
            None => false,
        }
    }

    /// Returns true if the pool still holds the endpoint
    pub fn contains(&self, endpoint: &str) -> bool {
        self.read().iter().any(|e| e == endpoint)
    }

    /// Number of endpoints remaining
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns whether every endpoint has been removed
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Copy of the remaining endpoints, in configured order
    pub fn snapshot(&self) -> Vec<String> {
        self.read().clone()
    }

    // A panic while holding the lock cannot leave the Vec half-updated, so
    // poisoned guards are recovered.
    fn read(&self) -> RwLockReadGuard<'_, Vec<String>> {
        self.endpoints
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<String>> {
        self.endpoints
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
