//! Scriptable renewal endpoint for testing.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

use crate::error::AuthError;
use crate::traits::{RenewalEndpoint, RenewalGrant, RenewalRequest};

/// Renewal endpoint returning scripted outcomes.
///
/// Outcomes registered for a refresh token with
/// [`MockRenewalEndpoint::respond_to`] win. Otherwise outcomes are consumed
/// in order; once the script is empty the fallback outcome is returned
/// (a `RefreshFailed` error unless configured). Every call is counted and
/// recorded. A call can be held open with
/// [`MockRenewalEndpoint::hold`] until [`MockRenewalEndpoint::release`].
#[derive(Debug, Clone)]
pub struct MockRenewalEndpoint {
    script: Arc<Mutex<VecDeque<Result<RenewalGrant, AuthError>>>>,
    by_token: Arc<Mutex<HashMap<String, Result<RenewalGrant, AuthError>>>>,
    fallback: Arc<Mutex<Result<RenewalGrant, AuthError>>>,
    requests: Arc<Mutex<Vec<RenewalRequest>>>,
    calls: Arc<AtomicUsize>,
    delay: Arc<Mutex<Option<Duration>>>,
    gate: Arc<watch::Sender<bool>>,
}

impl MockRenewalEndpoint {
    pub fn new() -> Self {
        let (gate, _) = watch::channel(false);
        Self {
            script: Arc::new(Mutex::new(VecDeque::new())),
            by_token: Arc::new(Mutex::new(HashMap::new())),
            fallback: Arc::new(Mutex::new(Err(AuthError::RefreshFailed {
                message: "No mock renewal outcome configured".to_string(),
            }))),
            requests: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(AtomicUsize::new(0)),
            delay: Arc::new(Mutex::new(None)),
            gate: Arc::new(gate),
        }
    }

    /// Endpoint that always grants `grant`.
    pub fn granting(grant: RenewalGrant) -> Self {
        let endpoint = Self::new();
        endpoint.set_fallback(Ok(grant));
        endpoint
    }

    /// Endpoint that always rejects the refresh token.
    pub fn rejecting() -> Self {
        let endpoint = Self::new();
        endpoint.set_fallback(Err(AuthError::RefreshRejected {
            status: 401,
            message: "Token is invalid or expired".to_string(),
        }));
        endpoint
    }

    /// Queue an outcome for the next unscripted call.
    pub fn push_outcome(&self, outcome: Result<RenewalGrant, AuthError>) {
        self.script.lock().unwrap().push_back(outcome);
    }

    /// Answer every request carrying `refresh_token` with `outcome`.
    pub fn respond_to(&self, refresh_token: &str, outcome: Result<RenewalGrant, AuthError>) {
        self.by_token
            .lock()
            .unwrap()
            .insert(refresh_token.to_string(), outcome);
    }

    pub fn set_fallback(&self, outcome: Result<RenewalGrant, AuthError>) {
        *self.fallback.lock().unwrap() = outcome;
    }

    /// Delay every response by `delay`.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// Make subsequent calls wait until [`Self::release`].
    pub fn hold(&self) {
        self.gate.send_replace(true);
    }

    pub fn release(&self) {
        self.gate.send_replace(false);
    }

    /// Number of renewal calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<RenewalRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockRenewalEndpoint {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RenewalEndpoint for MockRenewalEndpoint {
    async fn renew(&self, request: &RenewalRequest) -> Result<RenewalGrant, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        let mut gate = self.gate.subscribe();
        // The sender lives in `self`, so this only errors if it was dropped.
        let _ = gate.wait_for(|held| !*held).await;

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let keyed = self.by_token.lock().unwrap().get(&request.refresh_token).cloned();
        if let Some(outcome) = keyed {
            return outcome;
        }
        let scripted = self.script.lock().unwrap().pop_front();
        match scripted {
            Some(outcome) => outcome,
            None => self.fallback.lock().unwrap().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RenewalRequest {
        RenewalRequest {
            refresh_token: "r".to_string(),
            subject: None,
        }
    }

    #[tokio::test]
    async fn test_script_then_fallback() {
        let endpoint = MockRenewalEndpoint::granting(RenewalGrant::new("fallback"));
        endpoint.push_outcome(Ok(RenewalGrant::new("first")));
        endpoint.push_outcome(Err(AuthError::RefreshTokenMissing));

        assert_eq!(endpoint.renew(&request()).await.unwrap().access_token, "first");
        assert_eq!(
            endpoint.renew(&request()).await.unwrap_err(),
            AuthError::RefreshTokenMissing
        );
        assert_eq!(endpoint.renew(&request()).await.unwrap().access_token, "fallback");
        assert_eq!(endpoint.calls(), 3);
        assert_eq!(endpoint.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_keyed_outcome_wins_over_script() {
        let endpoint = MockRenewalEndpoint::granting(RenewalGrant::new("fallback"));
        endpoint.push_outcome(Ok(RenewalGrant::new("scripted")));
        endpoint.respond_to("r", Err(AuthError::RefreshTokenMissing));

        assert_eq!(
            endpoint.renew(&request()).await.unwrap_err(),
            AuthError::RefreshTokenMissing
        );
        let other = RenewalRequest {
            refresh_token: "other".to_string(),
            subject: None,
        };
        assert_eq!(endpoint.renew(&other).await.unwrap().access_token, "scripted");
    }

    #[tokio::test]
    async fn test_default_fails() {
        let endpoint = MockRenewalEndpoint::new();
        assert!(matches!(
            endpoint.renew(&request()).await,
            Err(AuthError::RefreshFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_hold_and_release() {
        let endpoint = MockRenewalEndpoint::granting(RenewalGrant::new("later"));
        endpoint.hold();

        let task = {
            let endpoint = endpoint.clone();
            tokio::spawn(async move { endpoint.renew(&request()).await })
        };

        while endpoint.calls() == 0 {
            tokio::task::yield_now().await;
        }
        assert!(!task.is_finished());

        endpoint.release();
        let grant = task.await.unwrap().unwrap();
        assert_eq!(grant.access_token, "later");
    }
}
