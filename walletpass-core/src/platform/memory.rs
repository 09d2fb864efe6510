//! In-memory implementation of [`WalletPlatform`] for testing.
//!
//! `MemoryWallet` behaves like a scriptable wallet: passes live in a `Vec`, submissions are
//! recorded and published on a channel so a test can play the role of the OS and deliver the
//! result callback, and every failure path can be injected.

// Allow certain clippy lints for test-only code
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::significant_drop_tightening)]

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;

use super::{StoredPass, WalletPlatform, WalletProvider};
use crate::error::PlatformError;

/// A payload handed to [`WalletPlatform::submit_pass`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// The correlation token the result must be delivered with.
    pub correlation_token: u64,
    /// The submitted payload.
    pub payload: Vec<u8>,
}

/// Number of calls made into a [`MemoryWallet`], per method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    /// `query_availability` calls.
    pub availability: usize,
    /// `contains_payload` calls.
    pub contains: usize,
    /// `submit_pass` calls.
    pub submit: usize,
    /// `enumerate_passes` calls.
    pub enumerate: usize,
    /// `remove_stored_pass` calls.
    pub remove: usize,
}

#[derive(Default)]
struct State {
    available: Option<Result<bool, PlatformError>>,
    presentation_context: bool,
    passes: Vec<StoredPass>,
    stored_payloads: Vec<Vec<u8>>,
    submit_error: Option<PlatformError>,
    contains_error: Option<PlatformError>,
    submissions: Vec<Submission>,
    opened_urls: Vec<String>,
    calls: CallCounts,
    listener: Option<mpsc::UnboundedSender<Submission>>,
}

/// Scriptable in-memory wallet.
pub struct MemoryWallet {
    provider: WalletProvider,
    state: Mutex<State>,
}

impl MemoryWallet {
    /// Creates an available wallet for `provider` with a presentation context and no passes.
    #[must_use]
    pub fn new(provider: WalletProvider) -> Self {
        Self {
            provider,
            state: Mutex::new(State {
                available: Some(Ok(true)),
                presentation_context: true,
                ..State::default()
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sets the answer to the next availability queries.
    pub fn set_availability(&self, result: Result<bool, PlatformError>) {
        self.state().available = Some(result);
    }

    /// Toggles whether a foreground activity / view controller is present.
    pub fn set_presentation_context(&self, present: bool) {
        self.state().presentation_context = present;
    }

    /// Makes every subsequent `submit_pass` fail synchronously with `error`.
    pub fn fail_submissions_with(&self, error: Option<PlatformError>) {
        self.state().submit_error = error;
    }

    /// Makes every subsequent `contains_payload` fail with `error`.
    pub fn fail_contains_with(&self, error: Option<PlatformError>) {
        self.state().contains_error = error;
    }

    /// Adds a pass to the store, optionally associating it with the payload that produced it.
    pub fn insert_pass(&self, pass: StoredPass, payload: Option<Vec<u8>>) {
        let mut state = self.state();
        state.passes.push(pass);
        if let Some(payload) = payload {
            state.stored_payloads.push(payload);
        }
    }

    /// Marks `payload` as stored, as the wallet would after the user confirms.
    pub fn store_payload(&self, payload: Vec<u8>) {
        self.state().stored_payloads.push(payload);
    }

    /// Returns a receiver that is sent every subsequent submission.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<Submission> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.state().listener = Some(tx);
        rx
    }

    /// All submissions received so far.
    #[must_use]
    pub fn submissions(&self) -> Vec<Submission> {
        self.state().submissions.clone()
    }

    /// All URLs opened through `open_url`.
    #[must_use]
    pub fn opened_urls(&self) -> Vec<String> {
        self.state().opened_urls.clone()
    }

    /// Passes currently in the store.
    #[must_use]
    pub fn passes(&self) -> Vec<StoredPass> {
        self.state().passes.clone()
    }

    /// Per-method call counts.
    #[must_use]
    pub fn calls(&self) -> CallCounts {
        self.state().calls
    }
}

impl WalletPlatform for MemoryWallet {
    fn provider(&self) -> WalletProvider {
        self.provider
    }

    fn query_availability(&self) -> Result<bool, PlatformError> {
        let mut state = self.state();
        state.calls.availability += 1;
        state.available.clone().unwrap_or(Ok(false))
    }

    fn has_presentation_context(&self) -> bool {
        self.state().presentation_context
    }

    fn contains_payload(&self, payload: Vec<u8>) -> Result<bool, PlatformError> {
        let mut state = self.state();
        state.calls.contains += 1;
        if let Some(error) = state.contains_error.clone() {
            return Err(error);
        }
        Ok(state.stored_payloads.contains(&payload))
    }

    fn submit_pass(&self, payload: Vec<u8>, correlation_token: u64) -> Result<(), PlatformError> {
        let mut state = self.state();
        state.calls.submit += 1;
        if let Some(error) = state.submit_error.clone() {
            return Err(error);
        }
        let submission = Submission {
            correlation_token,
            payload,
        };
        state.submissions.push(submission.clone());
        if let Some(listener) = &state.listener {
            // the receiver may have been dropped by a finished test
            let _ = listener.send(submission);
        }
        Ok(())
    }

    fn enumerate_passes(&self) -> Result<Vec<StoredPass>, PlatformError> {
        let mut state = self.state();
        state.calls.enumerate += 1;
        Ok(state.passes.clone())
    }

    fn remove_stored_pass(&self, pass: StoredPass) -> Result<bool, PlatformError> {
        let mut state = self.state();
        state.calls.remove += 1;
        let Some(index) = state.passes.iter().position(|stored| *stored == pass) else {
            return Ok(false);
        };
        state.passes.remove(index);
        Ok(true)
    }

    fn open_url(&self, url: String) -> Result<(), PlatformError> {
        self.state().opened_urls.push(url);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pass(identifier: &str, serial: &str) -> StoredPass {
        StoredPass {
            identifier: identifier.to_string(),
            serial_number: serial.to_string(),
            pass_url: None,
        }
    }

    #[test]
    fn test_remove_only_exact_pass() {
        let wallet = MemoryWallet::new(WalletProvider::AppleWallet);
        wallet.insert_pass(pass("pass.a", "1"), None);
        wallet.insert_pass(pass("pass.a", "2"), None);
        assert!(wallet.remove_stored_pass(pass("pass.a", "2")).unwrap());
        assert!(!wallet.remove_stored_pass(pass("pass.a", "2")).unwrap());
        assert_eq!(wallet.passes(), vec![pass("pass.a", "1")]);
        assert_eq!(wallet.calls().remove, 2);
    }

    #[test]
    fn test_submission_is_published() {
        let wallet = MemoryWallet::new(WalletProvider::GoogleWallet);
        let mut rx = wallet.subscribe();
        wallet.submit_pass(b"jwt".to_vec(), 7).unwrap();
        let submission = rx.try_recv().unwrap();
        assert_eq!(submission.correlation_token, 7);
        assert_eq!(wallet.submissions(), vec![submission]);
    }

    #[test]
    fn test_injected_submit_failure_is_not_recorded() {
        let wallet = MemoryWallet::new(WalletProvider::GoogleWallet);
        wallet.fail_submissions_with(Some(PlatformError::General {
            message: "boom".to_string(),
        }));
        assert!(wallet.submit_pass(vec![1], 1).is_err());
        assert!(wallet.submissions().is_empty());
        assert_eq!(wallet.calls().submit, 1);
    }
}
