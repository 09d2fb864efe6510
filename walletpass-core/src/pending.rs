//! Pending add-pass tracking.
//!
//! Presenting a pass hands control to the OS: Android reports back through
//! `onActivityResult`, iOS through the `PKAddPassesViewControllerDelegate`. The registry holds
//! the single in-flight request between those two points and routes the eventual callback to
//! the caller that started it.
//!
//! # Invariants
//!
//! - At most one operation is pending. `begin` on an occupied slot fails with
//!   `OPERATION_IN_PROGRESS`; the live operation is left untouched.
//! - At most one request is being prepared (payload download, checks) at a time. The
//!   [`Reservation`] taken by `reserve` is held until the operation is registered, so a
//!   concurrent request is rejected before it downloads anything.
//! - A pending operation is completed exactly once. Completion consumes it, and only the
//!   callback carrying its correlation token can take it out of the slot.
//! - A pending operation that is dropped without completing wakes its caller with
//!   `UNKNOWN_ERROR`.

use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Mutex, MutexGuard, PoisonError,
};

use log::{debug, info, warn};
use tokio::sync::oneshot;

use crate::{
    error::{PassOutcome, WalletPassError},
    platform::{PlatformResult, WalletPlatform},
};

const FALLBACK_ERROR: &str = "Unknown error";

/// The in-flight add-pass request.
pub(crate) struct PendingOperation {
    correlation_token: u64,
    payload: Option<Vec<u8>>,
    completion: oneshot::Sender<PassOutcome>,
}

impl PendingOperation {
    /// Completes the operation, waking the caller.
    pub(crate) fn complete(self, outcome: PassOutcome) {
        if self.completion.send(outcome).is_err() {
            debug!(
                "Caller for operation {} went away before completion",
                self.correlation_token
            );
        }
    }

    /// Maps a platform result code onto the normalized outcome.
    fn outcome_for(&self, result: PlatformResult, platform: &dyn WalletPlatform) -> PassOutcome {
        let provider = platform.provider();
        let result = match result {
            PlatformResult::Ok => Ok(()),
            PlatformResult::Cancelled => Err(provider.cancellation_error()),
            PlatformResult::Failed { message } => Err(WalletPassError::UnknownError {
                message: message.unwrap_or_else(|| FALLBACK_ERROR.to_string()),
            }),
            PlatformResult::Dismissed => match &self.payload {
                Some(payload) => match platform.contains_payload(payload.clone()) {
                    Ok(true) => Ok(()),
                    Ok(false) => Err(provider.cancellation_error()),
                    Err(err) => Err(WalletPassError::UnknownError {
                        message: err.message().to_string(),
                    }),
                },
                None => Err(WalletPassError::UnknownError {
                    message: "Unable to verify whether the pass was added".to_string(),
                }),
            },
        };
        PassOutcome::from(result)
    }
}

/// Caller side of a pending operation.
pub(crate) struct PendingHandle {
    pub(crate) correlation_token: u64,
    receiver: oneshot::Receiver<PassOutcome>,
}

impl PendingHandle {
    /// Waits for the operation to complete. There is no timeout.
    pub(crate) async fn outcome(self) -> PassOutcome {
        self.receiver.await.unwrap_or_else(|_| {
            PassOutcome::from(WalletPassError::UnknownError {
                message: "The pending operation was dropped before completing".to_string(),
            })
        })
    }
}

/// Exclusive right to register the next operation. Released on drop.
pub(crate) struct Reservation<'a> {
    registry: &'a PendingRegistry,
}

impl Reservation<'_> {
    /// Registers the operation this reservation was taken for.
    pub(crate) fn begin(self, payload: Option<Vec<u8>>) -> Result<PendingHandle, WalletPassError> {
        self.registry.begin(payload)
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        self.registry.preparing.store(false, Ordering::Release);
    }
}

/// Single-slot registry of the pending add-pass operation.
pub(crate) struct PendingRegistry {
    slot: Mutex<Option<PendingOperation>>,
    preparing: AtomicBool,
    next_token: AtomicU64,
}

impl PendingRegistry {
    pub(crate) const fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            preparing: AtomicBool::new(false),
            next_token: AtomicU64::new(1),
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<PendingOperation>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reserves the registry for a request that still has to resolve its payload.
    ///
    /// Fails with `OPERATION_IN_PROGRESS` while an operation is pending or another request
    /// holds a reservation.
    pub(crate) fn reserve(&self) -> Result<Reservation<'_>, WalletPassError> {
        let slot = self.slot();
        if slot.is_some() || self.preparing.swap(true, Ordering::AcqRel) {
            warn!("Rejecting add-pass request: another request is in progress");
            return Err(WalletPassError::OperationInProgress);
        }
        drop(slot);
        Ok(Reservation { registry: self })
    }

    /// Registers a new pending operation.
    ///
    /// `payload` is kept only so a `Dismissed` result can be checked against the wallet.
    pub(crate) fn begin(&self, payload: Option<Vec<u8>>) -> Result<PendingHandle, WalletPassError> {
        let mut slot = self.slot();
        if let Some(live) = slot.as_ref() {
            warn!(
                "Rejecting add-pass request: operation {} is still pending",
                live.correlation_token
            );
            return Err(WalletPassError::OperationInProgress);
        }

        let correlation_token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let (completion, receiver) = oneshot::channel();
        *slot = Some(PendingOperation {
            correlation_token,
            payload,
            completion,
        });
        drop(slot);

        info!("Registered pending add-pass operation {correlation_token}");
        Ok(PendingHandle {
            correlation_token,
            receiver,
        })
    }

    /// Removes the pending operation if it carries `correlation_token`.
    fn take(&self, correlation_token: u64) -> Option<PendingOperation> {
        let mut slot = self.slot();
        match slot.as_ref().map(|live| live.correlation_token) {
            Some(live) if live == correlation_token => {
                debug!("Cleared pending operation {correlation_token}");
                slot.take()
            }
            Some(live) => {
                warn!("Ignoring result for operation {correlation_token}: operation {live} is pending");
                None
            }
            None => {
                warn!("Ignoring result for operation {correlation_token}: nothing is pending");
                None
            }
        }
    }

    /// Resolves the operation from a platform callback. Returns whether an operation was
    /// resolved; repeated or stale callbacks return `false`.
    pub(crate) fn resolve(
        &self,
        correlation_token: u64,
        result: PlatformResult,
        platform: &dyn WalletPlatform,
    ) -> bool {
        let Some(operation) = self.take(correlation_token) else {
            return false;
        };
        let outcome = operation.outcome_for(result, platform);
        operation.complete(outcome);
        true
    }

    /// Fails the operation at the point of a synchronous submission error.
    pub(crate) fn fail(&self, correlation_token: u64, error: WalletPassError) -> bool {
        let Some(operation) = self.take(correlation_token) else {
            return false;
        };
        operation.complete(PassOutcome::from(error));
        true
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.slot().is_some()
    }
}
