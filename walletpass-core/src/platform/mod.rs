//! Platform abstraction for the native wallet subsystems.
//!
//! The session controller never talks to PassKit or the Google Pay API directly. Each host
//! application provides an implementation of [`WalletPlatform`] through `UniFFI`:
//!
//! ## iOS (Swift)
//! - `query_availability`: `PKAddPassesViewController.canAddPasses()`
//! - `contains_payload`: `PKPass(data:)` + `PKPassLibrary.containsPass`
//! - `submit_pass`: present a `PKAddPassesViewController` on the top-most view controller;
//!   its delegate reports [`PlatformResult::Dismissed`]
//! - `enumerate_passes` / `remove_stored_pass`: `PKPassLibrary`
//! - `open_url`: `UIApplication.shared.open`
//!
//! ## Android (Kotlin)
//! - `query_availability`: `PayClient.getPayApiAvailabilityStatus(SAVE_PASSES)`
//! - `submit_pass`: `PayClient.savePassesJwt(jwt, activity, requestCode)`; `onActivityResult`
//!   reports [`PlatformResult::Ok`], [`PlatformResult::Cancelled`] or
//!   [`PlatformResult::Failed`]
//! - the pass library is not exposed, so those methods are never called
//!
//! Implementations are responsible for hopping onto the UI thread before presenting anything.

use crate::error::{PlatformError, WalletPassError};

pub mod memory;

pub use memory::MemoryWallet;

/// The native wallet behind a [`WalletPlatform`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, uniffi::Enum)]
pub enum WalletProvider {
    /// Apple Wallet via `PassKit`.
    #[strum(serialize = "iOS")]
    AppleWallet,
    /// Google Wallet via the Google Pay API.
    #[strum(serialize = "Android")]
    GoogleWallet,
}

/// What a wallet provider can do beyond submitting a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Record)]
pub struct PlatformCapabilities {
    /// The wallet can tell whether a payload is already stored before presenting it.
    pub duplicate_precheck: bool,
    /// Passes can be presented straight from a local file.
    pub add_from_file: bool,
    /// Stored passes can be enumerated, removed and opened.
    pub pass_library: bool,
}

impl WalletProvider {
    /// Capabilities of this provider.
    #[must_use]
    pub const fn capabilities(self) -> PlatformCapabilities {
        match self {
            Self::AppleWallet => PlatformCapabilities {
                duplicate_precheck: true,
                add_from_file: true,
                pass_library: true,
            },
            Self::GoogleWallet => PlatformCapabilities {
                duplicate_precheck: false,
                add_from_file: false,
                pass_library: false,
            },
        }
    }

    /// Error reported when there is no foreground surface to present from.
    #[must_use]
    pub const fn missing_context_error(self) -> WalletPassError {
        match self {
            Self::AppleWallet => WalletPassError::NoViewController,
            Self::GoogleWallet => WalletPassError::NoActivity,
        }
    }

    /// Error reported when the user backs out of the add-pass screen.
    #[must_use]
    pub const fn cancellation_error(self) -> WalletPassError {
        match self {
            Self::AppleWallet => WalletPassError::UserCancelled,
            Self::GoogleWallet => WalletPassError::ResultCanceled,
        }
    }

    pub(crate) fn unsupported(self) -> WalletPassError {
        WalletPassError::UnsupportedPlatform {
            platform: self.to_string(),
        }
    }
}

/// A pass as enumerated from the platform pass store.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct StoredPass {
    /// The pass type identifier.
    pub identifier: String,
    /// The pass serial number.
    pub serial_number: String,
    /// Canonical deep link that opens the pass in the wallet, if the platform exposes one.
    pub pass_url: Option<String>,
}

/// Result code delivered by the platform once the add-pass UI has finished.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum PlatformResult {
    /// The user confirmed and the wallet saved the pass.
    Ok,
    /// The user backed out.
    Cancelled,
    /// Any other result, with the platform's error detail if it gave one.
    Failed {
        /// Free-text error supplied by the platform.
        message: Option<String>,
    },
    /// The add-pass screen was dismissed without an explicit result; success is decided by
    /// checking whether the submitted payload is now stored.
    Dismissed,
}

/// Capability interface over a native wallet subsystem.
#[uniffi::export(with_foreign)]
pub trait WalletPlatform: Send + Sync {
    /// Which wallet this is.
    fn provider(&self) -> WalletProvider;

    /// Whether the wallet can accept new passes on this device/account.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider cannot be queried.
    fn query_availability(&self) -> Result<bool, PlatformError>;

    /// Whether a foreground UI surface is available to present the add-pass screen.
    fn has_presentation_context(&self) -> bool;

    /// Whether the pass encoded in `payload` is already in the wallet.
    ///
    /// Only called when [`PlatformCapabilities::duplicate_precheck`] is set.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::InvalidPass`] if the payload cannot be parsed.
    fn contains_payload(&self, payload: Vec<u8>) -> Result<bool, PlatformError>;

    /// Hands `payload` to the wallet and presents its add-pass screen.
    ///
    /// The eventual result must be reported exactly once through
    /// `WalletSession::deliver_result` with the same `correlation_token`.
    ///
    /// # Errors
    ///
    /// Returns an error if the wallet refuses the payload synchronously; no result will be
    /// delivered for this token in that case.
    fn submit_pass(&self, payload: Vec<u8>, correlation_token: u64) -> Result<(), PlatformError>;

    /// All passes the wallet exposes to this application, in platform order.
    ///
    /// # Errors
    ///
    /// Returns an error if the pass store cannot be read.
    fn enumerate_passes(&self) -> Result<Vec<StoredPass>, PlatformError>;

    /// Removes `pass` from the wallet. Returns whether it was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the pass store cannot be modified.
    fn remove_stored_pass(&self, pass: StoredPass) -> Result<bool, PlatformError>;

    /// Opens `url` with the system handler.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be opened.
    fn open_url(&self, url: String) -> Result<(), PlatformError>;
}

impl From<PlatformError> for WalletPassError {
    fn from(error: PlatformError) -> Self {
        match error {
            PlatformError::Api {
                status_code,
                message,
            } => Self::ApiError {
                status_code,
                message,
            },
            PlatformError::InvalidPass { message } => Self::InvalidPass { reason: message },
            PlatformError::Controller { message } => Self::ControllerError { message },
            PlatformError::General { message }
            | PlatformError::UnexpectedUniFFICallbackError(message) => {
                Self::GeneralError { message }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_provider_specific_codes() {
        assert_eq!(
            WalletProvider::GoogleWallet.missing_context_error().code(),
            ErrorCode::NoActivity
        );
        assert_eq!(
            WalletProvider::AppleWallet.missing_context_error().code(),
            ErrorCode::NoViewController
        );
        assert_eq!(
            WalletProvider::GoogleWallet.cancellation_error().code(),
            ErrorCode::ResultCanceled
        );
        assert_eq!(
            WalletProvider::AppleWallet.cancellation_error().code(),
            ErrorCode::UserCancelled
        );
    }

    #[test]
    fn test_unsupported_names_platform() {
        let error = WalletProvider::GoogleWallet.unsupported();
        assert_eq!(error.to_string(), "This function is not supported on Android.");
    }

    #[test]
    fn test_platform_error_mapping() {
        let api: WalletPassError = PlatformError::Api {
            status_code: 10,
            message: "DEVELOPER_ERROR".to_string(),
        }
        .into();
        assert_eq!(api.code(), ErrorCode::ApiError);
        assert_eq!(
            api.to_string(),
            "Wallet API error occurred. Status code: 10, Message: DEVELOPER_ERROR"
        );

        let general: WalletPassError = PlatformError::UnexpectedUniFFICallbackError(
            "panic in callback".to_string(),
        )
        .into();
        assert_eq!(general.code(), ErrorCode::GeneralError);

        let controller: WalletPassError = PlatformError::Controller {
            message: "nil".to_string(),
        }
        .into();
        assert_eq!(controller.code(), ErrorCode::ControllerError);
    }
}
