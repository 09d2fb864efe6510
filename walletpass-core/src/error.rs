use strum::{Display, EnumString, IntoStaticStr};
use thiserror::Error;

/// Wire-level error codes reported to the host application.
///
/// The string form (`SCREAMING_SNAKE_CASE`) is what React Native / Swift / Kotlin callers
/// match on, e.g. `HTTP_ERROR` or `USER_CANCELLED`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, uniffi::Enum,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The pass URL (or file path) could not be parsed.
    InvalidUrl,
    /// The payload or request input is empty or malformed.
    InvalidData,
    /// The wallet could not parse the payload into a pass.
    InvalidPass,
    /// Transport, DNS or TLS failure while fetching a pass.
    NetworkError,
    /// The pass server answered with a non-2xx status.
    HttpError,
    /// No foreground activity to present from (Android).
    NoActivity,
    /// No root view controller to present from (iOS).
    NoViewController,
    /// The wallet provider reported a structured failure.
    ApiError,
    /// Unstructured failure while handing the pass to the wallet.
    GeneralError,
    /// The wallet reported an unexpected result.
    UnknownError,
    /// The user declined to add the pass (iOS).
    UserCancelled,
    /// The user backed out of the add-pass screen (Android).
    ResultCanceled,
    /// The pass is already stored in the wallet.
    PassAlreadyExists,
    /// The operation is not offered on this platform.
    UnsupportedPlatform,
    /// Another add-pass request is still waiting for its result.
    OperationInProgress,
    /// The wallet failed to build its add-pass screen.
    ControllerError,
    /// Checking the wallet API availability failed.
    Error,
}

/// Error outputs from `WalletPass`
#[derive(Debug, Clone, PartialEq, Eq, Error, uniffi::Error)]
pub enum WalletPassError {
    /// The presented URL is not a valid `http(s)` URL
    #[error("The URL is invalid")]
    InvalidUrl {
        /// The rejected input.
        url: String,
    },
    /// The pass payload or request input is empty or malformed
    #[error("{reason}")]
    InvalidData {
        /// What was wrong with the input.
        reason: String,
    },
    /// The wallet could not parse the payload into a pass
    #[error("Failed to parse pass data: {reason}")]
    InvalidPass {
        /// Detail reported by the wallet.
        reason: String,
    },
    /// Network connection error with details
    #[error("{error}")]
    NetworkError {
        /// The URL that was requested.
        url: String,
        /// Description of the transport failure.
        error: String,
    },
    /// The pass server answered with a non-2xx status
    #[error("HTTP {status}")]
    HttpError {
        /// The URL that was requested.
        url: String,
        /// The HTTP status code returned.
        status: u16,
    },
    /// No foreground activity is available to present the save flow
    #[error("Current activity is unavailable.")]
    NoActivity,
    /// No root view controller is available to present the add-pass sheet
    #[error("No root view controller found")]
    NoViewController,
    /// The wallet provider rejected the request with a status code
    #[error("Wallet API error occurred. Status code: {status_code}, Message: {message}")]
    ApiError {
        /// Provider status code.
        status_code: i32,
        /// Provider status description.
        message: String,
    },
    /// Unstructured failure while saving to the wallet
    #[error("Error when saving to the wallet: {message}")]
    GeneralError {
        /// Underlying failure message.
        message: String,
    },
    /// The wallet reported a result that is neither success nor cancellation
    #[error("An error occurred: {message}")]
    UnknownError {
        /// Wallet-supplied detail or a fallback.
        message: String,
    },
    /// The user declined to add the pass
    #[error("User cancelled or declined to add pass")]
    UserCancelled,
    /// The user backed out of the save flow
    #[error("The operation was canceled by the user.")]
    ResultCanceled,
    /// The pass is already in the wallet
    #[error("This pass is already in your wallet")]
    PassAlreadyExists,
    /// The requested operation is not offered by this wallet
    #[error("This function is not supported on {platform}.")]
    UnsupportedPlatform {
        /// Human readable platform name.
        platform: String,
    },
    /// An add-pass request is already waiting for its result
    #[error("Another pass is already being added")]
    OperationInProgress,
    /// The wallet failed to build its add-pass screen
    #[error("Failed to create pass controller: {message}")]
    ControllerError {
        /// Underlying failure message.
        message: String,
    },
    /// Querying the wallet API availability failed
    #[error("Error when checking the availability of the wallet API: {message}")]
    AvailabilityError {
        /// Provider failure message.
        message: String,
    },
}

impl WalletPassError {
    /// Returns the wire code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidUrl { .. } => ErrorCode::InvalidUrl,
            Self::InvalidData { .. } => ErrorCode::InvalidData,
            Self::InvalidPass { .. } => ErrorCode::InvalidPass,
            Self::NetworkError { .. } => ErrorCode::NetworkError,
            Self::HttpError { .. } => ErrorCode::HttpError,
            Self::NoActivity => ErrorCode::NoActivity,
            Self::NoViewController => ErrorCode::NoViewController,
            Self::ApiError { .. } => ErrorCode::ApiError,
            Self::GeneralError { .. } => ErrorCode::GeneralError,
            Self::UnknownError { .. } => ErrorCode::UnknownError,
            Self::UserCancelled => ErrorCode::UserCancelled,
            Self::ResultCanceled => ErrorCode::ResultCanceled,
            Self::PassAlreadyExists => ErrorCode::PassAlreadyExists,
            Self::UnsupportedPlatform { .. } => ErrorCode::UnsupportedPlatform,
            Self::OperationInProgress => ErrorCode::OperationInProgress,
            Self::ControllerError { .. } => ErrorCode::ControllerError,
            Self::AvailabilityError { .. } => ErrorCode::Error,
        }
    }

    pub(crate) fn invalid_data(reason: impl Into<String>) -> Self {
        Self::InvalidData {
            reason: reason.into(),
        }
    }
}

/// Errors raised by a [`WalletPlatform`](crate::platform::WalletPlatform) implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error, uniffi::Error)]
pub enum PlatformError {
    /// The provider SDK reported a structured failure (e.g. Google `ApiException`).
    #[error("api error {status_code}: {message}")]
    Api {
        /// Provider status code.
        status_code: i32,
        /// Provider status description.
        message: String,
    },
    /// The payload is not a pass the wallet understands.
    #[error("invalid pass: {message}")]
    InvalidPass {
        /// Parser detail.
        message: String,
    },
    /// The add-pass screen could not be created.
    #[error("controller error: {message}")]
    Controller {
        /// Failure detail.
        message: String,
    },
    /// Any other platform failure.
    #[error("{message}")]
    General {
        /// Failure detail.
        message: String,
    },
    /// Unexpected `UniFFI` callback error.
    #[error("unexpected uniffi callback error: {0}")]
    UnexpectedUniFFICallbackError(String),
}

impl From<uniffi::UnexpectedUniFFICallbackError> for PlatformError {
    fn from(error: uniffi::UnexpectedUniFFICallbackError) -> Self {
        Self::UnexpectedUniFFICallbackError(error.reason)
    }
}

impl PlatformError {
    /// Message to surface to the caller, without the variant prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Api { message, .. }
            | Self::InvalidPass { message }
            | Self::Controller { message }
            | Self::General { message }
            | Self::UnexpectedUniFFICallbackError(message) => message,
        }
    }
}

/// The normalized result every add-pass path converges to.
///
/// Mirrors the `(success, errorCode, errorMessage)` triple handed back to the JS layer.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct PassOutcome {
    /// Whether the pass ended up in the wallet.
    pub success: bool,
    /// The failure code, absent on success.
    pub error_code: Option<ErrorCode>,
    /// Human readable failure message, absent on success.
    pub error_message: Option<String>,
}

impl PassOutcome {
    /// A successful outcome.
    #[must_use]
    pub const fn success() -> Self {
        Self {
            success: true,
            error_code: None,
            error_message: None,
        }
    }
}

impl From<WalletPassError> for PassOutcome {
    fn from(error: WalletPassError) -> Self {
        Self {
            success: false,
            error_code: Some(error.code()),
            error_message: Some(error.to_string()),
        }
    }
}

impl From<Result<(), WalletPassError>> for PassOutcome {
    fn from(result: Result<(), WalletPassError>) -> Self {
        result.map_or_else(Self::from, |()| Self::success())
    }
}
