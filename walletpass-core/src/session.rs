//! The `WalletSession` is the single entry point the host application talks to.

use std::{collections::HashMap, sync::Arc};

use log::{info, warn};

use crate::{
    config::{DuplicateCheck, SessionConfig},
    error::{PassOutcome, WalletPassError},
    http_request::{read_pass_file, PassFetcher},
    pass_identity::PassKey,
    pending::{PendingHandle, PendingRegistry},
    platform::{PlatformResult, StoredPass, WalletPlatform},
};

/// Where the pass to add comes from.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum PassSource {
    /// Raw pass bytes, e.g. a `.pkpass` archive.
    Data {
        /// The pass payload.
        bytes: Vec<u8>,
    },
    /// A signed pass token, e.g. a Google Wallet save JWT.
    Jwt {
        /// The signed token.
        token: String,
    },
    /// A pass served over HTTP(S).
    Url {
        /// Where to download the pass from.
        url: String,
        /// Extra request headers, typically for authentication.
        headers: HashMap<String, String>,
    },
    /// A pass stored on the device.
    File {
        /// Absolute path to the pass file.
        path: String,
    },
}

/// Bridges the host application to the platform wallet.
///
/// Add-pass requests are correlated with the platform's asynchronous result callback, which
/// the host reports through [`WalletSession::deliver_result`]. Only one add-pass request can
/// be pending at a time; a second one resolves to `OPERATION_IN_PROGRESS`.
#[derive(uniffi::Object)]
pub struct WalletSession {
    platform: Arc<dyn WalletPlatform>,
    fetcher: PassFetcher,
    pending: PendingRegistry,
    config: SessionConfig,
}

#[uniffi::export(async_runtime = "tokio")]
impl WalletSession {
    /// Creates a session over `platform` with the default configuration.
    #[uniffi::constructor]
    #[must_use]
    pub fn new(platform: Arc<dyn WalletPlatform>) -> Self {
        Self::with_config(platform, SessionConfig::default())
    }

    /// Creates a session over `platform` with `config`.
    #[uniffi::constructor]
    #[must_use]
    pub fn with_config(platform: Arc<dyn WalletPlatform>, config: SessionConfig) -> Self {
        Self {
            fetcher: PassFetcher::new(&config),
            pending: PendingRegistry::new(),
            platform,
            config,
        }
    }

    /// Creates a session over `platform` from a JSON encoded [`SessionConfig`].
    ///
    /// # Errors
    /// Returns `INVALID_DATA` if the config cannot be parsed.
    #[uniffi::constructor]
    pub fn with_json_config(
        platform: Arc<dyn WalletPlatform>,
        config: &str,
    ) -> Result<Self, WalletPassError> {
        let config = SessionConfig::from_json(config)?;
        Ok(Self::with_config(platform, config))
    }

    /// Whether the wallet can accept new passes. Queried fresh on every call.
    ///
    /// # Errors
    /// Returns `ERROR` with the provider's message if availability cannot be determined.
    pub fn can_add_passes(&self) -> Result<bool, WalletPassError> {
        self.platform
            .query_availability()
            .map_err(|err| WalletPassError::AvailabilityError {
                message: err.message().to_string(),
            })
    }

    /// Adds a pass to the wallet and resolves once the user has finished with the wallet UI.
    ///
    /// `key` identifies the pass; with [`DuplicateCheck::BeforeFetch`] it is used to skip the
    /// download of a pass that is already stored.
    pub async fn add_pass(&self, source: PassSource, key: Option<PassKey>) -> PassOutcome {
        match self.submit(source, key).await {
            Ok(handle) => handle.outcome().await,
            Err(err) => {
                warn!("Add pass failed before reaching the wallet: {err}");
                PassOutcome::from(err)
            }
        }
    }

    /// Adds a pass from a signed JWT.
    pub async fn add_pass_jwt(&self, jwt: String) -> PassOutcome {
        self.add_pass(PassSource::Jwt { token: jwt }, None).await
    }

    /// Downloads a pass with the given headers and adds it.
    pub async fn add_pass_from_url(
        &self,
        url: String,
        headers: Option<HashMap<String, String>>,
    ) -> PassOutcome {
        let headers = headers.unwrap_or_default();
        self.add_pass(PassSource::Url { url, headers }, None).await
    }

    /// Presents the add-pass screen for a pass file on disk.
    ///
    /// Resolves to `UNSUPPORTED_PLATFORM` on wallets that cannot present from a file.
    pub async fn show_add_pass_controller_from_file(&self, path: String) -> PassOutcome {
        self.add_pass(PassSource::File { path }, None).await
    }

    /// Reports the result of the add-pass screen for `correlation_token`.
    ///
    /// Returns whether a pending operation was resolved. Repeated or stale callbacks are
    /// ignored.
    pub fn deliver_result(&self, correlation_token: u64, result: PlatformResult) -> bool {
        self.pending
            .resolve(correlation_token, result, self.platform.as_ref())
    }

    /// Whether an add-pass request is waiting for its result.
    pub fn is_add_pending(&self) -> bool {
        self.pending.is_pending()
    }

    /// Whether a pass matching `identifier` (and `serial_number`, if given) is stored.
    ///
    /// # Errors
    /// Returns `UNSUPPORTED_PLATFORM` if the wallet does not expose its passes.
    pub fn has_pass(
        &self,
        identifier: String,
        serial_number: Option<String>,
    ) -> Result<bool, WalletPassError> {
        let key = PassKey::new(identifier, serial_number);
        Ok(self.find_pass(&key)?.is_some())
    }

    /// Removes the first pass matching the key. Returns whether a pass was removed.
    ///
    /// # Errors
    /// Returns `UNSUPPORTED_PLATFORM` if the wallet does not expose its passes.
    pub fn remove_pass(
        &self,
        identifier: String,
        serial_number: Option<String>,
    ) -> Result<bool, WalletPassError> {
        let key = PassKey::new(identifier, serial_number);
        let Some(pass) = self.find_pass(&key)? else {
            return Ok(false);
        };
        let removed = self.platform.remove_stored_pass(pass)?;
        if removed {
            info!("Removed pass {}", key.identifier);
        }
        Ok(removed)
    }

    /// Opens the first pass matching the key in the wallet. Returns whether a pass matched.
    ///
    /// A matching pass without a deep link still counts as found.
    ///
    /// # Errors
    /// Returns `UNSUPPORTED_PLATFORM` if the wallet does not expose its passes.
    pub fn view_in_wallet(
        &self,
        identifier: String,
        serial_number: Option<String>,
    ) -> Result<bool, WalletPassError> {
        let key = PassKey::new(identifier, serial_number);
        let Some(pass) = self.find_pass(&key)? else {
            return Ok(false);
        };
        if let Some(url) = pass.pass_url {
            if let Err(err) = self.platform.open_url(url) {
                warn!("Unable to open pass {} in the wallet: {err}", pass.identifier);
            }
        }
        Ok(true)
    }
}

impl WalletSession {
    /// Resolves the payload, runs the pre-presentation checks and hands the pass to the
    /// platform. Registration happens before submission so a fast callback cannot miss it.
    async fn submit(
        &self,
        source: PassSource,
        key: Option<PassKey>,
    ) -> Result<PendingHandle, WalletPassError> {
        let provider = self.platform.provider();
        let capabilities = provider.capabilities();

        if matches!(source, PassSource::File { .. }) && !capabilities.add_from_file {
            return Err(provider.unsupported());
        }
        // held until the operation is registered; dropping it releases the slot
        let reservation = self.pending.reserve()?;

        if self.config.duplicate_check == DuplicateCheck::BeforeFetch
            && capabilities.pass_library
        {
            if let Some(key) = &key {
                if self.find_pass(key)?.is_some() {
                    info!("Pass {} is already in the wallet", key.identifier);
                    return Err(WalletPassError::PassAlreadyExists);
                }
            }
        }

        let payload = self.resolve_payload(source).await?;

        if self.config.duplicate_check != DuplicateCheck::Disabled
            && capabilities.duplicate_precheck
            && self.platform.contains_payload(payload.clone())?
        {
            info!("Submitted pass is already in the wallet");
            return Err(WalletPassError::PassAlreadyExists);
        }

        if !self.platform.has_presentation_context() {
            return Err(provider.missing_context_error());
        }

        // the payload is only retained when success has to be read back from the wallet
        let retained = capabilities.duplicate_precheck.then(|| payload.clone());
        let handle = reservation.begin(retained)?;
        if let Err(err) = self
            .platform
            .submit_pass(payload, handle.correlation_token)
        {
            warn!(
                "Wallet rejected operation {}: {err}",
                handle.correlation_token
            );
            self.pending.fail(handle.correlation_token, err.into());
        }
        Ok(handle)
    }

    async fn resolve_payload(&self, source: PassSource) -> Result<Vec<u8>, WalletPassError> {
        let payload = match source {
            PassSource::Data { bytes } => bytes,
            PassSource::Jwt { token } => token.into_bytes(),
            PassSource::Url { url, headers } => self.fetcher.fetch(&url, &headers).await?,
            PassSource::File { path } => read_pass_file(&path)?,
        };
        if payload.is_empty() {
            return Err(WalletPassError::invalid_data("Pass payload is empty"));
        }
        Ok(payload)
    }

    fn find_pass(&self, key: &PassKey) -> Result<Option<StoredPass>, WalletPassError> {
        let provider = self.platform.provider();
        if !provider.capabilities().pass_library {
            return Err(provider.unsupported());
        }
        let passes = self.platform.enumerate_passes()?;
        Ok(key.find_in(passes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::{ErrorCode, PlatformError},
        platform::{MemoryWallet, WalletProvider},
    };
    use tokio_test::{assert_pending, task};

    fn session(provider: WalletProvider) -> (Arc<MemoryWallet>, WalletSession) {
        let wallet = Arc::new(MemoryWallet::new(provider));
        let session = WalletSession::new(wallet.clone());
        (wallet, session)
    }

    fn stored(identifier: &str, serial: &str, url: Option<&str>) -> StoredPass {
        StoredPass {
            identifier: identifier.to_string(),
            serial_number: serial.to_string(),
            pass_url: url.map(ToString::to_string),
        }
    }

    #[test]
    fn test_can_add_passes() {
        let (wallet, session) = session(WalletProvider::GoogleWallet);
        assert!(session.can_add_passes().unwrap());

        wallet.set_availability(Ok(false));
        assert!(!session.can_add_passes().unwrap());

        wallet.set_availability(Err(PlatformError::General {
            message: "Play services missing".to_string(),
        }));
        let err = session.can_add_passes().unwrap_err();
        assert_eq!(err.code(), ErrorCode::Error);
        assert!(err.to_string().ends_with("Play services missing"));
        assert_eq!(wallet.calls().availability, 3);
    }

    #[test]
    fn test_pass_library_is_unsupported_on_google_wallet() {
        let (wallet, session) = session(WalletProvider::GoogleWallet);
        for result in [
            session.has_pass("pass.a".to_string(), None),
            session.remove_pass("pass.a".to_string(), None),
            session.view_in_wallet("pass.a".to_string(), None),
        ] {
            assert_eq!(result.unwrap_err().code(), ErrorCode::UnsupportedPlatform);
        }
        assert_eq!(wallet.calls().enumerate, 0);
    }

    #[test]
    fn test_remove_then_has_pass_agree() {
        let (wallet, session) = session(WalletProvider::AppleWallet);
        wallet.insert_pass(stored("pass.a", "1", None), None);
        wallet.insert_pass(stored("pass.a", "2", None), None);

        assert!(session.has_pass("pass.a".to_string(), Some("2".to_string())).unwrap());
        assert!(session.remove_pass("pass.a".to_string(), Some("2".to_string())).unwrap());
        assert!(!session.has_pass("pass.a".to_string(), Some("2".to_string())).unwrap());
        assert!(!session.remove_pass("pass.a".to_string(), Some("2".to_string())).unwrap());
        assert!(session.has_pass("pass.a".to_string(), None).unwrap());
    }

    #[test]
    fn test_view_in_wallet() {
        let (wallet, session) = session(WalletProvider::AppleWallet);
        wallet.insert_pass(stored("pass.a", "1", Some("shoebox://card/1")), None);
        wallet.insert_pass(stored("pass.b", "1", None), None);

        assert!(!session.view_in_wallet("pass.c".to_string(), None).unwrap());
        assert!(wallet.opened_urls().is_empty());

        assert!(session.view_in_wallet("pass.b".to_string(), None).unwrap());
        assert!(wallet.opened_urls().is_empty());

        assert!(session.view_in_wallet("pass.a".to_string(), None).unwrap());
        assert_eq!(wallet.opened_urls(), vec!["shoebox://card/1".to_string()]);
    }

    #[tokio::test]
    async fn test_file_source_is_unsupported_on_google_wallet() {
        let (wallet, session) = session(WalletProvider::GoogleWallet);
        let outcome = session
            .show_add_pass_controller_from_file("/tmp/ticket.pkpass".to_string())
            .await;
        assert_eq!(outcome.error_code, Some(ErrorCode::UnsupportedPlatform));
        assert!(!session.is_add_pending());
        assert_eq!(wallet.calls().submit, 0);
    }

    #[tokio::test]
    async fn test_missing_presentation_context() {
        let (wallet, session) = session(WalletProvider::GoogleWallet);
        wallet.set_presentation_context(false);
        let outcome = session.add_pass_jwt("eyJhbGciOi".to_string()).await;
        assert_eq!(outcome.error_code, Some(ErrorCode::NoActivity));
        assert!(!session.is_add_pending());
        assert_eq!(wallet.calls().submit, 0);
    }

    #[tokio::test]
    async fn test_synchronous_api_error_clears_slot() {
        let (wallet, session) = session(WalletProvider::GoogleWallet);
        wallet.fail_submissions_with(Some(PlatformError::Api {
            status_code: 10,
            message: "DEVELOPER_ERROR".to_string(),
        }));
        let outcome = session.add_pass_jwt("jwt".to_string()).await;
        assert_eq!(outcome.error_code, Some(ErrorCode::ApiError));
        assert!(!session.is_add_pending());

        wallet.fail_submissions_with(Some(PlatformError::General {
            message: "activity finishing".to_string(),
        }));
        let outcome = session.add_pass_jwt("jwt".to_string()).await;
        assert_eq!(outcome.error_code, Some(ErrorCode::GeneralError));
        assert!(!session.is_add_pending());
    }

    #[tokio::test]
    async fn test_empty_payload_is_rejected() {
        let (wallet, session) = session(WalletProvider::AppleWallet);
        let outcome = session
            .add_pass(PassSource::Data { bytes: Vec::new() }, None)
            .await;
        assert_eq!(outcome.error_code, Some(ErrorCode::InvalidData));
        assert_eq!(wallet.calls().contains, 0);
    }

    #[tokio::test]
    async fn test_duplicate_payload_is_reported() {
        let (wallet, session) = session(WalletProvider::AppleWallet);
        wallet.store_payload(b"pkpass".to_vec());
        let outcome = session
            .add_pass(PassSource::Data { bytes: b"pkpass".to_vec() }, None)
            .await;
        assert_eq!(outcome.error_code, Some(ErrorCode::PassAlreadyExists));
        assert_eq!(wallet.calls().submit, 0);
    }

    #[tokio::test]
    async fn test_unparseable_pass() {
        let (wallet, session) = session(WalletProvider::AppleWallet);
        wallet.fail_contains_with(Some(PlatformError::InvalidPass {
            message: "not a zip archive".to_string(),
        }));
        let outcome = session
            .add_pass(PassSource::Data { bytes: b"junk".to_vec() }, None)
            .await;
        assert_eq!(outcome.error_code, Some(ErrorCode::InvalidPass));
    }

    #[tokio::test]
    async fn test_duplicate_check_disabled() {
        let wallet = Arc::new(MemoryWallet::new(WalletProvider::AppleWallet));
        wallet.fail_submissions_with(Some(PlatformError::Controller {
            message: "nil controller".to_string(),
        }));
        let session = WalletSession::with_json_config(
            wallet.clone(),
            r#"{"duplicate_check": "disabled"}"#,
        )
        .unwrap();
        let outcome = session
            .add_pass(PassSource::Data { bytes: b"pkpass".to_vec() }, None)
            .await;
        assert_eq!(outcome.error_code, Some(ErrorCode::ControllerError));
        assert_eq!(wallet.calls().contains, 0);
    }

    #[tokio::test]
    async fn test_second_add_is_rejected_while_first_downloads() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/passes/1")
            .with_status(200)
            .with_body("pkpass")
            .expect_at_most(1)
            .create_async()
            .await;
        let (wallet, session) = session(WalletProvider::GoogleWallet);
        let url = format!("{}/passes/1", server.url());

        let mut first = task::spawn(session.add_pass_from_url(url.clone(), None));
        assert_pending!(first.poll());
        assert!(!session.is_add_pending());

        let second = session.add_pass_from_url(url, None).await;
        assert_eq!(second.error_code, Some(ErrorCode::OperationInProgress));

        // abandoning the first request mid-download frees the session
        drop(first);
        wallet.fail_submissions_with(Some(PlatformError::General {
            message: "activity finishing".to_string(),
        }));
        let third = session.add_pass_jwt("jwt".to_string()).await;
        assert_eq!(third.error_code, Some(ErrorCode::GeneralError));
        assert_eq!(wallet.calls().submit, 1);
        mock.assert_async().await;
    }

    #[test]
    fn test_deliver_without_pending_operation() {
        let (_wallet, session) = session(WalletProvider::GoogleWallet);
        assert!(!session.deliver_result(1, PlatformResult::Ok));
    }
}
