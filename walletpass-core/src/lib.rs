//! `walletpass-core` adds passes to Apple Wallet and Google Wallet from one API.
//!
//! The host application implements [`platform::WalletPlatform`] on top of `PassKit` or the
//! Google Pay API and drives everything else through a [`WalletSession`]:
//!
//! ```rust,ignore
//! let session = WalletSession::new(platform);
//! let outcome = session
//!     .add_pass_from_url("https://passes.example.com/ticket".into(), None)
//!     .await;
//! // meanwhile, from onActivityResult / the PKAddPassesViewController delegate:
//! session.deliver_result(token, PlatformResult::Ok);
//! ```
#![deny(clippy::all, clippy::pedantic, clippy::nursery)]

mod config;
pub use config::*;

mod error;
pub use error::*;

mod pass_identity;
pub use pass_identity::*;

mod session;
pub use session::*;

pub mod logger;
pub mod platform;

// private modules
mod http_request;
mod pending;

uniffi::setup_scaffolding!("walletpass_core");
