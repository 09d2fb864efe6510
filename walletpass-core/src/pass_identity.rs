//! Matching stored passes against a caller supplied `(identifier, serial)` key.

use crate::platform::StoredPass;

/// Identifies a pass in the wallet.
///
/// `identifier` is the pass type identifier and must match exactly. When `serial_number` is
/// `None` any pass of that type matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, uniffi::Record)]
pub struct PassKey {
    /// The pass type identifier.
    pub identifier: String,
    /// The serial number, if the caller wants one specific pass.
    pub serial_number: Option<String>,
}

impl PassKey {
    /// Creates a key.
    #[must_use]
    pub fn new(identifier: impl Into<String>, serial_number: Option<String>) -> Self {
        Self {
            identifier: identifier.into(),
            serial_number,
        }
    }

    /// Whether `pass` satisfies this key.
    #[must_use]
    pub fn matches(&self, pass: &StoredPass) -> bool {
        if pass.identifier != self.identifier {
            return false;
        }
        self.serial_number
            .as_ref()
            .is_none_or(|serial| *serial == pass.serial_number)
    }

    /// Returns the first pass satisfying this key.
    ///
    /// Platforms do not guarantee a stable enumeration order, so with a partial key the chosen
    /// pass may differ between calls.
    #[must_use]
    pub fn find_in(&self, passes: Vec<StoredPass>) -> Option<StoredPass> {
        passes.into_iter().find(|pass| self.matches(pass))
    }
}
