//! Options of the record name field.

use serde::Serialize;

use crate::error::TesseraError;

/// Largest number of digits the platform pads autoincremented names to.
const MAX_AUTOINCREMENT_PADDING: u8 = 9;

/// How the record name is managed.
///
/// With autoincrement enabled the platform generates names such as
/// `TCK-0042` from the prefix, padding and sequence, and the client must
/// send a null name when creating records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameOptions {
    /// Names must be unique across records.
    pub unique: bool,
    /// The platform assigns names.
    pub autoincrement_enabled: bool,
    /// Text placed before the sequence number.
    pub autoincrement_prefix: String,
    /// Digits the sequence number is zero-padded to (0-9).
    pub autoincrement_padding: u8,
    /// Sequence number the next record receives (at least 1).
    pub autoincrement_next_sequence: u32,
}

impl Default for NameOptions {
    fn default() -> Self {
        Self {
            unique: false,
            autoincrement_enabled: false,
            autoincrement_prefix: String::new(),
            autoincrement_padding: 0,
            autoincrement_next_sequence: 1,
        }
    }
}

impl NameOptions {
    /// Plain, non-unique names chosen by the client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires names to be unique.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Lets the platform generate names from a prefix and padded sequence.
    #[must_use]
    pub fn autoincrement(mut self, prefix: impl Into<String>, padding: u8) -> Self {
        self.autoincrement_enabled = true;
        self.autoincrement_prefix = prefix.into();
        self.autoincrement_padding = padding;
        self
    }

    /// Sets the sequence number of the next generated name.
    #[must_use]
    pub fn with_next_sequence(mut self, next: u32) -> Self {
        self.autoincrement_next_sequence = next;
        self
    }

    /// Checks the padding and sequence bounds.
    pub(crate) fn check(&self) -> Result<(), TesseraError> {
        if self.autoincrement_padding > MAX_AUTOINCREMENT_PADDING {
            return Err(TesseraError::invalid_schema(format!(
                "autoincrement padding must be between 0 and {}, got {}",
                MAX_AUTOINCREMENT_PADDING, self.autoincrement_padding
            )));
        }
        if self.autoincrement_next_sequence == 0 {
            return Err(TesseraError::invalid_schema(
                "autoincrement next sequence must be at least 1",
            ));
        }
        Ok(())
    }
}
