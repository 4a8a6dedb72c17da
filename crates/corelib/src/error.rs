//! Error types for the core library.

use std::fmt;

/// Result type alias for the core library.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the core library.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// One or more parameters failed validation
    #[error("parameter validation failed: {0}")]
    Validation(ValidationErrors),
    /// More nodes requested than the subnet has host addresses for
    #[error("address space exhausted: {requested} addresses requested, subnet holds {capacity}")]
    AddressSpaceExhausted { requested: u32, capacity: u32 },
    /// Profile settings are malformed
    #[error("invalid profile settings: {0}")]
    InvalidSettings(String),
}

/// A single parameter that was rejected during binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterError {
    /// Name of the offending parameter.
    pub name: String,
    /// Why it was rejected.
    pub reason: String,
}

impl fmt::Display for ParameterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.reason)
    }
}

/// Every parameter problem found in one binding pass.
///
/// Binding does not stop at the first bad value, so a user sees the whole list
/// at once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<ParameterError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, reason: impl Into<String>) {
        self.errors.push(ParameterError {
            name: name.into(),
            reason: reason.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParameterError> {
        self.errors.iter()
    }

    /// True if `name` is among the offending parameters.
    pub fn contains(&self, name: &str) -> bool {
        self.errors.iter().any(|e| e.name == name)
    }

    /// `Ok(())` when nothing was recorded, otherwise the collected errors.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}
