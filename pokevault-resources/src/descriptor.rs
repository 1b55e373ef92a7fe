//! Resource descriptor system.
//!
//! A descriptor is the declarative identity of a remote resource family:
//! - Endpoint path (e.g. `/auctions`)
//! - Label used in operation names (e.g. `auction`)
//!
//! [`ResourceFeatures`] decides which optional operations a family gets.

use std::fmt;

use pokevault_core::{Identifier, RawId, ValidationError, build_path};

// ============================================================================
// Resource Descriptor
// ============================================================================

/// Endpoint path plus label of a remote resource family.
///
/// Immutable once built; shared by every operation generated for it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceDescriptor {
    endpoint: String,
    label: String,
}

impl ResourceDescriptor {
    /// Creates a descriptor. A trailing `/` on the endpoint is dropped.
    pub fn new(endpoint: impl Into<String>, label: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            label: label.into(),
        }
    }

    /// Returns the endpoint path.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns the singular label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the label used for collection operations.
    pub fn plural(&self) -> String {
        format!("{}s", self.label)
    }

    /// Operation label for a single-item call, e.g. `"update auction"`.
    pub fn operation(&self, verb: &str) -> String {
        format!("{verb} {}", self.label)
    }

    /// Operation label for a collection call, e.g. `"fetch auctions"`.
    pub fn collection_operation(&self, verb: &str) -> String {
        format!("{verb} {}", self.plural())
    }

    /// Returns `{endpoint}/{suffix}` for a fixed, non-identifier suffix.
    pub fn path(&self, suffix: &str) -> String {
        format!("{}/{}", self.endpoint, suffix.trim_matches('/'))
    }

    /// Returns `{endpoint}/{id}` or `{endpoint}/{id}/{sub_path}`.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if `id` is not a usable identifier.
    pub fn item_path<R: RawId + ?Sized>(
        &self,
        id: &R,
        sub_path: Option<&str>,
    ) -> Result<String, ValidationError> {
        build_path(&self.endpoint, id, sub_path)
    }

    /// Returns `{endpoint}/batch/{operation}`.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if `operation` fails identifier rules.
    pub fn batch_path(&self, operation: &str) -> Result<String, ValidationError> {
        let operation = Identifier::parse(operation)?;
        Ok(format!("{}/batch/{operation}", self.endpoint))
    }
}

impl fmt::Display for ResourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label, self.endpoint)
    }
}

// ============================================================================
// Features
// ============================================================================

/// An optional operation a resource family may offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// `POST {endpoint}/{id}/mark-sold`
    MarkSold,
    /// `POST {endpoint}/export`
    Export,
    /// `POST {endpoint}/batch/{operation}`
    BatchOperations,
}

impl Capability {
    /// All capabilities, in declaration order.
    pub const ALL: [Capability; 3] = [Self::MarkSold, Self::Export, Self::BatchOperations];

    /// Returns the capability's name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MarkSold => "mark-sold",
            Self::Export => "export",
            Self::BatchOperations => "batch",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which optional operations a resource family gets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceFeatures {
    /// Enables [`Capability::MarkSold`].
    pub mark_sold: bool,
    /// Enables [`Capability::Export`].
    pub export: bool,
    /// Enables [`Capability::BatchOperations`].
    pub batch_operations: bool,
}

impl ResourceFeatures {
    /// No optional operations.
    pub fn none() -> Self {
        Self::default()
    }

    /// Every optional operation.
    pub fn all() -> Self {
        Self {
            mark_sold: true,
            export: true,
            batch_operations: true,
        }
    }

    /// Enables mark-sold.
    pub fn with_mark_sold(mut self) -> Self {
        self.mark_sold = true;
        self
    }

    /// Enables export.
    pub fn with_export(mut self) -> Self {
        self.export = true;
        self
    }

    /// Enables named batch operations.
    pub fn with_batch_operations(mut self) -> Self {
        self.batch_operations = true;
        self
    }

    /// Returns true if `capability` is enabled.
    pub fn has(&self, capability: Capability) -> bool {
        match capability {
            Capability::MarkSold => self.mark_sold,
            Capability::Export => self.export,
            Capability::BatchOperations => self.batch_operations,
        }
    }

    /// Returns the enabled capabilities.
    pub fn capabilities(&self) -> Vec<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|c| self.has(*c))
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
