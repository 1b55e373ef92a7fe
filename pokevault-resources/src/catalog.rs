//! Resource catalog for the collection's resource families.
//!
//! The catalog provides static access to every family's descriptor and
//! feature set, and builds operation sets for them.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use pokevault_fetch::RequestClient;

use crate::descriptor::{Capability, ResourceDescriptor, ResourceFeatures};
use crate::mapping::CanonicalId;
use crate::operations::ResourceOperations;

// ============================================================================
// Resource Kind
// ============================================================================

/// The resource families of a Pokevault collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Ungraded singles.
    RawCards,
    /// Slabbed cards (PSA, BGS, CGC, ...).
    GradedCards,
    /// Booster boxes, ETBs, and other sealed product.
    SealedProducts,
    /// Auction listings.
    Auctions,
    /// Completed sales.
    Sales,
}

impl ResourceKind {
    /// Returns a stable short name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RawCards => "raw-cards",
            Self::GradedCards => "graded-cards",
            Self::SealedProducts => "sealed-products",
            Self::Auctions => "auctions",
            Self::Sales => "sales",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Catalog Entry
// ============================================================================

/// Static configuration of one resource family.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    /// Family identifier.
    pub kind: ResourceKind,
    /// Endpoint and label.
    pub descriptor: ResourceDescriptor,
    /// Optional operations.
    pub features: ResourceFeatures,
    /// Identifier normalization for responses, if the backend needs one.
    pub canonical_id: Option<CanonicalId>,
}

impl CatalogEntry {
    /// Builds the operation set for this family.
    pub fn operations(&self, client: &RequestClient) -> ResourceOperations {
        let builder = ResourceOperations::builder(client, self.descriptor.clone())
            .features(self.features);
        match &self.canonical_id {
            Some(mapping) => builder.mapping(Arc::new(mapping.clone())).build(),
            None => builder.build(),
        }
    }
}

// ============================================================================
// Static Catalog
// ============================================================================

static ENTRIES: OnceLock<Vec<CatalogEntry>> = OnceLock::new();

static ENDPOINT_MAP: OnceLock<HashMap<String, ResourceKind>> = OnceLock::new();

fn init_entries() -> Vec<CatalogEntry> {
    vec![
        CatalogEntry {
            kind: ResourceKind::RawCards,
            descriptor: ResourceDescriptor::new("/cards", "card"),
            features: ResourceFeatures::all(),
            canonical_id: None,
        },
        CatalogEntry {
            kind: ResourceKind::GradedCards,
            descriptor: ResourceDescriptor::new("/graded-cards", "graded card"),
            features: ResourceFeatures::none().with_mark_sold().with_export(),
            canonical_id: Some(CanonicalId::new("_id").nested(["card"])),
        },
        CatalogEntry {
            kind: ResourceKind::SealedProducts,
            descriptor: ResourceDescriptor::new("/sealed-products", "sealed product"),
            features: ResourceFeatures::none().with_mark_sold().with_export(),
            canonical_id: Some(CanonicalId::new("_id")),
        },
        CatalogEntry {
            kind: ResourceKind::Auctions,
            descriptor: ResourceDescriptor::new("/auctions", "auction"),
            features: ResourceFeatures::none().with_batch_operations(),
            canonical_id: Some(CanonicalId::new("_id").nested(["items"])),
        },
        CatalogEntry {
            kind: ResourceKind::Sales,
            descriptor: ResourceDescriptor::new("/sales", "sale"),
            features: ResourceFeatures::none().with_export(),
            canonical_id: Some(CanonicalId::new("_id").nested(["item"])),
        },
    ]
}

/// Static catalog of resource families.
///
/// Initialized lazily on first access.
pub struct ResourceCatalog;

impl ResourceCatalog {
    /// Returns all entries.
    pub fn all() -> &'static [CatalogEntry] {
        ENTRIES.get_or_init(init_entries)
    }

    /// Gets an entry by kind.
    pub fn get(kind: ResourceKind) -> Option<&'static CatalogEntry> {
        Self::all().iter().find(|e| e.kind == kind)
    }

    /// Looks up an entry by endpoint path (trailing `/` ignored).
    pub fn by_endpoint(endpoint: &str) -> Option<&'static CatalogEntry> {
        let map = ENDPOINT_MAP.get_or_init(|| {
            Self::all()
                .iter()
                .map(|e| (e.descriptor.endpoint().to_string(), e.kind))
                .collect()
        });
        let kind = map.get(endpoint.trim_end_matches('/'))?;
        Self::get(*kind)
    }

    /// Returns entries offering `capability`.
    pub fn with_capability(capability: Capability) -> Vec<&'static CatalogEntry> {
        Self::all()
            .iter()
            .filter(|e| e.features.has(capability))
            .collect()
    }

    /// Returns all kinds.
    pub fn kinds() -> Vec<ResourceKind> {
        Self::all().iter().map(|e| e.kind).collect()
    }

    /// Returns the number of families.
    pub fn count() -> usize {
        Self::all().len()
    }

    /// Builds the operation set for `kind`.
    pub fn operations(client: &RequestClient, kind: ResourceKind) -> Option<ResourceOperations> {
        Self::get(kind).map(|entry| entry.operations(client))
    }
}

// ============================================================================
// Tests
// ============================================================================
