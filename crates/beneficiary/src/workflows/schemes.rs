//! Scheme catalog seam.
//!
//! Catalog management (listing, filtering, pagination) lives outside this crate. The
//! application lifecycle only asks whether a scheme exists; `InMemorySchemeCatalog` backs the
//! service binary and the tests.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::RwLock;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemeId(pub u64);

impl fmt::Display for SchemeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A scholarship or benefit programme users can apply to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scheme {
    pub id: SchemeId,
    pub name: String,
    pub description: String,
    pub amount: f64,
    pub application_link: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: String,
    pub eligibility: Eligibility,
}

/// Published eligibility criteria. Informational only; applications are not screened here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Eligibility {
    pub gender: Option<String>,
    pub age_min: Option<u8>,
    pub age_max: Option<u8>,
    pub income_limit: Option<f64>,
    pub academic_qualification: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub documents_required: Vec<String>,
}

/// Read access to the scheme catalog.
pub trait SchemeCatalog: Send + Sync {
    fn fetch(&self, id: SchemeId) -> Result<Option<Scheme>, CatalogError>;

    fn exists(&self, id: SchemeId) -> Result<bool, CatalogError> {
        Ok(self.fetch(id)?.is_some())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("scheme catalog unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Default)]
pub struct InMemorySchemeCatalog {
    schemes: RwLock<BTreeMap<SchemeId, Scheme>>,
}

impl InMemorySchemeCatalog {
    pub fn with_schemes(schemes: impl IntoIterator<Item = Scheme>) -> Self {
        let catalog = Self::default();
        for scheme in schemes {
            catalog.register(scheme);
        }
        catalog
    }

    /// Insert or replace a scheme.
    pub fn register(&self, scheme: Scheme) {
        let mut guard = match self.schemes.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.insert(scheme.id, scheme);
    }

    pub fn len(&self) -> usize {
        match self.schemes.read() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SchemeCatalog for InMemorySchemeCatalog {
    fn fetch(&self, id: SchemeId) -> Result<Option<Scheme>, CatalogError> {
        let guard = self
            .schemes
            .read()
            .map_err(|_| CatalogError::Unavailable("catalog lock poisoned".to_string()))?;
        Ok(guard.get(&id).cloned())
    }
}
