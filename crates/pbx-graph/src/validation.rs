//! Structural validation of the object graph
//!
//! Two independent scans, both always run to completion:
//! - dead references: a declared reference field names an identifier with
//!   no stored record
//! - orphans: a stored record no counted handle points at
//!
//! Violations are collected into one [`ValidationReport`].

use crate::id::ObjectId;
use crate::object::Isa;
use crate::store::ObjectStore;
use std::collections::HashSet;
use std::fmt::{self, Display, Formatter};

/// One reference violation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    /// A reference field names a missing record
    DeadReference {
        /// Discriminator of the referencing record
        isa: Isa,
        /// Referencing record
        id: ObjectId,
        /// Field holding the reference
        key_path: &'static str,
        /// Missing target
        target: ObjectId,
    },
    /// A stored record with no counted reference
    OrphanObject {
        /// Discriminator of the orphan
        isa: Isa,
        /// Orphaned record
        id: ObjectId,
    },
}

impl ReferenceError {
    /// Record the violation is reported on
    #[must_use]
    pub fn id(&self) -> &ObjectId {
        match self {
            Self::DeadReference { id, .. } | Self::OrphanObject { id, .. } => id,
        }
    }

    /// True for a dead reference
    #[must_use]
    pub fn is_dead_reference(&self) -> bool {
        matches!(self, Self::DeadReference { .. })
    }
}

impl Display for ReferenceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeadReference {
                isa,
                id,
                key_path,
                target,
            } => write!(f, "{isa} ({id}) references missing {key_path} {target}"),
            Self::OrphanObject { isa, id } => write!(f, "{isa} ({id}) is not used"),
        }
    }
}

/// Every reference violation found in one pass
///
/// Dead references come first, then orphans; each group is sorted by
/// record identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    errors: Vec<ReferenceError>,
}

impl ValidationReport {
    /// True if no violations were found
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of violations
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// All violations
    #[inline]
    #[must_use]
    pub fn errors(&self) -> &[ReferenceError] {
        &self.errors
    }

    /// Dead reference violations
    pub fn dead_references(&self) -> impl Iterator<Item = &ReferenceError> {
        self.errors.iter().filter(|e| e.is_dead_reference())
    }

    /// Orphan violations
    pub fn orphans(&self) -> impl Iterator<Item = &ReferenceError> {
        self.errors.iter().filter(|e| !e.is_dead_reference())
    }

    /// `Ok` when empty, the report itself otherwise
    ///
    /// # Errors
    /// The non-empty report.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl Display for ValidationReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "project.pbxproj is internally inconsistent.")?;
        writeln!(f)?;
        for error in &self.errors {
            writeln!(f, " - {error}")?;
        }
        writeln!(f)?;
        write!(f, "Perhaps a merge conflict?")
    }
}

impl std::error::Error for ValidationReport {}

/// Dead reference and orphan scanner
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceValidator;

impl ReferenceValidator {
    /// Create new validator instance
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Scan the whole store
    ///
    /// The root record is only exempt from the orphan scan if the caller
    /// retained it beforehand.
    #[must_use]
    pub fn validate(&self, store: &ObjectStore) -> ValidationReport {
        let mut dead = self.dead_references(store);
        let mut orphans = self.orphans(store);
        dead.sort_by(|a, b| a.id().cmp(b.id()));
        orphans.sort_by(|a, b| a.id().cmp(b.id()));

        dead.append(&mut orphans);
        if !dead.is_empty() {
            tracing::warn!(violations = dead.len(), "object graph is inconsistent");
        }
        ValidationReport { errors: dead }
    }

    /// Every reference field whose target is not stored
    #[must_use]
    pub fn dead_references(&self, store: &ObjectStore) -> Vec<ReferenceError> {
        store
            .records()
            .flat_map(|record| {
                record
                    .references()
                    .into_iter()
                    .filter(|edge| !store.contains(edge.target))
                    .map(|edge| ReferenceError::DeadReference {
                        isa: record.isa(),
                        id: record.id().clone(),
                        key_path: edge.key_path,
                        target: edge.target.clone(),
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Every stored record with a reference count of zero
    #[must_use]
    pub fn orphans(&self, store: &ObjectStore) -> Vec<ReferenceError> {
        let referenced: HashSet<&ObjectId> = store.referenced_ids().collect();
        store
            .records()
            .filter(|record| !referenced.contains(record.id()))
            .map(|record| ReferenceError::OrphanObject {
                isa: record.isa(),
                id: record.id().clone(),
            })
            .collect()
    }
}
