//! Catalog Store
//!
//! Publishes build generations for concurrent readers. Readers clone an
//! `Arc` to the current [`Snapshot`] and keep it as long as they like; a
//! generation is dropped once its last reader lets go. Builds run without
//! holding any lock and are published with a single pointer swap.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::build::{BuildPhase, CatalogBuilder};
use crate::catalog::Catalog;
use crate::error::{BuildResult, FormatError};
use crate::flow::FlowSchemaWarning;
use crate::loader::NamespaceDocument;

/// One published, immutable generation
#[derive(Debug)]
pub struct Snapshot {
    generation: u64,
    published_at: DateTime<Utc>,
    catalog: Catalog,
    warnings: Vec<FlowSchemaWarning>,
}

impl Snapshot {
    fn initial() -> Self {
        Self {
            generation: 0,
            published_at: Utc::now(),
            catalog: Catalog::empty(),
            warnings: Vec::new(),
        }
    }

    /// Ticket of the build that produced this snapshot; 0 before any build
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn published_at(&self) -> DateTime<Utc> {
        self.published_at
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn warnings(&self) -> &[FlowSchemaWarning] {
        &self.warnings
    }
}

/// What became of a rebuild request
#[derive(Debug)]
pub enum PublishOutcome {
    /// The build is now the current generation
    Published(Arc<Snapshot>),
    /// A newer request took over; published state is untouched
    Superseded { ticket: u64 },
}

impl PublishOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, PublishOutcome::Published(_))
    }
}

pub struct CatalogStore {
    builder: CatalogBuilder,
    current: RwLock<Arc<Snapshot>>,
    /// Highest ticket handed out to a rebuild
    latest_ticket: AtomicU64,
}

impl Default for CatalogStore {
    fn default() -> Self {
        Self::new(CatalogBuilder::default())
    }
}

impl CatalogStore {
    pub fn new(builder: CatalogBuilder) -> Self {
        Self {
            builder,
            current: RwLock::new(Arc::new(Snapshot::initial())),
            latest_ticket: AtomicU64::new(0),
        }
    }

    /// The latest published generation
    pub fn current(&self) -> Arc<Snapshot> {
        Arc::clone(&*self.current.read())
    }

    pub fn generation(&self) -> u64 {
        self.current.read().generation
    }

    /// Format against the current generation
    pub fn format(&self, path: &str, values: &HashMap<String, String>) -> Result<String, FormatError> {
        self.current().catalog.format(path, values)
    }

    /// Build `documents` and publish the result.
    ///
    /// A build that a later `rebuild` call overtakes is abandoned at its
    /// next phase boundary, or discarded at publication if a newer
    /// generation is already live. Failed builds leave the current
    /// generation in place.
    pub fn rebuild(&self, documents: &[NamespaceDocument]) -> BuildResult<PublishOutcome> {
        let ticket = self.issue_ticket();
        self.rebuild_with_ticket(ticket, documents)
    }

    fn issue_ticket(&self) -> u64 {
        self.latest_ticket.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn rebuild_with_ticket(
        &self,
        ticket: u64,
        documents: &[NamespaceDocument],
    ) -> BuildResult<PublishOutcome> {
        tracing::debug!(ticket, documents = documents.len(), "catalog rebuild requested");

        let superseded = |phase: BuildPhase| {
            let newer = self.latest_ticket.load(Ordering::SeqCst) != ticket;
            if newer {
                tracing::debug!(ticket, ?phase, "catalog build superseded");
            }
            newer
        };

        let build = match self.builder.build_until(documents, superseded) {
            Ok(Some(build)) => build,
            Ok(None) => return Ok(PublishOutcome::Superseded { ticket }),
            Err(err) => {
                tracing::warn!(ticket, errors = err.errors.len(), "catalog build failed");
                return Err(err);
            }
        };

        let snapshot = Arc::new(Snapshot {
            generation: ticket,
            published_at: Utc::now(),
            catalog: build.catalog,
            warnings: build.warnings,
        });

        let mut current = self.current.write();
        if current.generation > ticket {
            return Ok(PublishOutcome::Superseded { ticket });
        }
        *current = Arc::clone(&snapshot);
        drop(current);

        tracing::info!(
            generation = ticket,
            leaves = snapshot.catalog.len(),
            fingerprint = snapshot.catalog.fingerprint().short(),
            "published catalog generation"
        );
        Ok(PublishOutcome::Published(snapshot))
    }
}
