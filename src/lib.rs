//! Repair malformed CAML legal documents and merge them with authoritative
//! metadata rows, producing corrected documents plus per-category error
//! reports.

pub mod config;
pub mod coordinator;
pub mod document;
pub mod ids;
pub mod inject;
pub mod metadata;
pub mod repair;
pub mod report;
pub mod xml;

pub use config::{load_config, read_config, ConfigError, RunConfig};
pub use coordinator::{partition, Coordinator, DocumentOutcome, RepairedDocument, RunSummary, WriterMessage, YearSummary};
pub use document::{DocType, DocumentIdentity, FilenameFormatError};
pub use ids::{IdGenerator, SequentialIds, UuidIds};
pub use inject::{capitalize_name, fix_serialization_artifacts, inject_metadata, FieldError, InjectError};
pub use metadata::{MatchError, MetadataIndex, MetadataRow, MetadataSource};
pub use repair::{repair_common, repair_resolution, repair_statute, RepairError};
pub use report::ErrorAggregator;
