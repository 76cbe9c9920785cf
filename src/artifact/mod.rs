//! Local artifact provisioning
//!
//! Keeps exactly one copy of the server artifact on disk and refreshes it
//! from the latest release when possible.
//!
//! # Cache States
//!
//! | Marker | Artifact | Meaning |
//! |--------|----------|---------|
//! | absent | absent | Never provisioned; refresh must succeed |
//! | absent | present | Interrupted install; usable as stale fallback, re-downloaded next run |
//! | `vN` | present | Complete install of `vN` |
//!
//! A marker is only ever written after its artifact has been renamed into
//! place, so a present marker always describes complete bytes.

pub mod cache;
pub mod download;
pub mod provision;

pub use cache::{ArtifactCache, CacheRecord, VERSION_MARKER};
pub use download::{CancelFlag, DownloadedArtifact, Downloader, ProgressSink};
pub use provision::{ArtifactProvisioner, Freshness, Provisioned};
