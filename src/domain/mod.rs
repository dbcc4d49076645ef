//! Domain layer: entities, repository contracts and click write-back.
//!
//! - [`entities`] - Core business data structures
//! - [`repositories`] - Data access trait definitions
//! - [`flush_job`] - Click write-back job model and queue
//! - [`flush_worker`] - Background worker draining the queue
//!
//! # Click Write-back Flow
//!
//! 1. A resolution records its click (in the cache delta when a cache is present)
//! 2. A [`flush_job::FlushJob`] is put on the [`flush_job::FlushQueue`] without waiting
//! 3. [`flush_worker::run_flush_worker`] hands each job to a [`flush_worker::FlushHandler`]
//! 4. The handler moves the pending count into the store under its own deadline

pub mod entities;
pub mod flush_job;
pub mod flush_worker;
pub mod repositories;
