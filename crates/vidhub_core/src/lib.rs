/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Read-side view composition for the video platform: joins, counters and
//! viewer flags over the entity store, shaped into allowlisted payloads.

pub mod aggregate;
pub mod config;
pub mod entity_store;
pub mod error;
pub mod join_resolver;
pub mod model;
pub mod paginator;
pub mod pipeline;
pub mod projector;
pub mod sqlite_store;
pub mod store_adapter;
pub mod viewer_context;
mod views;

pub use error::{ComposeError, StoreError, ViewError, ViewResult};
pub use pipeline::{Composer, Stage};
pub use vidhub_protocol as protocol;
