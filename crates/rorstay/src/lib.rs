//! Core of the RoR Stay listing platform: listing search and storage, contact intake,
//! geocoding adapters, and the ambient configuration/telemetry plumbing shared by the
//! HTTP service.

pub mod config;
pub mod contact;
pub mod error;
pub mod geocoding;
pub mod listings;
pub mod telemetry;
pub mod users;
