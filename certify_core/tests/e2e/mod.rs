//! E2E Tests for CertifyKit
//!
//! End-to-end tests organized by waves.

pub mod wave_01_mining;
pub mod wave_02_pipeline;
pub mod wave_03_ingest;
