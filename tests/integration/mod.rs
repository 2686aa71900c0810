//! Integration test modules for patchbay

pub mod lifecycle;
pub mod mirroring;
pub mod scenarios;
pub mod toggle;
