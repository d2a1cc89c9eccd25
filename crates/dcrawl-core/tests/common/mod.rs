#![allow(dead_code)]

pub mod doc_server;

use std::path::Path;

use dcrawl_core::session::{AuthArtifact, Cookie};

/// Write a fresh one-cookie auth artifact at `path`.
pub fn write_artifact(path: &Path) {
    AuthArtifact::new(vec![Cookie {
        name: "sid".into(),
        value: "test".into(),
    }])
    .save(path)
    .unwrap();
}
