//! Shared fixtures for cache and discovery integration tests.

#![allow(dead_code)]

use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs;
use std::io::{self, Cursor, Read, Write};
use std::path::Path;
use tar::{Builder, Header};

/// Artifacts of a complete bundle for every engine.
pub const ENGINE_ARTIFACTS: &[&str] = &[
    "k8s_policy.wasm",
    "k8s_data.json",
    "tf_policy.wasm",
    "tf_data.json",
    "cloudformation_policy.wasm",
    "cloudformation_data.json",
    "arm_policy.wasm",
    "arm_data.json",
];

/// Build an uncompressed tar archive holding `files`.
pub fn tar_archive(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = Builder::new(Vec::new());
    for (path, contents) in files {
        let mut header = Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(0);
        header.set_cksum();
        builder.append_data(&mut header, path, *contents).unwrap();
    }
    builder.into_inner().unwrap()
}

/// A gzip-compressed bundle with every engine artifact.
pub fn full_bundle_tar_gz() -> Vec<u8> {
    let files: Vec<(&str, &[u8])> = ENGINE_ARTIFACTS
        .iter()
        .map(|name| {
            let contents: &[u8] = if name.ends_with(".wasm") { b"\0asm\x01\0\0\0" } else { b"{}" };
            (*name, contents)
        })
        .collect();
    gzip(&tar_archive(&files))
}

pub fn gzip(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).unwrap();
    encoder.finish().unwrap()
}

/// A reader that serves `limit` bytes of `data` and then fails, like a
/// download whose connection drops mid-transfer.
pub struct InterruptedDownload {
    data: Cursor<Vec<u8>>,
    limit: u64,
}

impl InterruptedDownload {
    pub fn new(data: Vec<u8>, limit: u64) -> Self {
        Self {
            data: Cursor::new(data),
            limit,
        }
    }
}

impl Read for InterruptedDownload {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.limit.saturating_sub(self.data.position());
        if remaining == 0 {
            return Err(io::Error::new(io::ErrorKind::ConnectionAborted, "download interrupted"));
        }
        let max = buf.len().min(remaining as usize);
        self.data.read(&mut buf[..max])
    }
}

/// Lay out a small IaC project:
///
/// ```text
/// root/
///   main.tf
///   README.md
///   empty/
///   k8s/
///     deployment.yaml
///     service.yml
///     charts/
///       values.json
/// ```
pub fn create_project(root: &Path) {
    fs::create_dir_all(root.join("empty")).unwrap();
    fs::create_dir_all(root.join("k8s").join("charts")).unwrap();
    fs::write(root.join("main.tf"), "resource \"aws_s3_bucket\" \"b\" {}\n").unwrap();
    fs::write(root.join("README.md"), "# infra\n").unwrap();
    fs::write(root.join("k8s").join("deployment.yaml"), "kind: Deployment\n").unwrap();
    fs::write(root.join("k8s").join("service.yml"), "kind: Service\n").unwrap();
    fs::write(root.join("k8s").join("charts").join("values.json"), "{}\n").unwrap();
}
