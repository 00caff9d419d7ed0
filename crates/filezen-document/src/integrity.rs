// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Artifact integrity: SHA-256 fingerprints for produced outputs.

use filezen_core::types::{MediaKind, OutputArtifact};
use sha2::{Digest, Sha256};

/// Compute the SHA-256 hash of `data` and return it as a lowercase hex string.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    hex::encode(result)
}

/// Wrap finished bytes as an [`OutputArtifact`], fingerprinting them once.
pub fn seal(bytes: Vec<u8>, filename: impl Into<String>, media_kind: MediaKind) -> OutputArtifact {
    let sha256 = hash_bytes(&bytes);
    OutputArtifact::new(bytes, filename, media_kind, sha256)
}
