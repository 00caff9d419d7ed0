// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Standard security handler glue: permission flags, file identifiers, and
// the encryption/decryption calls into `lopdf`.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use filezen_core::error::{FileZenError, Result};
use filezen_core::types::{Credential, PermissionSet};
use lopdf::encryption::crypt_filters::{Aes256CryptFilter, CryptFilter};
use lopdf::encryption::{EncryptionState, EncryptionVersion, Permissions};
use lopdf::{Document, Object, StringFormat};
use rand::Rng;
use sha2::{Digest, Sha256};
use tracing::debug;

/// Name of the single crypt filter used for both strings and streams.
const STD_CRYPT_FILTER: &[u8] = b"StdCF";

/// Bit positions of the /P entry (ISO 32000-1, table 22), as values.
const P_PRINT: i64 = 1 << 2;
const P_MODIFY: i64 = 1 << 3;
const P_COPY: i64 = 1 << 4;
const P_ANNOTATE: i64 = 1 << 5;
const P_FILL_FORMS: i64 = 1 << 8;
const P_ACCESSIBILITY: i64 = 1 << 9;
const P_ASSEMBLE: i64 = 1 << 10;
const P_PRINT_HIGH_RES: i64 = 1 << 11;

pub(crate) fn to_lopdf_permissions(set: &PermissionSet) -> Permissions {
    let mut permissions = Permissions::empty();
    let flags = [
        (set.print, Permissions::PRINTABLE),
        (set.modify, Permissions::MODIFIABLE),
        (set.copy, Permissions::COPYABLE),
        (set.annotate, Permissions::ANNOTABLE),
        (set.fill_forms, Permissions::FILLABLE),
        (set.copy_for_accessibility, Permissions::COPYABLE_FOR_ACCESSIBILITY),
        (set.assemble, Permissions::ASSEMBLABLE),
        (set.print_high_resolution, Permissions::PRINTABLE_IN_HIGH_QUALITY),
    ];
    for (allowed, flag) in flags {
        if allowed {
            permissions.insert(flag);
        }
    }
    permissions
}

/// Decode a raw /P value into typed flags.
pub(crate) fn permissions_from_p(p: i64) -> PermissionSet {
    PermissionSet {
        print: p & P_PRINT != 0,
        print_high_resolution: p & P_PRINT_HIGH_RES != 0,
        modify: p & P_MODIFY != 0,
        copy: p & P_COPY != 0,
        copy_for_accessibility: p & P_ACCESSIBILITY != 0,
        annotate: p & P_ANNOTATE != 0,
        fill_forms: p & P_FILL_FORMS != 0,
        assemble: p & P_ASSEMBLE != 0,
    }
}

/// Read the permission flags of an encrypted document without decrypting it.
pub(crate) fn read_permissions(document: &Document) -> Option<PermissionSet> {
    let encrypt = document.trailer.get(b"Encrypt").ok()?;
    let dict = match encrypt {
        Object::Reference(id) => document.get_dictionary(*id).ok()?,
        Object::Dictionary(dict) => dict,
        _ => return None,
    };
    let p = dict.get(b"P").and_then(Object::as_i64).ok()?;
    Some(permissions_from_p(p))
}

/// The standard handler derives its key from the first file identifier, so
/// an encrypted document must carry one.
fn ensure_file_id(document: &mut Document) {
    if document.trailer.has(b"ID") {
        return;
    }

    let mut hasher = Sha256::new();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or_default();
    hasher.update(nanos.to_le_bytes());
    hasher.update((document.objects.len() as u64).to_le_bytes());
    hasher.update((document.max_id as u64).to_le_bytes());
    let digest = hasher.finalize();
    let id = digest[..16].to_vec();

    document.trailer.set(
        "ID",
        Object::Array(vec![
            Object::String(id.clone(), StringFormat::Hexadecimal),
            Object::String(id, StringFormat::Hexadecimal),
        ]),
    );
}

/// AES-256 (V5, revision 6) encryption with one password for both the user
/// and owner roles.
pub(crate) fn encrypt(
    document: &mut Document,
    credential: &Credential,
    permissions: &PermissionSet,
) -> Result<()> {
    ensure_file_id(document);

    let mut file_key = [0u8; 32];
    rand::rng().fill(&mut file_key);

    let crypt_filter: Arc<dyn CryptFilter> = Arc::new(Aes256CryptFilter);
    let version = EncryptionVersion::V5 {
        encrypt_metadata: true,
        crypt_filters: BTreeMap::from([(STD_CRYPT_FILTER.to_vec(), crypt_filter)]),
        file_encryption_key: &file_key,
        stream_filter: STD_CRYPT_FILTER.to_vec(),
        string_filter: STD_CRYPT_FILTER.to_vec(),
        owner_password: credential.expose(),
        user_password: credential.expose(),
        permissions: to_lopdf_permissions(permissions),
    };
    let state = EncryptionState::try_from(version)
        .map_err(|err| FileZenError::Content(format!("failed to derive encryption key: {err}")))?;
    document
        .encrypt(&state)
        .map_err(|err| FileZenError::Content(format!("failed to encrypt document: {err}")))?;

    debug!("standard security handler applied");
    Ok(())
}

/// Classify a failed `decrypt` call. The error text never includes the
/// password.
pub(crate) fn map_decryption_error(err: lopdf::Error) -> FileZenError {
    match err {
        lopdf::Error::Decryption(detail) => {
            FileZenError::Authentication(format!("cannot decrypt document: {detail}"))
        }
        other => FileZenError::Authentication(format!("cannot decrypt document: {other}")),
    }
}

/// Drop the /Encrypt dictionary from a decrypted document so it serialises
/// in the clear.
pub(crate) fn strip_encryption(document: &mut Document) {
    match document.trailer.remove(b"Encrypt") {
        Some(Object::Reference(id)) => {
            document.objects.remove(&id);
        }
        Some(_) => {}
        None => debug!("decrypt already dropped the /Encrypt entry"),
    }
}
