//! System generated file names.

use std::path::Path;

use rand::RngCore;

/// Random bytes in every generated name.
pub const TOKEN_BYTES: usize = 16;

/// 16 bytes from the thread-local CSPRNG, hex encoded (32 characters).
pub fn random_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Extension of the client-declared name, kept for staged files only.
///
/// Anything other than 1-10 ASCII alphanumerics is dropped so the staged
/// name can never carry separators or traversal sequences.
pub fn client_extension(original_name: &str) -> Option<String> {
    let ext = Path::new(original_name).extension()?.to_str()?;
    let valid = (1..=10).contains(&ext.len()) && ext.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then(|| format!(".{}", ext.to_ascii_lowercase()))
}
