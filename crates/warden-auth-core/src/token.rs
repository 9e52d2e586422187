//! Opaque token generation

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::Rng;

/// Random bytes per token (256 bits)
pub const TOKEN_BYTES: usize = 32;

/// Encoded token length: 32 bytes in unpadded base64
pub const TOKEN_LENGTH: usize = 43;

/// Generate a fresh session identifier or reset token.
///
/// Draws from the thread-local CSPRNG and encodes URL-safe base64 without
/// padding, so the value is safe in cookies and form fields. At 256 bits a
/// collision check against live tokens is unnecessary.
pub fn generate_token() -> String {
    let bytes: [u8; TOKEN_BYTES] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(bytes)
}
