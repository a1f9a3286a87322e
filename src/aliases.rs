//! # Secure-Gate Type Aliases
//!
//! Every secret this crate handles lives in a [`secure-gate`](https://github.com/Slurp9187/secure-gate)
//! wrapper: zeroized on drop, redacted in `Debug`, and only reachable through an explicit
//! `.expose_secret()` / `.expose_secret_mut()`.
//!
//! ### Dynamic secrets
//! - [`PemKeyString`] - PEM-encoded RSA private key text
//! - [`PasswdString`] - archive passphrase forwarded to the session
//! - [`RecoveredKey`] - symmetric key unwrapped from a record envelope
//!
//! ### Fixed-size secrets
//! - [`Aes256Key32`] - 32-byte AES-256 key
//! - [`Iv16`] - 16-byte CBC initialization vector
//! - [`Block16`] - one AES block of plaintext

use secure_gate::dynamic_alias;
use secure_gate::fixed_alias;

// ─────────────────────────────────────────────────────────────────────────────
// Dynamic secrets
// ─────────────────────────────────────────────────────────────────────────────
dynamic_alias!(pub PemKeyString, String);
dynamic_alias!(pub PasswdString, String);
dynamic_alias!(pub RecoveredKey, Vec<u8>);

// ─────────────────────────────────────────────────────────────────────────────
// Fixed-size concrete secrets, alphabetical order
// ─────────────────────────────────────────────────────────────────────────────
fixed_alias!(pub Aes256Key32, 32); // vendor payload key
fixed_alias!(pub Block16, 16); // one AES block
fixed_alias!(pub Iv16, 16); // first half of the payload key
