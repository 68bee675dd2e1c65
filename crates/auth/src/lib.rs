//! plauderei-auth – Anmeldedaten pruefen und hashen
//!
//! Dieses Crate implementiert:
//! - Syntaxpruefung fuer Login, Nickname und Passwort
//! - Passwort-Hashing mit Argon2id und festem Salt

pub mod error;
pub mod password;
pub mod validation;

// Bequeme Re-Exporte
pub use error::{AuthError, AuthResult};
pub use password::PasswortHasher;
pub use validation::{kennung_pruefen, passwort_pruefen};
