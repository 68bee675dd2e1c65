//! Passwort-Hashing mit Argon2id
//!
//! Alle Passwoerter werden mit demselben, konfigurierten Salt gehasht.
//! Der gespeicherte Wert ist der PHC-String (inkl. Algorithmus, Parameter
//! und Salt), sodass ein spaeterer Parameterwechsel alte Hashes nicht
//! ungueltig macht.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

use crate::error::{AuthError, AuthResult};

/// Standard-Salt, falls keiner konfiguriert ist
pub const STANDARD_SALT: &str = "fixed_salt_value";

/// Argon2id mit festem Salt
#[derive(Clone)]
pub struct PasswortHasher {
    argon2: Argon2<'static>,
    salt: SaltString,
}

impl PasswortHasher {
    /// Erstellt einen Hasher
    ///
    /// - `salt`: fester Salt (4 bis 48 Bytes)
    /// - `speicher_kib`: Argon2 m_cost
    /// - `iterationen`: Argon2 t_cost
    pub fn neu(salt: &str, speicher_kib: u32, iterationen: u32) -> AuthResult<Self> {
        let salt = SaltString::encode_b64(salt.as_bytes())
            .map_err(|e| AuthError::UngueltigerSalt(e.to_string()))?;
        let params = Params::new(speicher_kib, iterationen, 1, None)
            .map_err(|e| AuthError::PasswortHashing(format!("Argon2-Parameter ungueltig: {e}")))?;

        tracing::debug!(speicher_kib, iterationen, "Passwort-Hasher erstellt");
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            salt,
        })
    }

    /// Hasher mit Argon2-Standardparametern und dem Standard-Salt
    pub fn standard() -> AuthResult<Self> {
        Self::neu(
            STANDARD_SALT,
            Params::DEFAULT_M_COST,
            Params::DEFAULT_T_COST,
        )
    }

    /// Hasht ein Passwort und gibt den PHC-String zurueck
    pub fn hashen(&self, passwort: &str) -> AuthResult<String> {
        self.argon2
            .hash_password(passwort.as_bytes(), &self.salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::PasswortHashing(e.to_string()))
    }

    /// Vergleicht ein Passwort mit einem gespeicherten PHC-Hash
    pub fn pruefen(&self, passwort: &str, hash: &str) -> AuthResult<bool> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| AuthError::PasswortHashing(format!("Ungueltiges Hash-Format: {e}")))?;

        match self.argon2.verify_password(passwort.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AuthError::PasswortHashing(e.to_string())),
        }
    }
}

impl std::fmt::Debug for PasswortHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswortHasher").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Kleine Parameter damit die Tests schnell bleiben
    fn hasher() -> PasswortHasher {
        PasswortHasher::neu(STANDARD_SALT, 8, 1).expect("Hasher muss erstellt werden")
    }

    #[test]
    fn passwort_hashen_und_pruefen() {
        let h = hasher();
        let hash = h.hashen("Abcdef1!").expect("Hashing fehlgeschlagen");

        assert!(hash.starts_with("$argon2id$"), "Hash muss mit $argon2id$ beginnen");
        assert!(h.pruefen("Abcdef1!", &hash).unwrap());
    }

    #[test]
    fn falsches_passwort_wird_abgelehnt() {
        let h = hasher();
        let hash = h.hashen("Abcdef1!").unwrap();
        assert!(!h.pruefen("Abcdef1?", &hash).unwrap());
    }

    #[test]
    fn fester_salt_ergibt_gleiche_hashes() {
        let h = hasher();
        assert_eq!(h.hashen("Abcdef1!").unwrap(), h.hashen("Abcdef1!").unwrap());
    }

    #[test]
    fn anderer_salt_anderer_hash() {
        let a = hasher();
        let b = PasswortHasher::neu("anderer_salt_wert", 8, 1).unwrap();
        assert_ne!(a.hashen("Abcdef1!").unwrap(), b.hashen("Abcdef1!").unwrap());
    }

    #[test]
    fn zu_kurzer_salt_wird_abgelehnt() {
        assert!(matches!(
            PasswortHasher::neu("ab", 8, 1),
            Err(AuthError::UngueltigerSalt(_))
        ));
    }

    #[test]
    fn ungueltiges_hash_format_gibt_fehler() {
        assert!(hasher().pruefen("passwort", "kein_gueltiger_hash").is_err());
    }
}
