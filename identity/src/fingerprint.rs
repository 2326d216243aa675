use sha2::{Digest, Sha256};

/// Salted SHA-256 digest of a password. Only good for equality checks.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordFingerprint {
    salt: u64,
    digest: [u8; 32],
}

impl PasswordFingerprint {
    pub fn new(salt: u64, password: &str) -> Self {
        Self {
            salt,
            digest: Self::digest(salt, password),
        }
    }

    pub fn matches(&self, password: &str) -> bool {
        let candidate = Self::digest(self.salt, password);
        self.digest
            .iter()
            .zip(candidate.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }

    fn digest(salt: u64, password: &str) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(salt.to_le_bytes());
        hasher.update(password.as_bytes());
        hasher.finalize().into()
    }
}

impl std::fmt::Debug for PasswordFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PasswordFingerprint(..)")
    }
}
