use argon2::{Algorithm, Argon2, Params, Version};

use crate::error::{AuthError, AuthResult};

const SALT_SIZE: usize = 16;
const HASH_SIZE: usize = 32;

// Argon2id, 4 MiB, one pass. Light enough for an emulator that signs up
// many throwaway accounts.
const MEMORY_COST_KIB: u32 = 4 * 1024;
const TIME_COST: u32 = 1;
const PARALLELISM: u32 = 1;

/// Argon2id digest of a password under a random salt.
#[derive(Clone)]
pub struct PasswordDigest {
    salt: [u8; SALT_SIZE],
    hash: [u8; HASH_SIZE],
}

impl PasswordDigest {
    /// Digest `password` under a fresh random salt.
    pub fn new(password: &str) -> AuthResult<Self> {
        let salt = rand::random::<[u8; SALT_SIZE]>();
        let hash = derive(&salt, password)?;
        Ok(Self { salt, hash })
    }

    /// Constant-time comparison against a candidate password.
    pub fn verify(&self, password: &str) -> bool {
        match derive(&self.salt, password) {
            Ok(candidate) => candidate
                .iter()
                .zip(self.hash.iter())
                .fold(0u8, |acc, (a, b)| acc | (a ^ b))
                == 0,
            Err(_) => false,
        }
    }
}

fn derive(salt: &[u8; SALT_SIZE], password: &str) -> AuthResult<[u8; HASH_SIZE]> {
    let params = Params::new(MEMORY_COST_KIB, TIME_COST, PARALLELISM, Some(HASH_SIZE))
        .map_err(|e| AuthError::PasswordHash(e.to_string()))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut hash = [0u8; HASH_SIZE];
    argon2
        .hash_password_into(password.as_bytes(), salt, &mut hash)
        .map_err(|e| AuthError::PasswordHash(e.to_string()))?;
    Ok(hash)
}

impl std::fmt::Debug for PasswordDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PasswordDigest(<redacted>)")
    }
}
