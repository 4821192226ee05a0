use rand::Rng;

use crate::db::Db;
use crate::errors::BackendError;

/// The 36-symbol alphabet invite codes are sampled from.
pub const ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub const MIN_LENGTH: usize = 6;
pub const MAX_LENGTH: usize = 8;

/// How many collisions we tolerate before giving up. Collisions over a
/// 36^6 space are vanishingly rare; hitting this limit means something
/// else is wrong.
const MAX_ATTEMPTS: usize = 16;

/// Samples a random candidate code. Uniqueness is the caller's concern.
pub fn generate_code() -> String {
    let mut rng = rand::rng();
    let length = rng.random_range(MIN_LENGTH..=MAX_LENGTH);

    (0..length)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect()
}

pub fn is_valid_code(code: &str) -> bool {
    code.len() >= MIN_LENGTH
        && code.len() <= MAX_LENGTH
        && code.bytes().all(|b| ALPHABET.contains(&b))
}

/// Generates a code that is not currently in use, regenerating on
/// collision. The storage layer additionally enforces uniqueness with a
/// constraint, so a concurrent create racing past this pre-check still
/// cannot produce duplicates.
pub async fn unique_code(db: &(dyn Db + Send + Sync)) -> Result<String, BackendError> {
    for _ in 0..MAX_ATTEMPTS {
        let code = generate_code();
        if !db.invite_code_exists(code.clone()).await? {
            return Ok(code);
        }
    }

    Err(BackendError::Conflict {
        what: "invite code".to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn generated_codes_are_well_formed() {
        for _ in 0..1000 {
            let code = generate_code();
            assert!(is_valid_code(&code), "{:?} must be valid", code);
        }
    }

    proptest! {
        #[test]
        fn validity_rejects_other_strings(code in "[a-z!@#$%^&*]{6,8}") {
            prop_assert!(!is_valid_code(&code));
        }

        #[test]
        fn validity_rejects_wrong_lengths(code in "[A-Z0-9]{1,5}|[A-Z0-9]{9,20}") {
            prop_assert!(!is_valid_code(&code));
        }
    }
}
