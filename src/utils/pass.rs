//! Password-related utilities.

use lazy_static::lazy_static;
use libreauth::pass::{Algorithm, HashBuilder, Hasher};

use crate::error::ServerError;

pub(crate) const PWD_ALGORITHM: Algorithm = Algorithm::Argon2;
pub(crate) const PWD_SCHEME_VERSION: usize = 1;

// If the Hasher changes, make sure to increment PWD_SCHEME_VERSION
lazy_static! {
    pub(crate) static ref HASHER: Hasher = {
        HashBuilder::new()
            .algorithm(PWD_ALGORITHM)
            .version(PWD_SCHEME_VERSION)
            .finalize()
            .unwrap()
    };
}

/// Hash a plaintext password into PHC form.
pub(crate) fn hash(password: &str) -> Result<String, ServerError> {
    HASHER
        .hash(password)
        .map_err(|e| ServerError::HashError(format!("{:?}", e)))
}

/// Outcome of checking a password against its stored hash.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Check {
    Invalid,
    Valid,
    /// Valid, but stored under an older scheme and worth rehashing.
    ValidOutdated,
}

pub(crate) fn check(stored: &str, password: &str) -> Result<Check, ServerError> {
    let checker = HashBuilder::from_phc(stored)
        .map_err(|e| ServerError::HashError(format!("{:?}", e)))?;

    if !checker.is_valid(password) {
        return Ok(Check::Invalid);
    }
    if checker.needs_update(Some(PWD_SCHEME_VERSION)) {
        return Ok(Check::ValidOutdated);
    }
    Ok(Check::Valid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_check_against_their_password() {
        let stored = hash("secret12").unwrap();
        assert_ne!(stored, "secret12");
        assert_eq!(check(&stored, "secret12").unwrap(), Check::Valid);
        assert_eq!(check(&stored, "secret34").unwrap(), Check::Invalid);
    }
}
