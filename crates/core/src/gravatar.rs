// SPDX-License-Identifier: MIT

//! Gravatar URL derivation for the embed author icon.

/// Build a gravatar avatar URL from an email address.
///
/// The address is normalized (trimmed, lowercased) before hashing, per the
/// gravatar contract.
pub fn gravatar_url(email: &str) -> String {
    let digest = md5::compute(email.trim().to_lowercase().as_bytes());
    format!("https://www.gravatar.com/avatar/{digest:x}?s=128")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_normalized_address() {
        assert_eq!(
            gravatar_url("test@example.com"),
            "https://www.gravatar.com/avatar/55502f40dc8b7c769880b10874abc9d0?s=128"
        );
    }

    #[test]
    fn trims_and_lowercases() {
        assert_eq!(gravatar_url("  Test@Example.COM \n"), gravatar_url("test@example.com"));
    }
}
