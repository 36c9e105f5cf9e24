use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};

const CODE_BYTES: usize = 8;

/// Length of a rendered code: 8 bytes in unpadded base64.
pub const CODE_LEN: usize = 11;

/// Draws a fresh referral code from the OS CSPRNG, rendered as unpadded
/// URL-safe base64.
pub fn generate_code() -> String {
    let mut bytes = [0u8; CODE_BYTES];
    OsRng.fill_bytes(&mut bytes);
    let code = Base64UrlUnpadded::encode_string(&bytes);
    debug_assert_eq!(code.len(), CODE_LEN);
    code
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn codes_are_eleven_url_safe_chars() {
        for _ in 0..256 {
            let code = generate_code();
            assert_eq!(code.len(), CODE_LEN);
            assert!(code
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        }
    }

    #[test]
    fn codes_do_not_repeat_in_practice() {
        let codes: HashSet<_> = (0..1000).map(|_| generate_code()).collect();
        assert_eq!(codes.len(), 1000);
    }
}
