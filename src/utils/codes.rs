use rand::Rng;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Random uppercase alphanumeric token.
pub fn random_token<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Codes and numbers typed by users: letters, digits, `-` and `_`.
pub fn is_valid_code(code: &str) -> bool {
    !code.is_empty()
        && code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_uppercase_alphanumeric() {
        let mut rng = rand::thread_rng();
        for _ in 0..100 {
            let token = random_token(&mut rng, 8);
            assert_eq!(token.len(), 8);
            assert!(token
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }

    #[test]
    fn code_validation() {
        assert!(is_valid_code("WH-01"));
        assert!(!is_valid_code(""));
        assert!(!is_valid_code("WH 01"));
        assert!(!is_valid_code("WH/01"));
    }
}
