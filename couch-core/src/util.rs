use rand::{thread_rng, Rng};

const URL_SAFE_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

/// Returns a random token that can be embedded in a url without escaping.
pub fn random_token(length: usize) -> String {
    let mut rng = thread_rng();

    std::iter::repeat(())
        .map(|_| URL_SAFE_ALPHABET[rng.gen_range(0..URL_SAFE_ALPHABET.len())] as char)
        .take(length)
        .collect()
}
