//! Invite-code generation (spec §4.1/§9): 6 uppercase alphanumerics, avoiding
//! characters easy to confuse when read aloud or displayed in a narrow font.

use rand::RngExt;

/// Characters excluded: 0/O, 1/I/L, because they're visually ambiguous.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const CODE_LENGTH: usize = 6;

pub fn generate_invite_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| {
            let idx = rng.random_range(0..CODE_ALPHABET.len());
            CODE_ALPHABET[idx] as char
        })
        .collect()
}

/// Generates a code guaranteed unique against `exists`, retrying on collision
/// (spec §9 Open Question: collisions are actively avoided, not merely unlikely).
/// Gives up after `max_attempts` to avoid spinning forever against a saturated
/// keyspace; callers should treat `None` as "try again later".
pub fn generate_unique_invite_code(
    max_attempts: usize,
    mut exists: impl FnMut(&str) -> bool,
) -> Option<String> {
    for _ in 0..max_attempts {
        let code = generate_invite_code();
        if !exists(&code) {
            return Some(code);
        }
    }
    None
}
