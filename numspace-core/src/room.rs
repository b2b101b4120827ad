//! Room codes as users see and type them.
//!
//! Codes are short upper-case base-36 strings. Normalization happens on the
//! client; the relay stores whatever id it is handed.

use uuid::Uuid;

use crate::StoreError;

/// Length of a generated room code.
pub const ROOM_CODE_LEN: usize = 6;

const ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Generate a fresh room code, e.g. `"K3Z9QA"`.
pub fn generate_room_code() -> String {
    let mut bits = Uuid::new_v4().as_u128();
    let mut code = String::with_capacity(ROOM_CODE_LEN);
    for _ in 0..ROOM_CODE_LEN {
        code.push(ALPHABET[(bits % 36) as usize] as char);
        bits /= 36;
    }
    code
}

/// Normalize user input into a room id: trimmed and upper-cased.
pub fn normalize_room_id(raw: &str) -> Result<String, StoreError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(StoreError::InvalidRoomId(raw.to_string()));
    }
    Ok(trimmed.to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_code_shape() {
        for _ in 0..100 {
            let code = generate_room_code();
            assert_eq!(code.len(), ROOM_CODE_LEN);
            assert!(code.bytes().all(|b| ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn test_normalize_trims_and_uppercases() {
        assert_eq!(normalize_room_id("  abc123 ").unwrap(), "ABC123");
        assert_eq!(normalize_room_id("ABC123").unwrap(), "ABC123");
    }

    #[test]
    fn test_normalize_rejects_blank() {
        assert!(normalize_room_id("").is_err());
        assert!(normalize_room_id("   ").is_err());
    }
}
