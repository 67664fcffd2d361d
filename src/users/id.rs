use base64ct::{Base64UrlUnpadded, Encoding};
use uuid::Uuid;

/// A user id that does not decode back to a database id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed user id {0:?}")]
pub struct InvalidUserId(pub String);

/// External form of a database id: unpadded url-safe base64 of the raw bytes.
pub fn encode_user_id(db_id: Uuid) -> String {
    Base64UrlUnpadded::encode_string(db_id.as_bytes())
}

/// Inverse of [`encode_user_id`]. Only the store calls this; nothing else
/// ever sees a database id.
pub fn decode_user_id(user_id: &str) -> Result<Uuid, InvalidUserId> {
    let bytes = Base64UrlUnpadded::decode_vec(user_id)
        .map_err(|_| InvalidUserId(user_id.to_string()))?;
    let bytes: [u8; 16] = bytes
        .try_into()
        .map_err(|_| InvalidUserId(user_id.to_string()))?;
    Ok(Uuid::from_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_from_db_id() {
        for _ in 0..20 {
            let db_id = Uuid::new_v4();
            assert_eq!(decode_user_id(&encode_user_id(db_id)), Ok(db_id));
        }
    }

    #[test]
    fn roundtrip_from_user_id() {
        let user_id = encode_user_id(Uuid::new_v4());
        let db_id = decode_user_id(&user_id).expect("valid user id");
        assert_eq!(encode_user_id(db_id), user_id);
    }

    #[test]
    fn user_id_has_no_padding_or_unsafe_characters() {
        let user_id = encode_user_id(Uuid::new_v4());
        assert!(!user_id.contains('='));
        assert!(!user_id.contains('+'));
        assert!(!user_id.contains('/'));
    }

    #[test]
    fn rejects_garbage() {
        for bad in ["", "not base64!!", "AAAA", "zz zz"] {
            assert_eq!(decode_user_id(bad), Err(InvalidUserId(bad.to_string())));
        }
    }

    #[test]
    fn rejects_wrong_length_payload() {
        // valid base64, but not 16 bytes underneath
        let short = Base64UrlUnpadded::encode_string(&[1u8, 2, 3]);
        assert!(decode_user_id(&short).is_err());
    }
}
