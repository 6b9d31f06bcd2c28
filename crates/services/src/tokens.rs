use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;

/// Generates the per-meeting host secret. Compared byte-for-byte against the
/// locally stored copy; never used as an auth credential.
pub fn generate_host_token() -> String {
    let mut bytes = [0u8; 24];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// New meeting identifier. Uuids by convention, but nothing downstream may
/// assume well-formedness: ids can come from an external namespace.
pub fn generate_meeting_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
