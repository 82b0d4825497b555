//! Credential derivation (spec.md §4.E).

use crate::crypto::Crypto;
use crate::error::IceError;

/// `key = MD5("<user>:<realm>:<pass>")`, recomputed on every TURN 401/438
/// response that carries a realm.
pub fn long_term_key(crypto: &dyn Crypto, username: &str, realm: &str, password: &str) -> Result<[u8; 16], IceError> {
    let input = [username, realm, password].join(":");
    crypto.md5(input.as_bytes())
}

/// The local/remote/combined username+password block carried on a
/// [`crate::context::Context`] (spec.md §3, `Context`'s credential block).
#[derive(Debug, Clone)]
pub struct CredentialBlock {
    pub local_username: String,
    pub local_password: String,
    pub remote_username: String,
    pub remote_password: String,
}

impl CredentialBlock {
    /// `USERNAME` value used on outbound connectivity checks: the ICE
    /// convention of `"<remote-ufrag>:<local-ufrag>"`.
    pub fn combined_username(&self) -> String {
        format!("{}:{}", self.remote_username, self.local_username)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::DefaultCrypto;

    #[test]
    fn long_term_key_matches_known_vector() {
        let expected = [
            0x3eu8, 0x2f, 0x79, 0x1e, 0x1f, 0x14, 0xd1, 0x73, 0xfc, 0x91, 0xff, 0x2f, 0x59, 0xb5,
            0x0f, 0xd1,
        ];

        let key = long_term_key(&DefaultCrypto, "panda", "raspberry", "panda").unwrap();
        assert_eq!(key, expected);
    }

    #[test]
    fn combined_username_is_remote_colon_local() {
        let creds = CredentialBlock {
            local_username: "loc".into(),
            local_password: "locpw".into(),
            remote_username: "rem".into(),
            remote_password: "rempw".into(),
        };

        assert_eq!(creds.combined_username(), "rem:loc");
    }
}
