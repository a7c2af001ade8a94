//! # Authentication
//!
//! Request builders for the login handshake and the MD5 challenge digest.
//! The builders are pure; [`ManagerClient::login`](crate::service::client::ManagerClient::login)
//! drives them through `publish`.

use crate::core::message::Message;
use md5::{Digest, Md5};

/// `Action: Challenge` requesting an MD5 challenge token.
pub fn challenge_request() -> Message {
    Message::new()
        .field("Action", "Challenge")
        .field("AuthType", "MD5")
}

/// `Action: Login` answering a challenge with the computed key.
pub fn login_request(username: &str, key: &str) -> Message {
    Message::new()
        .field("Action", "Login")
        .field("AuthType", "MD5")
        .field("Username", username)
        .field("Key", key)
}

/// `Action: Login` carrying the secret in clear text.
pub fn plain_login_request(username: &str, secret: &str) -> Message {
    Message::new()
        .field("Action", "Login")
        .field("Username", username)
        .field("Secret", secret)
}

/// `Action: Logoff`.
pub fn logoff_request() -> Message {
    Message::new().field("Action", "Logoff")
}

/// Lowercase hex MD5 of the challenge concatenated with the secret.
pub fn challenge_key(challenge: &str, secret: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(challenge.as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}
