pub mod nonce;
pub mod security_policy;
