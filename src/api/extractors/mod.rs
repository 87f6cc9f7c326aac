mod csp_nonce;

pub use csp_nonce::CspNonce;
