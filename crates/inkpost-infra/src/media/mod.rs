//! Media host integrations.

mod hmac_signer;

pub use hmac_signer::{HmacMediaSigner, MediaConfig};
