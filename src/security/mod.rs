pub mod api_key_hashing;
pub mod webhook_signature;
