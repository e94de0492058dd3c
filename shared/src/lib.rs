pub mod config;
pub mod error;
pub mod grant;
pub mod http;
pub mod signer;
