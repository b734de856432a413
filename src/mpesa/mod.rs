pub mod client;
pub mod error;
pub mod http;
pub mod types;

pub use client::{MpesaClient, MpesaGateway};
pub use error::{MpesaError, MpesaResult};
