// Backend gateway: the remote analysis service as seen by the client

pub mod provider;
pub mod http;

#[cfg(test)]
pub(crate) mod testing;

pub use provider::*;
pub use http::HttpGateway;
pub use crate::types::{GatewayError, GatewayResult};
