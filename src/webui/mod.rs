pub mod client;
#[cfg(test)]
pub(crate) mod fake;
pub mod traits;

pub use client::WebUiClient;
pub use traits::WebUiApi;
