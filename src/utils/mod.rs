pub(crate) mod http;

#[cfg(feature = "streaming")]
pub mod sse;
