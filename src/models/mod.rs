pub mod cookie;
pub mod headers;
