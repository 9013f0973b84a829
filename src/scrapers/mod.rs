pub mod base;
pub mod nse;
