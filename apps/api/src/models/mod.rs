pub mod principal;
pub mod session;
