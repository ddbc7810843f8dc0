pub mod blockchain;
pub mod cli;
pub mod observe;
pub mod signed_api;
pub mod time;
