pub mod config;
pub mod domain;
pub mod error;
pub mod normalize;
pub mod output;
pub mod registry;
pub mod resolver;
pub mod session;
