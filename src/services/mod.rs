pub mod token_service;
pub use token_service::{MODE_READ, MODE_SCAN, TokenError, TokenService};

pub mod token_service_impl;
pub use token_service_impl::SeaOrmTokenService;
