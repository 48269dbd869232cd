pub mod client_builder;
pub mod masking;

pub use client_builder::build_http_client;
pub use masking::{mask_code, mask_url_credentials};
