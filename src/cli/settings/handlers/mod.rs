//! Setting handler implementations.

pub mod backend;
pub mod string;

pub use backend::BackendHandler;
pub use string::{
    api_key_handler, backend_url_handler, data_dir_handler, gemini_base_url_handler,
    gemini_model_handler,
};
