pub mod model_handle;
pub mod model_loader;
pub mod prediction_handler;
