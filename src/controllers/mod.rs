pub mod form;
pub mod model_info;
pub mod predict;
