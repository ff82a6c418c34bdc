pub mod applications;
pub mod schemes;
