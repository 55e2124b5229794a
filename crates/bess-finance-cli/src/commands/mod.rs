pub mod estimators;
pub mod model;
pub mod sensitivity;
