pub mod estimators;
pub mod orchestrator;
pub mod request;
