pub mod analytics_service;
pub mod input_service;
pub mod metrics_service;
pub mod returns_service;
