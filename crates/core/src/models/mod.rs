pub mod analytics;
pub mod holding;
pub mod price;
pub mod returns;
pub mod settings;
