//! Domain services implementing validation and composition resolution

pub mod composition_service;
pub mod validation_service;

pub use composition_service::{CompositionKind, CompositionService, Resolution};
pub use validation_service::ValidationService;
