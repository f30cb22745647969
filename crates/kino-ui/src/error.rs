//! Error types for Kino UI

use thiserror::Error;

/// Result type alias for UI operations
pub type Result<T> = std::result::Result<T, Error>;

/// UI error types
#[derive(Error, Debug)]
pub enum Error {
    // Variant list errors
    #[error("Too many UI variants without a condition: only one default variant is allowed")]
    MultipleDefaultVariants,

    #[error("UI variant {index} has no condition and must be the last variant in the list")]
    DefaultVariantNotLast { index: usize },

    #[error("UI variant is not managed by this UI manager: {layout}")]
    UnknownVariant { layout: String },

    // Component tree errors
    #[error("Circular reference in UI tree: component {component} appears more than once")]
    DuplicateComponent { component: String },

    // Lifecycle errors
    #[error("UI instance is already configured")]
    AlreadyConfigured,

    #[error("UI instance has been released")]
    InstanceReleased,

    #[error("UI manager has been released")]
    Released,

    // Relay errors
    #[error("Unknown player member: {name}")]
    UnknownMember { name: String },

    #[error("Player member is read-only: {name}")]
    ReadOnlyMember { name: String },

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::InvalidConfig(msg.into())
    }

    /// Returns true if this error stems from how the UI was put together
    /// rather than from runtime use
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Error::MultipleDefaultVariants
                | Error::DefaultVariantNotLast { .. }
                | Error::DuplicateComponent { .. }
                | Error::InvalidConfig(_)
                | Error::Json(_)
        )
    }

    /// Returns the error code for diagnostics
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::MultipleDefaultVariants => "MULTIPLE_DEFAULT_VARIANTS",
            Error::DefaultVariantNotLast { .. } => "DEFAULT_VARIANT_NOT_LAST",
            Error::UnknownVariant { .. } => "UNKNOWN_VARIANT",
            Error::DuplicateComponent { .. } => "DUPLICATE_COMPONENT",
            Error::AlreadyConfigured => "ALREADY_CONFIGURED",
            Error::InstanceReleased => "INSTANCE_RELEASED",
            Error::Released => "RELEASED",
            Error::UnknownMember { .. } => "UNKNOWN_MEMBER",
            Error::ReadOnlyMember { .. } => "READ_ONLY_MEMBER",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Json(_) => "JSON",
        }
    }
}
