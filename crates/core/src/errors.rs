/// Result type alias for terra-stac operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for terra-stac operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Bearer token that could not be verified
    #[error("invalid credential: {message}")]
    InvalidCredential { message: String },

    /// Anonymous caller lacking the rights for an operation
    #[error("{message}")]
    Unauthorized { message: String },

    /// Authenticated caller lacking the rights for an operation
    #[error("{message}")]
    Forbidden { message: String },

    /// Referenced collection or item is absent
    #[error("{resource} '{id}' not found")]
    NotFound { resource: String, id: String },

    /// Malformed request, e.g. invalid authorization metadata
    #[error("{message}")]
    BadRequest { message: String },

    /// Resource with the same id already exists
    #[error("{resource} '{id}' already exists")]
    Conflict { resource: String, id: String },

    /// Failure of the underlying catalog store
    #[error("store operation '{operation}' failed: {message}")]
    Store { operation: String, message: String },

    /// Configuration errors
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// Network-related errors
    #[error("network error for '{endpoint}': {message}")]
    Network { endpoint: String, message: String },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::Json {
            message: error.to_string(),
            source: error,
        }
    }
}

// Helper methods for creating errors with context
impl Error {
    #[must_use]
    pub fn invalid_credential(message: impl Into<String>) -> Self {
        Error::InvalidCredential {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Error::Unauthorized {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Error::Forbidden {
            message: message.into(),
        }
    }

    /// Create a not found error for a collection
    #[must_use]
    pub fn collection_not_found(id: impl Into<String>) -> Self {
        Error::NotFound {
            resource: "collection".to_string(),
            id: id.into(),
        }
    }

    /// Create a not found error for an item, qualified by its collection
    #[must_use]
    pub fn item_not_found(collection_id: &str, item_id: &str) -> Self {
        Error::NotFound {
            resource: "item".to_string(),
            id: format!("{collection_id}/{item_id}"),
        }
    }

    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Error::BadRequest {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn conflict(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Error::Conflict {
            resource: resource.into(),
            id: id.into(),
        }
    }

    #[must_use]
    pub fn store(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Store {
            operation: operation.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn network(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Network {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Stable machine-readable name of the error kind, used in response bodies
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidCredential { .. } => "InvalidCredential",
            Error::Unauthorized { .. } => "UnauthorizedError",
            Error::Forbidden { .. } => "ForbiddenError",
            Error::NotFound { .. } => "NotFoundError",
            Error::BadRequest { .. } => "BadRequestError",
            Error::Conflict { .. } => "ConflictError",
            Error::Store { .. } => "StoreError",
            Error::Configuration { .. } => "ConfigurationError",
            Error::Network { .. } => "NetworkError",
            Error::Json { .. } => "RequestValidationError",
        }
    }

    /// Whether a 401 response for this error must carry a bearer challenge
    pub fn requires_challenge(&self) -> bool {
        matches!(
            self,
            Error::InvalidCredential { .. } | Error::Unauthorized { .. }
        )
    }
}
