use thiserror::Error;

/// Maximum length of a `string` field value.
pub const STRING_MAX_LENGTH: usize = 255;

#[derive(Debug, Error)]
pub enum TaskFieldError {
    #[error("Field '{api_name}' is required")]
    Required { api_name: String },
    #[error("Field '{api_name}' expects a string value")]
    NotString { api_name: String },
    #[error("Field '{api_name}' is longer than {STRING_MAX_LENGTH} characters")]
    StringTooLong { api_name: String },
    #[error("Field '{api_name}' must be a single line")]
    LineBreak { api_name: String },
    #[error("Field '{api_name}' has no such selection")]
    InvalidSelection { api_name: String },
    #[error("Field '{api_name}' expects a list of selections")]
    NotList { api_name: String },
    #[error("Field '{api_name}' expects selection names as strings")]
    ItemNotString { api_name: String },
    #[error("Field '{api_name}': selection '{selection}' not found")]
    SelectionNotFound { api_name: String, selection: String },
    #[error("Field '{api_name}' expects a Unix timestamp")]
    InvalidDate { api_name: String },
    #[error("Field '{api_name}' expects the url as a string")]
    UrlNotString { api_name: String },
    #[error("Field '{api_name}' expects an http or https url")]
    InvalidUrl { api_name: String },
    #[error("Field '{api_name}' does not name a user of this account")]
    InvalidUser { api_name: String },
    #[error("Field '{api_name}' contains unknown attachments")]
    InvalidAttachments { api_name: String },
    #[error("Task field not found")]
    NotFound,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl TaskFieldError {
    /// Api name of the field that failed validation.
    pub fn api_name(&self) -> Option<&str> {
        match self {
            TaskFieldError::Required { api_name }
            | TaskFieldError::NotString { api_name }
            | TaskFieldError::StringTooLong { api_name }
            | TaskFieldError::LineBreak { api_name }
            | TaskFieldError::InvalidSelection { api_name }
            | TaskFieldError::NotList { api_name }
            | TaskFieldError::ItemNotString { api_name }
            | TaskFieldError::SelectionNotFound { api_name, .. }
            | TaskFieldError::InvalidDate { api_name }
            | TaskFieldError::UrlNotString { api_name }
            | TaskFieldError::InvalidUrl { api_name }
            | TaskFieldError::InvalidUser { api_name }
            | TaskFieldError::InvalidAttachments { api_name } => Some(api_name),
            TaskFieldError::NotFound | TaskFieldError::Database(_) => None,
        }
    }

    /// Validation failures, as opposed to lookups and storage errors.
    pub fn is_validation(&self) -> bool {
        self.api_name().is_some()
    }
}
