use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PackError {
    #[error("item {item} ({w}x{h}) does not fit in any bin")]
    InfeasibleItem { item: usize, w: u32, h: u32 },

    #[error("nothing to pack: {items} item(s), {bins} bin(s)")]
    NoBinsAvailable { items: usize, bins: usize },

    #[error("all bins opened, item {item} could not be placed")]
    ExhaustedBins { item: usize },
}

impl PackError {
    /// Input index of the item that caused the failure, if any.
    pub fn item(&self) -> Option<usize> {
        match self {
            PackError::InfeasibleItem { item, .. } | PackError::ExhaustedBins { item } => {
                Some(*item)
            }
            PackError::NoBinsAvailable { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("unexpected end of input, expected {0}")]
    Missing(String),

    #[error("invalid number '{token}' for {what}")]
    InvalidNumber { token: String, what: String },

    #[error("{what} must be non-zero")]
    Zero { what: String },

    #[error("unexpected trailing data '{0}'")]
    Trailing(String),
}
