use thiserror::Error;

#[derive(Error, Debug)]
pub enum FoundryError {
    #[error("Blueprint already registered: {0}")]
    DuplicateBlueprint(String),

    #[error("Unknown blueprint: {0}")]
    UnknownBlueprint(String),

    #[error("Blueprint '{0}' resolved while definitions were still loading")]
    MisplacedResolution(String),

    #[error("Infinite recursion detected for blueprint: {0}")]
    InfiniteRecursion(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Definition source failed: {0}")]
    Source(String),
}

pub type Result<T> = std::result::Result<T, FoundryError>;
