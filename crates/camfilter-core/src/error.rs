use crate::id::ImageId;

/// Error types for the camera filter.
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    /// No image identifier could be extracted from a file name.
    #[error("Cannot extract an image identifier from {0:?}")]
    ParseError(String),

    /// Two source entries collapse to the same image identifier.
    #[error("Duplicate image identifier {0}")]
    DuplicateIdentifier(ImageId),

    /// The rotation quaternion cannot be normalized.
    #[error("Invalid rotation quaternion {0:?}")]
    InvalidRotation([f64; 4]),

    /// The translation vector has non-finite components.
    #[error("Invalid translation vector {0:?}")]
    InvalidTranslation([f64; 3]),

    /// The collection holds too few poses for the requested operation.
    #[error("At least {required} poses are required, got {actual}")]
    InsufficientData {
        /// Minimum number of poses required by the operation
        required: usize,
        /// Actual number of poses in the collection
        actual: usize,
    },

    /// Fewer than two usable neighbors could be resolved for a pose.
    #[error("Cannot resolve two usable neighbors for image {0}")]
    NoUsableNeighbors(ImageId),

    /// Statistics are undefined for an empty collection.
    #[error("The pose collection is empty")]
    EmptyCollection,

    /// The softness is not a confidence level in the open interval (0, 1).
    #[error("Softness must lie in (0, 1), got {0}")]
    InvalidSoftness(f64),

    /// A parameter is out of its valid range.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The identifier is not part of the collection.
    #[error("Unknown image identifier {0}")]
    UnknownIdentifier(ImageId),

    /// The pose has no geometric position (sequential passages).
    #[error("Image {0} carries no geometric position")]
    MissingGeometry(ImageId),
}
