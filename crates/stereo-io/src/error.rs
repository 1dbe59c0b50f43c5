/// An error type for the io module.
#[derive(thiserror::Error, Debug)]
pub enum IoError {
    /// Error when the file does not exist.
    #[error("File does not exist: {0}")]
    FileDoesNotExist(std::path::PathBuf),

    /// Invalid file extension.
    #[error("File does not have a valid extension: {0}")]
    InvalidFileExtension(std::path::PathBuf),

    /// Error to open the file.
    #[error("Failed to manipulate the file. {0}")]
    FileError(#[from] std::io::Error),

    /// Error to create the image.
    #[error("Failed to create image. {0}")]
    ImageCreationError(#[from] stereo_image::ImageError),

    /// Error to decode the image.
    #[error("Failed to decode the image. {0}")]
    ImageDecodeError(#[from] image::ImageError),

    /// The decoded image has a layout that is not supported.
    #[error("Unsupported image format")]
    UnsupportedImageFormat,

    /// Error to encode the PNG image.
    #[error("Failed to encode the png image. {0}")]
    PngEncodingError(String),

    /// Error to decode the PNG image.
    #[error("Failed to decode the png image. {0}")]
    PngDecodeError(String),

    /// Error to encode or decode the TIFF image.
    #[error("Error with Tiff encoding/decoding. {0}")]
    TiffError(#[from] tiff::TiffError),

    /// Error to parse or serialize a JSON record.
    #[error("Failed to parse the record. {0}")]
    JsonError(#[from] serde_json::Error),

    /// A record parsed but its content is inconsistent.
    #[error("Malformed record {0}: {1}")]
    MalformedRecord(std::path::PathBuf, String),
}
