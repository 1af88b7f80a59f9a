use thiserror::Error;

/// All errors that the crate can generate
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    /// An image was refused when adding it to the working set
    Intake(#[from] crate::image::IntakeError),

    #[error(transparent)]
    /// A document generation was refused or cancelled
    Generate(#[from] crate::assemble::GenerateError),

    #[error(transparent)]
    /// The pages could not be written as a PDF
    Pdf(#[from] crate::document::PdfError),

    #[error(transparent)]
    /// [serde_json] failed to parse layout settings
    Settings(#[from] serde_json::Error),
}
