//! Filesystem collaborators for the command-line host.

mod classify;
mod dir_list;
mod header_metadata;
mod image_renderer;

pub use classify::MountClassifier;
pub use dir_list::DirectoryList;
pub use header_metadata::HeaderMetadata;
pub use image_renderer::ImageRenderer;
