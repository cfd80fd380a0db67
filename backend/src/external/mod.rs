//! External collaborators of the backend service

pub mod attachments;

pub use attachments::AttachmentStore;
