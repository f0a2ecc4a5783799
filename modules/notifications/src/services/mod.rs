pub mod dispatch_service;
pub mod recipient_validator;

pub use dispatch_service::{CreateNotification, Created, DispatchService};
pub use recipient_validator::{HttpRecipientValidator, RecipientCheck, RecipientValidator};
