pub mod notification;
pub mod submission;

pub use notification::{format_notification, format_timestamp_ist, ContactNotification};
pub use submission::{ContactSubmission, SubmitContactResponse, SUCCESS_MESSAGE};
