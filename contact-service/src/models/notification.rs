use chrono::{DateTime, FixedOffset, Utc};

use super::ContactSubmission;

/// India Standard Time, UTC+05:30 with no daylight saving.
const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

/// Rendered WhatsApp notification body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactNotification {
    pub body: String,
}

/// `d/m/yyyy, h:mm:ss am` in IST, the `en-IN` locale rendering.
pub fn format_timestamp_ist(at: DateTime<Utc>) -> String {
    let ist = FixedOffset::east_opt(IST_OFFSET_SECS).expect("IST offset is within ±24h");
    at.with_timezone(&ist)
        .format("%-d/%-m/%Y, %-I:%M:%S %P")
        .to_string()
}

pub fn format_notification(submission: &ContactSubmission, at: DateTime<Utc>) -> ContactNotification {
    let body = format!(
        "🔔 New Contact Form Submission\n\
         \n\
         👤 Name: {}\n\
         📧 Email: {}\n\
         🛠️ Service: {}\n\
         💬 Message: {}\n\
         🕒 Time: {}",
        submission.name,
        submission.email,
        submission.service,
        submission.message,
        format_timestamp_ist(at),
    );

    ContactNotification { body }
}
