//! Notification records

use crate::domain::ids::{AccountId, FileId, MailingListId, MessageTypeId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Member of a mailing list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailingListRecipient {
    pub mailing_list_id: MailingListId,

    #[serde(default)]
    pub email: Option<String>,

    /// Account referenced by the list entry itself
    #[serde(default)]
    pub account_id: Option<AccountId>,
}

/// File persisted alongside a message (the HTML body)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFile {
    pub identification: String,
    pub category: String,
    pub data: Vec<u8>,
}

/// Message ready to be persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMessage {
    /// Generated unique message identifier (UUID v4)
    pub message_uid: String,

    pub identifier: String,
    pub email_from: String,
    pub message_type_id: Option<MessageTypeId>,
    pub subject: String,
    pub html: String,

    /// Plain-text rendering of `html`
    pub text_plain: String,

    pub html_file_id: Option<FileId>,
    pub sent: DateTime<Utc>,
    pub active: bool,
    pub draft: bool,
}

/// Recipient row of a persisted message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecipient {
    pub account_to_id: Option<AccountId>,
    pub email: Option<String>,
    pub message_date: DateTime<Utc>,
}

/// Lightweight message posted to a sample's own message thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleThreadMessage {
    pub subject: String,
    pub html: String,
}
