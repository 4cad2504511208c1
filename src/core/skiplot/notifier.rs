//! Notifications about a sample's batch
//!
//! Messages go either to every member of a mailing list, each one persisted and
//! linked to the sample, or straight to the sample's own message thread.

use crate::adapters::store::MessageSender;
use crate::config::NotificationMode;
use crate::core::skiplot::trace::{Action, ActionContext};
use crate::domain::ids::{AccountId, MailingListId, MessageTypeId, SampleId, WorkUnitId};
use crate::domain::{
    MailingListRecipient, MessageRecipient, NewFile, NewMessage, Result, SampleThreadMessage,
    SkipLotError,
};
use chrono::Utc;
use regex::Regex;
use std::sync::Arc;

/// Identification of the file holding a message body
pub const MESSAGE_FILE_IDENTIFICATION: &str = "Automatic message sent by custom task";

/// Category of the file holding a message body
pub const MESSAGE_FILE_CATEGORY: &str = "html";

/// Subject sent when a sample completes its batch
pub fn fully_processed_subject(sample_id: SampleId, prefix: &str) -> String {
    format!("Sample #{sample_id} - {prefix}")
}

pub fn fully_processed_body(sample_id: SampleId) -> String {
    format!("Sample ID {sample_id} must be fully processed.")
}

/// Subject sent when the aggregate could not be advanced
pub fn advancement_failed_subject(sample_id: SampleId, work_unit_id: WorkUnitId) -> String {
    format!("Sample #{sample_id} - Problem finalizing Aggregate #{work_unit_id}")
}

pub fn advancement_failed_body(work_unit_id: WorkUnitId, reasons: &str) -> String {
    format!(
        "Aggregate Id: {work_unit_id} could not be finalized.<br><br>Error: {reasons}<br><br>Fix the problem and run the task manually."
    )
}

/// Converts an HTML body into the plain-text rendering stored with a message
pub struct HtmlToText {
    line_breaks: Regex,
    block_ends: Regex,
    tags: Regex,
    blank_lines: Regex,
}

impl HtmlToText {
    pub fn new() -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| {
                SkipLotError::Configuration(format!("Invalid HTML pattern '{pattern}': {e}"))
            })
        };

        Ok(Self {
            line_breaks: compile(r"(?i)<br\s*/?>")?,
            block_ends: compile(r"(?i)</(p|div|li|tr|h[1-6])\s*>")?,
            tags: compile(r"<[^>]*>")?,
            blank_lines: compile(r"\n{3,}")?,
        })
    }

    pub fn convert(&self, html: &str) -> String {
        let text = self.line_breaks.replace_all(html, "\n");
        let text = self.block_ends.replace_all(&text, "\n");
        let text = self.tags.replace_all(&text, "");
        let text = decode_entities(&text);
        let text = self.blank_lines.replace_all(&text, "\n\n");
        text.trim().to_string()
    }
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Dispatches notifications in the configured mode
pub struct Notifier {
    messages: Arc<dyn MessageSender>,
    mode: NotificationMode,
    html_to_text: HtmlToText,
}

impl Notifier {
    pub fn new(messages: Arc<dyn MessageSender>, mode: NotificationMode) -> Result<Self> {
        Ok(Self {
            messages,
            mode,
            html_to_text: HtmlToText::new()?,
        })
    }

    /// Send `subject`/`html` about the sample; returns the number of messages created
    pub async fn notify(&self, sample_id: SampleId, subject: &str, html: &str) -> Result<usize> {
        let sent = match &self.mode {
            NotificationMode::MailingList {
                mailing_list_id,
                mail_from,
                message_type_id,
            } => {
                self.send_to_mailing_list(
                    sample_id,
                    *mailing_list_id,
                    mail_from,
                    *message_type_id,
                    subject,
                    html,
                )
                .await
            }
            NotificationMode::Direct => self.post_to_sample(sample_id, subject, html).await,
        }
        .in_action(Action::SendMessage)?;

        tracing::info!(sample_id = %sample_id, messages = sent, subject, "Notification sent");
        Ok(sent)
    }

    async fn send_to_mailing_list(
        &self,
        sample_id: SampleId,
        mailing_list_id: MailingListId,
        mail_from: &str,
        message_type_id: MessageTypeId,
        subject: &str,
        html: &str,
    ) -> Result<usize> {
        let recipients = self.messages.mailing_list_recipients(mailing_list_id).await?;
        if recipients.is_empty() {
            tracing::warn!(mailing_list_id = %mailing_list_id, "Mailing list has no recipients");
            return Ok(0);
        }

        let text_plain = self.html_to_text.convert(html);
        let mut sent = 0;

        for recipient in &recipients {
            let account_to_id = self.resolve_account(recipient).await?;
            if account_to_id.is_none() && recipient.email.is_none() {
                tracing::warn!(
                    mailing_list_id = %mailing_list_id,
                    "Skipping recipient without email or account"
                );
                continue;
            }

            self.send_one(
                sample_id,
                account_to_id,
                recipient,
                mail_from,
                message_type_id,
                subject,
                html,
                &text_plain,
            )
            .await?;
            sent += 1;
        }

        Ok(sent)
    }

    /// Account registered for the recipient's email, else the list entry's own account
    async fn resolve_account(&self, recipient: &MailingListRecipient) -> Result<Option<AccountId>> {
        if let Some(email) = &recipient.email {
            if let Some(account_id) = self.messages.account_for_email(email).await? {
                return Ok(Some(account_id));
            }
        }
        Ok(recipient.account_id)
    }

    #[allow(clippy::too_many_arguments)]
    async fn send_one(
        &self,
        sample_id: SampleId,
        account_to_id: Option<AccountId>,
        recipient: &MailingListRecipient,
        mail_from: &str,
        message_type_id: MessageTypeId,
        subject: &str,
        html: &str,
        text_plain: &str,
    ) -> Result<()> {
        let file_id = self
            .messages
            .store_html_body(&NewFile {
                identification: MESSAGE_FILE_IDENTIFICATION.to_string(),
                category: MESSAGE_FILE_CATEGORY.to_string(),
                data: html.as_bytes().to_vec(),
            })
            .await?;

        let now = Utc::now();
        let message = NewMessage {
            message_uid: uuid::Uuid::new_v4().to_string(),
            identifier: String::new(),
            email_from: mail_from.to_string(),
            message_type_id: Some(message_type_id),
            subject: subject.to_string(),
            html: html.to_string(),
            text_plain: text_plain.to_string(),
            html_file_id: Some(file_id),
            sent: now,
            active: true,
            draft: false,
        };
        let recipients = [MessageRecipient {
            account_to_id,
            email: recipient.email.clone(),
            message_date: now,
        }];

        let message_id = self.messages.create_message(&message, &recipients).await?;
        self.messages.link_sample_message(sample_id, message_id).await?;

        tracing::debug!(
            sample_id = %sample_id,
            message_id = %message_id,
            account_to_id = ?account_to_id.map(|a| a.get()),
            "Message created"
        );
        Ok(())
    }

    async fn post_to_sample(
        &self,
        sample_id: SampleId,
        subject: &str,
        html: &str,
    ) -> Result<usize> {
        let message = SampleThreadMessage {
            subject: subject.to_string(),
            html: html.to_string(),
        };
        self.messages
            .post_sample_thread_message(sample_id, &message)
            .await?;
        Ok(1)
    }
}
