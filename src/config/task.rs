//! Task options supplied by the host with every invocation
//!
//! The host hands the task a loosely-typed JSON block using its own PascalCase keys
//! (including the historical `Setp` spelling). It is parsed once into
//! [`RawTaskOptions`] and validated into [`TaskOptions`]; the engine only ever sees
//! the validated form.

use crate::domain::errors::SkipLotError;
use crate::domain::ids::{
    EquivalencyId, MailingListId, MessageTypeId, WorkMasterId, WorkflowStepId,
};
use crate::domain::result::Result;
use serde::{Deserialize, Serialize};

/// Options exactly as received, before validation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTaskOptions {
    #[serde(rename = "EquivalencyId", default)]
    pub equivalency_id: Option<i64>,

    #[serde(rename = "SkipLoteSampleQty", default)]
    pub skip_lote_sample_qty: Option<i64>,

    #[serde(rename = "WorkFinalSetpId", alias = "WorkFinalStepId", default)]
    pub work_final_step_id: Option<i64>,

    #[serde(rename = "WorkInitialSetpId", alias = "WorkInitialStepId", default)]
    pub work_initial_step_id: Option<i64>,

    #[serde(rename = "WorkMasterId", default)]
    pub work_master_id: Option<i64>,

    #[serde(rename = "SampleIdentification", default)]
    pub sample_identification: Option<String>,

    #[serde(rename = "MailingListId", default)]
    pub mailing_list_id: Option<i64>,

    #[serde(rename = "MailFrom", default)]
    pub mail_from: Option<String>,

    #[serde(rename = "MessageTypeId", default)]
    pub message_type_id: Option<i64>,
}

/// How notifications are delivered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationMode {
    /// One message per member of a mailing list
    MailingList {
        mailing_list_id: MailingListId,
        mail_from: String,
        message_type_id: MessageTypeId,
    },

    /// A message posted on the sample's own thread
    Direct,
}

/// Validated task options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOptions {
    pub equivalency_id: EquivalencyId,

    /// Number of counted samples that closes a batch, always greater than 1
    pub quota: usize,

    pub work_final_step_id: WorkflowStepId,
    pub work_initial_step_id: WorkflowStepId,
    pub work_master_id: WorkMasterId,

    /// Prefix prepended to the sample identification after a successful advancement
    pub sample_identification_prefix: String,

    pub notification: NotificationMode,
}

impl TaskOptions {
    /// Parses and validates the host's JSON configuration block
    ///
    /// # Errors
    ///
    /// Returns [`SkipLotError::Configuration`] if the block is absent, malformed, or
    /// any option is missing or invalid.
    pub fn from_json(config: &str) -> Result<Self> {
        if config.trim().is_empty() {
            return Err(SkipLotError::Configuration(
                "Task configuration is empty".to_string(),
            ));
        }
        let raw: RawTaskOptions = serde_json::from_str(config).map_err(|e| {
            SkipLotError::Configuration(format!("Task configuration is not valid JSON: {e}"))
        })?;
        Self::try_from(raw)
    }

    /// Parses and validates an already decoded configuration value
    pub fn from_value(config: serde_json::Value) -> Result<Self> {
        if config.is_null() {
            return Err(SkipLotError::Configuration(
                "Task configuration is empty".to_string(),
            ));
        }
        let raw: RawTaskOptions = serde_json::from_value(config).map_err(|e| {
            SkipLotError::Configuration(format!("Invalid task configuration: {e}"))
        })?;
        Self::try_from(raw)
    }
}

impl TryFrom<RawTaskOptions> for TaskOptions {
    type Error = SkipLotError;

    fn try_from(raw: RawTaskOptions) -> Result<Self> {
        let equivalency_id = required_id("EquivalencyId", raw.equivalency_id)?;

        let quota = required("SkipLoteSampleQty", raw.skip_lote_sample_qty)?;
        if quota <= 1 {
            return Err(SkipLotError::Configuration(
                "Parameter \"SkipLoteSampleQty\" must be greater than 1.".to_string(),
            ));
        }
        let quota = usize::try_from(quota).map_err(|_| {
            SkipLotError::Configuration(format!(
                "Parameter \"SkipLoteSampleQty\" is out of range: {quota}"
            ))
        })?;

        let work_final_step_id = required_id("WorkFinalSetpId", raw.work_final_step_id)?;
        let work_initial_step_id = required_id("WorkInitialSetpId", raw.work_initial_step_id)?;
        let work_master_id = required_id("WorkMasterId", raw.work_master_id)?;

        let sample_identification_prefix =
            required("SampleIdentification", raw.sample_identification)?;
        if sample_identification_prefix.trim().is_empty() {
            return Err(SkipLotError::Configuration(
                "Parameter \"SampleIdentification\" cannot be empty.".to_string(),
            ));
        }

        let notification = match raw.mailing_list_id {
            None => NotificationMode::Direct,
            Some(id) => {
                let mailing_list_id = parse_id::<MailingListId>("MailingListId", id)?;
                let mail_from = required("MailFrom", raw.mail_from)?;
                if mail_from.trim().is_empty() {
                    return Err(SkipLotError::Configuration(
                        "Parameter \"MailFrom\" cannot be empty.".to_string(),
                    ));
                }
                let message_type_id = required_id("MessageTypeId", raw.message_type_id)?;
                NotificationMode::MailingList {
                    mailing_list_id,
                    mail_from,
                    message_type_id,
                }
            }
        };

        Ok(Self {
            equivalency_id,
            quota,
            work_final_step_id,
            work_initial_step_id,
            work_master_id,
            sample_identification_prefix,
            notification,
        })
    }
}

fn required<T>(name: &str, value: Option<T>) -> Result<T> {
    value.ok_or_else(|| {
        SkipLotError::Configuration(format!("Parameter \"{name}\" not configured."))
    })
}

fn required_id<T>(name: &str, value: Option<i64>) -> Result<T>
where
    T: TryFrom<i64, Error = String>,
{
    parse_id(name, required(name, value)?)
}

fn parse_id<T>(name: &str, value: i64) -> Result<T>
where
    T: TryFrom<i64, Error = String>,
{
    T::try_from(value)
        .map_err(|e| SkipLotError::Configuration(format!("Parameter \"{name}\" is invalid: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    fn base_config() -> serde_json::Value {
        json!({
            "EquivalencyId": 3,
            "SkipLoteSampleQty": 5,
            "WorkFinalSetpId": 40,
            "WorkInitialSetpId": 10,
            "WorkMasterId": 2,
            "SampleIdentification": "SKIP-",
            "MailingListId": null,
            "MailFrom": null,
            "MessageTypeId": null
        })
    }

    #[test]
    fn test_valid_direct_mode() {
        let options = TaskOptions::from_value(base_config()).unwrap();
        assert_eq!(options.quota, 5);
        assert_eq!(options.equivalency_id.get(), 3);
        assert_eq!(options.work_final_step_id.get(), 40);
        assert_eq!(options.sample_identification_prefix, "SKIP-");
        assert_eq!(options.notification, NotificationMode::Direct);
    }

    #[test]
    fn test_valid_mailing_list_mode() {
        let mut config = base_config();
        config["MailingListId"] = json!(8);
        config["MailFrom"] = json!("lims@lab.example");
        config["MessageTypeId"] = json!(1);

        let options = TaskOptions::from_value(config).unwrap();
        assert_eq!(
            options.notification,
            NotificationMode::MailingList {
                mailing_list_id: MailingListId::new(8).unwrap(),
                mail_from: "lims@lab.example".to_string(),
                message_type_id: MessageTypeId::new(1).unwrap(),
            }
        );
    }

    #[test_case("EquivalencyId" ; "equivalency")]
    #[test_case("SkipLoteSampleQty" ; "quota")]
    #[test_case("WorkFinalSetpId" ; "final step")]
    #[test_case("WorkInitialSetpId" ; "initial step")]
    #[test_case("WorkMasterId" ; "master")]
    #[test_case("SampleIdentification" ; "prefix")]
    fn test_missing_required_option(key: &str) {
        let mut config = base_config();
        config.as_object_mut().unwrap().remove(key);

        let err = TaskOptions::from_value(config).unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(
            err.to_string(),
            format!("Configuration error: Parameter \"{key}\" not configured.")
        );
    }

    #[test_case(1 ; "one")]
    #[test_case(0 ; "zero")]
    #[test_case(-2 ; "negative")]
    fn test_quota_must_exceed_one(quota: i64) {
        let mut config = base_config();
        config["SkipLoteSampleQty"] = json!(quota);

        let err = TaskOptions::from_value(config).unwrap_err();
        assert!(err.to_string().contains("must be greater than 1"));
    }

    #[test_case("MailFrom" ; "sender")]
    #[test_case("MessageTypeId" ; "message type")]
    fn test_mailing_list_requires(key: &str) {
        let mut config = base_config();
        config["MailingListId"] = json!(8);
        config["MailFrom"] = json!("lims@lab.example");
        config["MessageTypeId"] = json!(1);
        config[key] = serde_json::Value::Null;

        let err = TaskOptions::from_value(config).unwrap_err();
        assert!(err.to_string().contains(key));
    }

    #[test]
    fn test_non_positive_id_rejected() {
        let mut config = base_config();
        config["WorkMasterId"] = json!(0);
        let err = TaskOptions::from_value(config).unwrap_err();
        assert!(err.to_string().contains("WorkMasterId"));
    }

    #[test]
    fn test_corrected_step_spelling_accepted() {
        let config = r#"{
            "EquivalencyId": 3, "SkipLoteSampleQty": 2,
            "WorkFinalStepId": 40, "WorkInitialStepId": 10,
            "WorkMasterId": 2, "SampleIdentification": "SKIP-"
        }"#;
        let options = TaskOptions::from_json(config).unwrap();
        assert_eq!(options.work_initial_step_id.get(), 10);
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let mut config = base_config();
        config["SampleFileIdentification"] = json!("Report");
        assert!(TaskOptions::from_value(config).is_ok());
    }

    #[test]
    fn test_empty_or_invalid_json() {
        assert!(TaskOptions::from_json("").unwrap_err().is_configuration());
        assert!(TaskOptions::from_json("{not json").unwrap_err().is_configuration());
        assert!(TaskOptions::from_value(serde_json::Value::Null)
            .unwrap_err()
            .is_configuration());
    }
}
