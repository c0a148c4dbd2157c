//! "New file in folder" trigger.
//!
//! The folder listing comes from the step payload (`{"files": [...]}`),
//! which makes this connector usable without a storage account and keeps
//! it a faithful example of the snapshot protocol.

use async_trait::async_trait;
use uuid::Uuid;

use crate::snapshot::detect_new;
use crate::{ConnectorError, TriggerCheckResult, TriggerConnector, TriggerParams, Variable};

pub struct FolderTrigger {
    params: TriggerParams,
}

impl FolderTrigger {
    pub fn new(params: TriggerParams) -> Self {
        Self { params }
    }

    fn list_files(&self) -> Result<Vec<String>, ConnectorError> {
        let files = self
            .params
            .payload
            .get("files")
            .and_then(|v| v.as_array())
            .ok_or_else(|| ConnectorError::InvalidPayload("missing 'files' array".into()))?;

        files
            .iter()
            .map(|f| {
                f.as_str()
                    .map(str::to_owned)
                    .ok_or_else(|| ConnectorError::InvalidPayload(format!("file entry is not a string: {f}")))
            })
            .collect()
    }
}

#[async_trait]
impl TriggerConnector for FolderTrigger {
    fn step_id(&self) -> Uuid {
        self.params.step_id
    }

    async fn check(&self) -> Result<TriggerCheckResult, ConnectorError> {
        let files = self.list_files()?;
        detect_new(
            &files,
            |name| name.clone(),
            self.params.last_comparison_data.as_ref(),
            |name| vec![Variable::new("FileName", name.as_str())],
        )
    }
}
