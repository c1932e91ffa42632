//! Rehearsal transport
//!
//! A [`TransportAdapter`] that accepts every record without touching the
//! network. The CLI uses it to rehearse an upload end-to-end (grouping,
//! sequencing, progress, export) before pointing at a real backend; tests
//! use it as the baseline all-success collaborator.

use async_trait::async_trait;

use crate::core::traits::{GroupResponse, SubmitContext, TransportAdapter};
use crate::types::{RecordGroup, TransportError};

/// Transport that accepts every record without any network call
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunTransport;

#[async_trait]
impl TransportAdapter for DryRunTransport {
    async fn submit(
        &self,
        group: &RecordGroup,
        context: &SubmitContext,
    ) -> Result<GroupResponse, TransportError> {
        Ok(GroupResponse::accept_all(
            group,
            serde_json::json!({
                "simulated": true,
                "group": context.group_key,
            }),
        ))
    }
}
