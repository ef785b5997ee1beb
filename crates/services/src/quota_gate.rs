//! Thin decision layer over `UsageAccountant`, shared by job submission
//! (`spec.md` §6.1 403 on quota) and the HTTP quota middleware in `api`.

use crate::error::JobError;
use crate::usage::{UsageAccountant, UsageCheckResult};
use domain::usage::UsageResource;
use uuid::Uuid;

pub struct QuotaGate<'a> {
    accountant: &'a UsageAccountant,
}

impl<'a> QuotaGate<'a> {
    pub fn new(accountant: &'a UsageAccountant) -> Self {
        Self { accountant }
    }

    /// Returns `Ok(())` if `owner_id` has room for `requested` more units of
    /// `resource`, otherwise a `JobError::QuotaExceeded` carrying the
    /// used/limit pair the HTTP layer surfaces verbatim (`spec.md` §7).
    pub async fn admit(
        &self,
        owner_id: Uuid,
        resource: UsageResource,
        requested: f64,
    ) -> Result<(), JobError> {
        match self.accountant.check(owner_id, resource, requested).await {
            Ok(UsageCheckResult::Ok { .. }) => Ok(()),
            Ok(UsageCheckResult::Over { used, limit, .. }) => Err(JobError::QuotaExceeded {
                resource: resource.to_string(),
                used,
                limit,
            }),
            Err(e) => Err(JobError::from(e)),
        }
    }
}
