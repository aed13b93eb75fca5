use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::staff::model::Staff;

#[async_trait]
pub trait StaffRepository: Send + Sync {
    async fn fetch_by_id(&self, staff_id: &Uuid) -> Result<Option<Staff>>;

    /// All active staff, every category.
    async fn fetch_active(&self) -> Result<Vec<Staff>>;
}
