use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueBrief {
    pub venue_id: Uuid,
    pub name: String,
}
