use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typeshare::typeshare;
use uuid::Uuid;

#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub screenshot_id: ObjectId,
    pub creator_id: Uuid,
    pub ip: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hwid: Option<String>,
    pub favorited_at: DateTime<Utc>,
}
