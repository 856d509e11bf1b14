use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::artist::ImagePreference;
use super::requests::EntityStatus;

#[derive(Debug, Serialize, Deserialize, Clone, FromRow, ToSchema)]
pub struct Booking {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub questions: Option<String>,
    pub image: Option<String>,
    pub image_preference: ImagePreference,
    pub created_by: Uuid,
    pub status: EntityStatus,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Serialize, Deserialize, Clone, FromRow, ToSchema)]
pub struct BookingDate {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub date: NaiveDate,
    pub time: String,
    pub duration: Option<String>,
    pub event_type: Option<String>,
    pub location: String,
    pub description: Option<String>,
    pub budget: Option<String>,
    /// Whether the date surfaces on the public events feed. Admin-only
    /// toggle, independent of booking approval.
    pub is_public: bool,
}

/// One proposed event date inside a booking submission or edit.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, ToSchema)]
pub struct BookingDateInput {
    pub date: NaiveDate,
    pub time: String,
    pub duration: Option<String>,
    pub event_type: Option<String>,
    pub location: String,
    pub description: Option<String>,
    pub budget: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct NewBooking {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub questions: Option<String>,
    #[serde(default)]
    pub dates: Vec<BookingDateInput>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateBooking {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub questions: Option<String>,
    #[serde(default)]
    pub dates: Vec<BookingDateInput>,
    #[serde(default)]
    pub admin_action: bool,
    pub review_request_id: Option<Uuid>,
}

/// A public events-feed row: a visible date joined with its booking's
/// contact name.
#[derive(Debug, Serialize, Deserialize, FromRow, ToSchema)]
pub struct PublicEvent {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub date: NaiveDate,
    pub time: String,
    pub event_type: Option<String>,
    pub location: String,
    pub description: Option<String>,
    pub booking_name: String,
}
