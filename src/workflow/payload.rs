//! Typed request payloads. `requests.data` is stored as JSONB whose shape
//! depends on `request_type`; decoding turns the pair into one variant of
//! [`RequestPayload`] so the approval engine can match exhaustively instead
//! of poking at loose JSON keys.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::db::models::booking::BookingDateInput;
use crate::db::models::requests::RequestType;
use crate::db::models::user::Role;
use crate::workflow::PlanError;

/// ROLE_CHANGE: the submitter asks for a new role for themselves.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoleChangePayload {
    pub role: Role,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub chapters: Option<Vec<Uuid>>,
    pub director_chapters: Option<Vec<Uuid>>,
}

/// USER_EDIT: a full profile edit. Absent fields clear the column on
/// approval and overlay nothing in previews.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct UserEditPayload {
    pub name: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub chapters: Option<Vec<Uuid>>,
    pub role: Option<Role>,
    pub director_chapters: Option<Vec<Uuid>>,
}

/// ARTIST_EDIT: overwrites the artist row wholesale on approval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArtistEditPayload {
    pub name: String,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub image: Option<String>,
    pub chapters: Option<Vec<Uuid>>,
    pub members: Option<Vec<Uuid>>,
}

/// ARTIST_ADD: mirrors the PENDING artist row written at submission time.
/// Approval only flips that row's status; the payload exists for previews
/// and for stale-member cleanup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArtistAddPayload {
    pub name: String,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub chapters: Option<Vec<Uuid>>,
    pub members: Option<Vec<Uuid>>,
}

/// BOOKING_INQUIRY: contact summary for the booking row written at
/// submission time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingInquiryPayload {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// BOOKING_EDIT: replacement contact fields plus the full replacement set
/// of event dates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingEditPayload {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub questions: Option<String>,
    #[serde(default)]
    pub dates: Vec<BookingDateInput>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestPayload {
    RoleChange(RoleChangePayload),
    UserEdit(UserEditPayload),
    ArtistEdit(ArtistEditPayload),
    ArtistAdd(ArtistAddPayload),
    BookingInquiry(BookingInquiryPayload),
    BookingEdit(BookingEditPayload),
}

impl RequestPayload {
    /// Decode a stored payload for the given request type.
    pub fn decode(request_type: RequestType, data: &Value) -> Result<Self, PlanError> {
        Ok(match request_type {
            RequestType::RoleChange => Self::RoleChange(serde_json::from_value(data.clone())?),
            RequestType::UserEdit => Self::UserEdit(serde_json::from_value(data.clone())?),
            RequestType::ArtistEdit => Self::ArtistEdit(serde_json::from_value(data.clone())?),
            RequestType::ArtistAdd => Self::ArtistAdd(serde_json::from_value(data.clone())?),
            RequestType::BookingInquiry => {
                Self::BookingInquiry(serde_json::from_value(data.clone())?)
            }
            RequestType::BookingEdit => Self::BookingEdit(serde_json::from_value(data.clone())?),
        })
    }

    /// The member set a pending artist proposal would commit, if this is an
    /// artist proposal carrying one. Used by the cleanup engine to find
    /// requests that reference a removed user.
    pub fn proposed_members(&self) -> Option<&[Uuid]> {
        match self {
            Self::ArtistEdit(p) => p.members.as_deref(),
            Self::ArtistAdd(p) => p.members.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_role_change() {
        let data = json!({
            "role": "ChapterDirector",
            "director_chapters": ["7a444c6b-3f4c-4cf5-9db9-41d1b1a0a6aa"],
        });
        let payload = RequestPayload::decode(RequestType::RoleChange, &data).unwrap();
        match payload {
            RequestPayload::RoleChange(p) => {
                assert_eq!(p.role, Role::ChapterDirector);
                assert_eq!(p.director_chapters.unwrap().len(), 1);
                assert!(p.chapters.is_none());
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn artist_edit_missing_name_is_malformed() {
        let data = json!({ "bio": "rewritten" });
        let err = RequestPayload::decode(RequestType::ArtistEdit, &data);
        assert!(matches!(err, Err(PlanError::MalformedPayload(_))));
    }

    #[test]
    fn booking_edit_defaults_to_no_dates() {
        let data = json!({ "name": "Venue", "email": "venue@example.org" });
        let payload = RequestPayload::decode(RequestType::BookingEdit, &data).unwrap();
        match payload {
            RequestPayload::BookingEdit(p) => assert!(p.dates.is_empty()),
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn proposed_members_only_for_artist_proposals() {
        let member = Uuid::new_v4();
        let edit = RequestPayload::decode(
            RequestType::ArtistEdit,
            &json!({ "name": "Quartet", "members": [member] }),
        )
        .unwrap();
        assert_eq!(edit.proposed_members(), Some(&[member][..]));

        let inquiry = RequestPayload::decode(
            RequestType::BookingInquiry,
            &json!({ "name": "A", "email": "a@b.c" }),
        )
        .unwrap();
        assert!(inquiry.proposed_members().is_none());
    }
}
