//! The merge engine: overlays a pending request's payload on a live entity
//! to produce the "what it would look like if approved" view.
//!
//! Display policy: admins always see the merged object (they are deciding
//! on it), the submitter sees their own proposal, everyone else sees the
//! live row. A payload that fails to decode overlays nothing; a broken
//! request must not break the page.

use sqlx::types::Json;
use uuid::Uuid;

use crate::db::models::artist::Artist;
use crate::db::models::booking::Booking;
use crate::db::models::requests::ModerationRequest;
use crate::db::models::user::User;
use crate::workflow::payload::RequestPayload;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewer {
    pub user_id: Option<Uuid>,
    pub is_admin: bool,
}

impl Viewer {
    pub fn anonymous() -> Self {
        Self {
            user_id: None,
            is_admin: false,
        }
    }
}

fn sees_proposal(viewer: &Viewer, pending: &ModerationRequest) -> bool {
    viewer.is_admin || viewer.user_id == Some(pending.user_id)
}

/// Live user with a pending USER_EDIT or ROLE_CHANGE overlaid.
pub fn merged_user(live: &User, pending: &ModerationRequest) -> User {
    let mut merged = live.clone();
    let Ok(payload) = RequestPayload::decode(pending.request_type, &pending.data) else {
        return merged;
    };

    match payload {
        RequestPayload::UserEdit(p) => {
            if let Some(name) = p.name {
                merged.name = Some(name);
            }
            if let Some(location) = p.location {
                merged.location = Some(location);
            }
            if let Some(bio) = p.bio {
                merged.bio = Some(bio);
            }
            if let Some(chapters) = p.chapters {
                merged.chapters = Json(chapters);
            }
            if let Some(role) = p.role {
                merged.role = role;
            }
            if let Some(director_chapters) = p.director_chapters {
                merged.director_chapters = Some(Json(director_chapters));
            }
        }
        RequestPayload::RoleChange(p) => {
            merged.role = p.role;
            if let Some(location) = p.location {
                merged.location = Some(location);
            }
            if let Some(bio) = p.bio {
                merged.bio = Some(bio);
            }
            if let Some(chapters) = p.chapters {
                merged.chapters = Json(chapters);
            }
            if let Some(director_chapters) = p.director_chapters {
                merged.director_chapters = Some(Json(director_chapters));
            }
        }
        _ => {}
    }

    merged
}

/// Live artist with a pending ARTIST_EDIT or ARTIST_ADD overlaid. Id-set
/// fields replace the live set wholesale, never element-wise.
pub fn merged_artist(live: &Artist, pending: &ModerationRequest) -> Artist {
    let mut merged = live.clone();
    let Ok(payload) = RequestPayload::decode(pending.request_type, &pending.data) else {
        return merged;
    };

    match payload {
        RequestPayload::ArtistEdit(p) => {
            merged.name = p.name;
            merged.location = p.location.or(merged.location);
            merged.bio = p.bio.or(merged.bio);
            merged.image = p.image.or(merged.image);
            if let Some(chapters) = p.chapters {
                merged.chapters = Json(chapters);
            }
            if let Some(members) = p.members {
                merged.members = Json(members);
            }
        }
        RequestPayload::ArtistAdd(p) => {
            merged.name = p.name;
            merged.location = p.location.or(merged.location);
            merged.bio = p.bio.or(merged.bio);
            if let Some(chapters) = p.chapters {
                merged.chapters = Json(chapters);
            }
            if let Some(members) = p.members {
                merged.members = Json(members);
            }
        }
        _ => {}
    }

    merged
}

/// Live booking with a pending BOOKING_EDIT's contact fields overlaid.
/// (The proposed date set lives in the payload and is shown alongside,
/// not merged into child rows.)
pub fn merged_booking(live: &Booking, pending: &ModerationRequest) -> Booking {
    let mut merged = live.clone();
    let Ok(RequestPayload::BookingEdit(p)) =
        RequestPayload::decode(pending.request_type, &pending.data)
    else {
        return merged;
    };

    merged.name = p.name;
    merged.email = p.email;
    merged.phone = p.phone.or(merged.phone);
    merged.questions = p.questions.or(merged.questions);
    merged
}

pub fn resolve_user_view(live: &User, pending: Option<&ModerationRequest>, viewer: &Viewer) -> User {
    match pending {
        Some(request) if sees_proposal(viewer, request) => merged_user(live, request),
        Some(_) => live.clone(),
        None => live.clone(),
    }
}

pub fn resolve_artist_view(
    live: &Artist,
    pending: Option<&ModerationRequest>,
    viewer: &Viewer,
) -> Artist {
    match pending {
        Some(request) if sees_proposal(viewer, request) => merged_artist(live, request),
        Some(_) => live.clone(),
        None => live.clone(),
    }
}

pub fn resolve_booking_view(
    live: &Booking,
    pending: Option<&ModerationRequest>,
    viewer: &Viewer,
) -> Booking {
    match pending {
        Some(request) if sees_proposal(viewer, request) => merged_booking(live, request),
        Some(_) => live.clone(),
        None => live.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::artist::ImagePreference;
    use crate::db::models::requests::{EntityStatus, RequestStatus, RequestType};
    use crate::db::models::user::Role;
    use serde_json::json;

    fn live_artist(members: Vec<Uuid>) -> Artist {
        Artist {
            id: Uuid::new_v4(),
            name: "Riverside Trio".into(),
            location: Some("Portland".into()),
            bio: Some("chamber trio".into()),
            image: None,
            image_preference: ImagePreference::Provider,
            owner_id: Uuid::new_v4(),
            members: Json(members),
            status: EntityStatus::Approved,
            chapters: Json(vec![]),
            created_at: None,
        }
    }

    fn pending(request_type: RequestType, submitter: Uuid, data: serde_json::Value) -> ModerationRequest {
        ModerationRequest {
            id: Uuid::new_v4(),
            user_id: submitter,
            request_type,
            target_id: None,
            data,
            status: RequestStatus::Pending,
            created_at: None,
        }
    }

    fn live_user() -> User {
        User {
            id: Uuid::new_v4(),
            name: Some("Jordan".into()),
            email: "jordan@example.org".into(),
            password_hash: "x".into(),
            role: Role::Audience,
            image: None,
            location: Some("Salem".into()),
            bio: None,
            chapters: Json(vec![]),
            director_chapters: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn admin_always_sees_overlay() {
        let live = live_user();
        let request = pending(
            RequestType::UserEdit,
            Uuid::new_v4(),
            json!({ "name": "Jordan Q", "bio": "new bio" }),
        );
        let viewer = Viewer {
            user_id: Some(Uuid::new_v4()),
            is_admin: true,
        };

        let view = resolve_user_view(&live, Some(&request), &viewer);
        assert_eq!(view.name.as_deref(), Some("Jordan Q"));
        assert_eq!(view.bio.as_deref(), Some("new bio"));
        // Absent fields keep live values.
        assert_eq!(view.location, live.location);
    }

    #[test]
    fn non_submitter_sees_live_row() {
        let live = live_user();
        let request = pending(
            RequestType::UserEdit,
            Uuid::new_v4(),
            json!({ "name": "Jordan Q" }),
        );
        let viewer = Viewer {
            user_id: Some(Uuid::new_v4()),
            is_admin: false,
        };

        let view = resolve_user_view(&live, Some(&request), &viewer);
        assert_eq!(view.name, live.name);
    }

    #[test]
    fn submitter_sees_own_proposal() {
        let live = live_user();
        let submitter = Uuid::new_v4();
        let request = pending(
            RequestType::RoleChange,
            submitter,
            json!({ "role": "Musician" }),
        );
        let viewer = Viewer {
            user_id: Some(submitter),
            is_admin: false,
        };

        let view = resolve_user_view(&live, Some(&request), &viewer);
        assert_eq!(view.role, Role::Musician);
    }

    #[test]
    fn malformed_payload_falls_back_to_live() {
        let live = live_artist(vec![Uuid::new_v4()]);
        // ARTIST_EDIT without a name fails to decode.
        let request = pending(RequestType::ArtistEdit, Uuid::new_v4(), json!({ "bio": 42 }));
        let viewer = Viewer {
            user_id: None,
            is_admin: true,
        };

        let view = resolve_artist_view(&live, Some(&request), &viewer);
        assert_eq!(view.name, live.name);
        assert_eq!(view.bio, live.bio);
    }

    #[test]
    fn member_set_replaces_wholesale() {
        let original_members = vec![Uuid::new_v4(), Uuid::new_v4()];
        let replacement = vec![Uuid::new_v4()];
        let live = live_artist(original_members);
        let request = pending(
            RequestType::ArtistEdit,
            Uuid::new_v4(),
            json!({ "name": "Riverside Duo", "members": replacement.clone() }),
        );

        let merged = merged_artist(&live, &request);
        assert_eq!(merged.members.0, replacement);
        assert_eq!(merged.name, "Riverside Duo");
    }

    #[test]
    fn no_pending_request_is_identity() {
        let live = live_user();
        let view = resolve_user_view(&live, None, &Viewer::anonymous());
        assert_eq!(view.name, live.name);
        assert_eq!(view.role, live.role);
    }
}
