//! Referential-integrity maintenance for the denormalized id-sets. The
//! store enforces nothing about `artists.members` or pending payloads that
//! reference users; this module is the sole authority that reconciles them
//! when a user is demoted out of a performing role or deleted outright.

use uuid::Uuid;

use crate::db::models::artist::Artist;
use crate::db::models::requests::{ModerationRequest, RequestStatus, RequestType};
use crate::workflow::payload::RequestPayload;
use crate::workflow::plan::Statement;

/// Remove a user from one artist's member set. The last member leaving
/// deletes the act, along with every request row still targeting it.
fn remove_member(user_id: Uuid, artist: &Artist) -> Vec<Statement> {
    if !artist.members.0.contains(&user_id) {
        return Vec::new();
    }

    let remaining: Vec<Uuid> = artist
        .members
        .0
        .iter()
        .copied()
        .filter(|id| *id != user_id)
        .collect();

    if remaining.is_empty() {
        vec![
            Statement::DeleteArtist {
                artist_id: artist.id,
            },
            Statement::DeleteRequestsTargeting {
                target_id: artist.id,
            },
        ]
    } else {
        vec![Statement::SetArtistMembers {
            artist_id: artist.id,
            members: remaining,
        }]
    }
}

/// Membership-removal routine: strip the user from every artist passed in.
/// Callers supply the artists whose member sets contain the user.
pub fn membership_removal_plan(user_id: Uuid, artists: &[Artist]) -> Vec<Statement> {
    artists
        .iter()
        .flat_map(|artist| remove_member(user_id, artist))
        .collect()
}

/// Reject every pending artist proposal whose proposed member set contains
/// the user. A proposal that would keep an ineligible or deleted user as a
/// member cannot be approved as-is. Payloads that fail to decode are
/// skipped, not rejected.
pub fn stale_request_rejections(
    user_id: Uuid,
    pending: &[ModerationRequest],
) -> Vec<Statement> {
    pending
        .iter()
        .filter(|request| {
            matches!(
                request.request_type,
                RequestType::ArtistAdd | RequestType::ArtistEdit
            ) && request.status == RequestStatus::Pending
        })
        .filter(|request| {
            RequestPayload::decode(request.request_type, &request.data)
                .ok()
                .and_then(|payload| payload.proposed_members().map(|m| m.contains(&user_id)))
                .unwrap_or(false)
        })
        .map(|request| Statement::SetRequestStatus {
            request_id: request.id,
            status: RequestStatus::Rejected,
        })
        .collect()
}

/// Full user-deletion cascade: the user row, every request they submitted
/// or are targeted by, every booking they created with its child dates,
/// their owned artists, their memberships elsewhere, and any pending artist
/// proposal that still references them. One plan, one batch.
pub fn user_deletion_plan(
    user_id: Uuid,
    all_artists: &[Artist],
    pending_artist_requests: &[ModerationRequest],
) -> Vec<Statement> {
    let mut statements = vec![
        Statement::DeleteUser { user_id },
        Statement::DeleteRequestsInvolving { user_id },
        Statement::DeleteBookingDatesCreatedBy { user_id },
        Statement::DeleteBookingsCreatedBy { user_id },
    ];

    for artist in all_artists {
        if artist.owner_id == user_id {
            statements.push(Statement::DeleteArtist {
                artist_id: artist.id,
            });
            statements.push(Statement::DeleteRequestsTargeting {
                target_id: artist.id,
            });
        } else {
            statements.extend(remove_member(user_id, artist));
        }
    }

    statements.extend(stale_request_rejections(user_id, pending_artist_requests));
    statements
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::artist::ImagePreference;
    use crate::db::models::requests::EntityStatus;
    use serde_json::json;
    use sqlx::types::Json;

    fn artist(owner_id: Uuid, members: Vec<Uuid>) -> Artist {
        Artist {
            id: Uuid::new_v4(),
            name: "Act".into(),
            location: None,
            bio: None,
            image: None,
            image_preference: ImagePreference::Provider,
            owner_id,
            members: Json(members),
            status: EntityStatus::Approved,
            chapters: Json(vec![]),
            created_at: None,
        }
    }

    fn pending_artist_edit(data: serde_json::Value) -> ModerationRequest {
        ModerationRequest {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            request_type: RequestType::ArtistEdit,
            target_id: Some(Uuid::new_v4()),
            data,
            status: RequestStatus::Pending,
            created_at: None,
        }
    }

    #[test]
    fn removal_shrinks_member_set() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let act = artist(b, vec![a, b]);

        let plan = membership_removal_plan(a, &[act.clone()]);
        assert_eq!(
            plan,
            vec![Statement::SetArtistMembers {
                artist_id: act.id,
                members: vec![b],
            }]
        );
    }

    #[test]
    fn removing_last_member_deletes_artist_and_its_requests() {
        let a = Uuid::new_v4();
        let act = artist(a, vec![a]);

        let plan = membership_removal_plan(a, &[act.clone()]);
        assert_eq!(
            plan,
            vec![
                Statement::DeleteArtist { artist_id: act.id },
                Statement::DeleteRequestsTargeting { target_id: act.id },
            ]
        );
    }

    #[test]
    fn uninvolved_artist_is_untouched() {
        let user = Uuid::new_v4();
        let act = artist(Uuid::new_v4(), vec![Uuid::new_v4()]);
        assert!(membership_removal_plan(user, &[act]).is_empty());
    }

    #[test]
    fn stale_proposals_mentioning_user_are_rejected() {
        let user = Uuid::new_v4();
        let stale = pending_artist_edit(json!({ "name": "Act", "members": [user] }));
        let unrelated = pending_artist_edit(json!({ "name": "Other", "members": [Uuid::new_v4()] }));

        let plan = stale_request_rejections(user, &[stale.clone(), unrelated]);
        assert_eq!(
            plan,
            vec![Statement::SetRequestStatus {
                request_id: stale.id,
                status: RequestStatus::Rejected,
            }]
        );
    }

    #[test]
    fn malformed_stale_payload_is_skipped() {
        let user = Uuid::new_v4();
        let malformed = pending_artist_edit(json!({ "members": "not-an-array" }));
        assert!(stale_request_rejections(user, &[malformed]).is_empty());
    }

    #[test]
    fn deletion_cascade_covers_owned_artists_and_memberships() {
        let user = Uuid::new_v4();
        let other = Uuid::new_v4();
        let owned = artist(user, vec![user, other]);
        let joined = artist(other, vec![other, user]);

        let plan = user_deletion_plan(user, &[owned.clone(), joined.clone()], &[]);

        assert!(plan.contains(&Statement::DeleteUser { user_id: user }));
        assert!(plan.contains(&Statement::DeleteRequestsInvolving { user_id: user }));
        assert!(plan.contains(&Statement::DeleteBookingsCreatedBy { user_id: user }));
        assert!(plan.contains(&Statement::DeleteArtist { artist_id: owned.id }));
        assert!(plan.contains(&Statement::DeleteRequestsTargeting { target_id: owned.id }));
        assert!(plan.contains(&Statement::SetArtistMembers {
            artist_id: joined.id,
            members: vec![other],
        }));
    }
}
