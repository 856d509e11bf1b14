//! The approval engine: turns a pending request into the ordered statement
//! batch that realizes it, plus side-effect cleanup, and executes the batch
//! atomically. Planning is pure (request + payload + pre-fetched context in,
//! statements out); the engine wraps it with the read phase, the
//! authorization capability it was constructed with, and the write phase.

use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::db::models::artist::Artist;
use crate::db::models::requests::{EntityStatus, ModerationRequest, RequestStatus};
use crate::db::models::user::Role;
use crate::middleware::auth::{Actor, AdminPolicy};
use crate::workflow::cleanup::{membership_removal_plan, stale_request_rejections};
use crate::workflow::payload::RequestPayload;
use crate::workflow::plan::{execute_batch, ArtistSeed, Statement};
use crate::workflow::PlanError;

#[derive(Debug, Error)]
pub enum ApprovalError {
    #[error("administrator privileges required")]
    Forbidden,
    #[error("request not found")]
    NotFound,
    /// Re-moderating a terminal request is an error, never a silent success.
    #[error("request is already {0:?}")]
    AlreadyModerated(RequestStatus),
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error("storage error: {0}")]
    Db(#[from] sqlx::Error),
}

/// Seed fields for synthesizing a solo artist, read from the target user's
/// row before planning.
#[derive(Debug, Clone, FromRow)]
pub struct SoloArtistSeed {
    pub name: Option<String>,
    pub image: Option<String>,
    pub chapters: Json<Vec<Uuid>>,
}

impl Default for SoloArtistSeed {
    fn default() -> Self {
        Self {
            name: None,
            image: None,
            chapters: Json(Vec::new()),
        }
    }
}

/// Everything the read phase gathers so planning can stay pure.
#[derive(Debug, Default)]
pub struct ApprovalContext {
    /// Whether the target user already owns an artist record. Guards the
    /// solo-artist synthesis against duplicates on repeated approvals.
    pub owned_artist_exists: bool,
    pub solo_seed: SoloArtistSeed,
    /// Artists whose member sets contain the target user; only loaded when
    /// the request demotes them to Audience.
    pub member_artists: Vec<Artist>,
    /// All pending artist proposals, for stale-member rejection.
    pub pending_artist_requests: Vec<ModerationRequest>,
}

/// A performing member who owns no act gets a solo entry so they appear on
/// the roster immediately. Callers must suppress this when an owned artist
/// already exists.
pub fn synthesize_solo_artist(
    owner_id: Uuid,
    name: Option<String>,
    location: Option<String>,
    bio: Option<String>,
    seed: &SoloArtistSeed,
) -> Statement {
    Statement::InsertArtist(ArtistSeed {
        id: Uuid::new_v4(),
        name: name
            .or_else(|| seed.name.clone())
            .unwrap_or_else(|| "New Artist".to_string()),
        location,
        bio,
        image: seed.image.clone(),
        owner_id,
        status: EntityStatus::Approved,
        members: vec![owner_id],
        chapters: seed.chapters.0.clone(),
    })
}

/// Build the statement batch that realizes an approved request. The final
/// statement always flips the request itself to APPROVED so the whole
/// transition commits or fails as one unit.
pub fn plan_approval(
    request: &ModerationRequest,
    payload: &RequestPayload,
    ctx: &ApprovalContext,
) -> Result<Vec<Statement>, PlanError> {
    let mut statements = Vec::new();

    match payload {
        RequestPayload::RoleChange(p) => {
            let user_id = request.user_id;
            statements.push(Statement::UpdateUserRole {
                user_id,
                role: p.role,
                director_chapters: p.director_chapters.clone(),
            });

            if p.role.is_performing() {
                if !ctx.owned_artist_exists {
                    statements.push(synthesize_solo_artist(
                        user_id,
                        None,
                        p.location.clone(),
                        p.bio.clone(),
                        &ctx.solo_seed,
                    ));
                }
            } else if p.role == Role::Audience {
                statements.extend(membership_removal_plan(user_id, &ctx.member_artists));
                statements.extend(stale_request_rejections(
                    user_id,
                    &ctx.pending_artist_requests,
                ));
            }
        }
        RequestPayload::UserEdit(p) => {
            let user_id = request.target_id.ok_or(PlanError::MissingTarget)?;
            let role = p.role.unwrap_or(Role::Audience);
            statements.push(Statement::UpdateUserProfile {
                user_id,
                name: p.name.clone(),
                location: p.location.clone(),
                bio: p.bio.clone(),
                chapters: p.chapters.clone().unwrap_or_default(),
                role,
                director_chapters: p.director_chapters.clone(),
            });

            if role.is_performing() {
                if !ctx.owned_artist_exists {
                    statements.push(synthesize_solo_artist(
                        user_id,
                        p.name.clone(),
                        p.location.clone(),
                        p.bio.clone(),
                        &ctx.solo_seed,
                    ));
                }
            } else if role == Role::Audience {
                statements.extend(membership_removal_plan(user_id, &ctx.member_artists));
                statements.extend(stale_request_rejections(
                    user_id,
                    &ctx.pending_artist_requests,
                ));
            }
        }
        RequestPayload::ArtistEdit(p) => {
            let artist_id = request.target_id.ok_or(PlanError::MissingTarget)?;
            // Also covers a previously rejected-then-resubmitted artist:
            // approval of the edit re-approves the row.
            statements.push(Statement::UpdateArtist {
                artist_id,
                name: p.name.clone(),
                location: p.location.clone(),
                bio: p.bio.clone(),
                image: p.image.clone(),
                chapters: p.chapters.clone().unwrap_or_default(),
                members: p.members.clone().unwrap_or_default(),
                status: EntityStatus::Approved,
            });
        }
        RequestPayload::ArtistAdd(_) => {
            // The PENDING row with its field values was written at
            // submission time; approval only flips it.
            let artist_id = request.target_id.ok_or(PlanError::MissingTarget)?;
            statements.push(Statement::SetArtistStatus {
                artist_id,
                status: EntityStatus::Approved,
            });
        }
        RequestPayload::BookingEdit(p) => {
            let booking_id = request.target_id.ok_or(PlanError::MissingTarget)?;
            statements.push(Statement::UpdateBookingContact {
                booking_id,
                name: p.name.clone(),
                email: p.email.clone(),
                phone: p.phone.clone(),
                questions: p.questions.clone(),
                status: EntityStatus::Approved,
            });
            statements.push(Statement::DeleteBookingDates { booking_id });
            for date in &p.dates {
                statements.push(Statement::InsertBookingDate {
                    booking_id,
                    date: date.clone(),
                });
            }
        }
        RequestPayload::BookingInquiry(_) => {
            let booking_id = request.target_id.ok_or(PlanError::MissingTarget)?;
            statements.push(Statement::SetBookingStatus {
                booking_id,
                status: EntityStatus::Approved,
            });
        }
    }

    statements.push(Statement::SetRequestStatus {
        request_id: request.id,
        status: RequestStatus::Approved,
    });

    Ok(statements)
}

/// The admin-facing state machine over requests. Constructed with the
/// authorization capability so policy is injected, not global.
#[derive(Clone)]
pub struct ApprovalEngine {
    pool: PgPool,
    policy: AdminPolicy,
}

impl ApprovalEngine {
    pub fn new(pool: PgPool, policy: AdminPolicy) -> Self {
        Self { pool, policy }
    }

    async fn fetch_request(&self, request_id: Uuid) -> Result<ModerationRequest, ApprovalError> {
        sqlx::query_as::<_, ModerationRequest>(
            "SELECT id, user_id, request_type, target_id, data, status, created_at \
             FROM requests WHERE id = $1",
        )
        .bind(request_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(ApprovalError::NotFound)
    }

    async fn load_context(
        &self,
        request: &ModerationRequest,
        payload: &RequestPayload,
    ) -> Result<ApprovalContext, ApprovalError> {
        let mut ctx = ApprovalContext::default();

        match payload {
            RequestPayload::RoleChange(p) => {
                self.load_user_context(&mut ctx, request.user_id, p.role)
                    .await?;
            }
            RequestPayload::UserEdit(p) => {
                let target = request.target_id.ok_or(PlanError::MissingTarget)?;
                let role = p.role.unwrap_or(Role::Audience);
                self.load_user_context(&mut ctx, target, role).await?;
            }
            RequestPayload::ArtistEdit(_) | RequestPayload::ArtistAdd(_) => {
                let target = request.target_id.ok_or(PlanError::MissingTarget)?;
                self.require_exists("artists", target).await?;
            }
            RequestPayload::BookingEdit(_) | RequestPayload::BookingInquiry(_) => {
                let target = request.target_id.ok_or(PlanError::MissingTarget)?;
                self.require_exists("bookings", target).await?;
            }
        }

        Ok(ctx)
    }

    async fn load_user_context(
        &self,
        ctx: &mut ApprovalContext,
        user_id: Uuid,
        new_role: Role,
    ) -> Result<(), ApprovalError> {
        let seed = sqlx::query_as::<_, SoloArtistSeed>(
            "SELECT name, image, chapters FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(ApprovalError::NotFound)?;
        ctx.solo_seed = seed;

        if new_role.is_performing() {
            ctx.owned_artist_exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM artists WHERE owner_id = $1)",
            )
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        } else if new_role == Role::Audience {
            ctx.member_artists = sqlx::query_as::<_, Artist>(
                "SELECT id, name, location, bio, image, image_preference, owner_id, members, \
                 status, chapters, created_at FROM artists WHERE members @> $1",
            )
            .bind(Json(vec![user_id]))
            .fetch_all(&self.pool)
            .await?;

            ctx.pending_artist_requests = pending_artist_proposals(&self.pool).await?;
        }

        Ok(())
    }

    async fn require_exists(&self, table: &str, id: Uuid) -> Result<(), ApprovalError> {
        // `table` is a compile-time constant at both call sites.
        let exists = sqlx::query_scalar::<_, bool>(&format!(
            "SELECT EXISTS(SELECT 1 FROM {table} WHERE id = $1)"
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        if exists {
            Ok(())
        } else {
            Err(ApprovalError::NotFound)
        }
    }

    fn require_admin(&self, actor: &Actor) -> Result<(), ApprovalError> {
        if self.policy.is_admin(&actor.email) {
            Ok(())
        } else {
            Err(ApprovalError::Forbidden)
        }
    }

    fn require_pending(request: &ModerationRequest) -> Result<(), ApprovalError> {
        if request.status == RequestStatus::Pending {
            Ok(())
        } else {
            Err(ApprovalError::AlreadyModerated(request.status))
        }
    }

    /// Approve a pending request: one read phase, one atomic write phase.
    pub async fn approve(
        &self,
        actor: &Actor,
        request_id: Uuid,
    ) -> Result<ModerationRequest, ApprovalError> {
        self.require_admin(actor)?;

        let request = self.fetch_request(request_id).await?;
        Self::require_pending(&request)?;

        let payload = RequestPayload::decode(request.request_type, &request.data)?;
        let ctx = self.load_context(&request, &payload).await?;
        let statements = plan_approval(&request, &payload, &ctx)?;

        let statement_count = statements.len();
        execute_batch(&self.pool, statements).await?;

        info!(
            request_id = %request.id,
            request_type = ?request.request_type,
            statement_count,
            "request approved"
        );
        Ok(request)
    }

    /// Reject a pending request. Flips status only; every target entity row
    /// is left untouched.
    pub async fn reject(
        &self,
        actor: &Actor,
        request_id: Uuid,
    ) -> Result<ModerationRequest, ApprovalError> {
        self.require_admin(actor)?;

        let request = self.fetch_request(request_id).await?;
        Self::require_pending(&request)?;

        execute_batch(
            &self.pool,
            vec![Statement::SetRequestStatus {
                request_id: request.id,
                status: RequestStatus::Rejected,
            }],
        )
        .await?;

        info!(request_id = %request.id, request_type = ?request.request_type, "request rejected");
        Ok(request)
    }
}

/// All pending artist proposals, for stale-member cleanup call sites.
pub async fn pending_artist_proposals(
    pool: &PgPool,
) -> Result<Vec<ModerationRequest>, sqlx::Error> {
    sqlx::query_as::<_, ModerationRequest>(
        "SELECT id, user_id, request_type, target_id, data, status, created_at FROM requests \
         WHERE status = 'pending' AND request_type IN ('artist_add', 'artist_edit')",
    )
    .fetch_all(pool)
    .await
}

/// Artists whose member sets contain the user. Shared by the admin direct
/// update path and the deletion cascade.
pub async fn artists_with_member(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<Artist>, sqlx::Error> {
    sqlx::query_as::<_, Artist>(
        "SELECT id, name, location, bio, image, image_preference, owner_id, members, status, \
         chapters, created_at FROM artists WHERE members @> $1",
    )
    .bind(Json(vec![user_id]))
    .fetch_all(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::artist::ImagePreference;
    use crate::db::models::requests::RequestType;
    use serde_json::json;

    fn request(
        request_type: RequestType,
        user_id: Uuid,
        target_id: Option<Uuid>,
        data: serde_json::Value,
    ) -> ModerationRequest {
        ModerationRequest {
            id: Uuid::new_v4(),
            user_id,
            request_type,
            target_id,
            data,
            status: RequestStatus::Pending,
            created_at: None,
        }
    }

    fn decode(r: &ModerationRequest) -> RequestPayload {
        RequestPayload::decode(r.request_type, &r.data).unwrap()
    }

    #[test]
    fn role_change_to_director_synthesizes_solo_artist() {
        let user = Uuid::new_v4();
        let chapter = Uuid::new_v4();
        let req = request(
            RequestType::RoleChange,
            user,
            Some(user),
            json!({ "role": "ChapterDirector", "director_chapters": [chapter] }),
        );
        let ctx = ApprovalContext {
            owned_artist_exists: false,
            solo_seed: SoloArtistSeed {
                name: Some("Sam Reyes".into()),
                image: Some("/media/sam.jpg".into()),
                chapters: Json(vec![chapter]),
            },
            ..Default::default()
        };

        let plan = plan_approval(&req, &decode(&req), &ctx).unwrap();

        assert_eq!(
            plan[0],
            Statement::UpdateUserRole {
                user_id: user,
                role: Role::ChapterDirector,
                director_chapters: Some(vec![chapter]),
            }
        );
        match &plan[1] {
            Statement::InsertArtist(seed) => {
                assert_eq!(seed.name, "Sam Reyes");
                assert_eq!(seed.owner_id, user);
                assert_eq!(seed.members, vec![user]);
                assert_eq!(seed.chapters, vec![chapter]);
                assert_eq!(seed.status, EntityStatus::Approved);
            }
            other => panic!("expected solo artist insert, got {other:?}"),
        }
        assert_eq!(
            plan.last(),
            Some(&Statement::SetRequestStatus {
                request_id: req.id,
                status: RequestStatus::Approved,
            })
        );
    }

    #[test]
    fn existing_owned_artist_suppresses_synthesis() {
        let user = Uuid::new_v4();
        let req = request(
            RequestType::RoleChange,
            user,
            Some(user),
            json!({ "role": "Musician" }),
        );
        let ctx = ApprovalContext {
            owned_artist_exists: true,
            ..Default::default()
        };

        let plan = plan_approval(&req, &decode(&req), &ctx).unwrap();
        assert_eq!(plan.len(), 2); // role update + request flip, no insert
        assert!(!plan
            .iter()
            .any(|s| matches!(s, Statement::InsertArtist(_))));
    }

    #[test]
    fn demotion_to_audience_runs_membership_cleanup() {
        let user = Uuid::new_v4();
        let other = Uuid::new_v4();
        let act = Artist {
            id: Uuid::new_v4(),
            name: "Duo".into(),
            location: None,
            bio: None,
            image: None,
            image_preference: ImagePreference::Provider,
            owner_id: other,
            members: Json(vec![user, other]),
            status: EntityStatus::Approved,
            chapters: Json(vec![]),
            created_at: None,
        };
        let stale = request(
            RequestType::ArtistEdit,
            other,
            Some(act.id),
            json!({ "name": "Duo", "members": [user, other] }),
        );
        let req = request(
            RequestType::RoleChange,
            user,
            Some(user),
            json!({ "role": "Audience" }),
        );
        let ctx = ApprovalContext {
            member_artists: vec![act.clone()],
            pending_artist_requests: vec![stale.clone()],
            ..Default::default()
        };

        let plan = plan_approval(&req, &decode(&req), &ctx).unwrap();

        assert!(plan.contains(&Statement::SetArtistMembers {
            artist_id: act.id,
            members: vec![other],
        }));
        assert!(plan.contains(&Statement::SetRequestStatus {
            request_id: stale.id,
            status: RequestStatus::Rejected,
        }));
    }

    #[test]
    fn user_edit_without_target_is_rejected() {
        let req = request(
            RequestType::UserEdit,
            Uuid::new_v4(),
            None,
            json!({ "name": "X" }),
        );
        let err = plan_approval(&req, &decode(&req), &ApprovalContext::default());
        assert!(matches!(err, Err(PlanError::MissingTarget)));
    }

    #[test]
    fn artist_add_approval_only_flips_statuses() {
        let artist_id = Uuid::new_v4();
        let req = request(
            RequestType::ArtistAdd,
            Uuid::new_v4(),
            Some(artist_id),
            json!({ "name": "New Act" }),
        );

        let plan = plan_approval(&req, &decode(&req), &ApprovalContext::default()).unwrap();
        assert_eq!(
            plan,
            vec![
                Statement::SetArtistStatus {
                    artist_id,
                    status: EntityStatus::Approved,
                },
                Statement::SetRequestStatus {
                    request_id: req.id,
                    status: RequestStatus::Approved,
                },
            ]
        );
    }

    #[test]
    fn booking_edit_replaces_dates_privately() {
        let booking_id = Uuid::new_v4();
        let req = request(
            RequestType::BookingEdit,
            Uuid::new_v4(),
            Some(booking_id),
            json!({
                "name": "Met Gala",
                "email": "events@example.org",
                "dates": [
                    { "date": "2026-02-01", "time": "19:00", "location": "Main Hall" },
                    { "date": "2026-02-02", "time": "20:00", "location": "Annex" },
                ],
            }),
        );

        let plan = plan_approval(&req, &decode(&req), &ApprovalContext::default()).unwrap();

        assert!(matches!(
            plan[0],
            Statement::UpdateBookingContact {
                status: EntityStatus::Approved,
                ..
            }
        ));
        assert_eq!(plan[1], Statement::DeleteBookingDates { booking_id });
        let inserts = plan
            .iter()
            .filter(|s| matches!(s, Statement::InsertBookingDate { .. }))
            .count();
        assert_eq!(inserts, 2);
    }

    #[test]
    fn booking_inquiry_approval_only_flips_statuses() {
        let booking_id = Uuid::new_v4();
        let req = request(
            RequestType::BookingInquiry,
            Uuid::new_v4(),
            Some(booking_id),
            json!({ "name": "A", "email": "a@b.c" }),
        );

        let plan = plan_approval(&req, &decode(&req), &ApprovalContext::default()).unwrap();
        assert_eq!(
            plan,
            vec![
                Statement::SetBookingStatus {
                    booking_id,
                    status: EntityStatus::Approved,
                },
                Statement::SetRequestStatus {
                    request_id: req.id,
                    status: RequestStatus::Approved,
                },
            ]
        );
    }

    #[test]
    fn user_edit_defaults_role_to_audience() {
        let target = Uuid::new_v4();
        let req = request(
            RequestType::UserEdit,
            Uuid::new_v4(),
            Some(target),
            json!({ "name": "Plain Edit" }),
        );

        let plan = plan_approval(&req, &decode(&req), &ApprovalContext::default()).unwrap();
        match &plan[0] {
            Statement::UpdateUserProfile { role, user_id, .. } => {
                assert_eq!(*role, Role::Audience);
                assert_eq!(*user_id, target);
            }
            other => panic!("expected profile update, got {other:?}"),
        }
    }
}
