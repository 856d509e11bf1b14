//! The closed set of storage mutations the approval and cleanup engines may
//! emit, and the executor that runs an ordered plan as one transaction.
//!
//! Engines build a `Vec<Statement>` purely from data they were handed, so
//! planning is unit-testable without a database; `execute_batch` is the
//! single write path and the sole concurrency boundary: either the whole
//! plan commits or none of it does.

use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::db::models::booking::BookingDateInput;
use crate::db::models::requests::{EntityStatus, RequestStatus, RequestType};
use crate::db::models::user::Role;

/// Field values for a newly synthesized or submitted artist row.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtistSeed {
    pub id: Uuid,
    pub name: String,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub image: Option<String>,
    pub owner_id: Uuid,
    pub status: EntityStatus,
    pub members: Vec<Uuid>,
    pub chapters: Vec<Uuid>,
}

/// Everything needed to insert a new booking inquiry row.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingSeed {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub questions: Option<String>,
    pub created_by: Uuid,
    pub status: EntityStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    UpdateUserRole {
        user_id: Uuid,
        role: Role,
        director_chapters: Option<Vec<Uuid>>,
    },
    UpdateUserProfile {
        user_id: Uuid,
        name: Option<String>,
        location: Option<String>,
        bio: Option<String>,
        chapters: Vec<Uuid>,
        role: Role,
        director_chapters: Option<Vec<Uuid>>,
    },
    UpdateUserBasics {
        user_id: Uuid,
        location: Option<String>,
        bio: Option<String>,
        chapters: Vec<Uuid>,
    },
    DeleteUser {
        user_id: Uuid,
    },
    InsertArtist(ArtistSeed),
    UpdateArtist {
        artist_id: Uuid,
        name: String,
        location: Option<String>,
        bio: Option<String>,
        image: Option<String>,
        chapters: Vec<Uuid>,
        members: Vec<Uuid>,
        status: EntityStatus,
    },
    SetArtistStatus {
        artist_id: Uuid,
        status: EntityStatus,
    },
    SetArtistMembers {
        artist_id: Uuid,
        members: Vec<Uuid>,
    },
    DeleteArtist {
        artist_id: Uuid,
    },
    InsertBooking(BookingSeed),
    UpdateBookingContact {
        booking_id: Uuid,
        name: String,
        email: String,
        phone: Option<String>,
        questions: Option<String>,
        status: EntityStatus,
    },
    DeleteBooking {
        booking_id: Uuid,
    },
    SetBookingStatus {
        booking_id: Uuid,
        status: EntityStatus,
    },
    /// Replace-all step of a booking edit: drop every child date first.
    DeleteBookingDates {
        booking_id: Uuid,
    },
    /// Re-inserted dates always start private; public visibility is an
    /// admin decision independent of the edit.
    InsertBookingDate {
        booking_id: Uuid,
        date: BookingDateInput,
    },
    DeleteBookingsCreatedBy {
        user_id: Uuid,
    },
    DeleteBookingDatesCreatedBy {
        user_id: Uuid,
    },
    InsertRequest {
        request_id: Uuid,
        user_id: Uuid,
        request_type: RequestType,
        target_id: Option<Uuid>,
        data: serde_json::Value,
    },
    SetRequestStatus {
        request_id: Uuid,
        status: RequestStatus,
    },
    /// Drop every request row referencing a deleted entity, pending or not.
    DeleteRequestsTargeting {
        target_id: Uuid,
    },
    /// User-deletion cascade: requests where the user is submitter or target.
    DeleteRequestsInvolving {
        user_id: Uuid,
    },
}

/// Execute an ordered plan inside a single transaction.
pub async fn execute_batch(pool: &PgPool, statements: Vec<Statement>) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    for statement in statements {
        apply(&mut tx, statement).await?;
    }
    tx.commit().await
}

async fn apply(
    tx: &mut Transaction<'_, Postgres>,
    statement: Statement,
) -> Result<(), sqlx::Error> {
    match statement {
        Statement::UpdateUserRole {
            user_id,
            role,
            director_chapters,
        } => {
            sqlx::query(
                "UPDATE users SET role = $1, director_chapters = $2, updated_at = NOW() WHERE id = $3",
            )
            .bind(role)
            .bind(director_chapters.map(Json))
            .bind(user_id)
            .execute(&mut **tx)
            .await?;
        }
        Statement::UpdateUserProfile {
            user_id,
            name,
            location,
            bio,
            chapters,
            role,
            director_chapters,
        } => {
            sqlx::query(
                "UPDATE users SET name = $1, location = $2, bio = $3, chapters = $4, role = $5, \
                 director_chapters = $6, updated_at = NOW() WHERE id = $7",
            )
            .bind(name)
            .bind(location)
            .bind(bio)
            .bind(Json(chapters))
            .bind(role)
            .bind(director_chapters.map(Json))
            .bind(user_id)
            .execute(&mut **tx)
            .await?;
        }
        Statement::UpdateUserBasics {
            user_id,
            location,
            bio,
            chapters,
        } => {
            sqlx::query(
                "UPDATE users SET location = $1, bio = $2, chapters = $3, updated_at = NOW() WHERE id = $4",
            )
            .bind(location)
            .bind(bio)
            .bind(Json(chapters))
            .bind(user_id)
            .execute(&mut **tx)
            .await?;
        }
        Statement::DeleteUser { user_id } => {
            sqlx::query("DELETE FROM users WHERE id = $1")
                .bind(user_id)
                .execute(&mut **tx)
                .await?;
        }
        Statement::InsertArtist(seed) => {
            sqlx::query(
                "INSERT INTO artists (id, name, location, bio, image, image_preference, owner_id, status, members, chapters) \
                 VALUES ($1, $2, $3, $4, $5, 'provider', $6, $7, $8, $9)",
            )
            .bind(seed.id)
            .bind(seed.name)
            .bind(seed.location)
            .bind(seed.bio)
            .bind(seed.image)
            .bind(seed.owner_id)
            .bind(seed.status)
            .bind(Json(seed.members))
            .bind(Json(seed.chapters))
            .execute(&mut **tx)
            .await?;
        }
        Statement::UpdateArtist {
            artist_id,
            name,
            location,
            bio,
            image,
            chapters,
            members,
            status,
        } => {
            sqlx::query(
                "UPDATE artists SET name = $1, location = $2, bio = $3, image = $4, chapters = $5, \
                 members = $6, status = $7 WHERE id = $8",
            )
            .bind(name)
            .bind(location)
            .bind(bio)
            .bind(image)
            .bind(Json(chapters))
            .bind(Json(members))
            .bind(status)
            .bind(artist_id)
            .execute(&mut **tx)
            .await?;
        }
        Statement::SetArtistStatus { artist_id, status } => {
            sqlx::query("UPDATE artists SET status = $1 WHERE id = $2")
                .bind(status)
                .bind(artist_id)
                .execute(&mut **tx)
                .await?;
        }
        Statement::SetArtistMembers { artist_id, members } => {
            sqlx::query("UPDATE artists SET members = $1 WHERE id = $2")
                .bind(Json(members))
                .bind(artist_id)
                .execute(&mut **tx)
                .await?;
        }
        Statement::DeleteArtist { artist_id } => {
            sqlx::query("DELETE FROM artists WHERE id = $1")
                .bind(artist_id)
                .execute(&mut **tx)
                .await?;
        }
        Statement::InsertBooking(seed) => {
            sqlx::query(
                "INSERT INTO bookings (id, name, email, phone, questions, image_preference, created_by, status) \
                 VALUES ($1, $2, $3, $4, $5, 'provider', $6, $7)",
            )
            .bind(seed.id)
            .bind(seed.name)
            .bind(seed.email)
            .bind(seed.phone)
            .bind(seed.questions)
            .bind(seed.created_by)
            .bind(seed.status)
            .execute(&mut **tx)
            .await?;
        }
        Statement::UpdateBookingContact {
            booking_id,
            name,
            email,
            phone,
            questions,
            status,
        } => {
            sqlx::query(
                "UPDATE bookings SET name = $1, email = $2, phone = $3, questions = $4, status = $5 WHERE id = $6",
            )
            .bind(name)
            .bind(email)
            .bind(phone)
            .bind(questions)
            .bind(status)
            .bind(booking_id)
            .execute(&mut **tx)
            .await?;
        }
        Statement::SetBookingStatus { booking_id, status } => {
            sqlx::query("UPDATE bookings SET status = $1 WHERE id = $2")
                .bind(status)
                .bind(booking_id)
                .execute(&mut **tx)
                .await?;
        }
        Statement::DeleteBooking { booking_id } => {
            sqlx::query("DELETE FROM bookings WHERE id = $1")
                .bind(booking_id)
                .execute(&mut **tx)
                .await?;
        }
        Statement::DeleteBookingDates { booking_id } => {
            sqlx::query("DELETE FROM booking_dates WHERE booking_id = $1")
                .bind(booking_id)
                .execute(&mut **tx)
                .await?;
        }
        Statement::InsertBookingDate { booking_id, date } => {
            sqlx::query(
                "INSERT INTO booking_dates (id, booking_id, date, time, duration, event_type, location, description, budget, is_public) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, FALSE)",
            )
            .bind(Uuid::new_v4())
            .bind(booking_id)
            .bind(date.date)
            .bind(date.time)
            .bind(date.duration)
            .bind(date.event_type)
            .bind(date.location)
            .bind(date.description)
            .bind(date.budget)
            .execute(&mut **tx)
            .await?;
        }
        Statement::DeleteBookingsCreatedBy { user_id } => {
            sqlx::query("DELETE FROM bookings WHERE created_by = $1")
                .bind(user_id)
                .execute(&mut **tx)
                .await?;
        }
        Statement::DeleteBookingDatesCreatedBy { user_id } => {
            sqlx::query(
                "DELETE FROM booking_dates WHERE booking_id IN (SELECT id FROM bookings WHERE created_by = $1)",
            )
            .bind(user_id)
            .execute(&mut **tx)
            .await?;
        }
        Statement::InsertRequest {
            request_id,
            user_id,
            request_type,
            target_id,
            data,
        } => {
            sqlx::query(
                "INSERT INTO requests (id, user_id, request_type, target_id, data, status) \
                 VALUES ($1, $2, $3, $4, $5, 'pending')",
            )
            .bind(request_id)
            .bind(user_id)
            .bind(request_type)
            .bind(target_id)
            .bind(data)
            .execute(&mut **tx)
            .await?;
        }
        Statement::SetRequestStatus { request_id, status } => {
            sqlx::query("UPDATE requests SET status = $1 WHERE id = $2")
                .bind(status)
                .bind(request_id)
                .execute(&mut **tx)
                .await?;
        }
        Statement::DeleteRequestsTargeting { target_id } => {
            sqlx::query("DELETE FROM requests WHERE target_id = $1")
                .bind(target_id)
                .execute(&mut **tx)
                .await?;
        }
        Statement::DeleteRequestsInvolving { user_id } => {
            sqlx::query("DELETE FROM requests WHERE user_id = $1 OR target_id = $2")
                .bind(user_id)
                .bind(user_id)
                .execute(&mut **tx)
                .await?;
        }
    }
    Ok(())
}
