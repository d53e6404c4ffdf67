use std::collections::HashMap;

use anyhow::Result;
use rusqlite::Connection;

use crate::Database;
use crate::models::{
    BookingRow, CommentRow, InvitationRow, ProposalRow, ReactionRow, SharedTimelineRow,
    TripMemberRow, TripRow, UserRow, VoteRow, parse_id, parse_ts, parse_ts_opt,
    proposal_status_from_str, trip_status_from_str,
};
use tripbi_types::models::{Booking, Proposal, ProposalDetails, Trip, TripTimezoneSettings};

/// Everything the derived-state orchestrator needs for one trip, read under a
/// single connection lock so the combined view is internally consistent.
pub struct TripSnapshotRows {
    pub trip: TripRow,
    pub members: Vec<TripMemberRow>,
    pub proposals: Vec<ProposalRow>,
    pub votes: Vec<VoteRow>,
    pub reactions: Vec<ReactionRow>,
    pub comments: Vec<CommentRow>,
    pub bookings: Vec<BookingRow>,
}

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        email: &str,
        display_name: Option<&str>,
        password_hash: &str,
        created_at: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, display_name, password, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, email, display_name, password_hash, created_at],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    // -- Trips --

    /// Create a trip and its creator's admin membership in one transaction.
    pub fn create_trip(&self, trip: &TripRow, creator: &TripMemberRow) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            insert_trip(&tx, trip)?;
            insert_member(&tx, creator)?;
            tx.commit()?;
            Ok(())
        })
    }

    pub fn get_trip(&self, trip_id: &str) -> Result<Option<(TripRow, Vec<TripMemberRow>)>> {
        self.with_conn(|conn| {
            let Some(trip) = query_trip(conn, trip_id)? else {
                return Ok(None);
            };
            let members = query_members(conn, trip_id)?;
            Ok(Some((trip, members)))
        })
    }

    pub fn list_trips_for_user(&self, user_id: &str) -> Result<Vec<(TripRow, Vec<TripMemberRow>)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT t.id FROM trips t
                 JOIN trip_members m ON m.trip_id = t.id
                 WHERE m.user_id = ?1
                 ORDER BY t.start_date",
            )?;
            let ids = stmt
                .query_map([user_id], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let mut trips = Vec::with_capacity(ids.len());
            for id in ids {
                if let Some(trip) = query_trip(conn, &id)? {
                    let members = query_members(conn, &id)?;
                    trips.push((trip, members));
                }
            }
            Ok(trips)
        })
    }

    pub fn update_trip(&self, trip: &TripRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE trips SET
                    name = ?2, destination = ?3, description = ?4,
                    start_date = ?5, end_date = ?6, updated_at = ?7, status = ?8,
                    splitbi_group_id = ?9, home_timezone = ?10,
                    destination_timezone = ?11, show_home_time = ?12
                 WHERE id = ?1",
                rusqlite::params![
                    trip.id,
                    trip.name,
                    trip.destination,
                    trip.description,
                    trip.start_date,
                    trip.end_date,
                    trip.updated_at,
                    trip.status,
                    trip.splitbi_group_id,
                    trip.home_timezone,
                    trip.destination_timezone,
                    trip.show_home_time,
                ],
            )?;
            Ok(())
        })
    }

    /// Cascades to members, proposals (and their votes/reactions/comments),
    /// bookings and invitations via foreign keys.
    pub fn delete_trip(&self, trip_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM trips WHERE id = ?1", [trip_id])?;
            Ok(())
        })
    }

    pub fn is_trip_member(&self, trip_id: &str, user_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM trip_members WHERE trip_id = ?1 AND user_id = ?2",
                [trip_id, user_id],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    pub fn member_count(&self, trip_id: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM trip_members WHERE trip_id = ?1",
                [trip_id],
                |row| row.get(0),
            )?;
            Ok(count as usize)
        })
    }

    // -- Proposals --

    pub fn insert_proposal(&self, proposal: &ProposalRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO proposals
                    (id, trip_id, category, status, title, description,
                     location, price, link, created_by, created_at, updated_at,
                     scheduled_date, scheduled_time)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                rusqlite::params![
                    proposal.id,
                    proposal.trip_id,
                    proposal.category,
                    proposal.status,
                    proposal.title,
                    proposal.description,
                    proposal.location,
                    proposal.price,
                    proposal.link,
                    proposal.created_by,
                    proposal.created_at,
                    proposal.updated_at,
                    proposal.scheduled_date,
                    proposal.scheduled_time,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_proposal(&self, proposal_id: &str) -> Result<Option<ProposalRow>> {
        self.with_conn(|conn| query_proposal(conn, proposal_id))
    }

    pub fn update_proposal(&self, proposal: &ProposalRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE proposals SET
                    title = ?2, description = ?3, location = ?4, price = ?5,
                    link = ?6, updated_at = ?7, scheduled_date = ?8, scheduled_time = ?9
                 WHERE id = ?1",
                rusqlite::params![
                    proposal.id,
                    proposal.title,
                    proposal.description,
                    proposal.location,
                    proposal.price,
                    proposal.link,
                    proposal.updated_at,
                    proposal.scheduled_date,
                    proposal.scheduled_time,
                ],
            )?;
            Ok(())
        })
    }

    pub fn set_proposal_status(&self, proposal_id: &str, status: &str, updated_at: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE proposals SET status = ?2, updated_at = ?3 WHERE id = ?1",
                rusqlite::params![proposal_id, status, updated_at],
            )?;
            Ok(())
        })
    }

    pub fn count_proposals_for_trip(&self, trip_id: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM proposals WHERE trip_id = ?1",
                [trip_id],
                |row| row.get(0),
            )?;
            Ok(count as usize)
        })
    }

    // -- Votes & reactions --

    /// Atomic set-or-replace: a member's re-vote never transits through a
    /// deleted state, so readers see exactly one vote per (proposal, user).
    pub fn upsert_vote(
        &self,
        proposal_id: &str,
        user_id: &str,
        vote: &str,
        timestamp: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO votes (proposal_id, user_id, vote, timestamp)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (proposal_id, user_id)
                 DO UPDATE SET vote = excluded.vote, timestamp = excluded.timestamp",
                rusqlite::params![proposal_id, user_id, vote, timestamp],
            )?;
            Ok(())
        })
    }

    /// Same keyed-upsert rule as votes.
    pub fn upsert_reaction(
        &self,
        proposal_id: &str,
        user_id: &str,
        reaction: &str,
        timestamp: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO reactions (proposal_id, user_id, reaction, timestamp)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (proposal_id, user_id)
                 DO UPDATE SET reaction = excluded.reaction, timestamp = excluded.timestamp",
                rusqlite::params![proposal_id, user_id, reaction, timestamp],
            )?;
            Ok(())
        })
    }

    pub fn get_votes_for_proposal(&self, proposal_id: &str) -> Result<Vec<VoteRow>> {
        self.with_conn(|conn| query_votes(conn, &[proposal_id.to_string()]))
    }

    // -- Comments --

    pub fn insert_comment(&self, comment: &CommentRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO comments (id, proposal_id, user_id, text, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    comment.id,
                    comment.proposal_id,
                    comment.user_id,
                    comment.text,
                    comment.timestamp,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_comment(&self, comment_id: &str) -> Result<Option<CommentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, proposal_id, user_id, text, timestamp, edited_at
                 FROM comments WHERE id = ?1",
            )?;
            stmt.query_row([comment_id], |row| {
                Ok(CommentRow {
                    id: row.get(0)?,
                    proposal_id: row.get(1)?,
                    user_id: row.get(2)?,
                    text: row.get(3)?,
                    timestamp: row.get(4)?,
                    edited_at: row.get(5)?,
                })
            })
            .optional()
        })
    }

    pub fn edit_comment(&self, comment_id: &str, text: &str, edited_at: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE comments SET text = ?2, edited_at = ?3 WHERE id = ?1",
                rusqlite::params![comment_id, text, edited_at],
            )?;
            Ok(())
        })
    }

    pub fn delete_comment(&self, comment_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM comments WHERE id = ?1", [comment_id])?;
            Ok(())
        })
    }

    // -- Bookings --

    /// Keyed upsert on (trip, proposal, user); the UNIQUE constraint backs the
    /// composite-id convention even for callers that bypass it.
    pub fn upsert_booking(&self, booking: &BookingRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO bookings
                    (id, trip_id, proposal_id, user_id, status, confirmation_number,
                     proof_url, notes, booked_for_count, booked_at, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                 ON CONFLICT (trip_id, proposal_id, user_id)
                 DO UPDATE SET
                    status = excluded.status,
                    confirmation_number = excluded.confirmation_number,
                    notes = excluded.notes,
                    booked_for_count = excluded.booked_for_count,
                    booked_at = excluded.booked_at,
                    updated_at = excluded.updated_at",
                rusqlite::params![
                    booking.id,
                    booking.trip_id,
                    booking.proposal_id,
                    booking.user_id,
                    booking.status,
                    booking.confirmation_number,
                    booking.proof_url,
                    booking.notes,
                    booking.booked_for_count,
                    booking.booked_at,
                    booking.created_at,
                    booking.updated_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_booking(&self, booking_id: &str) -> Result<Option<BookingRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{BOOKING_SELECT} WHERE id = ?1"))?;
            stmt.query_row([booking_id], booking_from_row).optional()
        })
    }

    pub fn set_booking_proof(&self, booking_id: &str, proof_url: &str, updated_at: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE bookings SET proof_url = ?2, updated_at = ?3 WHERE id = ?1",
                rusqlite::params![booking_id, proof_url, updated_at],
            )?;
            Ok(())
        })
    }

    pub fn list_bookings_for_trip(&self, trip_id: &str) -> Result<Vec<BookingRow>> {
        self.with_conn(|conn| query_bookings(conn, trip_id))
    }

    pub fn list_bookings_for_user(&self, user_id: &str) -> Result<Vec<BookingRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("{BOOKING_SELECT} WHERE user_id = ?1 ORDER BY created_at"))?;
            let rows = stmt
                .query_map([user_id], booking_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Invitations --

    pub fn insert_invitation(&self, invitation: &InvitationRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO invitations
                    (id, trip_id, trip_name, email, token, status, created_by,
                     created_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                rusqlite::params![
                    invitation.id,
                    invitation.trip_id,
                    invitation.trip_name,
                    invitation.email,
                    invitation.token,
                    invitation.status,
                    invitation.created_by,
                    invitation.created_at,
                    invitation.expires_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_invitation_by_token(&self, token: &str) -> Result<Option<InvitationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, trip_id, trip_name, email, token, status, created_by,
                        created_at, expires_at, accepted_by, accepted_at
                 FROM invitations WHERE token = ?1",
            )?;
            stmt.query_row([token], |row| {
                Ok(InvitationRow {
                    id: row.get(0)?,
                    trip_id: row.get(1)?,
                    trip_name: row.get(2)?,
                    email: row.get(3)?,
                    token: row.get(4)?,
                    status: row.get(5)?,
                    created_by: row.get(6)?,
                    created_at: row.get(7)?,
                    expires_at: row.get(8)?,
                    accepted_by: row.get(9)?,
                    accepted_at: row.get(10)?,
                })
            })
            .optional()
        })
    }

    /// Accept an invitation: add the member and mark the invitation accepted
    /// in one transaction, so a crash can never leave a member without a
    /// consumed invitation or vice versa.
    pub fn accept_invitation(
        &self,
        invitation_id: &str,
        member: &TripMemberRow,
        accepted_at: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            insert_member(&tx, member)?;
            tx.execute(
                "UPDATE invitations
                 SET status = 'accepted', accepted_by = ?2, accepted_at = ?3
                 WHERE id = ?1",
                rusqlite::params![invitation_id, member.user_id, accepted_at],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    // -- Shared timelines --

    pub fn insert_shared_timeline(&self, shared: &SharedTimelineRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO shared_timelines
                    (id, trip_id, trip_name, destination, start_date, end_date,
                     token, created_by, created_at, expires_at, proposals_json)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                rusqlite::params![
                    shared.id,
                    shared.trip_id,
                    shared.trip_name,
                    shared.destination,
                    shared.start_date,
                    shared.end_date,
                    shared.token,
                    shared.created_by,
                    shared.created_at,
                    shared.expires_at,
                    shared.proposals_json,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_shared_timeline_by_token(&self, token: &str) -> Result<Option<SharedTimelineRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, trip_id, trip_name, destination, start_date, end_date,
                        token, created_by, created_at, expires_at, proposals_json
                 FROM shared_timelines WHERE token = ?1",
            )?;
            stmt.query_row([token], |row| {
                Ok(SharedTimelineRow {
                    id: row.get(0)?,
                    trip_id: row.get(1)?,
                    trip_name: row.get(2)?,
                    destination: row.get(3)?,
                    start_date: row.get(4)?,
                    end_date: row.get(5)?,
                    token: row.get(6)?,
                    created_by: row.get(7)?,
                    created_at: row.get(8)?,
                    expires_at: row.get(9)?,
                    proposals_json: row.get(10)?,
                })
            })
            .optional()
        })
    }

    // -- Snapshot --

    /// Load everything the orchestrator needs for one trip under a single
    /// lock hold, so the combined view is internally consistent.
    pub fn load_trip_snapshot(&self, trip_id: &str) -> Result<Option<TripSnapshotRows>> {
        self.with_conn(|conn| {
            let Some(trip) = query_trip(conn, trip_id)? else {
                return Ok(None);
            };
            let members = query_members(conn, trip_id)?;
            let proposals = query_proposals_for_trip(conn, trip_id)?;
            let proposal_ids: Vec<String> = proposals.iter().map(|p| p.id.clone()).collect();
            let votes = query_votes(conn, &proposal_ids)?;
            let reactions = query_reactions(conn, &proposal_ids)?;
            let comments = query_comments(conn, &proposal_ids)?;
            let bookings = query_bookings(conn, trip_id)?;

            Ok(Some(TripSnapshotRows {
                trip,
                members,
                proposals,
                votes,
                reactions,
                comments,
                bookings,
            }))
        })
    }
}

// -- Model assembly --

pub fn assemble_trip(row: TripRow, member_rows: Vec<TripMemberRow>) -> Result<Trip> {
    let members = member_rows
        .into_iter()
        .map(TripMemberRow::into_model)
        .collect::<Result<Vec<_>>>()?;

    let timezone_settings = match (&row.home_timezone, &row.destination_timezone) {
        (Some(home), Some(destination)) => Some(TripTimezoneSettings {
            home_timezone: home.clone(),
            destination_timezone: destination.clone(),
            show_home_time: row.show_home_time.unwrap_or(false),
        }),
        _ => None,
    };

    Ok(Trip {
        id: parse_id(&row.id)?,
        name: row.name,
        destination: row.destination,
        description: row.description,
        start_date: parse_ts(&row.start_date)?,
        end_date: parse_ts(&row.end_date)?,
        created_by: parse_id(&row.created_by)?,
        created_at: parse_ts(&row.created_at)?,
        updated_at: parse_ts(&row.updated_at)?,
        members: members.iter().map(|m| m.user_id).collect(),
        member_details: members,
        status: trip_status_from_str(&row.status)?,
        splitbi_group_id: row.splitbi_group_id,
        timezone_settings,
    })
}

pub fn assemble_proposal(
    row: ProposalRow,
    votes: Vec<VoteRow>,
    reactions: Vec<ReactionRow>,
    comments: Vec<CommentRow>,
) -> Result<Proposal> {
    Ok(Proposal {
        id: parse_id(&row.id)?,
        trip_id: parse_id(&row.trip_id)?,
        category: crate::models::category_from_str(&row.category)?,
        status: proposal_status_from_str(&row.status)?,
        title: row.title,
        description: row.description,
        details: ProposalDetails {
            location: row.location,
            price: row.price,
            link: row.link,
        },
        created_by: parse_id(&row.created_by)?,
        created_at: parse_ts(&row.created_at)?,
        updated_at: parse_ts(&row.updated_at)?,
        scheduled_date: parse_ts_opt(&row.scheduled_date)?,
        scheduled_time: row.scheduled_time,
        votes: votes.into_iter().map(VoteRow::into_model).collect::<Result<_>>()?,
        comments: comments.into_iter().map(CommentRow::into_model).collect::<Result<_>>()?,
        reactions: reactions.into_iter().map(ReactionRow::into_model).collect::<Result<_>>()?,
    })
}

/// Assemble a full snapshot into domain models, distributing child rows to
/// their proposals by id.
pub fn assemble_snapshot(rows: TripSnapshotRows) -> Result<(Trip, Vec<Proposal>, Vec<Booking>)> {
    let trip = assemble_trip(rows.trip, rows.members)?;

    let mut votes_by_proposal: HashMap<String, Vec<VoteRow>> = HashMap::new();
    for vote in rows.votes {
        votes_by_proposal.entry(vote.proposal_id.clone()).or_default().push(vote);
    }
    let mut reactions_by_proposal: HashMap<String, Vec<ReactionRow>> = HashMap::new();
    for reaction in rows.reactions {
        reactions_by_proposal.entry(reaction.proposal_id.clone()).or_default().push(reaction);
    }
    let mut comments_by_proposal: HashMap<String, Vec<CommentRow>> = HashMap::new();
    for comment in rows.comments {
        comments_by_proposal.entry(comment.proposal_id.clone()).or_default().push(comment);
    }

    let proposals = rows
        .proposals
        .into_iter()
        .map(|row| {
            let votes = votes_by_proposal.remove(&row.id).unwrap_or_default();
            let reactions = reactions_by_proposal.remove(&row.id).unwrap_or_default();
            let comments = comments_by_proposal.remove(&row.id).unwrap_or_default();
            assemble_proposal(row, votes, reactions, comments)
        })
        .collect::<Result<Vec<_>>>()?;

    let bookings = rows
        .bookings
        .into_iter()
        .map(BookingRow::into_model)
        .collect::<Result<Vec<_>>>()?;

    Ok((trip, proposals, bookings))
}

// -- Row queries --

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    // `column` is a compile-time constant at every call site
    let mut stmt = conn.prepare(&format!(
        "SELECT id, email, display_name, photo_url, password, created_at
         FROM users WHERE {column} = ?1"
    ))?;

    stmt.query_row([value], |row| {
        Ok(UserRow {
            id: row.get(0)?,
            email: row.get(1)?,
            display_name: row.get(2)?,
            photo_url: row.get(3)?,
            password: row.get(4)?,
            created_at: row.get(5)?,
        })
    })
    .optional()
}

fn insert_trip(conn: &Connection, trip: &TripRow) -> Result<()> {
    conn.execute(
        "INSERT INTO trips
            (id, name, destination, description, start_date, end_date,
             created_by, created_at, updated_at, status, splitbi_group_id,
             home_timezone, destination_timezone, show_home_time)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        rusqlite::params![
            trip.id,
            trip.name,
            trip.destination,
            trip.description,
            trip.start_date,
            trip.end_date,
            trip.created_by,
            trip.created_at,
            trip.updated_at,
            trip.status,
            trip.splitbi_group_id,
            trip.home_timezone,
            trip.destination_timezone,
            trip.show_home_time,
        ],
    )?;
    Ok(())
}

fn insert_member(conn: &Connection, member: &TripMemberRow) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO trip_members
            (trip_id, user_id, email, display_name, role, joined_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            member.trip_id,
            member.user_id,
            member.email,
            member.display_name,
            member.role,
            member.joined_at,
        ],
    )?;
    Ok(())
}

fn query_trip(conn: &Connection, trip_id: &str) -> Result<Option<TripRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, destination, description, start_date, end_date,
                created_by, created_at, updated_at, status, splitbi_group_id,
                home_timezone, destination_timezone, show_home_time
         FROM trips WHERE id = ?1",
    )?;

    stmt.query_row([trip_id], |row| {
        Ok(TripRow {
            id: row.get(0)?,
            name: row.get(1)?,
            destination: row.get(2)?,
            description: row.get(3)?,
            start_date: row.get(4)?,
            end_date: row.get(5)?,
            created_by: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
            status: row.get(9)?,
            splitbi_group_id: row.get(10)?,
            home_timezone: row.get(11)?,
            destination_timezone: row.get(12)?,
            show_home_time: row.get(13)?,
        })
    })
    .optional()
}

fn query_members(conn: &Connection, trip_id: &str) -> Result<Vec<TripMemberRow>> {
    // joined_at then rowid: join order is insertion order
    let mut stmt = conn.prepare(
        "SELECT trip_id, user_id, email, display_name, role, joined_at
         FROM trip_members WHERE trip_id = ?1
         ORDER BY joined_at, rowid",
    )?;

    let rows = stmt
        .query_map([trip_id], |row| {
            Ok(TripMemberRow {
                trip_id: row.get(0)?,
                user_id: row.get(1)?,
                email: row.get(2)?,
                display_name: row.get(3)?,
                role: row.get(4)?,
                joined_at: row.get(5)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

const PROPOSAL_SELECT: &str = "SELECT id, trip_id, category, status, title, description,
        location, price, link, created_by, created_at, updated_at,
        scheduled_date, scheduled_time
 FROM proposals";

fn proposal_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProposalRow> {
    Ok(ProposalRow {
        id: row.get(0)?,
        trip_id: row.get(1)?,
        category: row.get(2)?,
        status: row.get(3)?,
        title: row.get(4)?,
        description: row.get(5)?,
        location: row.get(6)?,
        price: row.get(7)?,
        link: row.get(8)?,
        created_by: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
        scheduled_date: row.get(12)?,
        scheduled_time: row.get(13)?,
    })
}

fn query_proposal(conn: &Connection, proposal_id: &str) -> Result<Option<ProposalRow>> {
    let mut stmt = conn.prepare(&format!("{PROPOSAL_SELECT} WHERE id = ?1"))?;
    stmt.query_row([proposal_id], proposal_from_row).optional()
}

fn query_proposals_for_trip(conn: &Connection, trip_id: &str) -> Result<Vec<ProposalRow>> {
    let mut stmt =
        conn.prepare(&format!("{PROPOSAL_SELECT} WHERE trip_id = ?1 ORDER BY created_at"))?;
    let rows = stmt
        .query_map([trip_id], proposal_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Batch-fetch children for a set of proposal ids in one query.
fn batch_by_proposal<T>(
    conn: &Connection,
    proposal_ids: &[String],
    sql_template: &str,
    map: impl Fn(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
) -> Result<Vec<T>> {
    if proposal_ids.is_empty() {
        return Ok(vec![]);
    }

    let placeholders: Vec<String> = (1..=proposal_ids.len()).map(|i| format!("?{}", i)).collect();
    let sql = sql_template.replace("{ids}", &placeholders.join(", "));

    let mut stmt = conn.prepare(&sql)?;
    let params: Vec<&dyn rusqlite::types::ToSql> = proposal_ids
        .iter()
        .map(|id| id as &dyn rusqlite::types::ToSql)
        .collect();

    let rows = stmt
        .query_map(params.as_slice(), map)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn query_votes(conn: &Connection, proposal_ids: &[String]) -> Result<Vec<VoteRow>> {
    batch_by_proposal(
        conn,
        proposal_ids,
        "SELECT proposal_id, user_id, vote, timestamp
         FROM votes WHERE proposal_id IN ({ids}) ORDER BY timestamp",
        |row| {
            Ok(VoteRow {
                proposal_id: row.get(0)?,
                user_id: row.get(1)?,
                vote: row.get(2)?,
                timestamp: row.get(3)?,
            })
        },
    )
}

fn query_reactions(conn: &Connection, proposal_ids: &[String]) -> Result<Vec<ReactionRow>> {
    batch_by_proposal(
        conn,
        proposal_ids,
        "SELECT proposal_id, user_id, reaction, timestamp
         FROM reactions WHERE proposal_id IN ({ids})",
        |row| {
            Ok(ReactionRow {
                proposal_id: row.get(0)?,
                user_id: row.get(1)?,
                reaction: row.get(2)?,
                timestamp: row.get(3)?,
            })
        },
    )
}

fn query_comments(conn: &Connection, proposal_ids: &[String]) -> Result<Vec<CommentRow>> {
    batch_by_proposal(
        conn,
        proposal_ids,
        "SELECT id, proposal_id, user_id, text, timestamp, edited_at
         FROM comments WHERE proposal_id IN ({ids}) ORDER BY timestamp",
        |row| {
            Ok(CommentRow {
                id: row.get(0)?,
                proposal_id: row.get(1)?,
                user_id: row.get(2)?,
                text: row.get(3)?,
                timestamp: row.get(4)?,
                edited_at: row.get(5)?,
            })
        },
    )
}

const BOOKING_SELECT: &str = "SELECT id, trip_id, proposal_id, user_id, status, confirmation_number,
        proof_url, notes, booked_for_count, booked_at, created_at, updated_at
 FROM bookings";

fn booking_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<BookingRow> {
    Ok(BookingRow {
        id: row.get(0)?,
        trip_id: row.get(1)?,
        proposal_id: row.get(2)?,
        user_id: row.get(3)?,
        status: row.get(4)?,
        confirmation_number: row.get(5)?,
        proof_url: row.get(6)?,
        notes: row.get(7)?,
        booked_for_count: row.get(8)?,
        booked_at: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

fn query_bookings(conn: &Connection, trip_id: &str) -> Result<Vec<BookingRow>> {
    let mut stmt =
        conn.prepare(&format!("{BOOKING_SELECT} WHERE trip_id = ?1 ORDER BY created_at"))?;
    let rows = stmt
        .query_map([trip_id], booking_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn now() -> String {
        Utc::now().to_rfc3339()
    }

    fn seed_user(db: &Database, email: &str) -> String {
        let id = Uuid::new_v4().to_string();
        db.create_user(&id, email, Some("Tester"), "hash", &now()).unwrap();
        id
    }

    fn seed_trip(db: &Database, creator: &str) -> String {
        let trip_id = Uuid::new_v4().to_string();
        let trip = TripRow {
            id: trip_id.clone(),
            name: "Tokyo 2025".into(),
            destination: "Tokyo".into(),
            description: None,
            start_date: now(),
            end_date: now(),
            created_by: creator.to_string(),
            created_at: now(),
            updated_at: now(),
            status: "planning".into(),
            splitbi_group_id: None,
            home_timezone: Some("America/New_York".into()),
            destination_timezone: Some("Asia/Tokyo".into()),
            show_home_time: Some(true),
        };
        let member = TripMemberRow {
            trip_id: trip_id.clone(),
            user_id: creator.to_string(),
            email: "creator@example.com".into(),
            display_name: Some("Tester".into()),
            role: "admin".into(),
            joined_at: now(),
        };
        db.create_trip(&trip, &member).unwrap();
        trip_id
    }

    fn seed_proposal(db: &Database, trip_id: &str, creator: &str) -> String {
        let id = Uuid::new_v4().to_string();
        let proposal = ProposalRow {
            id: id.clone(),
            trip_id: trip_id.to_string(),
            category: "activities".into(),
            status: "proposed".into(),
            title: "teamLab".into(),
            description: String::new(),
            location: None,
            price: None,
            link: None,
            created_by: creator.to_string(),
            created_at: now(),
            updated_at: now(),
            scheduled_date: None,
            scheduled_time: None,
        };
        db.insert_proposal(&proposal).unwrap();
        id
    }

    #[test]
    fn test_revote_leaves_single_row() {
        let db = Database::open_in_memory().unwrap();
        let user = seed_user(&db, "a@example.com");
        let trip = seed_trip(&db, &user);
        let proposal = seed_proposal(&db, &trip, &user);

        db.upsert_vote(&proposal, &user, "yes", &now()).unwrap();
        db.upsert_vote(&proposal, &user, "no", &now()).unwrap();
        db.upsert_vote(&proposal, &user, "abstain", &now()).unwrap();

        let votes = db.get_votes_for_proposal(&proposal).unwrap();
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].vote, "abstain");
    }

    #[test]
    fn test_booking_uniqueness_enforced_by_constraint() {
        let db = Database::open_in_memory().unwrap();
        let user = seed_user(&db, "a@example.com");
        let trip = seed_trip(&db, &user);
        let proposal = seed_proposal(&db, &trip, &user);

        let mut booking = BookingRow {
            id: format!("{trip}-{proposal}-{user}"),
            trip_id: trip.clone(),
            proposal_id: proposal.clone(),
            user_id: user.clone(),
            status: "pending".into(),
            confirmation_number: None,
            proof_url: None,
            notes: None,
            booked_for_count: 1,
            booked_at: None,
            created_at: now(),
            updated_at: now(),
        };
        db.upsert_booking(&booking).unwrap();

        booking.status = "confirmed".into();
        booking.booked_at = Some(now());
        db.upsert_booking(&booking).unwrap();

        let bookings = db.list_bookings_for_trip(&trip).unwrap();
        assert_eq!(bookings.len(), 1);
        assert_eq!(bookings[0].status, "confirmed");
    }

    #[test]
    fn test_trip_delete_cascades() {
        let db = Database::open_in_memory().unwrap();
        let user = seed_user(&db, "a@example.com");
        let trip = seed_trip(&db, &user);
        let proposal = seed_proposal(&db, &trip, &user);
        db.upsert_vote(&proposal, &user, "yes", &now()).unwrap();

        db.delete_trip(&trip).unwrap();

        assert!(db.get_trip(&trip).unwrap().is_none());
        assert!(db.get_proposal(&proposal).unwrap().is_none());
        assert!(db.get_votes_for_proposal(&proposal).unwrap().is_empty());
    }

    #[test]
    fn test_accept_invitation_is_transactional() {
        let db = Database::open_in_memory().unwrap();
        let creator = seed_user(&db, "a@example.com");
        let joiner = seed_user(&db, "b@example.com");
        let trip = seed_trip(&db, &creator);

        let invitation_id = Uuid::new_v4().to_string();
        db.insert_invitation(&InvitationRow {
            id: invitation_id.clone(),
            trip_id: trip.clone(),
            trip_name: "Tokyo 2025".into(),
            email: None,
            token: "abcDEFghjkMNPQ23".into(),
            status: "pending".into(),
            created_by: creator.clone(),
            created_at: now(),
            expires_at: now(),
            accepted_by: None,
            accepted_at: None,
        })
        .unwrap();

        let member = TripMemberRow {
            trip_id: trip.clone(),
            user_id: joiner.clone(),
            email: "b@example.com".into(),
            display_name: None,
            role: "member".into(),
            joined_at: now(),
        };
        db.accept_invitation(&invitation_id, &member, &now()).unwrap();

        assert!(db.is_trip_member(&trip, &joiner).unwrap());
        let row = db.get_invitation_by_token("abcDEFghjkMNPQ23").unwrap().unwrap();
        assert_eq!(row.status, "accepted");
        assert_eq!(row.accepted_by.as_deref(), Some(joiner.as_str()));
    }

    #[test]
    fn test_snapshot_assembly_groups_children() {
        let db = Database::open_in_memory().unwrap();
        let user = seed_user(&db, "a@example.com");
        let trip = seed_trip(&db, &user);
        let p1 = seed_proposal(&db, &trip, &user);
        let p2 = seed_proposal(&db, &trip, &user);
        db.upsert_vote(&p1, &user, "yes", &now()).unwrap();
        db.upsert_reaction(&p2, &user, "maybe", &now()).unwrap();

        let rows = db.load_trip_snapshot(&trip).unwrap().unwrap();
        let (trip_model, proposals, bookings) = assemble_snapshot(rows).unwrap();

        assert_eq!(trip_model.members.len(), 1);
        assert_eq!(trip_model.member_details.len(), 1);
        assert_eq!(proposals.len(), 2);
        assert!(bookings.is_empty());

        let by_id = |id: &str| proposals.iter().find(|p| p.id.to_string() == id).unwrap();
        assert_eq!(by_id(&p1).votes.len(), 1);
        assert!(by_id(&p1).reactions.is_empty());
        assert_eq!(by_id(&p2).reactions.len(), 1);
    }
}
