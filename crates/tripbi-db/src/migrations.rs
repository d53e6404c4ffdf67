use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id              TEXT PRIMARY KEY,
            email           TEXT NOT NULL UNIQUE,
            display_name    TEXT,
            photo_url       TEXT,
            password        TEXT NOT NULL,
            created_at      TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS trips (
            id                      TEXT PRIMARY KEY,
            name                    TEXT NOT NULL,
            destination             TEXT NOT NULL,
            description             TEXT,
            start_date              TEXT NOT NULL,
            end_date                TEXT NOT NULL,
            created_by              TEXT NOT NULL REFERENCES users(id),
            created_at              TEXT NOT NULL,
            updated_at              TEXT NOT NULL,
            status                  TEXT NOT NULL DEFAULT 'planning',
            splitbi_group_id        TEXT,
            home_timezone           TEXT,
            destination_timezone    TEXT,
            show_home_time          INTEGER
        );

        -- One row per member; join order preserved via joined_at + rowid.
        -- The member id list and member detail list are the same rows, so
        -- they can never diverge.
        CREATE TABLE IF NOT EXISTS trip_members (
            trip_id         TEXT NOT NULL REFERENCES trips(id) ON DELETE CASCADE,
            user_id         TEXT NOT NULL REFERENCES users(id),
            email           TEXT NOT NULL,
            display_name    TEXT,
            role            TEXT NOT NULL DEFAULT 'member',
            joined_at       TEXT NOT NULL,
            PRIMARY KEY (trip_id, user_id)
        );

        CREATE TABLE IF NOT EXISTS proposals (
            id              TEXT PRIMARY KEY,
            trip_id         TEXT NOT NULL REFERENCES trips(id) ON DELETE CASCADE,
            category        TEXT NOT NULL,
            status          TEXT NOT NULL DEFAULT 'proposed',
            title           TEXT NOT NULL,
            description     TEXT NOT NULL DEFAULT '',
            location        TEXT,
            price           TEXT,
            link            TEXT,
            created_by      TEXT NOT NULL REFERENCES users(id),
            created_at      TEXT NOT NULL,
            updated_at      TEXT NOT NULL,
            scheduled_date  TEXT,
            scheduled_time  TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_proposals_trip
            ON proposals(trip_id, created_at);

        -- One vote per (proposal, user); re-votes are keyed upserts.
        CREATE TABLE IF NOT EXISTS votes (
            proposal_id     TEXT NOT NULL REFERENCES proposals(id) ON DELETE CASCADE,
            user_id         TEXT NOT NULL REFERENCES users(id),
            vote            TEXT NOT NULL,
            timestamp       TEXT NOT NULL,
            PRIMARY KEY (proposal_id, user_id)
        );

        -- Private per-user reactions, same uniqueness rule as votes.
        CREATE TABLE IF NOT EXISTS reactions (
            proposal_id     TEXT NOT NULL REFERENCES proposals(id) ON DELETE CASCADE,
            user_id         TEXT NOT NULL REFERENCES users(id),
            reaction        TEXT NOT NULL,
            timestamp       TEXT NOT NULL,
            PRIMARY KEY (proposal_id, user_id)
        );

        CREATE TABLE IF NOT EXISTS comments (
            id              TEXT PRIMARY KEY,
            proposal_id     TEXT NOT NULL REFERENCES proposals(id) ON DELETE CASCADE,
            user_id         TEXT NOT NULL REFERENCES users(id),
            text            TEXT NOT NULL,
            timestamp       TEXT NOT NULL,
            edited_at       TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_comments_proposal
            ON comments(proposal_id, timestamp);

        -- id is the deterministic composite {trip}-{proposal}-{user}; the
        -- UNIQUE constraint enforces one booking per member per proposal even
        -- if a caller bypasses the id convention.
        CREATE TABLE IF NOT EXISTS bookings (
            id                  TEXT PRIMARY KEY,
            trip_id             TEXT NOT NULL REFERENCES trips(id) ON DELETE CASCADE,
            proposal_id         TEXT NOT NULL REFERENCES proposals(id) ON DELETE CASCADE,
            user_id             TEXT NOT NULL REFERENCES users(id),
            status              TEXT NOT NULL DEFAULT 'pending',
            confirmation_number TEXT,
            proof_url           TEXT,
            notes               TEXT,
            booked_for_count    INTEGER NOT NULL DEFAULT 1,
            booked_at           TEXT,
            created_at          TEXT NOT NULL,
            updated_at          TEXT NOT NULL,
            UNIQUE (trip_id, proposal_id, user_id)
        );

        CREATE INDEX IF NOT EXISTS idx_bookings_trip
            ON bookings(trip_id);
        CREATE INDEX IF NOT EXISTS idx_bookings_user
            ON bookings(user_id);

        CREATE TABLE IF NOT EXISTS invitations (
            id              TEXT PRIMARY KEY,
            trip_id         TEXT NOT NULL REFERENCES trips(id) ON DELETE CASCADE,
            trip_name       TEXT NOT NULL,
            email           TEXT,
            token           TEXT NOT NULL UNIQUE,
            status          TEXT NOT NULL DEFAULT 'pending',
            created_by      TEXT NOT NULL REFERENCES users(id),
            created_at      TEXT NOT NULL,
            expires_at      TEXT NOT NULL,
            accepted_by     TEXT,
            accepted_at     TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_invitations_token
            ON invitations(token);

        -- Point-in-time snapshots. No FK to trips: a share link outlives the
        -- trip it was cut from.
        CREATE TABLE IF NOT EXISTS shared_timelines (
            id              TEXT PRIMARY KEY,
            trip_id         TEXT NOT NULL,
            trip_name       TEXT NOT NULL,
            destination     TEXT NOT NULL,
            start_date      TEXT NOT NULL,
            end_date        TEXT NOT NULL,
            token           TEXT NOT NULL UNIQUE,
            created_by      TEXT NOT NULL,
            created_at      TEXT NOT NULL,
            expires_at      TEXT,
            proposals_json  TEXT NOT NULL
        );
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
