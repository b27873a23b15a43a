//! SQL schema for the Gatehouse SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS memberships (
    member_ref      TEXT PRIMARY KEY,
    display_name    TEXT NOT NULL,
    plan            TEXT NOT NULL,   -- 'recurring' | 'annual' | 'lifetime'
    status          TEXT NOT NULL,   -- 'pending' | 'active' | 'expired' | 'cancelled'
    expires_at      TEXT,            -- NULL for lifetime plans
    account_blocked INTEGER NOT NULL DEFAULT 0,
    card_blocked    INTEGER NOT NULL DEFAULT 0,
    created_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS events (
    event_id   TEXT PRIMARY KEY,
    title      TEXT NOT NULL,
    active     INTEGER NOT NULL DEFAULT 1,
    starts_at  TEXT NOT NULL,
    ends_at    TEXT NOT NULL,
    created_at TEXT NOT NULL
);

-- Counters live on their own row: the allocator and the check-in path
-- increment them here, never by patching the events table.
CREATE TABLE IF NOT EXISTS event_aggregates (
    event_id            TEXT PRIMARY KEY REFERENCES events(event_id),
    total_sold          INTEGER NOT NULL DEFAULT 0,
    total_revenue_cents INTEGER NOT NULL DEFAULT 0,
    total_checked_in    INTEGER NOT NULL DEFAULT 0
);

-- 'sold' is written only inside the allocation transaction.
CREATE TABLE IF NOT EXISTS ticket_categories (
    category_id    TEXT PRIMARY KEY,
    event_id       TEXT NOT NULL REFERENCES events(event_id),
    name           TEXT NOT NULL,
    price_cents    INTEGER NOT NULL,
    capacity       INTEGER NOT NULL,
    sold           INTEGER NOT NULL DEFAULT 0,
    active         INTEGER NOT NULL DEFAULT 1,
    members_only   INTEGER NOT NULL DEFAULT 0,
    sales_open_at  TEXT,
    sales_close_at TEXT,
    CHECK (sold >= 0 AND sold <= capacity)
);

-- 'checked_in'/'checked_in_at' transition exactly once, inside the
-- check-in transaction.
CREATE TABLE IF NOT EXISTS ticket_purchases (
    purchase_id   TEXT PRIMARY KEY,
    member_ref    TEXT NOT NULL,
    event_id      TEXT NOT NULL REFERENCES events(event_id),
    category_id   TEXT NOT NULL REFERENCES ticket_categories(category_id),
    quantity      INTEGER NOT NULL,
    ticket_number TEXT NOT NULL UNIQUE,
    amount_cents  INTEGER NOT NULL,
    payment       TEXT NOT NULL DEFAULT 'pending',
    checked_in    INTEGER NOT NULL DEFAULT 0,
    checked_in_at TEXT,
    purchased_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS attendance_records (
    attendance_id TEXT PRIMARY KEY,
    member_ref    TEXT NOT NULL,
    event_id      TEXT NOT NULL REFERENCES events(event_id),
    recorded_at   TEXT NOT NULL,
    UNIQUE (member_ref, event_id)
);

-- Append-only; written after each decision, never read to make one.
CREATE TABLE IF NOT EXISTS scan_log (
    scan_id     TEXT PRIMARY KEY,
    event_id    TEXT,
    member_ref  TEXT,
    operator_id TEXT NOT NULL,
    mode        TEXT NOT NULL,
    status      TEXT NOT NULL,
    scanned_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS purchases_member_event_idx
    ON ticket_purchases(member_ref, event_id);
CREATE INDEX IF NOT EXISTS categories_event_idx ON ticket_categories(event_id);
CREATE INDEX IF NOT EXISTS attendance_event_idx ON attendance_records(event_id);
CREATE INDEX IF NOT EXISTS scan_log_event_idx   ON scan_log(event_id, scanned_at);

PRAGMA user_version = 1;
";
