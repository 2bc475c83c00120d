use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};

use crate::models::game_type::default_catalog;
use crate::models::{Booking, BookingStatus, GameType, Settings, StatusCounts};

const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

const BOOKING_COLUMNS: &str = "id, reference_number, name, phone, email, game_type, date, time_slot, \
     duration_minutes, num_people, special_requests, price, status, created_at, updated_at";

// ── Bookings ──

/// Inserts a booking. The raw rusqlite error is returned so callers can spot
/// a duplicate reference number with [`is_unique_violation`].
pub fn insert_booking(conn: &Connection, booking: &Booking) -> Result<(), rusqlite::Error> {
    conn.execute(
        &format!(
            "INSERT INTO bookings ({BOOKING_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"
        ),
        params![
            booking.id,
            booking.reference_number,
            booking.name,
            booking.phone,
            booking.email,
            booking.game_type,
            booking.date.format(DATE_FORMAT).to_string(),
            booking.time_slot,
            booking.duration,
            booking.num_people,
            booking.special_requests,
            booking.price,
            booking.status.as_str(),
            booking.created_at.format(TS_FORMAT).to_string(),
            booking.updated_at.format(TS_FORMAT).to_string(),
        ],
    )?;
    Ok(())
}

/// True only for a UNIQUE constraint failure; CHECK, NOT NULL and primary
/// key failures are reported as they are.
pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let row = conn
        .query_row(
            &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
            params![id],
            |row| Ok(parse_booking_row(row)),
        )
        .optional()?;
    row.transpose()
}

pub fn get_booking_by_reference(
    conn: &Connection,
    reference: &str,
) -> anyhow::Result<Option<Booking>> {
    let row = conn
        .query_row(
            &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE reference_number = ?1"),
            params![reference.trim().to_uppercase()],
            |row| Ok(parse_booking_row(row)),
        )
        .optional()?;
    row.transpose()
}

/// All bookings, newest first.
pub fn list_bookings(
    conn: &Connection,
    status_filter: Option<BookingStatus>,
) -> anyhow::Result<Vec<Booking>> {
    let mut bookings = vec![];
    match status_filter {
        Some(status) => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings WHERE status = ?1
                 ORDER BY created_at DESC, rowid DESC"
            ))?;
            let rows = stmt.query_map(params![status.as_str()], |row| Ok(parse_booking_row(row)))?;
            for row in rows {
                bookings.push(row??);
            }
        }
        None => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings ORDER BY created_at DESC, rowid DESC"
            ))?;
            let rows = stmt.query_map([], |row| Ok(parse_booking_row(row)))?;
            for row in rows {
                bookings.push(row??);
            }
        }
    }
    Ok(bookings)
}

/// Non-cancelled bookings on `date`, optionally for one game type.
pub fn get_active_bookings_on(
    conn: &Connection,
    date: NaiveDate,
    game_type: Option<&str>,
) -> anyhow::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE date = ?1 AND status != 'cancelled' AND (?2 IS NULL OR game_type = ?2)"
    ))?;
    let rows = stmt.query_map(
        params![date.format(DATE_FORMAT).to_string(), game_type],
        |row| Ok(parse_booking_row(row)),
    )?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn update_booking_status(
    conn: &Connection,
    id: &str,
    status: BookingStatus,
    now: NaiveDateTime,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), now.format(TS_FORMAT).to_string(), id],
    )?;
    Ok(count > 0)
}

pub fn update_special_requests(
    conn: &Connection,
    id: &str,
    special_requests: Option<&str>,
    now: NaiveDateTime,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET special_requests = ?1, updated_at = ?2 WHERE id = ?3",
        params![special_requests, now.format(TS_FORMAT).to_string(), id],
    )?;
    Ok(count > 0)
}

pub fn delete_booking(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM bookings WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

pub fn get_status_counts(conn: &Connection) -> anyhow::Result<StatusCounts> {
    let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM bookings GROUP BY status")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    })?;

    let mut counts = StatusCounts::default();
    for row in rows {
        let (status, n) = row?;
        match BookingStatus::parse(&status) {
            Some(status) => counts.add(status, n),
            None => tracing::warn!(status = %status, "unknown booking status in database"),
        }
    }
    Ok(counts)
}

pub fn count_upcoming_confirmed(conn: &Connection, today: NaiveDate) -> anyhow::Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM bookings WHERE date >= ?1 AND status = 'confirmed'",
        params![today.format(DATE_FORMAT).to_string()],
        |row| row.get(0),
    )?;
    Ok(count)
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let date_str: String = row.get(6)?;
    let status_str: String = row.get(12)?;
    let created_at_str: String = row.get(13)?;
    let updated_at_str: String = row.get(14)?;

    let status = BookingStatus::parse(&status_str)
        .ok_or_else(|| anyhow::anyhow!("unknown booking status: {status_str}"))?;

    Ok(Booking {
        id: row.get(0)?,
        reference_number: row.get(1)?,
        name: row.get(2)?,
        phone: row.get(3)?,
        email: row.get(4)?,
        game_type: row.get(5)?,
        date: NaiveDate::parse_from_str(&date_str, DATE_FORMAT)?,
        time_slot: row.get(7)?,
        duration: row.get(8)?,
        num_people: row.get(9)?,
        special_requests: row.get(10)?,
        price: row.get(11)?,
        status,
        created_at: NaiveDateTime::parse_from_str(&created_at_str, TS_FORMAT)?,
        updated_at: NaiveDateTime::parse_from_str(&updated_at_str, TS_FORMAT)?,
    })
}

// ── Game types ──

pub fn list_game_types(conn: &Connection) -> anyhow::Result<Vec<GameType>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, description, icon, available, capacity, popular_games
         FROM game_types ORDER BY sort_order ASC, id ASC",
    )?;
    let rows = stmt.query_map([], |row| Ok(parse_game_type_row(row)))?;

    let mut game_types = vec![];
    for row in rows {
        game_types.push(row??);
    }
    Ok(game_types)
}

pub fn upsert_game_type(conn: &Connection, game_type: &GameType, sort_order: i64) -> anyhow::Result<()> {
    let popular_games = serde_json::to_string(&game_type.popular_games)?;
    conn.execute(
        "INSERT INTO game_types (id, name, description, icon, available, capacity, popular_games, sort_order)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            description = excluded.description,
            icon = excluded.icon,
            available = excluded.available,
            capacity = excluded.capacity,
            popular_games = excluded.popular_games,
            sort_order = excluded.sort_order",
        params![
            game_type.id,
            game_type.name,
            game_type.description,
            game_type.icon,
            game_type.available,
            game_type.capacity,
            popular_games,
            sort_order,
        ],
    )?;
    Ok(())
}

fn parse_game_type_row(row: &rusqlite::Row) -> anyhow::Result<GameType> {
    let popular_json: String = row.get(6)?;
    Ok(GameType {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        icon: row.get(3)?,
        available: row.get(4)?,
        capacity: row.get(5)?,
        popular_games: serde_json::from_str(&popular_json).unwrap_or_default(),
        base_rate_per_hour: None,
    })
}

// ── Settings ──

pub fn get_settings(conn: &Connection) -> anyhow::Result<Option<Settings>> {
    let document: Option<String> = conn
        .query_row("SELECT document FROM settings WHERE id = 1", [], |row| row.get(0))
        .optional()?;
    document.map(|json| Settings::from_json(&json)).transpose()
}

pub fn save_settings(conn: &Connection, settings: &Settings) -> anyhow::Result<()> {
    let document = serde_json::to_string(settings)?;
    conn.execute(
        "INSERT INTO settings (id, document, updated_at) VALUES (1, ?1, datetime('now'))
         ON CONFLICT(id) DO UPDATE SET document = excluded.document, updated_at = excluded.updated_at",
        params![document],
    )?;
    Ok(())
}

/// Seeds the catalog and settings on an empty database. Existing rows are
/// left alone.
pub fn seed_defaults(conn: &Connection) -> anyhow::Result<()> {
    let catalog_size: i64 = conn.query_row("SELECT COUNT(*) FROM game_types", [], |row| row.get(0))?;
    if catalog_size == 0 {
        for (i, game_type) in default_catalog().iter().enumerate() {
            upsert_game_type(conn, game_type, i as i64)?;
        }
        tracing::info!("seeded game type catalog");
    }

    if get_settings(conn)?.is_none() {
        save_settings(conn, &Settings::default())?;
        tracing::info!("seeded default settings");
    }
    Ok(())
}
