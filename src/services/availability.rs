use chrono::{Duration, NaiveDate, NaiveDateTime};
use rusqlite::Connection;

use crate::db::queries;
use crate::models::availability::format_slot_label;
use crate::models::{Booking, DayAvailability, GameType, NewBooking, Settings, TimeSlot};

#[derive(Debug, thiserror::Error)]
pub enum SchedulingError {
    #[error("{0} is in the past")]
    PastDate(NaiveDate),

    #[error("unknown game type: {0}")]
    UnknownGameType(String),

    #[error("{0} is not available for booking right now")]
    GameUnavailable(String),

    #[error("there is no {slot} slot on {date}. Opening hours: {hours}")]
    UnknownSlot {
        date: NaiveDate,
        slot: String,
        hours: String,
    },

    #[error("the {slot} slot on {date} has already started")]
    SlotStarted { date: NaiveDate, slot: String },

    #[error("a {duration}-minute session from {slot} would run past closing time")]
    PastClosing { slot: String, duration: u32 },

    #[error("sorry, {slot} on {date} is already fully booked. Could you pick a different time?")]
    Conflict { date: NaiveDate, slot: String },

    #[error(transparent)]
    Database(#[from] anyhow::Error),
}

/// Slots for `date`, each marked free or taken.
///
/// With `game_type`, a slot is free when that game still has a station for
/// the whole of `duration` (default: one slot interval). Without it, a slot
/// is free when any bookable game has a station at that slot.
pub fn day_availability(
    conn: &Connection,
    settings: &Settings,
    catalog: &[GameType],
    date: NaiveDate,
    now: NaiveDateTime,
    game_type: Option<&str>,
    duration: Option<u32>,
) -> Result<DayAvailability, SchedulingError> {
    if date < now.date() {
        return Err(SchedulingError::PastDate(date));
    }

    let schedule = &settings.schedule;
    let slot_times = schedule.slot_times(date);
    if slot_times.is_empty() {
        return Ok(DayAvailability {
            date,
            time_slots: Vec::new(),
        });
    }

    let game = match game_type {
        Some(id) => Some(
            catalog
                .iter()
                .find(|g| g.id == id)
                .ok_or_else(|| SchedulingError::UnknownGameType(id.to_string()))?,
        ),
        None => None,
    };

    let bookings = queries::get_active_bookings_on(conn, date, game_type)?;
    let interval = schedule.interval_minutes;
    let closing = schedule.closing_on(date);

    let time_slots = slot_times
        .into_iter()
        .map(|time| {
            let start = date.and_time(time);
            let available = start > now
                && match game {
                    Some(game) => {
                        let minutes = duration.unwrap_or(interval);
                        game.available
                            && ends_by_closing(start, minutes, closing)
                            && has_station(&bookings, game, start, minutes)
                    }
                    None => catalog
                        .iter()
                        .any(|g| g.available && has_station(&bookings, g, start, interval)),
                };
            TimeSlot {
                time: format_slot_label(time),
                available,
            }
        })
        .collect();

    Ok(DayAvailability { date, time_slots })
}

/// The authoritative check run while creating a booking.
pub fn ensure_slot_free(
    conn: &Connection,
    settings: &Settings,
    catalog: &[GameType],
    booking: &NewBooking,
    now: NaiveDateTime,
) -> Result<(), SchedulingError> {
    if booking.date < now.date() {
        return Err(SchedulingError::PastDate(booking.date));
    }

    let game = catalog
        .iter()
        .find(|g| g.id == booking.game_type)
        .ok_or_else(|| SchedulingError::UnknownGameType(booking.game_type.clone()))?;
    if !game.available {
        return Err(SchedulingError::GameUnavailable(game.name.clone()));
    }

    let schedule = &settings.schedule;
    let time = schedule
        .find_slot(booking.date, &booking.time_slot)
        .ok_or_else(|| SchedulingError::UnknownSlot {
            date: booking.date,
            slot: booking.time_slot.clone(),
            hours: schedule.to_human_readable(),
        })?;

    let start = booking.date.and_time(time);
    let slot = format_slot_label(time);
    if start <= now {
        return Err(SchedulingError::SlotStarted {
            date: booking.date,
            slot,
        });
    }
    if !ends_by_closing(start, booking.duration, schedule.closing_on(booking.date)) {
        return Err(SchedulingError::PastClosing {
            slot,
            duration: booking.duration,
        });
    }

    let bookings = queries::get_active_bookings_on(conn, booking.date, Some(&game.id))?;
    if !has_station(&bookings, game, start, booking.duration) {
        return Err(SchedulingError::Conflict {
            date: booking.date,
            slot,
        });
    }
    Ok(())
}

/// Capacity check for putting an existing booking back on the schedule.
pub fn ensure_capacity_for(
    conn: &Connection,
    catalog: &[GameType],
    booking: &Booking,
) -> Result<(), SchedulingError> {
    let game = catalog
        .iter()
        .find(|g| g.id == booking.game_type)
        .ok_or_else(|| SchedulingError::UnknownGameType(booking.game_type.clone()))?;

    let others: Vec<Booking> = queries::get_active_bookings_on(conn, booking.date, Some(&game.id))?
        .into_iter()
        .filter(|b| b.id != booking.id)
        .collect();

    if !has_station(&others, game, booking.session_start(), booking.duration) {
        return Err(SchedulingError::Conflict {
            date: booking.date,
            slot: booking.time_slot.clone(),
        });
    }
    Ok(())
}

fn ends_by_closing(start: NaiveDateTime, minutes: u32, closing: Option<NaiveDateTime>) -> bool {
    closing
        .map(|closing| start + Duration::minutes(minutes as i64) <= closing)
        .unwrap_or(true)
}

fn has_station(bookings: &[Booking], game: &GameType, start: NaiveDateTime, minutes: u32) -> bool {
    let end = start + Duration::minutes(minutes as i64);
    let overlapping: Vec<&Booking> = bookings
        .iter()
        .filter(|b| b.game_type == game.id && b.occupies(start, end))
        .collect();
    peak_occupancy(&overlapping, start, end) < game.capacity as usize
}

/// Most bookings running at the same moment within `[start, end)`.
fn peak_occupancy(bookings: &[&Booking], start: NaiveDateTime, end: NaiveDateTime) -> usize {
    let mut points = vec![start];
    points.extend(
        bookings
            .iter()
            .map(|b| b.session_start())
            .filter(|s| *s > start && *s < end),
    );

    points
        .iter()
        .map(|p| {
            bookings
                .iter()
                .filter(|b| b.session_start() <= *p && b.session_end() > *p)
                .count()
        })
        .max()
        .unwrap_or(0)
}
