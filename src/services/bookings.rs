use chrono::{Duration, NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use serde::Serialize;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::db::queries;
use crate::errors::AppError;
use crate::models::booking::{check_self_cancellation, generate_reference};
use crate::models::{
    Booking, BookingStatus, CreateBookingRequest, DayAvailability, GameType, PriceBreakdown,
    PriceQuery, Settings, StatusCounts, Transition, UpdateBookingRequest,
};
use crate::services::availability;
use crate::services::pricing::{PricingEngine, PricingError};

const MAX_REFERENCE_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct AdminStats {
    #[serde(flatten)]
    pub counts: StatusCounts,
    pub upcoming_confirmed: i64,
}

pub fn load_settings(conn: &Connection) -> anyhow::Result<Settings> {
    Ok(queries::get_settings(conn)?.unwrap_or_default())
}

/// The catalog with each entry's individual hourly rate filled in.
pub fn catalog_with_rates(conn: &Connection) -> anyhow::Result<Vec<GameType>> {
    let settings = load_settings(conn)?;
    let mut catalog = queries::list_game_types(conn)?;
    for game in &mut catalog {
        game.base_rate_per_hour = settings.pricing.rates.get(&game.id).map(|r| r.individual);
    }
    Ok(catalog)
}

pub fn quote(conn: &Connection, query: &PriceQuery) -> Result<PriceBreakdown, AppError> {
    let settings = load_settings(conn)?;
    let game_type = query.game_type.trim();
    let catalog = queries::list_game_types(conn)?;
    if !catalog.iter().any(|g| g.id == game_type) {
        return Err(PricingError::UnknownGameType(game_type.to_string()).into());
    }
    let breakdown =
        PricingEngine::new(&settings.pricing).quote(game_type, query.duration, query.num_people)?;
    Ok(breakdown)
}

pub fn availability_on(
    conn: &Connection,
    date: NaiveDate,
    now: NaiveDateTime,
    game_type: Option<&str>,
    duration: Option<u32>,
) -> Result<DayAvailability, AppError> {
    let settings = load_settings(conn)?;
    let catalog = queries::list_game_types(conn)?;
    let day = availability::day_availability(conn, &settings, &catalog, date, now, game_type, duration)?;
    Ok(day)
}

/// Validates, prices and stores a new booking. The slot check and the
/// insert run on the same connection, so callers holding the connection
/// lock cannot double-book a station.
pub fn create_booking(
    conn: &Connection,
    config: &AppConfig,
    now: NaiveDateTime,
    request: CreateBookingRequest,
) -> Result<Booking, AppError> {
    let new = request.normalize()?;
    let settings = load_settings(conn)?;
    let catalog = queries::list_game_types(conn)?;

    let breakdown =
        PricingEngine::new(&settings.pricing).quote(&new.game_type, new.duration, new.num_people)?;
    availability::ensure_slot_free(conn, &settings, &catalog, &new, now)?;

    let time_slot = settings
        .schedule
        .find_slot(new.date, &new.time_slot)
        .map(crate::models::availability::format_slot_label)
        .unwrap_or_else(|| new.time_slot.clone());

    let mut booking = Booking {
        id: Uuid::new_v4().to_string(),
        reference_number: String::new(),
        name: new.name,
        phone: new.phone,
        email: new.email,
        game_type: new.game_type,
        date: new.date,
        time_slot,
        duration: new.duration,
        num_people: new.num_people,
        special_requests: new.special_requests,
        price: breakdown.total_price,
        status: config.initial_status,
        created_at: now,
        updated_at: now,
    };

    insert_with_fresh_reference(conn, &mut booking, generate_reference)?;
    tracing::info!(
        booking_id = %booking.id,
        reference = %booking.reference_number,
        game_type = %booking.game_type,
        date = %booking.date,
        slot = %booking.time_slot,
        status = %booking.status,
        "booking created"
    );
    Ok(booking)
}

/// Stores `booking` under the first reference from `next_reference` that is
/// not already taken, giving up after `MAX_REFERENCE_ATTEMPTS`.
fn insert_with_fresh_reference(
    conn: &Connection,
    booking: &mut Booking,
    mut next_reference: impl FnMut() -> String,
) -> Result<(), AppError> {
    for attempt in 1..=MAX_REFERENCE_ATTEMPTS {
        booking.reference_number = next_reference();
        match queries::insert_booking(conn, booking) {
            Ok(()) => return Ok(()),
            Err(e) if queries::is_unique_violation(&e) => {
                tracing::warn!(attempt, "reference number collision, regenerating");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(AppError::Internal(anyhow::anyhow!(
        "could not allocate a unique reference number after {MAX_REFERENCE_ATTEMPTS} attempts"
    )))
}

pub fn get_booking(conn: &Connection, id: &str) -> Result<Booking, AppError> {
    queries::get_booking_by_id(conn, id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {id}")))
}

pub fn get_by_reference(conn: &Connection, reference: &str) -> Result<Booking, AppError> {
    queries::get_booking_by_reference(conn, reference)?.ok_or_else(|| {
        AppError::NotFound(format!(
            "no booking with reference {}, please check your reference number",
            reference.trim().to_uppercase()
        ))
    })
}

/// Customer self-cancellation, subject to the cutoff window.
pub fn cancel_by_reference(
    conn: &Connection,
    config: &AppConfig,
    now: NaiveDateTime,
    reference: &str,
) -> Result<Booking, AppError> {
    let mut booking = get_by_reference(conn, reference)?;

    if let Err(refusal) = check_self_cancellation(
        &booking,
        now,
        Duration::minutes(config.cancellation_cutoff_minutes),
    ) {
        tracing::debug!(reference = %booking.reference_number, reason = %refusal, "self-cancel refused");
        return Err(refusal.into());
    }

    queries::update_booking_status(conn, &booking.id, BookingStatus::Cancelled, now)?;
    booking.status = BookingStatus::Cancelled;
    booking.updated_at = now;

    tracing::info!(reference = %booking.reference_number, "booking cancelled by customer");
    Ok(booking)
}

/// Admin update: a status transition and/or new special requests.
pub fn update_booking(
    conn: &Connection,
    now: NaiveDateTime,
    id: &str,
    update: UpdateBookingRequest,
) -> Result<Booking, AppError> {
    let target = match update.status.as_deref() {
        Some(raw) => Some(
            BookingStatus::parse(raw).ok_or_else(|| AppError::InvalidStatus(raw.to_string()))?,
        ),
        None => None,
    };

    let mut booking = get_booking(conn, id)?;

    if let Some(target) = target {
        match booking.status.transition(target)? {
            Transition::Unchanged => {}
            Transition::Applied => {
                if booking.status == BookingStatus::Cancelled {
                    let catalog = queries::list_game_types(conn)?;
                    availability::ensure_capacity_for(conn, &catalog, &booking)?;
                }
                queries::update_booking_status(conn, id, target, now)?;
                tracing::info!(
                    booking_id = %id,
                    from = %booking.status,
                    to = %target,
                    "booking status changed"
                );
                booking.status = target;
                booking.updated_at = now;
            }
        }
    }

    if let Some(raw) = update.special_requests {
        let notes = Some(raw.trim().to_string()).filter(|s| !s.is_empty());
        if notes != booking.special_requests {
            queries::update_special_requests(conn, id, notes.as_deref(), now)?;
            booking.special_requests = notes;
            booking.updated_at = now;
        }
    }

    Ok(booking)
}

pub fn delete_booking(conn: &Connection, id: &str) -> Result<(), AppError> {
    if !queries::delete_booking(conn, id)? {
        return Err(AppError::NotFound(format!("booking {id}")));
    }
    tracing::warn!(booking_id = %id, "booking deleted by admin");
    Ok(())
}

pub fn list_bookings(conn: &Connection, status: Option<&str>) -> Result<Vec<Booking>, AppError> {
    let filter = match status.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => {
            Some(BookingStatus::parse(raw).ok_or_else(|| AppError::InvalidStatus(raw.to_string()))?)
        }
        None => None,
    };
    Ok(queries::list_bookings(conn, filter)?)
}

pub fn stats(conn: &Connection, today: NaiveDate) -> Result<AdminStats, AppError> {
    Ok(AdminStats {
        counts: queries::get_status_counts(conn)?,
        upcoming_confirmed: queries::count_upcoming_confirmed(conn, today)?,
    })
}

pub fn replace_settings(conn: &Connection, settings: &Settings) -> Result<(), AppError> {
    let catalog = queries::list_game_types(conn)?;
    settings
        .validate()
        .and_then(|_| {
            settings
                .pricing
                .check_against_catalog(catalog.iter().map(|g| g.id.as_str()))
        })
        .map_err(|e| AppError::Validation(e.to_string()))?;
    queries::save_settings(conn, settings)?;
    tracing::info!("settings replaced");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::booking::is_valid_reference;

    fn setup_db() -> Connection {
        db::init_db(":memory:").unwrap()
    }

    fn config(initial_status: BookingStatus) -> AppConfig {
        AppConfig {
            port: 0,
            database_url: ":memory:".to_string(),
            admin_password: "secret".to_string(),
            admin_session_ttl_minutes: 60,
            initial_status,
            cancellation_cutoff_minutes: 60,
        }
    }

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn now() -> NaiveDateTime {
        dt("2025-06-15 09:00")
    }

    fn request(game: &str, slot: &str) -> CreateBookingRequest {
        CreateBookingRequest {
            name: Some("Asha".to_string()),
            phone: Some("+919876543210".to_string()),
            game_type: Some(game.to_string()),
            date: Some("2025-06-16".to_string()),
            time_slot: Some(slot.to_string()),
            duration: Some(60),
            num_people: Some(1),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_assigns_reference_and_policy_status() {
        let conn = setup_db();
        let booking =
            create_booking(&conn, &config(BookingStatus::Pending), now(), request("xbox", "2:00 PM")).unwrap();
        assert!(is_valid_reference(&booking.reference_number));
        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.price, 120.0);

        let booking =
            create_booking(&conn, &config(BookingStatus::Confirmed), now(), request("xbox", "3:00 PM")).unwrap();
        assert_eq!(booking.status, BookingStatus::Confirmed);

        let stored = get_by_reference(&conn, &booking.reference_number.to_lowercase()).unwrap();
        assert_eq!(stored, booking);
    }

    #[test]
    fn test_create_normalizes_slot_label() {
        let conn = setup_db();
        let booking =
            create_booking(&conn, &config(BookingStatus::Pending), now(), request("xbox", "14:00")).unwrap();
        assert_eq!(booking.time_slot, "2:00 PM");
    }

    #[test]
    fn test_price_is_snapshot_at_creation() {
        let conn = setup_db();
        let booking =
            create_booking(&conn, &config(BookingStatus::Pending), now(), request("xbox", "2:00 PM")).unwrap();

        let mut settings = load_settings(&conn).unwrap();
        settings.pricing.rates.get_mut("xbox").unwrap().individual = 500.0;
        replace_settings(&conn, &settings).unwrap();

        assert_eq!(get_booking(&conn, &booking.id).unwrap().price, 120.0);
    }

    #[test]
    fn test_create_full_slot_rejected() {
        let conn = setup_db();
        let config = config(BookingStatus::Pending);
        create_booking(&conn, &config, now(), request("vr", "2:00 PM")).unwrap();
        let err = create_booking(&conn, &config, now(), request("vr", "2:00 PM")).unwrap_err();
        assert!(matches!(err, AppError::SlotUnavailable(_)));
    }

    #[test]
    fn test_reference_collision_regenerates() {
        let conn = setup_db();
        let first =
            create_booking(&conn, &config(BookingStatus::Pending), now(), request("xbox", "2:00 PM")).unwrap();

        let mut second = first.clone();
        second.id = Uuid::new_v4().to_string();
        let mut candidates = vec![first.reference_number.clone(), "KGGFRESH1".to_string()].into_iter();
        insert_with_fresh_reference(&conn, &mut second, || candidates.next().unwrap()).unwrap();

        assert_eq!(second.reference_number, "KGGFRESH1");
        assert_eq!(get_by_reference(&conn, "KGGFRESH1").unwrap().id, second.id);
    }

    #[test]
    fn test_reference_attempts_are_bounded() {
        let conn = setup_db();
        let first =
            create_booking(&conn, &config(BookingStatus::Pending), now(), request("xbox", "2:00 PM")).unwrap();

        let mut second = first.clone();
        second.id = Uuid::new_v4().to_string();
        let mut calls = 0;
        let err = insert_with_fresh_reference(&conn, &mut second, || {
            calls += 1;
            first.reference_number.clone()
        })
        .unwrap_err();

        assert!(matches!(err, AppError::Internal(_)));
        assert_eq!(calls, MAX_REFERENCE_ATTEMPTS);
        assert!(get_booking(&conn, &second.id).is_err());
    }

    #[test]
    fn test_thousand_bookings_get_distinct_references() {
        let conn = setup_db();
        let config = config(BookingStatus::Confirmed);
        let settings = load_settings(&conn).unwrap();
        let catalog = queries::list_game_types(&conn).unwrap();

        let mut seen = std::collections::HashSet::new();
        let mut date = NaiveDate::from_ymd_opt(2025, 6, 16).unwrap();
        while seen.len() < 1000 {
            for time in settings.schedule.slot_times(date) {
                for game in &catalog {
                    for _ in 0..game.capacity {
                        if seen.len() == 1000 {
                            break;
                        }
                        let req = CreateBookingRequest {
                            date: Some(date.format("%Y-%m-%d").to_string()),
                            ..request(&game.id, &crate::models::availability::format_slot_label(time))
                        };
                        let booking = create_booking(&conn, &config, now(), req).unwrap();
                        assert!(is_valid_reference(&booking.reference_number));
                        seen.insert(booking.reference_number);
                    }
                }
            }
            date += Duration::days(1);
        }

        assert_eq!(seen.len(), 1000);
        assert_eq!(queries::get_status_counts(&conn).unwrap().confirmed, 1000);
    }

    #[test]
    fn test_create_validation_errors() {
        let conn = setup_db();
        let config = config(BookingStatus::Pending);

        let err = create_booking(&conn, &config, now(), CreateBookingRequest::default()).unwrap_err();
        match err {
            AppError::InvalidFields(errors) => {
                let fields = errors.fields();
                for f in ["name", "phone", "game_type", "date", "time_slot"] {
                    assert!(fields.contains(&f), "missing {f}");
                }
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let mut bad_duration = request("xbox", "2:00 PM");
        bad_duration.duration = Some(45);
        assert!(matches!(
            create_booking(&conn, &config, now(), bad_duration),
            Err(AppError::Validation(_))
        ));

        let mut past = request("xbox", "2:00 PM");
        past.date = Some("2025-06-01".to_string());
        assert!(matches!(create_booking(&conn, &config, now(), past), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_cancel_window() {
        let conn = setup_db();
        let config = config(BookingStatus::Confirmed);
        let booking = create_booking(&conn, &config, now(), request("xbox", "2:00 PM")).unwrap();

        let err = cancel_by_reference(&conn, &config, dt("2025-06-16 13:30"), &booking.reference_number)
            .unwrap_err();
        assert!(matches!(err, AppError::CancellationWindow(_)));

        let cancelled =
            cancel_by_reference(&conn, &config, dt("2025-06-16 12:00"), &booking.reference_number).unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);

        let err = cancel_by_reference(&conn, &config, dt("2025-06-16 12:00"), &booking.reference_number)
            .unwrap_err();
        assert!(matches!(err, AppError::AlreadyCancelled(_)));
    }

    #[test]
    fn test_cancel_unknown_reference() {
        let conn = setup_db();
        let err = cancel_by_reference(&conn, &config(BookingStatus::Pending), now(), "KGG000000").unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_update_status_transitions() {
        let conn = setup_db();
        let booking =
            create_booking(&conn, &config(BookingStatus::Pending), now(), request("vr", "2:00 PM")).unwrap();

        let status = |s: &str| UpdateBookingRequest {
            status: Some(s.to_string()),
            special_requests: None,
        };

        let err = update_booking(&conn, now(), &booking.id, status("archived")).unwrap_err();
        assert!(matches!(err, AppError::InvalidStatus(_)));

        let later = dt("2025-06-15 10:00");
        let confirmed = update_booking(&conn, later, &booking.id, status("confirmed")).unwrap();
        assert_eq!(confirmed.status, BookingStatus::Confirmed);
        assert_eq!(confirmed.updated_at, later);

        // same status again is a no-op
        let again = update_booking(&conn, dt("2025-06-15 11:00"), &booking.id, status("confirmed")).unwrap();
        assert_eq!(again.updated_at, later);

        let err = update_booking(&conn, now(), &booking.id, status("pending")).unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));

        update_booking(&conn, now(), &booking.id, status("cancelled")).unwrap();
        let reactivated = update_booking(&conn, now(), &booking.id, status("confirmed")).unwrap();
        assert_eq!(reactivated.status, BookingStatus::Confirmed);
    }

    #[test]
    fn test_reactivation_blocked_when_slot_taken() {
        let conn = setup_db();
        let config = config(BookingStatus::Confirmed);
        let first = create_booking(&conn, &config, now(), request("vr", "2:00 PM")).unwrap();
        update_booking(
            &conn,
            now(),
            &first.id,
            UpdateBookingRequest {
                status: Some("cancelled".to_string()),
                special_requests: None,
            },
        )
        .unwrap();
        create_booking(&conn, &config, now(), request("vr", "2:00 PM")).unwrap();

        let err = update_booking(
            &conn,
            now(),
            &first.id,
            UpdateBookingRequest {
                status: Some("confirmed".to_string()),
                special_requests: None,
            },
        )
        .unwrap_err();
        assert!(matches!(err, AppError::SlotUnavailable(_)));
    }

    #[test]
    fn test_update_special_requests_and_delete() {
        let conn = setup_db();
        let booking =
            create_booking(&conn, &config(BookingStatus::Pending), now(), request("xbox", "2:00 PM")).unwrap();
        let updated = update_booking(
            &conn,
            now(),
            &booking.id,
            UpdateBookingRequest {
                status: None,
                special_requests: Some("  birthday cake  ".to_string()),
            },
        )
        .unwrap();
        assert_eq!(updated.special_requests.as_deref(), Some("birthday cake"));

        delete_booking(&conn, &booking.id).unwrap();
        assert!(matches!(get_booking(&conn, &booking.id), Err(AppError::NotFound(_))));
        assert!(matches!(delete_booking(&conn, &booking.id), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_list_filter_and_stats() {
        let conn = setup_db();
        let pending = config(BookingStatus::Pending);
        let confirmed = config(BookingStatus::Confirmed);
        create_booking(&conn, &pending, now(), request("xbox", "2:00 PM")).unwrap();
        create_booking(&conn, &confirmed, now(), request("xbox", "3:00 PM")).unwrap();
        create_booking(&conn, &confirmed, now(), request("xbox", "4:00 PM")).unwrap();

        assert_eq!(list_bookings(&conn, Some("confirmed")).unwrap().len(), 2);
        assert_eq!(list_bookings(&conn, None).unwrap().len(), 3);
        assert!(matches!(list_bookings(&conn, Some("done")), Err(AppError::InvalidStatus(_))));

        let stats = stats(&conn, now().date()).unwrap();
        assert_eq!(stats.counts.total, 3);
        assert_eq!(stats.counts.pending, 1);
        assert_eq!(stats.upcoming_confirmed, 2);
    }

    #[test]
    fn test_catalog_carries_rates() {
        let conn = setup_db();
        let catalog = catalog_with_rates(&conn).unwrap();
        let vr = catalog.iter().find(|g| g.id == "vr").unwrap();
        assert_eq!(vr.base_rate_per_hour, Some(200.0));
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let conn = setup_db();
        let mut settings = load_settings(&conn).unwrap();
        settings.pricing.rates.get_mut("xbox").unwrap().group = 999.0;
        assert!(matches!(replace_settings(&conn, &settings), Err(AppError::Validation(_))));
    }
}
