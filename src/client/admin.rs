use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::{BookingApi, BookingService, ClientError};
use crate::models::{AdminSession, Booking, BookingStatus, StatusCounts};

/// What the dashboard shows: every booking, newest first, and the counts
/// per status.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdminSnapshot {
    pub bookings: Vec<Booking>,
    pub counts: StatusCounts,
}

impl AdminSnapshot {
    pub fn new(mut bookings: Vec<Booking>) -> Self {
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let counts = StatusCounts::tally(&bookings);
        Self { bookings, counts }
    }

    fn replace(&mut self, booking: Booking) {
        if let Some(slot) = self.bookings.iter_mut().find(|b| b.id == booking.id) {
            *slot = booking;
        } else {
            self.bookings.push(booking);
        }
        *self = AdminSnapshot::new(std::mem::take(&mut self.bookings));
    }

    fn remove(&mut self, id: &str) {
        self.bookings.retain(|b| b.id != id);
        self.counts = StatusCounts::tally(&self.bookings);
    }
}

/// Background refresh of an [`AdminView`]. Stopping or dropping the handle
/// aborts the task.
pub struct RefreshHandle {
    task: JoinHandle<()>,
}

impl RefreshHandle {
    pub fn stop(self) {
        self.task.abort();
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Admin dashboard state. Status changes go through [`BookingService`];
/// the view only keeps the latest snapshot for subscribers.
pub struct AdminView<A: BookingApi + 'static> {
    service: Arc<BookingService<A>>,
    session: AdminSession,
    snapshot: Arc<watch::Sender<AdminSnapshot>>,
    refresh: Option<RefreshHandle>,
}

impl<A: BookingApi + 'static> AdminView<A> {
    pub fn new(service: Arc<BookingService<A>>, session: AdminSession) -> Self {
        let (tx, _) = watch::channel(AdminSnapshot::default());
        Self {
            service,
            session,
            snapshot: Arc::new(tx),
            refresh: None,
        }
    }

    pub fn session(&self) -> &AdminSession {
        &self.session
    }

    pub fn subscribe(&self) -> watch::Receiver<AdminSnapshot> {
        self.snapshot.subscribe()
    }

    pub fn snapshot(&self) -> AdminSnapshot {
        self.snapshot.borrow().clone()
    }

    pub async fn refresh(&self) -> Result<AdminSnapshot, ClientError> {
        let snapshot = load(&self.service, &self.session).await?;
        self.snapshot.send_replace(snapshot.clone());
        Ok(snapshot)
    }

    /// pending → confirmed. A cancelled booking goes through [`Self::reactivate`].
    pub async fn approve(&self, id: &str) -> Result<Booking, ClientError> {
        self.set_status(id, "approve", BookingStatus::Pending, BookingStatus::Confirmed)
            .await
    }

    /// pending → cancelled
    pub async fn decline(&self, id: &str) -> Result<Booking, ClientError> {
        self.set_status(id, "decline", BookingStatus::Pending, BookingStatus::Cancelled)
            .await
    }

    /// cancelled → confirmed
    pub async fn reactivate(&self, id: &str) -> Result<Booking, ClientError> {
        self.set_status(id, "reactivate", BookingStatus::Cancelled, BookingStatus::Confirmed)
            .await
    }

    /// confirmed → cancelled
    pub async fn cancel(&self, id: &str) -> Result<Booking, ClientError> {
        self.set_status(id, "cancel", BookingStatus::Confirmed, BookingStatus::Cancelled)
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<(), ClientError> {
        self.service.delete(&self.session, id).await?;
        self.snapshot.send_modify(|s| s.remove(id));
        Ok(())
    }

    /// Refuses an action whose starting status does not match the booking as
    /// last seen. Bookings missing from the snapshot are left to the server.
    async fn set_status(
        &self,
        id: &str,
        action: &str,
        from: BookingStatus,
        to: BookingStatus,
    ) -> Result<Booking, ClientError> {
        let seen = self
            .snapshot
            .borrow()
            .bookings
            .iter()
            .find(|b| b.id == id)
            .map(|b| b.status);
        if let Some(current) = seen.filter(|s| *s != from && *s != to) {
            return Err(ClientError::InvalidTransition(format!(
                "cannot {action} a {current} booking"
            )));
        }

        let booking = self
            .service
            .update_status(&self.session, id, to.as_str())
            .await?;
        self.snapshot.send_modify(|s| s.replace(booking.clone()));
        Ok(booking)
    }

    /// Reloads the snapshot every `period` until stopped. A previous
    /// refresh task is replaced.
    pub fn start_auto_refresh(&mut self, period: Duration) {
        let service = Arc::clone(&self.service);
        let session = self.session.clone();
        let snapshot = Arc::clone(&self.snapshot);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match load(&service, &session).await {
                    Ok(next) => {
                        snapshot.send_replace(next);
                    }
                    Err(err @ ClientError::Unauthorized(_)) => {
                        err.report();
                        break;
                    }
                    Err(err) => err.report(),
                }
            }
            tracing::debug!("admin auto-refresh stopped");
        });

        self.refresh = Some(RefreshHandle { task });
    }

    pub fn stop_auto_refresh(&mut self) {
        if let Some(handle) = self.refresh.take() {
            handle.stop();
        }
    }

    pub fn is_auto_refreshing(&self) -> bool {
        self.refresh.as_ref().is_some_and(RefreshHandle::is_running)
    }

    /// Ends the admin session: stops refreshing and revokes the token.
    pub async fn logout(mut self) -> Result<(), ClientError> {
        self.stop_auto_refresh();
        self.service.logout(&self.session).await
    }
}

async fn load<A: BookingApi>(
    service: &BookingService<A>,
    session: &AdminSession,
) -> Result<AdminSnapshot, ClientError> {
    let bookings = service.list(session, None).await?;
    Ok(AdminSnapshot::new(bookings))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{Local, NaiveDate, NaiveDateTime};

    use super::*;
    use crate::models::{
        DayAvailability, GameType, NewBooking, PriceBreakdown, PriceQuery, Settings,
        UpdateBookingRequest,
    };

    struct StubApi {
        bookings: Mutex<Vec<Booking>>,
        list_calls: AtomicUsize,
        logged_out: AtomicUsize,
    }

    impl StubApi {
        fn with(bookings: Vec<Booking>) -> Self {
            Self {
                bookings: Mutex::new(bookings),
                list_calls: AtomicUsize::new(0),
                logged_out: AtomicUsize::new(0),
            }
        }
    }

    fn unused<T>() -> Result<T, ClientError> {
        Err(ClientError::Transport("not used in these tests".to_string()))
    }

    #[async_trait]
    impl BookingApi for StubApi {
        async fn create_booking(&self, _booking: &NewBooking) -> Result<Booking, ClientError> {
            unused()
        }
        async fn get_by_reference(&self, _reference: &str) -> Result<Booking, ClientError> {
            unused()
        }
        async fn cancel_by_reference(&self, _reference: &str) -> Result<Booking, ClientError> {
            unused()
        }
        async fn calculate_price(&self, _query: &PriceQuery) -> Result<PriceBreakdown, ClientError> {
            unused()
        }
        async fn availability(
            &self,
            _date: NaiveDate,
            _game_type: Option<&str>,
            _duration: Option<u32>,
        ) -> Result<DayAvailability, ClientError> {
            unused()
        }
        async fn game_types(&self) -> Result<Vec<GameType>, ClientError> {
            unused()
        }
        async fn settings(&self) -> Result<Settings, ClientError> {
            unused()
        }
        async fn login(&self, _password: &str) -> Result<AdminSession, ClientError> {
            unused()
        }

        async fn logout(&self, _token: &str) -> Result<(), ClientError> {
            self.logged_out.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn list_bookings(
            &self,
            _token: &str,
            _status: Option<BookingStatus>,
        ) -> Result<Vec<Booking>, ClientError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.bookings.lock().unwrap().clone())
        }

        async fn get_booking(&self, _token: &str, _id: &str) -> Result<Booking, ClientError> {
            unused()
        }

        async fn update_booking(
            &self,
            _token: &str,
            id: &str,
            update: &UpdateBookingRequest,
        ) -> Result<Booking, ClientError> {
            let status = update
                .status
                .as_deref()
                .and_then(BookingStatus::parse)
                .ok_or_else(|| ClientError::InvalidStatus(String::new()))?;
            let mut bookings = self.bookings.lock().unwrap();
            let booking = bookings
                .iter_mut()
                .find(|b| b.id == id)
                .ok_or_else(|| ClientError::NotFound(id.to_string()))?;
            booking
                .status
                .transition(status)
                .map_err(|e| ClientError::InvalidTransition(e.to_string()))?;
            booking.status = status;
            Ok(booking.clone())
        }

        async fn delete_booking(&self, _token: &str, id: &str) -> Result<(), ClientError> {
            self.bookings.lock().unwrap().retain(|b| b.id != id);
            Ok(())
        }
    }

    fn booking(id: &str, status: BookingStatus, created: &str) -> Booking {
        let created_at = NaiveDateTime::parse_from_str(created, "%Y-%m-%d %H:%M").unwrap();
        Booking {
            id: id.to_string(),
            reference_number: format!("KGG{:0>6}", id.to_uppercase()),
            name: "Asha".to_string(),
            phone: "+919876543210".to_string(),
            email: None,
            game_type: "xbox".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 6, 16).unwrap(),
            time_slot: "2:00 PM".to_string(),
            duration: 60,
            num_people: 1,
            special_requests: None,
            price: 120.0,
            status,
            created_at,
            updated_at: created_at,
        }
    }

    fn session() -> AdminSession {
        AdminSession {
            token: "token".to_string(),
            expires_at: Local::now().naive_local() + chrono::Duration::hours(1),
        }
    }

    fn view(bookings: Vec<Booking>) -> AdminView<StubApi> {
        let service = Arc::new(BookingService::new(StubApi::with(bookings)));
        AdminView::new(service, session())
    }

    fn seed() -> Vec<Booking> {
        vec![
            booking("a", BookingStatus::Pending, "2025-06-10 09:00"),
            booking("b", BookingStatus::Confirmed, "2025-06-12 09:00"),
            booking("c", BookingStatus::Cancelled, "2025-06-11 09:00"),
        ]
    }

    #[tokio::test]
    async fn test_refresh_sorts_newest_first_and_counts() {
        let view = view(seed());
        let snapshot = view.refresh().await.unwrap();
        let ids: Vec<&str> = snapshot.bookings.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
        assert_eq!(
            snapshot.counts,
            StatusCounts {
                total: 3,
                pending: 1,
                confirmed: 1,
                cancelled: 1
            }
        );
        assert_eq!(view.snapshot(), snapshot);
    }

    #[tokio::test]
    async fn test_transitions_update_snapshot() {
        let view = view(seed());
        view.refresh().await.unwrap();
        let mut rx = view.subscribe();

        view.approve("a").await.unwrap();
        assert!(rx.has_changed().unwrap());
        let snapshot = rx.borrow_and_update().clone();
        assert_eq!(snapshot.counts.pending, 0);
        assert_eq!(snapshot.counts.confirmed, 2);

        view.reactivate("c").await.unwrap();
        assert_eq!(view.snapshot().counts.cancelled, 0);

        view.cancel("b").await.unwrap();
        assert_eq!(view.snapshot().counts.cancelled, 1);

        // confirmed → pending is not a move the dashboard can make
        assert!(view.service.update_status(view.session(), "a", "pending").await.is_err());
    }

    #[tokio::test]
    async fn test_actions_check_the_starting_status() {
        let view = view(seed());
        view.refresh().await.unwrap();

        let err = view.approve("c").await.unwrap_err();
        assert_eq!(
            err,
            ClientError::InvalidTransition("cannot approve a cancelled booking".to_string())
        );
        assert!(matches!(view.decline("b").await, Err(ClientError::InvalidTransition(_))));
        assert!(matches!(view.cancel("a").await, Err(ClientError::InvalidTransition(_))));
        assert!(matches!(view.reactivate("a").await, Err(ClientError::InvalidTransition(_))));
        assert_eq!(view.snapshot().counts.cancelled, 1);

        // Repeating a finished action is harmless.
        assert_eq!(view.approve("b").await.unwrap().status, BookingStatus::Confirmed);
        assert_eq!(view.reactivate("c").await.unwrap().status, BookingStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_delete_removes_from_snapshot() {
        let view = view(seed());
        view.refresh().await.unwrap();
        view.delete("c").await.unwrap();
        let snapshot = view.snapshot();
        assert_eq!(snapshot.counts.total, 2);
        assert!(snapshot.bookings.iter().all(|b| b.id != "c"));
    }

    #[tokio::test]
    async fn test_auto_refresh_stops() {
        let mut view = view(seed());
        view.start_auto_refresh(Duration::from_millis(20));
        assert!(view.is_auto_refreshing());

        let mut rx = view.subscribe();
        tokio::time::timeout(Duration::from_secs(2), rx.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(rx.borrow().counts.total, 3);

        view.stop_auto_refresh();
        assert!(!view.is_auto_refreshing());
        tokio::time::sleep(Duration::from_millis(30)).await;
        let calls = view.service.api().list_calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(view.service.api().list_calls.load(Ordering::SeqCst), calls);
    }

    #[tokio::test]
    async fn test_logout_stops_refresh_and_revokes() {
        let service = Arc::new(BookingService::new(StubApi::with(seed())));
        let mut view = AdminView::new(Arc::clone(&service), session());
        view.start_auto_refresh(Duration::from_millis(20));
        view.logout().await.unwrap();

        assert_eq!(service.api().logged_out.load(Ordering::SeqCst), 1);
        tokio::time::sleep(Duration::from_millis(30)).await;
        let calls = service.api().list_calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(service.api().list_calls.load(Ordering::SeqCst), calls);
    }
}
