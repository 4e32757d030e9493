//! crates/school_ops_core/src/board.rs
//!
//! Live presence board: keeps a roster subscription and a per-day event
//! subscription open and republishes a fresh [`PresenceSnapshot`] whenever the
//! roster, the event log, the selected day, or the filter changes.
//!
//! The two subscriptions are not ordered with respect to each other, so a snapshot
//! may combine a roster and an event log captured at slightly different moments.
//! Each recomputation starts from the full latest state; nothing is patched.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::debug;

use crate::classifier::RosterFilter;
use crate::domain::{AttendanceEvent, RosterMember};
use crate::ports::{AttendanceSource, RosterSource, Subscription};
use crate::presence::{compute_presence_filtered, PresenceSnapshot};

struct BoardState {
    roster: Vec<RosterMember>,
    /// Only events belonging to `day`.
    events: Vec<AttendanceEvent>,
    day: String,
    filter: RosterFilter,
}

struct Shared {
    state: Mutex<BoardState>,
    tx: watch::Sender<PresenceSnapshot>,
}

impl Shared {
    fn recompute(&self) {
        let snapshot = {
            let state = self.state.lock();
            compute_presence_filtered(&state.roster, &state.events, &state.filter)
        };
        debug!(
            total = snapshot.total,
            present = snapshot.present_count(),
            rate = snapshot.rate,
            "presence recomputed"
        );
        self.tx.send_replace(snapshot);
    }
}

pub struct PresenceBoard {
    shared: Arc<Shared>,
    attendance: Arc<dyn AttendanceSource>,
    roster_sub: Mutex<Option<Subscription>>,
    events_sub: Mutex<Option<Subscription>>,
}

impl PresenceBoard {
    pub fn open(
        roster: &dyn RosterSource,
        attendance: Arc<dyn AttendanceSource>,
        day: impl Into<String>,
        filter: RosterFilter,
    ) -> Self {
        let (tx, _rx) = watch::channel(PresenceSnapshot::default());
        let shared = Arc::new(Shared {
            state: Mutex::new(BoardState {
                roster: Vec::new(),
                events: Vec::new(),
                day: day.into(),
                filter,
            }),
            tx,
        });

        let sink = shared.clone();
        let roster_sub = roster.subscribe_roster(Box::new(move |members: Vec<RosterMember>| {
            sink.state.lock().roster = members;
            sink.recompute();
        }));

        let board = Self {
            shared,
            attendance,
            roster_sub: Mutex::new(Some(roster_sub)),
            events_sub: Mutex::new(None),
        };
        let day = board.day();
        board.subscribe_day(day);
        board
    }

    /// Switches to another day. The previous day's subscription is released before
    /// the new one opens, and its events stop counting immediately.
    pub fn select_day(&self, day: impl Into<String>) {
        let day = day.into();
        let old = self.events_sub.lock().take();
        if let Some(old) = old {
            old.unsubscribe();
        }
        {
            let mut state = self.shared.state.lock();
            state.day = day.clone();
            state.events.clear();
        }
        self.shared.recompute();
        self.subscribe_day(day);
    }

    pub fn set_filter(&self, filter: RosterFilter) {
        self.shared.state.lock().filter = filter;
        self.shared.recompute();
    }

    pub fn day(&self) -> String {
        self.shared.state.lock().day.clone()
    }

    pub fn filter(&self) -> RosterFilter {
        self.shared.state.lock().filter.clone()
    }

    pub fn snapshot(&self) -> PresenceSnapshot {
        self.shared.tx.borrow().clone()
    }

    /// A receiver that observes every republished snapshot.
    pub fn watch(&self) -> watch::Receiver<PresenceSnapshot> {
        self.shared.tx.subscribe()
    }

    /// Releases both subscriptions. The last snapshot stays readable.
    pub fn close(&self) {
        let events = self.events_sub.lock().take();
        let roster = self.roster_sub.lock().take();
        for sub in events.into_iter().chain(roster) {
            sub.unsubscribe();
        }
    }

    fn subscribe_day(&self, day: String) {
        let sink = self.shared.clone();
        let subscribed_day = day.clone();
        let sub = self.attendance.subscribe_events(
            &day,
            Box::new(move |events: Vec<AttendanceEvent>| {
                {
                    let mut state = sink.state.lock();
                    if state.day != subscribed_day {
                        return;
                    }
                    state.events = events
                        .into_iter()
                        .filter(|e| e.day == subscribed_day)
                        .collect();
                }
                sink.recompute();
            }),
        );
        *self.events_sub.lock() = Some(sub);
    }
}

impl Drop for PresenceBoard {
    fn drop(&mut self) {
        self.close();
    }
}
