//! A simulated client face.
//!
//! Every action on the face is deferred onto the [Scheduler] and takes effect only when the clock
//! advances. Data put on the face is recorded in order so it can be inspected.

use crate::deterministic::Scheduler;
use mgmt_packet::{Data, Interest, Name};
use std::{
    cell::{Ref, RefCell},
    collections::{BTreeMap, BTreeSet},
    rc::Rc,
    time::Duration,
};
use tracing::{debug, trace};

/// Callback invoked with the filter prefix and the incoming interest.
pub type InterestHandler = Rc<dyn Fn(&Name, &Interest)>;

/// Identifies an installed interest filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FilterId(u64);

#[derive(Default)]
struct State {
    next_filter: u64,
    filters: BTreeMap<FilterId, (Name, InterestHandler)>,
    registered: BTreeSet<Name>,
    sent_data: Vec<Data>,
}

/// Handle to a simulated face.
#[derive(Clone)]
pub struct Face {
    scheduler: Scheduler,
    state: Rc<RefCell<State>>,
}

impl Face {
    pub fn new(scheduler: Scheduler) -> Self {
        Self {
            scheduler,
            state: Rc::default(),
        }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Delivers `interest` to every filter matching its name.
    pub fn receive(&self, interest: Interest) {
        let state = self.state.clone();
        self.scheduler.schedule(Duration::ZERO, move || {
            let matching: Vec<_> = state
                .borrow()
                .filters
                .values()
                .filter(|(prefix, _)| prefix.is_prefix_of(interest.name()))
                .map(|(prefix, handler)| (prefix.clone(), handler.clone()))
                .collect();
            if matching.is_empty() {
                debug!(name = %interest.name(), "no filter for interest");
                return;
            }
            for (prefix, handler) in matching {
                trace!(name = %interest.name(), %prefix, "delivering interest");
                handler(&prefix, &interest);
            }
        });
    }

    /// Sends `data` out of the face.
    pub fn put(&self, data: Data) {
        let state = self.state.clone();
        self.scheduler.schedule(Duration::ZERO, move || {
            trace!(name = %data.name(), "sent data");
            state.borrow_mut().sent_data.push(data);
        });
    }

    /// Installs a filter delivering interests under `prefix` to `handler`.
    pub fn set_interest_filter(
        &self,
        prefix: Name,
        handler: impl Fn(&Name, &Interest) + 'static,
    ) -> FilterId {
        let id = {
            let mut state = self.state.borrow_mut();
            let id = FilterId(state.next_filter);
            state.next_filter += 1;
            id
        };
        let state = self.state.clone();
        let handler: InterestHandler = Rc::new(handler);
        self.scheduler.schedule(Duration::ZERO, move || {
            debug!(%prefix, "interest filter installed");
            state.borrow_mut().filters.insert(id, (prefix, handler));
        });
        id
    }

    /// Removes a filter. Interests already delivered are not affected.
    pub fn unset_interest_filter(&self, id: FilterId) {
        let state = self.state.clone();
        self.scheduler.schedule(Duration::ZERO, move || {
            if let Some((prefix, _)) = state.borrow_mut().filters.remove(&id) {
                debug!(%prefix, "interest filter removed");
            }
        });
    }

    /// Registers `prefix` with the (simulated) forwarder.
    pub fn register_prefix(&self, prefix: Name) {
        let state = self.state.clone();
        self.scheduler.schedule(Duration::ZERO, move || {
            debug!(%prefix, "prefix registered");
            state.borrow_mut().registered.insert(prefix);
        });
    }

    /// Withdraws a registration made with [Face::register_prefix].
    pub fn unregister_prefix(&self, prefix: Name) {
        let state = self.state.clone();
        self.scheduler.schedule(Duration::ZERO, move || {
            state.borrow_mut().registered.remove(&prefix);
        });
    }

    /// Prefixes currently registered.
    pub fn registered_prefixes(&self) -> Vec<Name> {
        self.state.borrow().registered.iter().cloned().collect()
    }

    /// Number of filters currently installed.
    pub fn filter_count(&self) -> usize {
        self.state.borrow().filters.len()
    }

    /// Data sent so far, in order.
    pub fn sent_data(&self) -> Ref<'_, [Data]> {
        Ref::map(self.state.borrow(), |state| state.sent_data.as_slice())
    }

    /// Forgets all recorded data.
    pub fn clear_sent_data(&self) {
        self.state.borrow_mut().sent_data.clear();
    }
}
