use crate::ports::TimeProvider;
use crate::types::{Category, Notification, NotificationAction};

use base64::{URL_SAFE_NO_PAD, encode_config};
use rand::RngCore;
use rand::rngs::OsRng;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;

pub const DEFAULT_CAPACITY: usize = 50;
pub const DEFAULT_DISMISS_AFTER: Duration = Duration::from_millis(5000);

type Subscriber = Arc<dyn Fn(Vec<Notification>) + Send + Sync>;

/// Options for [`NotificationCenter::add`]. `duration` falls back to the
/// center-wide default when unset; `auto_hide: false` keeps the entry until
/// it is dismissed explicitly or evicted by capacity.
pub struct AddOptions {
    pub auto_hide: bool,
    pub duration: Option<Duration>,
    pub actions: Vec<NotificationAction>,
}

impl Default for AddOptions {
    fn default() -> Self {
        Self {
            auto_hide: true,
            duration: None,
            actions: Vec::new(),
        }
    }
}

struct CenterInner {
    entries: Vec<Notification>,
    unread: usize,
    subscribers: Vec<(u64, Subscriber)>,
    next_subscriber_id: u64,
    next_sequence: u64,
    timers: Vec<JoinHandle<()>>,
}

/// Bounded, newest-first collection of user-visible notifications.
///
/// Every successful mutation hands a snapshot copy of the collection to each
/// live subscriber, synchronously and without batching. Unknown ids are
/// tolerated silently; none of the operations can fail.
#[derive(Clone)]
pub struct NotificationCenter<T> {
    time: T,
    capacity: usize,
    dismiss_after: Duration,
    inner: Arc<Mutex<CenterInner>>,
}

impl<T: TimeProvider> NotificationCenter<T> {
    pub fn new(time: T, capacity: usize, dismiss_after: Duration) -> Self {
        Self {
            time,
            capacity: capacity.max(1),
            dismiss_after,
            inner: Arc::new(Mutex::new(CenterInner {
                entries: Vec::new(),
                unread: 0,
                subscribers: Vec::new(),
                next_subscriber_id: 0,
                next_sequence: 0,
                timers: Vec::new(),
            })),
        }
    }

    /// Creates a notification and prepends it to the collection. When the
    /// capacity cap would be exceeded the least-recently-added entry is
    /// silently dropped. Returns the assigned id.
    pub fn add(
        &self,
        category: Category,
        title: &str,
        message: Option<&str>,
        options: AddOptions,
    ) -> String {
        let created_at = self.time.now();
        let (id, notified) = {
            let mut inner = self.inner.lock().expect("notification center lock");
            inner.timers.retain(|handle| !handle.is_finished());

            let sequence = inner.next_sequence;
            inner.next_sequence += 1;
            let id = fresh_id_with_rng(sequence, &mut OsRng);

            inner.entries.insert(
                0,
                Notification {
                    id: id.clone(),
                    category,
                    title: title.to_string(),
                    message: message.map(str::to_string),
                    created_at,
                    read: false,
                    actions: options.actions,
                },
            );
            inner.unread += 1;
            if inner.entries.len() > self.capacity {
                let evicted = inner.entries.pop().expect("entry beyond capacity");
                if !evicted.read {
                    inner.unread -= 1;
                }
            }
            (id, notified_snapshot(&inner))
        };
        dispatch(notified);

        if options.auto_hide {
            let duration = options.duration.unwrap_or(self.dismiss_after);
            let center = self.clone();
            let dismiss_id = id.clone();
            let handle = tokio::spawn(async move {
                center.time.sleep(duration).await;
                // A no-op if the entry was removed or evicted in the meantime.
                center.remove(&dismiss_id);
            });
            self.inner
                .lock()
                .expect("notification center lock")
                .timers
                .push(handle);
        }

        id
    }

    /// Marks the matching entry read. Idempotent; unknown ids are ignored.
    pub fn mark_read(&self, id: &str) {
        let notified = {
            let mut inner = self.inner.lock().expect("notification center lock");
            let Some(entry) = inner.entries.iter_mut().find(|entry| entry.id == id) else {
                return;
            };
            if entry.read {
                return;
            }
            entry.read = true;
            inner.unread -= 1;
            notified_snapshot(&inner)
        };
        dispatch(notified);
    }

    pub fn mark_all_read(&self) {
        let notified = {
            let mut inner = self.inner.lock().expect("notification center lock");
            if inner.unread == 0 {
                return;
            }
            for entry in &mut inner.entries {
                entry.read = true;
            }
            inner.unread = 0;
            notified_snapshot(&inner)
        };
        dispatch(notified);
    }

    /// Deletes the entry by id. Unknown ids are ignored.
    pub fn remove(&self, id: &str) {
        let notified = {
            let mut inner = self.inner.lock().expect("notification center lock");
            let Some(position) = inner.entries.iter().position(|entry| entry.id == id) else {
                return;
            };
            let removed = inner.entries.remove(position);
            if !removed.read {
                inner.unread -= 1;
            }
            notified_snapshot(&inner)
        };
        dispatch(notified);
    }

    pub fn clear(&self) {
        let notified = {
            let mut inner = self.inner.lock().expect("notification center lock");
            if inner.entries.is_empty() {
                return;
            }
            inner.entries.clear();
            inner.unread = 0;
            notified_snapshot(&inner)
        };
        dispatch(notified);
    }

    /// Registers a callback invoked with a newest-first snapshot after every
    /// mutation. Dropping the returned handle without calling
    /// [`SubscriberHandle::unsubscribe`] leaves the subscription live.
    pub fn subscribe(
        &self,
        callback: impl Fn(Vec<Notification>) + Send + Sync + 'static,
    ) -> SubscriberHandle {
        let mut inner = self.inner.lock().expect("notification center lock");
        let id = inner.next_subscriber_id;
        inner.next_subscriber_id += 1;
        inner.subscribers.push((id, Arc::new(callback)));
        SubscriberHandle {
            id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn snapshot(&self) -> Vec<Notification> {
        self.inner
            .lock()
            .expect("notification center lock")
            .entries
            .clone()
    }

    pub fn unread_count(&self) -> usize {
        self.inner.lock().expect("notification center lock").unread
    }

    #[cfg(test)]
    pub(crate) fn take_timers(&self) -> Vec<JoinHandle<()>> {
        std::mem::take(
            &mut self
                .inner
                .lock()
                .expect("notification center lock")
                .timers,
        )
    }
}

pub struct SubscriberHandle {
    id: u64,
    inner: Weak<Mutex<CenterInner>>,
}

impl SubscriberHandle {
    pub fn unsubscribe(self) {
        if let Some(inner) = self.inner.upgrade() {
            inner
                .lock()
                .expect("notification center lock")
                .subscribers
                .retain(|(id, _)| *id != self.id);
        }
    }
}

// Snapshot and subscriber list are cloned under the lock, then callbacks run
// after it is released so a subscriber may re-enter the center.
fn notified_snapshot(inner: &CenterInner) -> (Vec<Notification>, Vec<Subscriber>) {
    let snapshot = inner.entries.clone();
    let subscribers = inner
        .subscribers
        .iter()
        .map(|(_, subscriber)| Arc::clone(subscriber))
        .collect();
    (snapshot, subscribers)
}

fn dispatch((snapshot, subscribers): (Vec<Notification>, Vec<Subscriber>)) {
    for subscriber in subscribers {
        subscriber(snapshot.clone());
    }
}

fn fresh_id_with_rng<R: RngCore>(sequence: u64, rng: &mut R) -> String {
    let mut bytes = [0u8; 6];
    rng.fill_bytes(&mut bytes);
    format!("{:x}-{}", sequence, encode_config(bytes, URL_SAFE_NO_PAD))
}
