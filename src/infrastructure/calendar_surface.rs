use crate::domain::models::ActivityId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Payload the drop surface reads off a draggable pool element.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DraggableItem {
    pub title: String,
    /// `HH:mm`
    pub duration: String,
    pub activity_id: ActivityId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DragHandle(pub u64);

/// Imperative side of the external calendar widget.
pub trait CalendarSurface: Send + Sync {
    fn register_draggable(&self, item: &DraggableItem) -> DragHandle;
    fn unregister_draggable(&self, handle: DragHandle);
    fn remove_event(&self, activity_id: ActivityId);
}

/// Surface that only records what it was told, for headless hosts and tests.
#[derive(Debug, Default)]
pub struct InMemoryCalendarSurface {
    next_handle: AtomicU64,
    draggables: Mutex<BTreeMap<DragHandle, DraggableItem>>,
    removed_events: Mutex<Vec<ActivityId>>,
    total_registrations: AtomicU64,
}

impl InMemoryCalendarSurface {
    pub fn registered(&self) -> Vec<DraggableItem> {
        self.draggables
            .lock()
            .map(|draggables| draggables.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn registered_count(&self) -> usize {
        self.draggables
            .lock()
            .map(|draggables| draggables.len())
            .unwrap_or_default()
    }

    pub fn total_registrations(&self) -> u64 {
        self.total_registrations.load(Ordering::SeqCst)
    }

    pub fn removed_events(&self) -> Vec<ActivityId> {
        self.removed_events
            .lock()
            .map(|removed| removed.clone())
            .unwrap_or_default()
    }
}

impl CalendarSurface for InMemoryCalendarSurface {
    fn register_draggable(&self, item: &DraggableItem) -> DragHandle {
        let handle = DragHandle(self.next_handle.fetch_add(1, Ordering::SeqCst));
        self.total_registrations.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut draggables) = self.draggables.lock() {
            draggables.insert(handle, item.clone());
        }
        handle
    }

    fn unregister_draggable(&self, handle: DragHandle) {
        if let Ok(mut draggables) = self.draggables.lock() {
            draggables.remove(&handle);
        }
    }

    fn remove_event(&self, activity_id: ActivityId) {
        if let Ok(mut removed) = self.removed_events.lock() {
            removed.push(activity_id);
        }
    }
}
