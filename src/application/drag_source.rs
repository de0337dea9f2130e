use crate::domain::models::{Activity, format_duration_hhmm};
use crate::infrastructure::calendar_surface::{CalendarSurface, DragHandle, DraggableItem};
use std::sync::Arc;
use tracing::debug;

pub fn draggable_item(activity: &Activity, default_minutes: u32) -> DraggableItem {
    DraggableItem {
        title: activity.display_title().to_string(),
        duration: format_duration_hhmm(activity.effective_duration_minutes(default_minutes)),
        activity_id: activity.id,
    }
}

/// Live draggable registrations on a surface; unregisters all of them when dropped.
pub struct DragRegistration<S>
where
    S: CalendarSurface + ?Sized,
{
    surface: Arc<S>,
    handles: Vec<DragHandle>,
    items: Vec<DraggableItem>,
}

impl<S> DragRegistration<S>
where
    S: CalendarSurface + ?Sized,
{
    pub fn register(surface: Arc<S>, items: Vec<DraggableItem>) -> Self {
        let handles = items
            .iter()
            .map(|item| surface.register_draggable(item))
            .collect();
        Self {
            surface,
            handles,
            items,
        }
    }

    pub fn items(&self) -> &[DraggableItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

impl<S> Drop for DragRegistration<S>
where
    S: CalendarSurface + ?Sized,
{
    fn drop(&mut self) {
        for handle in self.handles.drain(..) {
            self.surface.unregister_draggable(handle);
        }
    }
}

/// Makes pool activities draggable onto the calendar surface.
pub struct DragSourceAdapter<S>
where
    S: CalendarSurface + ?Sized,
{
    surface: Arc<S>,
    default_duration_minutes: u32,
    registration: Option<DragRegistration<S>>,
}

impl<S> DragSourceAdapter<S>
where
    S: CalendarSurface + ?Sized,
{
    pub fn new(surface: Arc<S>, default_duration_minutes: u32) -> Self {
        Self {
            surface,
            default_duration_minutes,
            registration: None,
        }
    }

    /// Registers the given pool items, tearing down any earlier registration first.
    pub fn initialize<'a, I>(&mut self, pool: I) -> &[DraggableItem]
    where
        I: IntoIterator<Item = &'a Activity>,
    {
        self.teardown();
        let items: Vec<DraggableItem> = pool
            .into_iter()
            .map(|activity| draggable_item(activity, self.default_duration_minutes))
            .collect();
        debug!(count = items.len(), "registering draggable pool items");
        let registration = self
            .registration
            .insert(DragRegistration::register(Arc::clone(&self.surface), items));
        registration.items()
    }

    pub fn teardown(&mut self) {
        if let Some(registration) = self.registration.take() {
            debug!(count = registration.len(), "releasing draggable pool items");
        }
    }

    pub fn items(&self) -> &[DraggableItem] {
        self.registration
            .as_ref()
            .map(DragRegistration::items)
            .unwrap_or_default()
    }
}
