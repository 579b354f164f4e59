//! Change notifications from a sheet to the editor
//!
//! The editor owns its view state and learns about changes only through
//! [`SheetEvent`]s. Any `FnMut(&SheetEvent)` closure can subscribe.

use crate::calculation::CalculationStats;
use comment_sheet_core::CellFormat;

/// Something the editor should react to
#[derive(Debug, Clone, PartialEq)]
pub enum SheetEvent {
    /// A cell's display text or format changed
    CellChanged {
        row: u32,
        col: u16,
        display: String,
        format: CellFormat,
    },
    /// Rows or columns were inserted or removed, or the sheet was replaced;
    /// every cell should be redrawn
    StructureChanged { rows: u32, cols: u16 },
    /// A full recalc finished
    RecalcComplete { stats: CalculationStats },
    /// A batch operation made progress
    Progress { done: usize, total: usize },
    /// An operation failed; the sheet is unchanged
    Error { message: String },
}

/// Receiver of [`SheetEvent`]s
pub trait SheetObserver {
    fn notify(&mut self, event: &SheetEvent);
}

impl<F: FnMut(&SheetEvent)> SheetObserver for F {
    fn notify(&mut self, event: &SheetEvent) {
        self(event)
    }
}

/// Handle returned by [`Sheet::subscribe`](crate::Sheet::subscribe)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// The set of subscribed observers
#[derive(Default)]
pub(crate) struct Observers {
    next_id: u64,
    entries: Vec<(ObserverId, Box<dyn SheetObserver>)>,
}

impl Observers {
    pub(crate) fn subscribe(&mut self, observer: Box<dyn SheetObserver>) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, observer));
        id
    }

    pub(crate) fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    pub(crate) fn emit(&mut self, event: &SheetEvent) {
        for (_, observer) in &mut self.entries {
            observer.notify(event);
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for Observers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers")
            .field("count", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_closures_observe_until_unsubscribed() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut observers = Observers::default();

        let sink = Rc::clone(&seen);
        let id = observers.subscribe(Box::new(move |event: &SheetEvent| {
            sink.borrow_mut().push(event.clone());
        }));

        let event = SheetEvent::Progress { done: 1, total: 2 };
        observers.emit(&event);
        assert!(observers.unsubscribe(id));
        assert!(!observers.unsubscribe(id));
        observers.emit(&event);

        assert_eq!(*seen.borrow(), vec![event]);
        assert!(observers.is_empty());
    }
}
