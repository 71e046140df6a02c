//! Priority-ordered interceptor chains for sent messages, received
//! messages and notices.

/// Verdict returned by a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerResult {
    /// Pass the message to the next handler.
    Continue,
    /// Drop the message; the receive loop fetches the next one.
    Consumed,
    /// Abort the receive with an internal error.
    Error,
}

/// Where a handler is inserted inside its priority band: `Begin` has
/// stack semantics (latest insertion runs first), `End` has queue
/// semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerPosition {
    Begin,
    End,
}

/// Lower values run first.
pub type HandlerPriority = i32;

pub const PRIORITY_HIGH: HandlerPriority = 100;
pub const PRIORITY_MEDIUM: HandlerPriority = 200;
pub const PRIORITY_LOW: HandlerPriority = 300;

pub type HandlerId = u64;

/// Handler id meaning "nothing registered".
pub const HANDLER_ID_NOT_VALID: HandlerId = u64::MAX;

pub(crate) struct Entry<H> {
    pub id: HandlerId,
    pub priority: HandlerPriority,
    pub handler: H,
}

/// A list kept ordered by priority, with stable remove-by-id.
pub(crate) struct PriorityChain<H> {
    entries: Vec<Entry<H>>,
}

impl<H> Default for PriorityChain<H> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<H> PriorityChain<H> {
    pub fn insert(
        &mut self,
        id: HandlerId,
        priority: HandlerPriority,
        position: HandlerPosition,
        handler: H,
    ) {
        let index = match position {
            // Before every entry of the same or a later band.
            HandlerPosition::Begin => self
                .entries
                .iter()
                .position(|e| e.priority >= priority)
                .unwrap_or(self.entries.len()),
            // After every entry of the same or an earlier band.
            HandlerPosition::End => self
                .entries
                .iter()
                .rposition(|e| e.priority <= priority)
                .map(|i| i + 1)
                .unwrap_or(0),
        };

        self.entries.insert(
            index,
            Entry {
                id,
                priority,
                handler,
            },
        );
    }

    pub fn remove(&mut self, id: HandlerId) {
        if let Some(index) = self.entries.iter().position(|e| e.id == id) {
            self.entries.remove(index);
        }
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entry<H>> {
        self.entries.iter_mut()
    }
}
