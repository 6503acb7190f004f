use rapid_traits::StreamId;
use std::sync::atomic::{AtomicU32, Ordering};

/// Hands out client stream identifiers: 3, 5, 7, ...
///
/// Stream 1 is never issued, the counter starts there and every call
/// advances it by two. Identifiers past 2^31-1 do not exist on the wire,
/// so the allocator stops instead of wrapping into reused values.
#[derive(Debug)]
pub struct StreamIdAllocator {
    last: AtomicU32,
}

impl StreamIdAllocator {
    pub fn new() -> Self {
        Self::starting_after(1)
    }

    /// Next call returns `last + 2`.
    pub fn starting_after(last: u32) -> Self {
        debug_assert!(last % 2 == 1, "client stream ids are odd");
        Self {
            last: AtomicU32::new(last),
        }
    }

    /// Returns `None` once the identifier space is used up.
    pub fn next(&self) -> Option<StreamId> {
        self.last
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cur| {
                cur.checked_add(2).filter(|id| *id <= StreamId::MAX)
            })
            .ok()
            .map(|prev| StreamId::new(prev + 2))
    }
}

impl Default for StreamIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
