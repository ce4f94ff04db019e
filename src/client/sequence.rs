// ABOUTME: Allocates PDU sequence numbers for one session
// ABOUTME: Wraps from u32::MAX back to 1, never yields 0 and skips numbers still awaiting a response

/// Monotonic sequence number source.
#[derive(Debug, Clone)]
pub struct SequenceAllocator {
    next: u32,
}

impl Default for SequenceAllocator {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl SequenceAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start at `first`; 0 is treated as 1
    pub fn starting_at(first: u32) -> Self {
        Self { next: first.max(1) }
    }

    /// Next number for which `in_flight` is false.
    ///
    /// The caller bounds the in-flight set well below `u32::MAX`, so the
    /// search always terminates.
    pub fn allocate(&mut self, in_flight: impl Fn(u32) -> bool) -> u32 {
        loop {
            let candidate = self.next;
            self.next = match self.next {
                u32::MAX => 1,
                n => n + 1,
            };
            if !in_flight(candidate) {
                return candidate;
            }
        }
    }
}
