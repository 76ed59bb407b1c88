use std::time::Instant;

/// Component holding time-bounded state that can be swept.
pub trait Reap: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Remove state that is no longer live at `now`. Returns the number of
    /// records removed.
    fn reap(&self, now: Instant) -> usize;
}
