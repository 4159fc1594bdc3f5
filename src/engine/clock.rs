use time::PrimitiveDateTime;
use tokio::time::Instant;

use crate::core::time::primitive_now_utc;

/// Time provider for the engine. Deadlines are computed against the
/// monotonic side so a countdown stays correct across system sleep and
/// scheduling jitter; the wall side only stamps records.
pub(crate) trait Clock: Send + Sync + 'static {
    fn monotonic(&self) -> Instant;
    fn now_utc(&self) -> PrimitiveDateTime;
}

/// Production clock. `tokio::time::Instant` also honors the paused test
/// clock, so the whole engine can be driven on virtual time.
pub(crate) struct SystemClock;

impl Clock for SystemClock {
    fn monotonic(&self) -> Instant {
        Instant::now()
    }

    fn now_utc(&self) -> PrimitiveDateTime {
        primitive_now_utc()
    }
}
