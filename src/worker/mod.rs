// Fri Jan 17 2026 - Alex

pub mod cancel;
pub mod feed;
pub mod poller;

use std::thread;
use std::time::{Duration, Instant};

pub use cancel::CancellationToken;
pub use feed::{Marker, OverlaySink, PositionFeed};
pub use poller::{AttachFn, PollObserver, Poller, Status};

/// Calls `step` every `interval` until it returns false or `token` is
/// cancelled. A zero interval runs uncapped.
pub fn run_loop<F>(token: &CancellationToken, interval: Duration, mut step: F)
where
    F: FnMut() -> bool,
{
    while !token.is_cancelled() {
        let started = Instant::now();
        if !step() {
            break;
        }
        let elapsed = started.elapsed();
        if interval.is_zero() {
            thread::yield_now();
        } else if elapsed < interval {
            thread::sleep(interval - elapsed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_loop_stops() {
        let token = CancellationToken::new();
        let mut count = 0;
        run_loop(&token, Duration::ZERO, || {
            count += 1;
            count < 5
        });
        assert_eq!(count, 5);

        let stopper = token.clone();
        let mut count = 0;
        run_loop(&token, Duration::from_millis(1), || {
            count += 1;
            if count == 3 {
                stopper.cancel();
            }
            true
        });
        assert_eq!(count, 3);
    }
}
