//! Startup link wait
//!
//! Runs once before the scheduler starts: nothing is published until the
//! link is up, so blocking here is fine.

use embedded_hal_async::delay::DelayNs;
use hal_abstractions::NetworkLink;

use crate::config::LinkConfig;
use crate::error::LinkError;

/// Polling parameters for [`wait_for_link`]
pub type LinkWait = LinkConfig;

/// Poll `link` every `poll_ms` until it reports up
///
/// Returns the number of polls it took. With `max_attempts = None` this
/// waits forever.
pub async fn wait_for_link<L, D>(link: &L, delay: &mut D, wait: LinkWait) -> Result<u32, LinkError>
where
    L: NetworkLink,
    D: DelayNs,
{
    let mut attempts = 0u32;
    loop {
        attempts = attempts.saturating_add(1);
        if link.is_up() {
            info!("Network link up after {} polls", attempts);
            return Ok(attempts);
        }
        if let Some(max) = wait.max_attempts {
            if attempts >= max {
                error!("Network link still down after {} polls", attempts);
                return Err(LinkError::Timeout { attempts });
            }
        }
        if attempts % 10 == 0 {
            debug!("Waiting for network link ({} polls)", attempts);
        }
        delay.delay_ms(wait.poll_ms).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{DelayedLink, RecordingDelay};
    use core::cell::Cell;
    use embassy_futures::block_on;

    #[test]
    fn test_link_already_up() {
        let link = DelayedLink {
            up_after: Cell::new(0),
        };
        let elapsed = Cell::new(0);
        let mut delay = RecordingDelay::new(&elapsed);
        let polls = block_on(wait_for_link(&link, &mut delay, LinkWait::default()));
        assert_eq!(polls, Ok(1));
        assert_eq!(elapsed.get(), 0);
    }

    #[test]
    fn test_waits_until_link_up() {
        let link = DelayedLink {
            up_after: Cell::new(4),
        };
        let elapsed = Cell::new(0);
        let mut delay = RecordingDelay::new(&elapsed);
        let polls = block_on(wait_for_link(&link, &mut delay, LinkWait::default()));
        assert_eq!(polls, Ok(5));
        assert_eq!(elapsed.get(), 4 * 300);
    }

    #[test]
    fn test_gives_up_after_max_attempts() {
        let link = DelayedLink {
            up_after: Cell::new(100),
        };
        let elapsed = Cell::new(0);
        let mut delay = RecordingDelay::new(&elapsed);
        let wait = LinkWait {
            poll_ms: 100,
            max_attempts: Some(3),
        };
        let result = block_on(wait_for_link(&link, &mut delay, wait));
        assert_eq!(result, Err(LinkError::Timeout { attempts: 3 }));
        // No delay after the final poll
        assert_eq!(elapsed.get(), 200);
    }
}
