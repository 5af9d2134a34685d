/*!
 * Background Refresh Loop
 *
 * One task per enabled cell: waits on whichever resolves first, the
 * fixed-interval timer or the cancellation signal, and stores the producer's
 * output into the value cell on each tick.
 */

use super::cell::Shared;
use log::{info, trace};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::MissedTickBehavior;

/// Core refresh loop.
///
/// Holds only a `Weak` reference to the cell, so an abandoned cell does not
/// keep its task alive: the loop exits when the last handle is dropped.
pub(crate) async fn run_refresh_loop<T: Send + Sync + 'static>(
    cell: Weak<Shared<T>>,
    mut stop_rx: oneshot::Receiver<()>,
    period: Duration,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    // The interval's first tick completes immediately; consume it so the
    // initial value survives a full period.
    interval.tick().await;

    loop {
        tokio::select! {
            // Cancellation or time to refresh, whichever happens first.
            _ = &mut stop_rx => {
                info!("refresh task stopped");
                return;
            }

            _ = interval.tick() => {
                let Some(cell) = cell.upgrade() else {
                    // Every handle is gone; nothing left to refresh.
                    return;
                };

                if let Some(new_value) = (cell.source)() {
                    cell.value.store(Arc::new(new_value));
                    trace!("refresh tick stored a new value");
                }
            }
        }
    }
}
