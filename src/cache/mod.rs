/*!
 * Self-Refreshing Cache
 *
 * A concurrency-safe container holding the latest version of a computed
 * value, transparently refreshed on a fixed interval by a background task.
 *
 * # Architecture
 *
 * - **Value cell**: `arc_swap::ArcSwap` — lock-free, wait-free reads; every
 *   store fully replaces the previous value (no torn reads).
 * - **Enabled flag**: a single atomic swap makes `enable`/`disable`
 *   idempotent under any number of concurrent callers.
 * - **Cancellation**: a fresh oneshot channel per enable cycle; disable
 *   drops the sender, which the task observes at its next wait boundary.
 *
 * # Performance
 *
 * - `get` is an atomic pointer load, independent of producer latency
 * - `enable`/`disable` cost one task spawn / one channel drop
 */

mod cell;
mod config;
mod task;

pub use cell::CachedValue;
pub use config::RefreshConfig;
