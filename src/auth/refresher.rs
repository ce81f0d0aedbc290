//! Background token refresher that keeps one expiring bearer token valid for many callers.
//!
//! [`TokenRefresher::spawn`] starts a single tokio task that owns the current token, its
//! error (when the last authentication failed), and the refresh alarm. Callers never touch
//! that state directly: [`TokenRefresher::get`] enqueues a one-shot reply channel and the
//! task answers it with whatever value is current at the moment it picks the caller up.
//! Because the task is the only writer, there is exactly one authenticator call in flight
//! at any time and every caller observes the outcome of the latest completed attempt.
//!
//! The task re-authenticates [`RefreshPolicy::safety_margin`] before a token expires and
//! retries failed attempts every [`RefreshPolicy::retry_interval`]. No hand-offs happen
//! while an authentication call is running.

mod metrics;

pub use metrics::RefreshMetrics;

// std
use std::time::Duration as StdDuration;
// crates.io
use tokio::{
	runtime::Handle,
	sync::{mpsc, oneshot},
	task::JoinHandle,
	time::{self, Instant},
};
use tokio_util::sync::CancellationToken;
// self
use crate::{
	_prelude::*,
	auth::{Authenticator, IssuedToken, Secret},
	error::{AuthenticationError, ConfigError},
	obs::{self, Stage},
};

type Handoff = Result<Secret, AuthenticationError>;
type Waiter = oneshot::Sender<Handoff>;

/// Timing knobs for the refresh loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RefreshPolicy {
	/// How long before expiry a token is re-issued.
	pub safety_margin: Duration,
	/// Delay before retrying after a failed authentication.
	pub retry_interval: Duration,
}
impl RefreshPolicy {
	/// Default delay between failed attempts.
	pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::seconds(5);
	/// Default lead time before expiry.
	pub const DEFAULT_SAFETY_MARGIN: Duration = Duration::seconds(10);

	/// Overrides the safety margin (defaults to 10 seconds).
	pub fn with_safety_margin(mut self, margin: Duration) -> Self {
		self.safety_margin = margin;

		self
	}

	/// Overrides the retry interval (defaults to 5 seconds).
	pub fn with_retry_interval(mut self, interval: Duration) -> Self {
		self.retry_interval = interval;

		self
	}

	/// Delay until a token issued with `ttl` should be refreshed.
	///
	/// Returns zero when `ttl` does not exceed the safety margin, which makes the refresher
	/// re-authenticate continuously for such tokens.
	pub fn refresh_delay(&self, ttl: Duration) -> StdDuration {
		to_std(ttl.saturating_sub(self.safety_margin))
	}

	/// Delay until a failed authentication is retried.
	pub fn retry_delay(&self) -> StdDuration {
		to_std(self.retry_interval)
	}
}
impl Default for RefreshPolicy {
	fn default() -> Self {
		Self {
			safety_margin: Self::DEFAULT_SAFETY_MARGIN,
			retry_interval: Self::DEFAULT_RETRY_INTERVAL,
		}
	}
}

/// Handle to the background refresh task.
///
/// Dropping the handle cancels the task. Cancelling the token passed to
/// [`spawn`](Self::spawn) does the same for every refresher derived from it.
pub struct TokenRefresher {
	waiters: mpsc::Sender<Waiter>,
	cancel: CancellationToken,
	worker: Mutex<Option<JoinHandle<()>>>,
	metrics: Arc<RefreshMetrics>,
	policy: RefreshPolicy,
}
impl TokenRefresher {
	/// Spawns the refresh task on the current tokio runtime with the default policy.
	pub fn spawn(authenticator: impl Authenticator, cancel: &CancellationToken) -> Result<Self> {
		Self::spawn_with_policy(authenticator, cancel, RefreshPolicy::default())
	}

	/// Spawns the refresh task on the current tokio runtime.
	///
	/// The first authentication runs inside the task, so the call returns immediately and
	/// early [`get`](Self::get) calls wait for that attempt to finish.
	pub fn spawn_with_policy(
		authenticator: impl Authenticator,
		cancel: &CancellationToken,
		policy: RefreshPolicy,
	) -> Result<Self> {
		let runtime = Handle::try_current().map_err(|_| ConfigError::MissingRuntime)?;
		let (waiters, queue) = mpsc::channel(1);
		let cancel = cancel.child_token();
		let metrics = Arc::new(RefreshMetrics::default());
		let worker =
			Worker { authenticator: Box::new(authenticator), policy, metrics: metrics.clone() };
		let handle = runtime.spawn(worker.run(queue, cancel.clone()));

		Ok(Self { waiters, cancel, worker: Mutex::new(Some(handle)), metrics, policy })
	}

	/// Waits for the background task to hand over the current token.
	///
	/// The raw token carries no scheme prefix. When the latest authentication failed, its
	/// error is returned instead. There is no timeout: the call completes at the task's next
	/// serving instant, which may be after an in-flight authentication finishes.
	pub async fn get(&self) -> Result<Secret> {
		let (reply, handoff) = oneshot::channel();

		self.waiters.send(reply).await.map_err(|_| Error::RefresherStopped)?;

		let token = handoff.await.map_err(|_| Error::RefresherStopped)??;

		Ok(token)
	}

	/// Counters for this refresher.
	pub fn metrics(&self) -> &RefreshMetrics {
		&self.metrics
	}

	/// Timing policy the task runs with.
	pub fn policy(&self) -> RefreshPolicy {
		self.policy
	}

	/// Returns `true` while the background task is alive.
	pub fn is_running(&self) -> bool {
		self.worker.lock().as_ref().is_some_and(|handle| !handle.is_finished())
	}

	/// Signals the background task to stop without waiting for it.
	pub fn cancel(&self) {
		self.cancel.cancel();
	}

	/// Signals the background task to stop and waits until it has exited.
	///
	/// An authentication call that is already running completes first. A panic raised by
	/// the authenticator is resumed on the caller.
	pub async fn shutdown(&self) {
		self.cancel.cancel();

		let handle = self.worker.lock().take();
		let Some(handle) = handle else { return };

		match handle.await {
			Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
			_ => (),
		}
	}
}
impl Drop for TokenRefresher {
	fn drop(&mut self) {
		self.cancel.cancel();
	}
}
impl Debug for TokenRefresher {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenRefresher")
			.field("policy", &self.policy)
			.field("cancelled", &self.cancel.is_cancelled())
			.field("metrics", &self.metrics)
			.finish()
	}
}

struct Worker {
	authenticator: Box<dyn Authenticator>,
	policy: RefreshPolicy,
	metrics: Arc<RefreshMetrics>,
}
impl Worker {
	async fn run(self, mut queue: mpsc::Receiver<Waiter>, cancel: CancellationToken) {
		let mut state = self.authenticate().await;
		let reason = loop {
			if cancel.is_cancelled() {
				break "cancelled";
			}

			// Unbiased on purpose: an alarm that is always due must not starve waiters.
			tokio::select! {
				_ = cancel.cancelled() => break "cancelled",
				_ = time::sleep_until(state.refresh_at) => state = self.authenticate().await,
				waiter = queue.recv() => match waiter {
					Some(waiter) => {
						// A caller that gave up has dropped its receiver and is not counted.
						if waiter.send(state.current.clone()).is_ok() {
							self.metrics.record_handoff();
						}
					},
					None => break "closed",
				},
			}
		};

		obs::refresher_exited(reason);
	}

	async fn authenticate(&self) -> RefreshState {
		self.metrics.record_attempt();

		match obs::observe(Stage::Refresh, self.authenticator.authenticate()).await {
			Ok(IssuedToken { token, ttl }) => {
				let delay = self.policy.refresh_delay(ttl);

				self.metrics.record_success();
				obs::authenticated(delay);

				RefreshState { current: Ok(token), refresh_at: deadline(delay) }
			},
			Err(err) => {
				let delay = self.policy.retry_delay();

				self.metrics.record_failure();
				obs::authentication_failed(&err, delay);

				RefreshState { current: Err(err), refresh_at: deadline(delay) }
			},
		}
	}
}

struct RefreshState {
	current: Handoff,
	refresh_at: Instant,
}

fn deadline(delay: StdDuration) -> Instant {
	// Roughly 30 years, the same horizon tokio uses for "never".
	const FAR_FUTURE: StdDuration = StdDuration::from_secs(86_400 * 365 * 30);

	let now = Instant::now();

	now.checked_add(delay).unwrap_or_else(|| now + FAR_FUTURE)
}

fn to_std(duration: Duration) -> StdDuration {
	StdDuration::try_from(duration).unwrap_or(StdDuration::ZERO)
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use super::*;

	#[test]
	fn refresh_delay_subtracts_the_safety_margin() {
		let policy = RefreshPolicy::default();

		assert_eq!(policy.refresh_delay(Duration::seconds(30)), StdDuration::from_secs(20));
		assert_eq!(policy.refresh_delay(Duration::seconds(10)), StdDuration::ZERO);
		assert_eq!(policy.refresh_delay(Duration::seconds(3)), StdDuration::ZERO);
		assert_eq!(policy.retry_delay(), StdDuration::from_secs(5));
	}

	#[test]
	fn policy_overrides_apply() {
		let policy = RefreshPolicy::default()
			.with_safety_margin(Duration::minutes(1))
			.with_retry_interval(Duration::seconds(30));

		assert_eq!(policy.refresh_delay(Duration::minutes(5)), StdDuration::from_secs(240));
		assert_eq!(policy.retry_delay(), StdDuration::from_secs(30));
	}

	#[test]
	fn spawn_requires_a_runtime() {
		let err = TokenRefresher::spawn(
			|| async { Ok::<_, AuthenticationError>(IssuedToken::new("tok", Duration::minutes(1))) },
			&CancellationToken::new(),
		)
		.expect_err("Spawning outside a runtime should fail.");

		assert!(matches!(err, Error::Config(ConfigError::MissingRuntime)));
	}

	#[tokio::test(start_paused = true)]
	async fn short_lived_tokens_refresh_without_starving_callers() {
		let calls = Arc::new(AtomicUsize::new(0));
		let counter = calls.clone();
		let refresher = TokenRefresher::spawn(
			move || {
				let n = counter.fetch_add(1, Ordering::SeqCst);

				async move {
					Ok::<_, AuthenticationError>(IssuedToken::new(
						format!("tok-{n}"),
						Duration::seconds(5),
					))
				}
			},
			&CancellationToken::new(),
		)
		.expect("Refresher should spawn inside a runtime.");

		for _ in 0..20 {
			let token = refresher.get().await.expect("Short-lived tokens should still be served.");

			assert!(token.expose().starts_with("tok-"));
		}

		assert_eq!(refresher.metrics().handoffs(), 20);
		assert!(calls.load(Ordering::SeqCst) >= 1);
	}

	#[tokio::test(start_paused = true)]
	async fn abandoned_callers_are_not_counted_as_handoffs() {
		let refresher = TokenRefresher::spawn(
			|| async {
				time::sleep(StdDuration::from_secs(3)).await;

				Ok::<_, AuthenticationError>(IssuedToken::new("slow", Duration::minutes(5)))
			},
			&CancellationToken::new(),
		)
		.expect("Refresher should spawn inside a runtime.");

		time::timeout(StdDuration::from_secs(1), refresher.get())
			.await
			.expect_err("The caller should give up before the first login finishes.");

		let token = refresher.get().await.expect("A patient caller should be served.");

		assert_eq!(token.expose(), "slow");
		assert_eq!(refresher.metrics().handoffs(), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn dropping_the_handle_stops_the_task() {
		let calls = Arc::new(AtomicUsize::new(0));
		let counter = calls.clone();
		let refresher = TokenRefresher::spawn(
			move || {
				counter.fetch_add(1, Ordering::SeqCst);

				async { Ok::<_, AuthenticationError>(IssuedToken::new("tok", Duration::seconds(15))) }
			},
			&CancellationToken::new(),
		)
		.expect("Refresher should spawn inside a runtime.");

		refresher.get().await.expect("Initial token should be served.");
		drop(refresher);
		time::sleep(StdDuration::from_secs(60)).await;

		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}
}
