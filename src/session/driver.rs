//! Async orchestration of one [`Session`]: dispatches the two network
//! operations when the machine allows them, feeds the outcomes back in, and
//! runs the timed return to OTP entry after a confirmation.

use std::sync::Arc;

use chrono::{Duration, Utc};
use log::warn;
use tokio::sync::{Mutex, MutexGuard};

use crate::client::Backend;
use crate::config::Config;
use crate::scheduled_task::ScheduledTask;

use super::Session;

/// A live voting session: the state machine plus its backend.
///
/// Both network operations take `&mut self`, so a session can never have two
/// requests of the same intent outstanding; the phase guards inside
/// [`Session`] additionally ignore triggers that arrive while one is in
/// flight. Dropping the driver aborts any pending auto-reset, so a discarded
/// session is never mutated afterwards.
pub struct VotingSession<B> {
    backend: B,
    state: Arc<Mutex<Session>>,
    confirmation_hold: Duration,
    reset_task: Option<ScheduledTask<()>>,
}

impl<B: Backend> VotingSession<B> {
    pub fn new(backend: B, config: &Config) -> Self {
        Self::with_hold(backend, config.confirmation_hold())
    }

    /// Build with an explicit confirmation hold; [`VotingSession::new`]
    /// takes it from the config.
    pub fn with_hold(backend: B, confirmation_hold: Duration) -> Self {
        Self {
            backend,
            state: Arc::new(Mutex::new(Session::new())),
            confirmation_hold,
            reset_task: None,
        }
    }

    /// Access the session state: digit entry, choices, navigation, views.
    pub async fn state(&self) -> MutexGuard<'_, Session> {
        self.state.lock().await
    }

    /// Dispatch a verification request if the machine allows one. Returns
    /// whether a request went out; the outcome lands in the session state
    /// either way.
    pub async fn verify(&mut self) -> bool {
        let Some(code) = self.state.lock().await.verify_requested() else {
            return false;
        };
        match self.backend.positions(&code).await {
            Ok(ballot) => self.state.lock().await.verify_succeeded(ballot),
            Err(err) => {
                warn!("verification failed: {err}");
                self.state.lock().await.verify_failed(&err);
            }
        }
        true
    }

    /// Dispatch the final submission if the machine allows it. On success
    /// the session confirms and the auto-reset is scheduled; on failure
    /// browsing resumes where it left off. Never retries by itself.
    pub async fn submit(&mut self) -> bool {
        let request = self.state.lock().await.submit_requested();
        let Some((code, votes)) = request else {
            return false;
        };
        match self.backend.submit(&code, &votes).await {
            Ok(message) => {
                self.state.lock().await.submit_succeeded(message);
                self.schedule_reset();
            }
            Err(err) => {
                warn!("submission failed: {err}");
                self.state.lock().await.submit_failed(&err);
            }
        }
        true
    }

    /// Skip the rest of the confirmation hold, e.g. when the next voter is
    /// already waiting. A no-op unless a reset is pending.
    pub fn trigger_reset(&self) {
        if let Some(task) = &self.reset_task {
            task.trigger_now();
        }
    }

    fn schedule_reset(&mut self) {
        let state = Arc::clone(&self.state);
        let task = ScheduledTask::new(
            async move {
                state.lock().await.reset();
            },
            Utc::now() + self.confirmation_hold,
        );
        // Replacing an earlier task drops it, which aborts it.
        self.reset_task = Some(task);
    }

    #[cfg(test)]
    fn state_handle(&self) -> Arc<Mutex<Session>> {
        Arc::clone(&self.state)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;

    use crate::error::{Error, Result};
    use crate::model::api::VoteEntry;
    use crate::model::ballot::{Ballot, Choice};
    use crate::model::otp::Code;
    use crate::session::{Notice, Phase};

    use super::*;

    /// A backend that replays scripted outcomes and records what it was
    /// asked.
    #[derive(Default)]
    struct ScriptedBackend {
        positions: StdMutex<VecDeque<Result<Ballot>>>,
        submits: StdMutex<VecDeque<Result<String>>>,
        calls: AtomicUsize,
        submitted: StdMutex<Vec<(String, Vec<VoteEntry>)>>,
    }

    impl ScriptedBackend {
        fn next_verify(self, outcome: Result<Ballot>) -> Self {
            self.positions.lock().unwrap().push_back(outcome);
            self
        }

        fn next_submit(self, outcome: Result<String>) -> Self {
            self.submits.lock().unwrap().push_back(outcome);
            self
        }
    }

    #[async_trait]
    impl<'a> Backend for &'a ScriptedBackend {
        async fn positions(&self, _otp: &Code) -> Result<Ballot> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.positions
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected positions call")
        }

        async fn submit(&self, otp: &Code, votes: &[VoteEntry]) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.submitted
                .lock()
                .unwrap()
                .push((otp.to_string(), votes.to_vec()));
            self.submits
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected submit call")
        }
    }

    fn hold_ms(ms: i64) -> Duration {
        Duration::milliseconds(ms)
    }

    async fn enter_code(driver: &VotingSession<&ScriptedBackend>, code: &str) {
        let mut state = driver.state().await;
        for (slot, digit) in code.chars().enumerate() {
            state.set_digit(slot, &digit.to_string());
        }
    }

    #[tokio::test]
    async fn incomplete_code_dispatches_nothing() {
        let backend = ScriptedBackend::default();
        let mut driver = VotingSession::with_hold(&backend, hold_ms(50));
        enter_code(&driver, "12345").await;

        assert!(!driver.verify().await);
        assert_eq!(0, backend.calls.load(Ordering::SeqCst));
        assert_eq!(Phase::AwaitingOtp, driver.state().await.phase());
    }

    #[tokio::test]
    async fn verify_populates_the_ballot() {
        let backend = ScriptedBackend::default().next_verify(Ok(Ballot::example()));
        let mut driver = VotingSession::with_hold(&backend, hold_ms(50));
        enter_code(&driver, "123456").await;

        assert!(driver.verify().await);
        let state = driver.state().await;
        assert_eq!(Phase::Browsing, state.phase());
        assert_eq!(0, state.cursor());
        assert_eq!(2, state.ballot().unwrap().len());
    }

    #[tokio::test]
    async fn failed_verify_returns_to_otp_entry() {
        let backend = ScriptedBackend::default()
            .next_verify(Err(Error::Rejection("Invalid OTP".to_string())));
        let mut driver = VotingSession::with_hold(&backend, hold_ms(50));
        enter_code(&driver, "123456").await;

        assert!(driver.verify().await);
        let state = driver.state().await;
        assert_eq!(Phase::AwaitingOtp, state.phase());
        assert_eq!(
            Some(&Notice::Error("Invalid OTP".to_string())),
            state.notice()
        );
        assert!(state.entry().is_complete());
    }

    #[tokio::test]
    async fn submit_is_gated_by_the_machine() {
        let backend = ScriptedBackend::default();
        let mut driver = VotingSession::with_hold(&backend, hold_ms(50));

        assert!(!driver.submit().await);
        assert_eq!(0, backend.calls.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn full_session_submits_non_abstentions_only() {
        let backend = ScriptedBackend::default()
            .next_verify(Ok(Ballot::example()))
            .next_submit(Ok("Votes recorded".to_string()));
        let mut driver = VotingSession::with_hold(&backend, hold_ms(50));
        enter_code(&driver, "123456").await;
        driver.verify().await;

        {
            let mut state = driver.state().await;
            state
                .record_choice(Choice::Candidate("A".to_string()))
                .unwrap();
            state.advance();
            state.record_choice(Choice::Nota).unwrap();
        }
        assert!(driver.submit().await);

        let (otp, votes) = backend.submitted.lock().unwrap().pop().unwrap();
        assert_eq!("123456", otp);
        assert_eq!(
            vec![VoteEntry {
                position_id: "P1".to_string(),
                candidate_id: "A".to_string(),
            }],
            votes
        );
        let state = driver.state().await;
        assert_eq!(Phase::Confirmed, state.phase());
        assert_eq!(
            Some(&Notice::Confirmation("Votes recorded".to_string())),
            state.notice()
        );
    }

    #[tokio::test]
    async fn failed_submit_resumes_browsing_intact() {
        let backend = ScriptedBackend::default()
            .next_verify(Ok(Ballot::example()))
            .next_submit(Err(Error::Rejection("OTP already used".to_string())));
        let mut driver = VotingSession::with_hold(&backend, hold_ms(50));
        enter_code(&driver, "123456").await;
        driver.verify().await;
        {
            let mut state = driver.state().await;
            state
                .record_choice(Choice::Candidate("B".to_string()))
                .unwrap();
            state.advance();
            state.record_choice(Choice::Nota).unwrap();
        }

        assert!(driver.submit().await);

        let state = driver.state().await;
        assert_eq!(Phase::Browsing, state.phase());
        assert_eq!(1, state.cursor());
        assert_eq!(
            Some(&Notice::Error("OTP already used".to_string())),
            state.notice()
        );
        assert_eq!(Some(&Choice::Nota), state.current_choice());
    }

    #[tokio::test]
    async fn confirmation_resets_after_the_hold_and_not_before() {
        let backend = ScriptedBackend::default()
            .next_verify(Ok(Ballot::example()))
            .next_submit(Ok("Votes recorded".to_string()));
        let mut driver = VotingSession::with_hold(&backend, hold_ms(60));
        enter_code(&driver, "123456").await;
        driver.verify().await;
        {
            let mut state = driver.state().await;
            state.record_choice(Choice::Nota).unwrap();
            state.advance();
            state.record_choice(Choice::Nota).unwrap();
        }
        driver.submit().await;

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert_eq!(Phase::Confirmed, driver.state().await.phase());

        tokio::time::sleep(std::time::Duration::from_millis(120)).await;
        let state = driver.state().await;
        assert_eq!(Phase::AwaitingOtp, state.phase());
        assert!(state.ballot().is_none());
        assert!(state.notice().is_none());
        assert!(!state.entry().is_complete());
    }

    #[tokio::test]
    async fn teardown_cancels_the_pending_reset() {
        let backend = ScriptedBackend::default()
            .next_verify(Ok(Ballot::example()))
            .next_submit(Ok("Votes recorded".to_string()));
        let mut driver = VotingSession::with_hold(&backend, hold_ms(40));
        enter_code(&driver, "123456").await;
        driver.verify().await;
        {
            let mut state = driver.state().await;
            state.record_choice(Choice::Nota).unwrap();
            state.advance();
            state.record_choice(Choice::Nota).unwrap();
        }
        driver.submit().await;

        let handle = driver.state_handle();
        drop(driver);

        tokio::time::sleep(std::time::Duration::from_millis(80)).await;
        // The discarded session was never mutated after teardown.
        assert_eq!(Phase::Confirmed, handle.lock().await.phase());
    }

    #[tokio::test]
    async fn trigger_reset_skips_the_hold() {
        let backend = ScriptedBackend::default()
            .next_verify(Ok(Ballot::example()))
            .next_submit(Ok("Votes recorded".to_string()));
        let mut driver = VotingSession::with_hold(&backend, Duration::seconds(3600));
        enter_code(&driver, "123456").await;
        driver.verify().await;
        {
            let mut state = driver.state().await;
            state.record_choice(Choice::Nota).unwrap();
            state.advance();
            state.record_choice(Choice::Nota).unwrap();
        }
        driver.submit().await;
        assert_eq!(Phase::Confirmed, driver.state().await.phase());

        driver.trigger_reset();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(Phase::AwaitingOtp, driver.state().await.phase());
    }
}
