//! Live decay timer owned by the session handle.
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::{ActionReport, PetSession, SessionPhase, SessionView, TaskOutcome};
use crate::actions::CareAction;
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::derived::Achievement;
use crate::error::PetResult;
use crate::ids::{PetId, TaskId, UserId};
use crate::question::QuizQuestion;
use crate::store::PetStore;

pub type SharedSession<S> = Arc<Mutex<PetSession<S>>>;

/// Recurring tick task. Aborted on `cancel` or drop, and exits by itself once
/// the session stops accepting ticks.
#[derive(Debug)]
pub struct TickTimer {
    handle: Option<JoinHandle<()>>,
}

impl TickTimer {
    /// Spawn the timer. The first tick fires one full period after start.
    #[must_use]
    pub fn start<S>(session: SharedSession<S>, period: Duration) -> Self
    where
        S: PetStore + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let outcome = session.lock().await.tick().await;
                if !outcome.keeps_running() {
                    log::debug!("tick timer stopping: {outcome:?}");
                    break;
                }
            }
        });
        Self {
            handle: Some(handle),
        }
    }

    /// A timer that never ticks.
    #[must_use]
    pub const fn idle() -> Self {
        Self { handle: None }
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for TickTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// An open pet screen: the shared session plus its timer.
///
/// Dropping the handle releases the timer on every exit path.
pub struct LiveSession<S: PetStore + 'static> {
    session: SharedSession<S>,
    timer: TickTimer,
}

impl<S: PetStore + 'static> LiveSession<S> {
    /// Open the session and, unless the pet is already lost, start ticking.
    ///
    /// # Errors
    ///
    /// See [`PetSession::open`].
    pub async fn open(
        store: S,
        clock: Arc<dyn Clock>,
        cfg: Arc<EngineConfig>,
        user: UserId,
        pet_id: PetId,
        seed: u64,
    ) -> PetResult<Self> {
        let period = cfg.tick.interval();
        let session = PetSession::open(store, clock, cfg, user, pet_id, seed).await?;
        let accepting = session.phase().accepts_care();
        let session = Arc::new(Mutex::new(session));
        let timer = if accepting {
            TickTimer::start(Arc::clone(&session), period)
        } else {
            TickTimer::idle()
        };
        Ok(Self { session, timer })
    }

    #[must_use]
    pub fn session(&self) -> SharedSession<S> {
        Arc::clone(&self.session)
    }

    #[must_use]
    pub fn timer_running(&self) -> bool {
        self.timer.is_running()
    }

    pub async fn phase(&self) -> SessionPhase {
        self.session.lock().await.phase()
    }

    pub async fn view(&self) -> SessionView {
        self.session.lock().await.view()
    }

    /// # Errors
    ///
    /// See [`PetSession::perform`].
    pub async fn perform(&self, action: CareAction) -> PetResult<ActionReport> {
        self.session.lock().await.perform(action).await
    }

    /// # Errors
    ///
    /// See [`PetSession::complete_task`].
    pub async fn complete_task(
        &self,
        task: TaskId,
        answer: usize,
        question: &QuizQuestion,
    ) -> PetResult<TaskOutcome> {
        self.session
            .lock()
            .await
            .complete_task(task, answer, question)
            .await
    }

    pub async fn take_notifications(&self) -> Vec<Achievement> {
        self.session.lock().await.take_notifications()
    }

    /// Delete the lost pet and tear down.
    ///
    /// # Errors
    ///
    /// See [`PetSession::remove_pet`]; the handle stays usable on failure.
    pub async fn remove_pet(&mut self) -> PetResult<()> {
        self.timer.cancel();
        self.session.lock().await.remove_pet().await
    }

    pub async fn close(mut self) {
        self.timer.cancel();
        self.session.lock().await.close().await;
    }
}
