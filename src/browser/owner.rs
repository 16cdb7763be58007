//! Single-owner session task
//!
//! The browser driver is not safe for concurrent use, so one task owns the
//! `Session` and runs queued jobs against it strictly one after another. The
//! trading loop and chat commands both go through a cloned `SessionHandle`;
//! a command arriving mid-cycle waits behind the loop's current job.

use super::session::{Session, SessionManager, SessionState};
use crate::errors::{BotError, BotResult};
use crate::logger::{self, LogTag};
use futures::future::BoxFuture;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

const JOB_QUEUE_CAPACITY: usize = 32;

type Job = Box<dyn for<'a> FnOnce(&'a mut Session) -> BoxFuture<'a, ()> + Send>;

fn job<F>(f: F) -> Job
where
    F: for<'a> FnOnce(&'a mut Session) -> BoxFuture<'a, ()> + Send + 'static,
{
    Box::new(f)
}

/// Last published view of the owned session, readable without queueing
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub authenticated: bool,
    pub user_agent: String,
}

impl SessionSnapshot {
    fn of(session: &Session) -> Self {
        Self {
            state: session.state(),
            authenticated: session.is_authenticated(),
            user_agent: session.user_agent().to_string(),
        }
    }
}

#[derive(Clone)]
pub struct SessionHandle {
    jobs: mpsc::Sender<Job>,
    snapshot: Arc<RwLock<SessionSnapshot>>,
}

impl SessionHandle {
    /// Move `session` into a new owner task
    pub fn spawn(session: Session) -> Self {
        let (tx, rx) = mpsc::channel::<Job>(JOB_QUEUE_CAPACITY);
        let snapshot = Arc::new(RwLock::new(SessionSnapshot::of(&session)));
        tokio::spawn(run_owner(session, rx, snapshot.clone()));
        Self { jobs: tx, snapshot }
    }

    /// Queue `f` and wait for its result
    ///
    /// ```ignore
    /// let balance = handle
    ///     .run(move |session| Box::pin(async move { reader.get_balance(session).await }))
    ///     .await?;
    /// ```
    pub async fn run<T, F>(&self, f: F) -> BotResult<T>
    where
        T: Send + 'static,
        F: for<'a> FnOnce(&'a mut Session) -> BoxFuture<'a, BotResult<T>> + Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let queued = job(move |session| {
            Box::pin(async move {
                let result = f(session).await;
                let _ = reply_tx.send(result);
            })
        });

        self.jobs
            .send(queued)
            .await
            .map_err(|_| BotError::SessionClosed)?;
        reply_rx.await.map_err(|_| BotError::SessionClosed)?
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.read().clone()
    }

    /// Owner task still accepting jobs
    pub fn is_alive(&self) -> bool {
        !self.jobs.is_closed()
    }

    /// Close the browser; jobs queued behind this one fail with `SessionClosed`
    pub async fn close(&self) -> BotResult<()> {
        self.run(|session| {
            Box::pin(async move {
                SessionManager::close(Some(session)).await;
                Ok(())
            })
        })
        .await
    }
}

async fn run_owner(
    mut session: Session,
    mut jobs: mpsc::Receiver<Job>,
    snapshot: Arc<RwLock<SessionSnapshot>>,
) {
    logger::debug(LogTag::Browser, "Session owner started");

    while let Some(next) = jobs.recv().await {
        next(&mut session).await;
        *snapshot.write() = SessionSnapshot::of(&session);
        if session.state() == SessionState::Closed {
            break;
        }
    }

    // Every handle dropped or the session was closed by a job
    jobs.close();
    SessionManager::close(Some(&mut session)).await;
    *snapshot.write() = SessionSnapshot::of(&session);
    logger::debug(LogTag::Browser, "Session owner stopped");
}
