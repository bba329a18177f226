//! A small connection pool with a bounded overflow.
//!
//! At most `pool_size + max_overflow` connections exist at once. Up to
//! `pool_size` of them are kept idle after use; the rest are closed when
//! returned. New physical connections are opened through the manager, so
//! pre-connect interceptors run only when the pool actually grows.

use std::collections::VecDeque;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

use crate::config::PoolConfig;
use crate::error::DbError;
use crate::manager::ManageConnection;

struct Idle<C> {
    conn: C,
    since: Instant,
}

struct PoolInner<M: ManageConnection> {
    manager: M,
    config: PoolConfig,
    idle: Mutex<VecDeque<Idle<M::Connection>>>,
    permits: Arc<Semaphore>,
    open: AtomicUsize,
    closed: AtomicBool,
}

impl<M: ManageConnection> PoolInner<M> {
    /// Forget a connection and close it in the background.
    fn discard(self: &Arc<Self>, conn: M::Connection) {
        self.open.fetch_sub(1, Ordering::SeqCst);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let inner = Arc::clone(self);
                handle.spawn(async move { inner.manager.disconnect(conn).await });
            }
            Err(_) => drop(conn),
        }
    }

    /// `close` sets `closed` under the idle lock and it is checked under the
    /// same lock here, so nothing lands in the idle list after the drain.
    fn release(self: &Arc<Self>, conn: M::Connection) {
        let mut idle = self.idle.lock();
        if !self.closed.load(Ordering::SeqCst) && idle.len() < self.config.pool_size {
            idle.push_back(Idle {
                conn,
                since: Instant::now(),
            });
            return;
        }
        drop(idle);
        tracing::trace!("closing returned connection");
        self.discard(conn);
    }
}

/// Holds a connection taken from the idle list until it is handed out.
/// Dropping it, e.g. when `get` is cancelled mid pre-ping, discards the
/// connection.
struct Taken<M: ManageConnection> {
    pool: Arc<PoolInner<M>>,
    conn: Option<M::Connection>,
}

impl<M: ManageConnection> Taken<M> {
    fn hand_out(mut self) -> Option<M::Connection> {
        self.conn.take()
    }
}

impl<M: ManageConnection> Drop for Taken<M> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.discard(conn);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolState {
    /// Open physical connections, idle or checked out.
    pub connections: usize,
    pub idle: usize,
}

pub struct Pool<M: ManageConnection> {
    inner: Arc<PoolInner<M>>,
}

impl<M: ManageConnection> Clone for Pool<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M: ManageConnection> Pool<M> {
    /// Connections are opened lazily on first use.
    ///
    /// # Errors
    /// Returns [`DbError::Config`] if the pool would allow no connections.
    pub fn new(manager: M, config: PoolConfig) -> Result<Self, DbError> {
        let max = config.max_connections();
        if max == 0 {
            return Err(DbError::config(
                "pool_size + max_overflow must allow at least one connection",
            ));
        }
        Ok(Self {
            inner: Arc::new(PoolInner {
                manager,
                config,
                idle: Mutex::new(VecDeque::new()),
                permits: Arc::new(Semaphore::new(max)),
                open: AtomicUsize::new(0),
                closed: AtomicBool::new(false),
            }),
        })
    }

    #[must_use]
    pub fn manager(&self) -> &M {
        &self.inner.manager
    }

    #[must_use]
    pub fn state(&self) -> PoolState {
        PoolState {
            connections: self.inner.open.load(Ordering::SeqCst),
            idle: self.inner.idle.lock().len(),
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Check out a connection, reusing an idle one when possible.
    ///
    /// # Errors
    /// - [`DbError::PoolTimedOut`] if no slot frees up within the acquire timeout
    /// - [`DbError::PoolClosed`] after [`Pool::close`]
    /// - any error from opening a new connection
    pub async fn get(&self) -> Result<PooledConnection<M>, DbError> {
        if self.is_closed() {
            return Err(DbError::PoolClosed);
        }
        let permits = Arc::clone(&self.inner.permits);
        let permit =
            match tokio::time::timeout(self.inner.config.acquire_timeout(), permits.acquire_owned())
                .await
            {
                Err(_) => return Err(DbError::PoolTimedOut),
                Ok(Err(_)) => return Err(DbError::PoolClosed),
                Ok(Ok(permit)) => permit,
            };

        while let Some(conn) = self.take_idle() {
            let mut taken = Taken {
                pool: Arc::clone(&self.inner),
                conn: Some(conn),
            };
            if self.inner.config.pre_ping
                && let Some(conn) = taken.conn.as_mut()
                && let Err(e) = self.inner.manager.is_valid(conn).await
            {
                tracing::warn!(error = %e, "discarding dead pooled connection");
                continue;
            }
            if let Some(conn) = taken.hand_out() {
                return Ok(self.wrap(conn, permit));
            }
        }

        // On failure the permit drops here and the slot is free again.
        let conn = self.inner.manager.connect().await?;
        self.inner.open.fetch_add(1, Ordering::SeqCst);
        Ok(self.wrap(conn, permit))
    }

    /// Pops the most recently returned idle connection, closing any that
    /// outlived the idle timeout.
    fn take_idle(&self) -> Option<M::Connection> {
        let idle_timeout = self.inner.config.idle_timeout();
        loop {
            let entry = self.inner.idle.lock().pop_back()?;
            match idle_timeout {
                Some(limit) if entry.since.elapsed() >= limit => {
                    tracing::debug!("closing idle connection past idle timeout");
                    self.inner.discard(entry.conn);
                }
                _ => return Some(entry.conn),
            }
        }
    }

    fn wrap(&self, conn: M::Connection, permit: OwnedSemaphorePermit) -> PooledConnection<M> {
        PooledConnection {
            conn: Some(conn),
            pool: Arc::clone(&self.inner),
            _permit: permit,
        }
    }

    /// Stop handing out connections and close the idle ones. Connections
    /// still checked out are closed when they are returned.
    pub async fn close(&self) {
        let drained: Vec<_> = {
            let mut idle = self.inner.idle.lock();
            if self.inner.closed.swap(true, Ordering::SeqCst) {
                return;
            }
            idle.drain(..).collect()
        };
        self.inner.permits.close();
        for entry in drained {
            self.inner.open.fetch_sub(1, Ordering::SeqCst);
            self.inner.manager.disconnect(entry.conn).await;
        }
        tracing::info!("database pool closed");
    }
}

/// A checked-out connection. Goes back to the pool on drop.
pub struct PooledConnection<M: ManageConnection> {
    conn: Option<M::Connection>,
    pool: Arc<PoolInner<M>>,
    // Released after the connection is back in the idle list.
    _permit: OwnedSemaphorePermit,
}

impl<M: ManageConnection> Deref for PooledConnection<M> {
    type Target = M::Connection;

    fn deref(&self) -> &Self::Target {
        match &self.conn {
            Some(conn) => conn,
            None => unreachable!("connection is present until drop"),
        }
    }
}

impl<M: ManageConnection> DerefMut for PooledConnection<M> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match &mut self.conn {
            Some(conn) => conn,
            None => unreachable!("connection is present until drop"),
        }
    }
}

impl<M: ManageConnection> Drop for PooledConnection<M> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn);
        }
    }
}
