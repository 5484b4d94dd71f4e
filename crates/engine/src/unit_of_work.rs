//! Transaction boundary with deferred broadcasts.
//!
//! A [`UnitOfWork`] owns one database transaction and the broadcast
//! messages staged while it was open. [`UnitOfWork::commit`] commits and
//! then publishes; rolling back or dropping the unit discards the staged
//! messages, so listeners never hear about rows that were not committed.

use std::sync::Arc;

use sqlx::{PgConnection, Postgres, Transaction};
use vigia_db::DbPool;
use vigia_events::{BroadcastMessage, EventBus};

/// A SAVEPOINT opened with [`UnitOfWork::savepoint`].
///
/// Remembers how many messages were staged when it was taken so a rollback
/// can discard the ones staged afterwards.
#[derive(Debug)]
#[must_use = "a savepoint must be released or rolled back"]
pub struct Savepoint {
    name: String,
    staged: usize,
}

pub struct UnitOfWork {
    tx: Transaction<'static, Postgres>,
    staged: Vec<BroadcastMessage>,
    bus: Option<Arc<EventBus>>,
    savepoints: usize,
}

impl UnitOfWork {
    pub async fn begin(pool: &DbPool, bus: Option<Arc<EventBus>>) -> Result<Self, sqlx::Error> {
        let tx = pool.begin().await?;
        Ok(Self {
            tx,
            staged: Vec::new(),
            bus,
            savepoints: 0,
        })
    }

    /// The transaction's connection, for repository calls.
    pub fn conn(&mut self) -> &mut PgConnection {
        &mut *self.tx
    }

    /// Queue a message for publication after commit.
    pub fn stage(&mut self, message: BroadcastMessage) {
        self.staged.push(message);
    }

    pub fn staged(&self) -> &[BroadcastMessage] {
        &self.staged
    }

    pub async fn savepoint(&mut self) -> Result<Savepoint, sqlx::Error> {
        self.savepoints += 1;
        let name = format!("vigia_sp_{}", self.savepoints);
        sqlx::query(&format!("SAVEPOINT {name}"))
            .execute(&mut *self.tx)
            .await?;
        Ok(Savepoint {
            name,
            staged: self.staged.len(),
        })
    }

    /// Keep everything done since the savepoint.
    pub async fn release(&mut self, savepoint: Savepoint) -> Result<(), sqlx::Error> {
        sqlx::query(&format!("RELEASE SAVEPOINT {}", savepoint.name))
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    /// Undo every write and staged message since the savepoint.
    pub async fn rollback_to(&mut self, savepoint: Savepoint) -> Result<(), sqlx::Error> {
        sqlx::query(&format!("ROLLBACK TO SAVEPOINT {}", savepoint.name))
            .execute(&mut *self.tx)
            .await?;
        self.staged.truncate(savepoint.staged);
        Ok(())
    }

    /// Commit, then publish staged messages. Returns how many were published.
    pub async fn commit(self) -> Result<usize, sqlx::Error> {
        let Self {
            tx, staged, bus, ..
        } = self;
        tx.commit().await?;

        let Some(bus) = bus else {
            return Ok(0);
        };
        let count = staged.len();
        for message in staged {
            bus.publish(message);
        }
        Ok(count)
    }

    pub async fn rollback(self) -> Result<(), sqlx::Error> {
        self.tx.rollback().await
    }
}
