//! Database models and the queries that read and write them.
//!
//! Every store function takes a `&mut SqliteConnection`, so callers decide
//! whether it runs on a pooled connection or inside a transaction.

pub mod assignment;
pub mod audit;
pub mod billing;
pub mod job;
pub mod location;
pub mod user;
pub mod workshop;

pub use assignment::Assignment;
pub use audit::AuditEntry;
pub use billing::InvoiceLine;
pub use job::{Job, JobDetail, JobState};
pub use location::{Location, RecentLocation};
pub use user::{Role, User};
pub use workshop::Workshop;

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{NaiveDate, NaiveDateTime};
    use sqlx::{sqlite::SqliteConnectOptions, Connection, SqliteConnection};
    use std::str::FromStr;

    /// A fresh in-memory store with the schema applied.
    pub(crate) async fn conn() -> SqliteConnection {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .unwrap()
            .foreign_keys(true);
        let mut conn = SqliteConnection::connect_with(&options).await.unwrap();
        sqlx::migrate!("./migrations").run(&mut conn).await.unwrap();
        conn
    }

    pub(crate) fn at(date: &str, time: &str) -> NaiveDateTime {
        NaiveDate::from_str(date)
            .unwrap()
            .and_time(time.parse().unwrap())
    }
}
