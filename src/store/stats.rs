use rusqlite::Connection;
use serde::Serialize;

use crate::error::StorageError;

/// Aggregate counts for health and monitoring.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub total_facts: u64,
    pub total_summaries: u64,
    pub distinct_users: u64,
    pub distinct_topics: u64,
}

/// Compute store statistics. Read-only; repeated calls with no intervening
/// writes return identical counts.
pub fn stats(conn: &Connection) -> Result<StoreStats, StorageError> {
    let total_facts: i64 = conn.query_row("SELECT COUNT(*) FROM facts", [], |row| row.get(0))?;
    let total_summaries: i64 =
        conn.query_row("SELECT COUNT(*) FROM summaries", [], |row| row.get(0))?;
    let distinct_users: i64 = conn.query_row(
        "SELECT COUNT(DISTINCT user_id) FROM facts WHERE user_id IS NOT NULL",
        [],
        |row| row.get(0),
    )?;
    let distinct_topics: i64 =
        conn.query_row("SELECT COUNT(DISTINCT topic) FROM facts", [], |row| row.get(0))?;

    Ok(StoreStats {
        total_facts: total_facts as u64,
        total_summaries: total_summaries as u64,
        distinct_users: distinct_users as u64,
        distinct_topics: distinct_topics as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::store::types::{NewFact, NewSummary};
    use crate::store::write::{insert_fact, insert_summary};

    #[test]
    fn empty_store_counts_zero() {
        let conn = db::open_memory_database().unwrap();
        let s = stats(&conn).unwrap();
        assert_eq!(s.total_facts, 0);
        assert_eq!(s.total_summaries, 0);
        assert_eq!(s.distinct_users, 0);
        assert_eq!(s.distinct_topics, 0);
    }

    #[test]
    fn counts_distinct_users_and_topics() {
        let mut conn = db::open_memory_database().unwrap();
        for (user, topic) in [
            (Some("u1"), "preferences"),
            (Some("u1"), "projects"),
            (Some("u2"), "preferences"),
            (None, "preferences"),
        ] {
            insert_fact(
                &mut conn,
                &NewFact {
                    user_id: user.map(String::from),
                    topic: topic.into(),
                    fact: "something worth keeping".into(),
                    ..Default::default()
                },
            )
            .unwrap();
        }
        insert_summary(
            &conn,
            &NewSummary {
                session_id: "s1".into(),
                channel: None,
                user_id: None,
                summary: "batch done".into(),
                message_count: 2,
            },
        )
        .unwrap();

        let s = stats(&conn).unwrap();
        assert_eq!(s.total_facts, 4);
        assert_eq!(s.total_summaries, 1);
        assert_eq!(s.distinct_users, 2); // NULL user not counted
        assert_eq!(s.distinct_topics, 2);
    }

    #[test]
    fn stats_idempotent_without_writes() {
        let mut conn = db::open_memory_database().unwrap();
        insert_fact(
            &mut conn,
            &NewFact {
                topic: "t".into(),
                fact: "f".into(),
                ..Default::default()
            },
        )
        .unwrap();

        let first = stats(&conn).unwrap();
        let second = stats(&conn).unwrap();
        assert_eq!(first.total_facts, second.total_facts);
        assert_eq!(first.distinct_topics, second.distinct_topics);
    }
}
