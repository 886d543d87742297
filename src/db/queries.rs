//! Ready-made monitoring queries, one rendering per backend dialect.
//!
//! The predefined table, the synthesizer templates and the fallback path all
//! refer to these by name; the SQL text is picked once the target's backend
//! kind is known.

use crate::models::BackendKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CannedQuery {
    InstanceStatus,
    ResourceLimits,
    TablespaceUsage,
    SessionsToday,
    ActiveSessions,
    BlockedSessions,
    CurrentTime,
}

impl CannedQuery {
    pub fn name(&self) -> &'static str {
        match self {
            Self::InstanceStatus => "instance_status",
            Self::ResourceLimits => "resource_limits",
            Self::TablespaceUsage => "tablespace_usage",
            Self::SessionsToday => "sessions_today",
            Self::ActiveSessions => "active_sessions",
            Self::BlockedSessions => "blocked_sessions",
            Self::CurrentTime => "current_time",
        }
    }

    pub fn sql(&self, kind: BackendKind) -> &'static str {
        match kind {
            BackendKind::Postgres => postgres::sql(*self),
            BackendKind::MySql => mysql::sql(*self),
            BackendKind::SQLite => sqlite::sql(*self),
        }
    }
}

mod postgres {
    use super::CannedQuery;

    pub fn sql(query: CannedQuery) -> &'static str {
        match query {
            CannedQuery::InstanceStatus => {
                "SELECT current_database() AS database_name,
       inet_server_addr()::text AS host_address,
       version() AS version,
       to_char(pg_postmaster_start_time(), 'DD-MON-YYYY HH24:MI:SS') AS started_at,
       CASE WHEN pg_is_in_recovery() THEN 'STANDBY' ELSE 'OPEN' END AS database_status,
       (SELECT count(*) FROM pg_stat_activity) AS sessions
FROM pg_catalog.pg_database
WHERE datname = current_database()"
            }
            CannedQuery::ResourceLimits => {
                "SELECT 'connections' AS resource_name,
       (SELECT count(*) FROM pg_stat_activity) AS current_utilization,
       current_setting('max_connections')::int AS limit_value
UNION ALL
SELECT 'prepared_transactions',
       (SELECT count(*) FROM pg_prepared_xacts),
       current_setting('max_prepared_transactions')::int
ORDER BY resource_name"
            }
            CannedQuery::TablespaceUsage => {
                "SELECT spcname AS tablespace_name,
       pg_size_pretty(pg_tablespace_size(oid)) AS used,
       pg_tablespace_size(oid) AS used_bytes
FROM pg_tablespace
ORDER BY used_bytes DESC"
            }
            CannedQuery::SessionsToday => {
                "SELECT usename AS username,
       client_addr::text AS client_address,
       application_name AS program,
       state AS status,
       to_char(backend_start, 'YYYY-MM-DD HH24:MI:SS') AS logon_time
FROM pg_stat_activity
WHERE usename IS NOT NULL
  AND backend_start::date = current_date
ORDER BY backend_start DESC"
            }
            CannedQuery::ActiveSessions => {
                "SELECT usename AS username,
       state AS status,
       client_addr::text AS client_address,
       application_name AS program
FROM pg_stat_activity
WHERE usename IS NOT NULL
ORDER BY backend_start DESC"
            }
            CannedQuery::BlockedSessions => {
                "SELECT a.pid,
       a.usename AS username,
       pg_blocking_pids(a.pid)::text AS blocked_by,
       a.wait_event_type,
       a.wait_event,
       a.state AS status,
       substr(a.query, 1, 100) AS current_query
FROM pg_stat_activity a
WHERE cardinality(pg_blocking_pids(a.pid)) > 0
ORDER BY a.pid"
            }
            CannedQuery::CurrentTime => "SELECT now() AS current_time",
        }
    }
}

mod mysql {
    use super::CannedQuery;

    pub fn sql(query: CannedQuery) -> &'static str {
        match query {
            CannedQuery::InstanceStatus => {
                "SELECT @@hostname AS host_name,
       @@version AS version,
       DATE_FORMAT(NOW() - INTERVAL VARIABLE_VALUE SECOND, '%d-%b-%Y %H:%i:%s') AS started_at,
       IF(@@read_only = 1, 'READ ONLY', 'OPEN') AS database_status
FROM performance_schema.global_status
WHERE VARIABLE_NAME = 'Uptime'"
            }
            CannedQuery::ResourceLimits => {
                "SELECT 'connections' AS resource_name,
       (SELECT COUNT(*) FROM information_schema.PROCESSLIST) AS current_utilization,
       @@max_connections AS limit_value"
            }
            CannedQuery::TablespaceUsage => {
                "SELECT table_schema AS tablespace_name,
       ROUND(SUM(data_length + index_length) / 1024 / 1024, 2) AS used_mb,
       SUM(data_length + index_length) AS used_bytes
FROM information_schema.TABLES
GROUP BY table_schema
ORDER BY used_bytes DESC"
            }
            CannedQuery::SessionsToday => {
                "SELECT USER AS username,
       HOST AS client_address,
       DB AS database_name,
       COMMAND AS command,
       TIME AS seconds_in_state,
       STATE AS status
FROM information_schema.PROCESSLIST
WHERE USER IS NOT NULL
  AND TIME < TIMESTAMPDIFF(SECOND, CURDATE(), NOW())
ORDER BY TIME"
            }
            CannedQuery::ActiveSessions => {
                "SELECT USER AS username,
       HOST AS client_address,
       DB AS database_name,
       COMMAND AS command,
       STATE AS status
FROM information_schema.PROCESSLIST
WHERE USER IS NOT NULL"
            }
            CannedQuery::BlockedSessions => {
                "SELECT REQUESTING_ENGINE_TRANSACTION_ID AS waiting_trx,
       BLOCKING_ENGINE_TRANSACTION_ID AS blocking_trx,
       REQUESTING_THREAD_ID AS waiting_thread,
       BLOCKING_THREAD_ID AS blocking_thread
FROM performance_schema.data_lock_waits"
            }
            CannedQuery::CurrentTime => "SELECT NOW() AS current_time",
        }
    }
}

mod sqlite {
    use super::CannedQuery;

    pub fn sql(query: CannedQuery) -> &'static str {
        match query {
            CannedQuery::InstanceStatus => {
                "SELECT sqlite_version() AS version,
       (SELECT page_count FROM pragma_page_count()) AS page_count,
       (SELECT page_size FROM pragma_page_size()) AS page_size,
       (SELECT journal_mode FROM pragma_journal_mode()) AS journal_mode"
            }
            CannedQuery::ResourceLimits => {
                "SELECT 'pages' AS resource_name,
       (SELECT page_count FROM pragma_page_count()) AS current_utilization,
       (SELECT max_page_count FROM pragma_max_page_count()) AS limit_value"
            }
            CannedQuery::TablespaceUsage => {
                "SELECT name AS tablespace_name,
       file AS file_name
FROM pragma_database_list()"
            }
            // SQLite is embedded: the only session is the bot's own connection.
            CannedQuery::SessionsToday | CannedQuery::ActiveSessions => {
                "SELECT 'local' AS username,
       'ACTIVE' AS status,
       datetime('now') AS logon_time"
            }
            CannedQuery::BlockedSessions => "SELECT 0 AS blocked_sessions",
            CannedQuery::CurrentTime => "SELECT datetime('now') AS current_time",
        }
    }
}
