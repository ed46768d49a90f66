use rusqlite::Connection;
use std::path::PathBuf;
use tempfile::TempDir;
use tg_eye::store::StatusStore;

fn scratch_store() -> (StatusStore, PathBuf, TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("user_status.sqlite3");
    let store = StatusStore::open(&path).expect("open store");
    (store, path, dir)
}

#[test]
fn opening_twice_is_idempotent() {
    let (store, path, _dir) = scratch_store();
    drop(store);
    StatusStore::open(&path).expect("reopen store");
}

#[test]
fn status_rows_append_in_push_order() {
    let (store, path, _dir) = scratch_store();
    store.insert_status(42, 100, true).unwrap();
    store.insert_status(42, 200, false).unwrap();
    store.insert_status(42, 300, true).unwrap();

    let conn = Connection::open(&path).unwrap();
    let rows: Vec<(i64, i64, i64)> = conn
        .prepare("select telegram_user_id, timestamp, status from user_status")
        .unwrap()
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(rows, vec![(42, 100, 1), (42, 200, 0), (42, 300, 1)]);
}

#[test]
fn upsert_never_duplicates_a_user_row() {
    let (store, path, _dir) = scratch_store();
    store.update_user_info(42, "Ada", "ada", &[1]).unwrap();
    store
        .update_user_info(42, "Ada Lovelace", "ada", &[1, 2])
        .unwrap();

    let conn = Connection::open(&path).unwrap();
    let count: i64 = conn
        .query_row("select count(*) from user_info", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);

    let name: String = conn
        .query_row(
            "select full_name from user_info where telegram_user_id = 42",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(name, "Ada Lovelace");
}

#[test]
fn empty_values_never_overwrite_known_ones() {
    let (store, path, _dir) = scratch_store();
    store
        .update_user_info(42, "Ada Lovelace", "ada", &[9, 9, 9])
        .unwrap();
    store.update_user_info(42, "", "", &[]).unwrap();

    let conn = Connection::open(&path).unwrap();
    let (name, username, photo): (String, String, Vec<u8>) = conn
        .query_row(
            "select full_name, username, profile_photo from user_info \
             where telegram_user_id = 42",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .unwrap();
    assert_eq!(name, "Ada Lovelace");
    assert_eq!(username, "ada");
    assert_eq!(photo, vec![9, 9, 9]);
}

#[test]
fn non_empty_values_always_overwrite() {
    let (store, path, _dir) = scratch_store();
    store.update_user_info(42, "Ada", "ada", &[1]).unwrap();
    store
        .update_user_info(42, "Countess Lovelace", "countess", &[2])
        .unwrap();

    let conn = Connection::open(&path).unwrap();
    let (name, username, photo): (String, String, Vec<u8>) = conn
        .query_row(
            "select full_name, username, profile_photo from user_info \
             where telegram_user_id = 42",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .unwrap();
    assert_eq!(name, "Countess Lovelace");
    assert_eq!(username, "countess");
    assert_eq!(photo, vec![2]);
}

#[test]
fn partial_update_keeps_other_columns() {
    let (store, path, _dir) = scratch_store();
    store.update_user_info(42, "Ada", "", &[3, 4]).unwrap();
    store.update_user_info(42, "", "ada", &[]).unwrap();

    let conn = Connection::open(&path).unwrap();
    let (name, username, photo): (String, String, Vec<u8>) = conn
        .query_row(
            "select full_name, username, profile_photo from user_info \
             where telegram_user_id = 42",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .unwrap();
    assert_eq!(name, "Ada");
    assert_eq!(username, "ada");
    assert_eq!(photo, vec![3, 4]);
}

// The end-to-end property: a fresh store, one profile upsert with no
// photo, one online status event, verified with direct SQL.
#[test]
fn fresh_store_round_trip() {
    let (store, path, _dir) = scratch_store();
    store.update_user_info(42, "Ada Lovelace", "ada", &[]).unwrap();
    store.insert_status(42, 1000, true).unwrap();

    let conn = Connection::open(&path).unwrap();

    let info_rows: Vec<(i64, String, Vec<u8>)> = conn
        .prepare("select telegram_user_id, full_name, profile_photo from user_info")
        .unwrap()
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(info_rows.len(), 1);
    assert_eq!(info_rows[0].0, 42);
    assert_eq!(info_rows[0].1, "Ada Lovelace");
    assert!(info_rows[0].2.is_empty());

    let status_rows: Vec<(i64, i64, i64)> = conn
        .prepare("select telegram_user_id, timestamp, status from user_status")
        .unwrap()
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(status_rows, vec![(42, 1000, 1)]);
}

#[test]
fn read_only_open_fails_on_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    assert!(StatusStore::open_read_only(dir.path().join("absent.sqlite3")).is_err());
}

#[test]
fn read_queries_see_written_data() {
    let (store, path, _dir) = scratch_store();
    store.update_user_info(7, "Grace", "grace", &[]).unwrap();
    store.insert_status(7, 100, true).unwrap();
    store.insert_status(7, 200, false).unwrap();
    drop(store);

    let reader = StatusStore::open_read_only(&path).unwrap();
    let users = reader.list_users().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].user_id, 7);
    assert_eq!(users[0].full_name.as_deref(), Some("Grace"));

    let samples = reader.statuses_for_user(7).unwrap();
    assert_eq!(samples.len(), 2);
    assert!(samples[0].is_online);
    assert!(!samples[1].is_online);
}
