#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use rusqlite::{Connection, params};

use retail_etl::EtlResult;
use retail_etl::extraction::{HttpClient, HttpResponse, StoreBackedStorage};

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn fixture(name: &str) -> String {
    std::fs::read_to_string(fixture_path(name)).unwrap()
}

/// HTTP client answering from a fixed table; unknown URLs get a 404.
#[derive(Default)]
pub struct ScriptedHttp {
    responses: HashMap<String, (u16, Vec<u8>)>,
    requested: Mutex<Vec<String>>,
}

impl ScriptedHttp {
    pub fn respond(mut self, url: &str, status: u16, body: impl Into<Vec<u8>>) -> Self {
        self.responses.insert(url.to_string(), (status, body.into()));
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

impl HttpClient for ScriptedHttp {
    fn get(&self, url: &str, _headers: &[(String, String)]) -> EtlResult<HttpResponse> {
        self.requested.lock().unwrap().push(url.to_string());
        let (status, body) = self
            .responses
            .get(url)
            .cloned()
            .unwrap_or((404, b"not found".to_vec()));
        Ok(HttpResponse { status, body })
    }
}

/// In-memory object storage holding `objects` (key, body).
pub fn memory_storage(objects: &[(&str, &str)]) -> StoreBackedStorage {
    let store = Arc::new(InMemory::new());
    let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
    for (key, body) in objects {
        rt.block_on(store.put(&ObjectPath::from(*key), PutPayload::from(body.as_bytes().to_vec())))
            .unwrap();
    }
    StoreBackedStorage::new(store).unwrap()
}

pub fn user_uuid(i: usize) -> String {
    format!("{i:08x}-e4e9-4c6e-bebb-{i:012x}")
}

/// Legacy users table with `valid` distinct users, `null_dob` users whose date of birth
/// is the `NULL` sentinel and `duplicates` exact copies of earlier users.
pub fn seed_users(conn: &Connection, valid: usize, null_dob: usize, duplicates: usize) {
    conn.execute_batch(
        "CREATE TABLE legacy_users (
            \"index\" INTEGER, first_name TEXT, last_name TEXT, date_of_birth TEXT,
            company TEXT, email_address TEXT, address TEXT, country TEXT,
            country_code TEXT, phone_number TEXT, join_date TEXT, user_uuid TEXT
        );",
    )
    .unwrap();

    let mut rows = Vec::new();
    for i in 0..valid {
        let dob = if i % 2 == 0 {
            format!("{}-0{}-1{}", 1960 + i % 40, 1 + i % 9, i % 10)
        } else {
            format!("{} March 0{}", 1960 + i % 40, 1 + i % 9)
        };
        let country_code = if i % 10 == 0 { "GGB" } else { "GB" };
        let phone = if i % 3 == 0 {
            format!("+44(0)20 7946 {:04}", i)
        } else {
            format!("(020) 7946-{:04}x{}", i, i % 7)
        };
        rows.push(vec![
            format!("User{i}"),
            format!("Surname{i}"),
            dob,
            "NULL".to_string(),
            format!("user{i}@@example.com"),
            format!("{i} high street\nexeter\nex1 {i}ab"),
            "United Kingdom".to_string(),
            country_code.to_string(),
            phone,
            "2018-03-03".to_string(),
            user_uuid(i),
        ]);
    }
    for i in 0..null_dob {
        let mut row = rows[i].clone();
        row[2] = "NULL".to_string();
        row[10] = user_uuid(valid + i);
        rows.push(row);
    }
    for i in 0..duplicates {
        rows.push(rows[i].clone());
    }

    let mut stmt = conn
        .prepare(
            "INSERT INTO legacy_users \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        )
        .unwrap();
    for (idx, r) in rows.iter().enumerate() {
        stmt.execute(params![
            idx as i64, r[0], r[1], r[2], r[3], r[4], r[5], r[6], r[7], r[8], r[9], r[10]
        ])
        .unwrap();
    }
}

pub fn seed_orders(conn: &Connection) {
    conn.execute_batch(
        "CREATE TABLE orders_table (
            level_0 INTEGER, \"index\" INTEGER, date_uuid TEXT, first_name TEXT, last_name TEXT,
            user_uuid TEXT, card_number INTEGER, store_code TEXT, product_code TEXT,
            \"1\" REAL, product_quantity INTEGER
        );
        INSERT INTO orders_table VALUES
            (0, 0, '9476f17e-5d6a-4117-874d-9cdb38ca1a5e', NULL, NULL,
             '00000001-e4e9-4c6e-bebb-000000000001', 4971858637664481, 'bl-8387506c', 'R7-3126933H', NULL, 3),
            (1, 1, '0423a395-a04d-4e4b-bd2c-0d6ae5ce9e16', NULL, NULL,
             '00000002-e4e9-4c6e-bebb-000000000002', 3554954842403145, 'WEB-1388012W', 'c2-7287916l', NULL, 4),
            (2, 2, 'bogus', NULL, NULL,
             '00000003-e4e9-4c6e-bebb-000000000003', 3554954842403145, 'WEB-1388012W', 'c2-7287916l', NULL, 1);",
    )
    .unwrap();
}
