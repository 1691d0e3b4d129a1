use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info, instrument};

use crate::data::{NewProduct, Product};
use crate::error::{CatalogError, CatalogResult};

const SCHEMA_VERSION: i64 = 1;

const SCHEMA_V1: &str = r#"
CREATE TABLE IF NOT EXISTS product (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    image        TEXT    NOT NULL DEFAULT '',
    price        REAL    NOT NULL,
    product_name TEXT    NOT NULL UNIQUE,
    product_type TEXT    NOT NULL,
    tax          REAL    NOT NULL
);
"#;

// Keyed by name so ids of already-cached products stay stable across refreshes.
const UPSERT_BY_NAME: &str = r#"
INSERT INTO product (image, price, product_name, product_type, tax)
VALUES (?1, ?2, ?3, ?4, ?5)
ON CONFLICT(product_name) DO UPDATE SET
    image        = excluded.image,
    price        = excluded.price,
    product_type = excluded.product_type,
    tax          = excluded.tax
"#;

const SELECT_ALL: &str =
    "SELECT id, image, price, product_name, product_type, tax FROM product ORDER BY id ASC";

/// Local product cache backed by SQLite.
///
/// Every committed write re-publishes the full table to subscribers, so readers
/// must expect more than one snapshot per refresh.
pub struct Db {
    conn: Mutex<Connection>,
    snapshots: watch::Sender<Vec<Product>>,
}

impl Db {
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> CatalogResult<Self> {
        if let Some(parent) = path.as_ref().parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| CatalogError::LocalWrite(format!("create db dir: {e}")))?;
        }
        let conn = Connection::open(path.as_ref()).map_err(read_err)?;
        apply_pragmas(&conn)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> CatalogResult<Self> {
        let conn = Connection::open_in_memory().map_err(read_err)?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> CatalogResult<Self> {
        migrate(&conn)?;
        let initial = select_all(&conn)?;
        info!(rows = initial.len(), "product store ready");
        let (snapshots, _) = watch::channel(initial);
        Ok(Self {
            conn: Mutex::new(conn),
            snapshots,
        })
    }

    /// Insert-or-update every row by `product_name` in one transaction.
    /// Returns the number of rows written.
    #[instrument(skip(self, rows), fields(batch = rows.len()))]
    pub fn upsert_products(&self, rows: &[NewProduct]) -> CatalogResult<usize> {
        let snapshot = {
            let mut conn = self.lock()?;
            let tx = conn.transaction().map_err(write_err)?;
            {
                let mut stmt = tx.prepare_cached(UPSERT_BY_NAME).map_err(write_err)?;
                for row in rows {
                    stmt.execute(params![
                        row.image,
                        row.price,
                        row.product_name,
                        row.product_type,
                        row.tax
                    ])
                    .map_err(write_err)?;
                }
            }
            tx.commit().map_err(write_err)?;
            select_all(&conn)?
        };
        debug!(total = snapshot.len(), "publishing store snapshot");
        self.snapshots.send_replace(snapshot);
        Ok(rows.len())
    }

    /// Full table, ordered by id ascending.
    pub fn products(&self) -> CatalogResult<Vec<Product>> {
        let conn = self.lock()?;
        select_all(&conn)
    }

    pub fn product_by_name(&self, product_name: &str) -> CatalogResult<Option<Product>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, image, price, product_name, product_type, tax FROM product WHERE product_name = ?1",
            [product_name],
            row_to_product,
        )
        .optional()
        .map_err(read_err)
    }

    pub fn count(&self) -> CatalogResult<usize> {
        let conn = self.lock()?;
        let n: i64 = conn
            .query_row("SELECT COUNT(*) FROM product", [], |r| r.get(0))
            .map_err(read_err)?;
        Ok(n as usize)
    }

    /// Latest snapshot plus change notifications for every later write.
    pub fn subscribe(&self) -> watch::Receiver<Vec<Product>> {
        self.snapshots.subscribe()
    }

    /// `subscribe()` as a stream; yields the current snapshot first.
    pub fn observe(&self) -> WatchStream<Vec<Product>> {
        WatchStream::new(self.subscribe())
    }

    /// Run a blocking store call off the async executor.
    pub async fn run<T, F>(self: &Arc<Self>, f: F) -> CatalogResult<T>
    where
        F: FnOnce(&Db) -> CatalogResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(self);
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| CatalogError::LocalRead(format!("store task failed: {e}")))?
    }

    fn lock(&self) -> CatalogResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| CatalogError::LocalRead("store connection poisoned".into()))
    }
}

fn apply_pragmas(conn: &Connection) -> CatalogResult<()> {
    conn.execute_batch(
        r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
PRAGMA busy_timeout = 3000;
"#,
    )
    .map_err(write_err)
}

fn migrate(conn: &Connection) -> CatalogResult<()> {
    let version: i64 = conn
        .query_row("PRAGMA user_version", [], |r| r.get(0))
        .map_err(read_err)?;
    if version > SCHEMA_VERSION {
        return Err(CatalogError::LocalRead(format!(
            "store schema v{version} is newer than supported v{SCHEMA_VERSION}"
        )));
    }
    if version < SCHEMA_VERSION {
        conn.execute_batch(SCHEMA_V1).map_err(write_err)?;
        conn.execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION};"))
            .map_err(write_err)?;
        info!(from = version, to = SCHEMA_VERSION, "migrated product store");
    }
    Ok(())
}

fn select_all(conn: &Connection) -> CatalogResult<Vec<Product>> {
    let mut stmt = conn.prepare_cached(SELECT_ALL).map_err(read_err)?;
    let rows = stmt
        .query_map([], row_to_product)
        .map_err(read_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(read_err)?;
    Ok(rows)
}

fn row_to_product(r: &rusqlite::Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product {
        id: r.get(0)?,
        image: r.get(1)?,
        price: r.get(2)?,
        product_name: r.get(3)?,
        product_type: r.get(4)?,
        tax: r.get(5)?,
    })
}

fn read_err(e: rusqlite::Error) -> CatalogError {
    CatalogError::LocalRead(e.to_string())
}

fn write_err(e: rusqlite::Error) -> CatalogError {
    CatalogError::LocalWrite(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_stream::StreamExt;

    fn sample(n: usize) -> Vec<NewProduct> {
        (0..n)
            .map(|i| {
                NewProduct::new(format!("Item {i}"), "Other", 100.0 + i as f64, 5.0)
                    .with_image(format!("https://cdn.test/{i}.png"))
            })
            .collect()
    }

    #[test]
    fn fresh_store_is_empty() {
        let db = Db::open_in_memory().unwrap();
        assert_eq!(db.count().unwrap(), 0);
        assert!(db.products().unwrap().is_empty());
    }

    #[test]
    fn rows_come_back_in_id_order() {
        let db = Db::open_in_memory().unwrap();
        db.upsert_products(&sample(5)).unwrap();
        let rows = db.products().unwrap();
        assert_eq!(rows.len(), 5);
        assert!(rows.windows(2).all(|w| w[0].id < w[1].id));
        assert_eq!(rows[0].product_name, "Item 0");
        assert_eq!(rows[4].product_name, "Item 4");
    }

    #[test]
    fn upsert_is_idempotent_for_identical_payloads() {
        let db = Db::open_in_memory().unwrap();
        db.upsert_products(&sample(3)).unwrap();
        let first = db.products().unwrap();
        db.upsert_products(&sample(3)).unwrap();
        let second = db.products().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn duplicate_name_replaces_attributes() {
        let db = Db::open_in_memory().unwrap();
        db.upsert_products(&sample(2)).unwrap();
        let before = db.product_by_name("Item 1").unwrap().unwrap();

        let newer = NewProduct::new("Item 1", "Electronics", 999.0, 12.0).with_image("new.jpg");
        db.upsert_products(&[newer]).unwrap();

        assert_eq!(db.count().unwrap(), 2);
        let after = db.product_by_name("Item 1").unwrap().unwrap();
        assert_eq!(after.id, before.id);
        assert_eq!(after.price, 999.0);
        assert_eq!(after.tax, 12.0);
        assert_eq!(after.product_type, "Electronics");
        assert_eq!(after.image, "new.jpg");
    }

    #[test]
    fn duplicate_names_within_one_batch_keep_last() {
        let db = Db::open_in_memory().unwrap();
        let batch = vec![
            NewProduct::new("Mug", "Home & Kitchen", 10.0, 1.0),
            NewProduct::new("Mug", "Home & Kitchen", 12.0, 1.0),
        ];
        db.upsert_products(&batch).unwrap();
        assert_eq!(db.count().unwrap(), 1);
        assert_eq!(db.product_by_name("Mug").unwrap().unwrap().price, 12.0);
    }

    #[test]
    fn writes_notify_subscribers() {
        let db = Db::open_in_memory().unwrap();
        let mut rx = db.subscribe();
        assert!(rx.borrow_and_update().is_empty());

        db.upsert_products(&sample(2)).unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().len(), 2);

        // Unchanged payload still re-delivers.
        db.upsert_products(&sample(2)).unwrap();
        assert!(rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn observe_yields_current_snapshot_first() {
        let db = Db::open_in_memory().unwrap();
        db.upsert_products(&sample(1)).unwrap();
        let mut stream = db.observe();
        let first = stream.next().await.unwrap();
        assert_eq!(first.len(), 1);
    }

    #[tokio::test]
    async fn run_moves_work_off_the_executor() {
        let db = Arc::new(Db::open_in_memory().unwrap());
        let written = db.run(|db| db.upsert_products(&sample(4))).await.unwrap();
        assert_eq!(written, 4);
        assert_eq!(db.run(|db| db.count()).await.unwrap(), 4);
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("products.sqlite3");
        {
            let db = Db::open(&path).unwrap();
            db.upsert_products(&sample(3)).unwrap();
        }
        let db = Db::open(&path).unwrap();
        assert_eq!(db.count().unwrap(), 3);
        assert_eq!(db.subscribe().borrow().len(), 3);
    }
}
