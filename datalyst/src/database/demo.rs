//! Sample e-commerce database.
//!
//! Builds `customers`, `products`, `orders` and `sales` tables with
//! 100 customers, a fixed catalogue of 15 products and randomly generated
//! orders. Used by `datalyst setup-demo` and by the evaluation run.

use std::fmt;
use std::path::Path;

use chrono::{Days, NaiveDate, Utc};
use rusqlite::{Connection, params};
use serde::Serialize;
use tracing::info;

use crate::error::{DatabaseError, DatabaseResult};

const SCHEMA: &str = "
DROP TABLE IF EXISTS sales;
DROP TABLE IF EXISTS products;
DROP TABLE IF EXISTS customers;
DROP TABLE IF EXISTS orders;

CREATE TABLE customers (
    customer_id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT UNIQUE NOT NULL,
    region TEXT NOT NULL,
    signup_date DATE NOT NULL
);

CREATE TABLE products (
    product_id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    category TEXT NOT NULL,
    price DECIMAL(10, 2) NOT NULL,
    stock_quantity INTEGER NOT NULL
);

CREATE TABLE orders (
    order_id INTEGER PRIMARY KEY,
    customer_id INTEGER NOT NULL,
    order_date DATE NOT NULL,
    total_amount DECIMAL(10, 2) NOT NULL,
    status TEXT NOT NULL,
    FOREIGN KEY (customer_id) REFERENCES customers(customer_id)
);

CREATE TABLE sales (
    sale_id INTEGER PRIMARY KEY,
    order_id INTEGER NOT NULL,
    product_id INTEGER NOT NULL,
    quantity INTEGER NOT NULL,
    unit_price DECIMAL(10, 2) NOT NULL,
    total_price DECIMAL(10, 2) NOT NULL,
    sale_date DATE NOT NULL,
    FOREIGN KEY (order_id) REFERENCES orders(order_id),
    FOREIGN KEY (product_id) REFERENCES products(product_id)
);
";

const CUSTOMERS: i64 = 100;
const REGIONS: [&str; 4] = ["North", "South", "East", "West"];
const STATUSES: [&str; 5] = ["Completed", "Completed", "Completed", "Pending", "Shipped"];

/// `(id, name, category, price, stock)`
const PRODUCTS: [(i64, &str, &str, f64, i64); 15] = [
    (1, "Laptop Pro", "Electronics", 1299.99, 50),
    (2, "Wireless Mouse", "Electronics", 29.99, 200),
    (3, "Running Shoes", "Sports", 89.99, 100),
    (4, "Coffee Maker", "Home & Garden", 79.99, 75),
    (5, "T-Shirt", "Clothing", 19.99, 300),
    (6, "Smartphone", "Electronics", 699.99, 80),
    (7, "Yoga Mat", "Sports", 34.99, 150),
    (8, "Novel Book", "Books", 14.99, 120),
    (9, "Jeans", "Clothing", 59.99, 200),
    (10, "Desk Lamp", "Home & Garden", 39.99, 90),
    (11, "Tablet", "Electronics", 499.99, 60),
    (12, "Backpack", "Sports", 49.99, 180),
    (13, "Cookbook", "Books", 24.99, 100),
    (14, "Sweater", "Clothing", 44.99, 150),
    (15, "Plant Pot", "Home & Garden", 12.99, 250),
];

/// Row counts of a generated database.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DemoSummary {
    /// Customers inserted.
    pub customers: usize,
    /// Products inserted.
    pub products: usize,
    /// Orders inserted.
    pub orders: usize,
    /// Sale lines inserted.
    pub sales: usize,
}

impl fmt::Display for DemoSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total records:")?;
        writeln!(f, "  Customers: {}", self.customers)?;
        writeln!(f, "  Products:  {}", self.products)?;
        writeln!(f, "  Orders:    {}", self.orders)?;
        write!(f, "  Sales:     {}", self.sales)
    }
}

/// Create (or recreate) the sample database at `path`.
///
/// # Errors
///
/// Returns [`DatabaseError`] if the file cannot be opened or written.
pub fn create_demo_database(path: impl AsRef<Path>) -> DatabaseResult<DemoSummary> {
    let path = path.as_ref();
    let mut conn = Connection::open(path)
        .map_err(|e| DatabaseError::connection(format!("{}: {e}", path.display())))?;

    let summary = populate(&mut conn, &mut fastrand::Rng::new())?;
    info!(
        path = %path.display(),
        customers = summary.customers,
        orders = summary.orders,
        sales = summary.sales,
        "demo_database_created"
    );
    Ok(summary)
}

/// Create the sample tables on an open connection using `rng` for the
/// random parts.
///
/// # Errors
///
/// Returns [`DatabaseError`] if any statement fails.
pub fn populate(conn: &mut Connection, rng: &mut fastrand::Rng) -> DatabaseResult<DemoSummary> {
    let today = Utc::now().date_naive();
    let tx = conn.transaction()?;
    tx.execute_batch(SCHEMA)?;

    let mut summary = DemoSummary::default();

    {
        let mut insert = tx.prepare("INSERT INTO customers VALUES (?1, ?2, ?3, ?4, ?5)")?;
        for id in 1..=CUSTOMERS {
            insert.execute(params![
                id,
                format!("Customer {id}"),
                format!("customer{id}@example.com"),
                REGIONS[rng.usize(..REGIONS.len())],
                days_ago(today, rng.u64(30..=730)),
            ])?;
            summary.customers += 1;
        }

        let mut insert = tx.prepare("INSERT INTO products VALUES (?1, ?2, ?3, ?4, ?5)")?;
        for (id, name, category, price, stock) in PRODUCTS {
            insert.execute(params![id, name, category, price, stock])?;
            summary.products += 1;
        }

        let mut insert_order = tx.prepare("INSERT INTO orders VALUES (?1, ?2, ?3, ?4, ?5)")?;
        let mut insert_sale =
            tx.prepare("INSERT INTO sales VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)")?;
        let mut order_id: i64 = 1;
        let mut sale_id: i64 = 1;

        for customer_id in 1..=CUSTOMERS {
            for _ in 0..rng.u32(0..=5) {
                let order_date = days_ago(today, rng.u64(1..=365));
                let status = STATUSES[rng.usize(..STATUSES.len())];
                let mut order_total = 0.0;

                for _ in 0..rng.u32(1..=4) {
                    let (product_id, _, _, unit_price, _) = PRODUCTS[rng.usize(..PRODUCTS.len())];
                    let quantity = rng.i64(1..=3);
                    let total_price = round_cents(unit_price * quantity as f64);
                    order_total += total_price;

                    insert_sale.execute(params![
                        sale_id,
                        order_id,
                        product_id,
                        quantity,
                        unit_price,
                        total_price,
                        order_date,
                    ])?;
                    sale_id += 1;
                    summary.sales += 1;
                }

                insert_order.execute(params![
                    order_id,
                    customer_id,
                    order_date,
                    round_cents(order_total),
                    status,
                ])?;
                order_id += 1;
                summary.orders += 1;
            }
        }
    }

    tx.commit()?;
    Ok(summary)
}

fn days_ago(today: NaiveDate, days: u64) -> String {
    today
        .checked_sub_days(Days::new(days))
        .unwrap_or(today)
        .to_string()
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
