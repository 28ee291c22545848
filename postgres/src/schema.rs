//! Table definitions applied by [`PostgresStore::migrate`](crate::PostgresStore::migrate).
//!
//! Counters are `BIGINT` so `u32` values never overflow on the SQL side.
//! The `CHECK` constraints back up the ledger's conditional updates: no write
//! can leave `reserved` above `quantity` or either counter negative.
//!
//! A product goes with its stock record, and the ledger only deletes a stock
//! record that has nothing reserved.

/// Statements run in order; each is idempotent.
pub const STATEMENTS: &[&str] = &[
    r"
    CREATE TABLE IF NOT EXISTS stocks (
        id UUID PRIMARY KEY,
        quantity BIGINT NOT NULL CHECK (quantity >= 0),
        reserved BIGINT NOT NULL DEFAULT 0 CHECK (reserved >= 0),
        CONSTRAINT reserved_within_quantity CHECK (reserved <= quantity)
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS products (
        id UUID PRIMARY KEY,
        code TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        price_cents BIGINT NOT NULL CHECK (price_cents >= 0),
        stock_id UUID NOT NULL REFERENCES stocks (id) ON DELETE CASCADE
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS customers (
        id UUID PRIMARY KEY,
        name TEXT NOT NULL
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS reservations (
        id UUID PRIMARY KEY,
        customer_id UUID NOT NULL,
        status TEXT NOT NULL CHECK (status IN ('PENDING', 'CONFIRMED', 'CANCELLED')),
        total_cents BIGINT NOT NULL,
        detail_ids UUID[] NOT NULL,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL,
        seq BIGSERIAL NOT NULL
    )
    ",
    "ALTER TABLE products DROP CONSTRAINT IF EXISTS products_stock_id_fkey",
    r"
    ALTER TABLE products ADD CONSTRAINT products_stock_id_fkey
        FOREIGN KEY (stock_id) REFERENCES stocks (id) ON DELETE CASCADE
    ",
    "ALTER TABLE reservations ADD COLUMN IF NOT EXISTS version BIGINT NOT NULL DEFAULT 1",
    "CREATE INDEX IF NOT EXISTS idx_reservations_customer ON reservations (customer_id)",
    "CREATE INDEX IF NOT EXISTS idx_reservations_created ON reservations (created_at DESC, seq DESC)",
    r"
    CREATE TABLE IF NOT EXISTS reservation_details (
        id UUID PRIMARY KEY,
        reservation_id UUID NOT NULL,
        product_id UUID NOT NULL,
        quantity BIGINT NOT NULL CHECK (quantity >= 1),
        subtotal_cents BIGINT NOT NULL CHECK (subtotal_cents >= 0)
    )
    ",
    "CREATE INDEX IF NOT EXISTS idx_details_reservation ON reservation_details (reservation_id)",
];
