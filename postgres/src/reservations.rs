//! Reservation aggregates and their lines.

use crate::{PostgresStore, count, database, decode};
use chrono::{DateTime, Utc};
use sqlx::Row;
use std::collections::HashMap;
use std::str::FromStr;
use sqlx::PgConnection;
use stockroom_core::store::{DetailStore, ReservationStore, ReservationWrite, StoreFuture};
use stockroom_core::{
    CustomerId, DetailId, Money, Page, ProductId, Reservation, ReservationDetail,
    ReservationFilter, ReservationId, ReservationStatus, StoreError,
};
use uuid::Uuid;

fn row_to_detail(row: &sqlx::postgres::PgRow) -> Result<ReservationDetail, StoreError> {
    let id: Uuid = row.try_get("id").map_err(decode)?;
    let reservation: Uuid = row.try_get("reservation_id").map_err(decode)?;
    let product: Uuid = row.try_get("product_id").map_err(decode)?;
    let subtotal: i64 = row.try_get("subtotal_cents").map_err(decode)?;
    Ok(ReservationDetail {
        id: DetailId::from_uuid(id),
        reservation: ReservationId::from_uuid(reservation),
        product: ProductId::from_uuid(product),
        quantity: count(row, "quantity")?,
        subtotal: Money::from_cents(subtotal),
    })
}

fn row_to_reservation(row: &sqlx::postgres::PgRow) -> Result<Reservation, StoreError> {
    let id: Uuid = row.try_get("id").map_err(decode)?;
    let customer: Uuid = row.try_get("customer_id").map_err(decode)?;
    let status: String = row.try_get("status").map_err(decode)?;
    let status = ReservationStatus::from_str(&status)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    let total: i64 = row.try_get("total_cents").map_err(decode)?;
    let details: Vec<Uuid> = row.try_get("detail_ids").map_err(decode)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(decode)?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at").map_err(decode)?;
    let version: i64 = row.try_get("version").map_err(decode)?;
    let version = u64::try_from(version)
        .map_err(|_| StoreError::Serialization(format!("version out of range: {version}")))?;
    Ok(Reservation {
        id: ReservationId::from_uuid(id),
        customer: CustomerId::from_uuid(customer),
        status,
        total: Money::from_cents(total),
        details: details.into_iter().map(DetailId::from_uuid).collect(),
        created_at,
        updated_at,
        version,
    })
}

fn detail_ids(reservation: &Reservation) -> Vec<Uuid> {
    reservation.details.iter().map(|id| *id.as_uuid()).collect()
}

fn version_param(version: u64) -> Result<i64, StoreError> {
    i64::try_from(version)
        .map_err(|_| StoreError::Serialization(format!("version out of range: {version}")))
}

async fn insert_details(
    conn: &mut PgConnection,
    details: &[ReservationDetail],
) -> Result<(), StoreError> {
    for detail in details {
        sqlx::query(
            r"
            INSERT INTO reservation_details
                (id, reservation_id, product_id, quantity, subtotal_cents)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(detail.id.as_uuid())
        .bind(detail.reservation.as_uuid())
        .bind(detail.product.as_uuid())
        .bind(i64::from(detail.quantity))
        .bind(detail.subtotal.cents())
        .execute(&mut *conn)
        .await
        .map_err(database)?;
    }
    Ok(())
}

async fn update_detail(
    conn: &mut PgConnection,
    detail: &ReservationDetail,
) -> Result<(), StoreError> {
    let result = sqlx::query(
        r"
        UPDATE reservation_details
        SET product_id = $2, quantity = $3, subtotal_cents = $4
        WHERE id = $1
        ",
    )
    .bind(detail.id.as_uuid())
    .bind(detail.product.as_uuid())
    .bind(i64::from(detail.quantity))
    .bind(detail.subtotal.cents())
    .execute(conn)
    .await
    .map_err(database)?;

    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound(format!("reservation detail {}", detail.id)));
    }
    Ok(())
}

async fn delete_details(conn: &mut PgConnection, ids: &[Uuid]) -> Result<(), StoreError> {
    if ids.is_empty() {
        return Ok(());
    }
    sqlx::query("DELETE FROM reservation_details WHERE id = ANY($1)")
        .bind(ids)
        .execute(conn)
        .await
        .map_err(database)?;
    Ok(())
}

impl DetailStore for PostgresStore {
    fn insert_many(&self, details: Vec<ReservationDetail>) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let mut tx = self.pool().begin().await.map_err(database)?;
            insert_details(&mut tx, &details).await?;
            tx.commit().await.map_err(database)?;
            Ok(())
        })
    }

    fn get_many(&self, ids: Vec<DetailId>) -> StoreFuture<'_, Vec<ReservationDetail>> {
        Box::pin(async move {
            let wanted: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
            let rows = sqlx::query(
                r"
                SELECT id, reservation_id, product_id, quantity, subtotal_cents
                FROM reservation_details
                WHERE id = ANY($1)
                ",
            )
            .bind(&wanted)
            .fetch_all(self.pool())
            .await
            .map_err(database)?;

            let mut found = rows
                .iter()
                .map(|row| row_to_detail(row).map(|d| (d.id, d)))
                .collect::<Result<HashMap<_, _>, _>>()?;
            Ok(ids.iter().filter_map(|id| found.remove(id)).collect())
        })
    }

    fn update(&self, detail: ReservationDetail) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let mut conn = self.pool().acquire().await.map_err(database)?;
            update_detail(&mut conn, &detail).await
        })
    }

    fn delete_many(&self, ids: Vec<DetailId>) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let ids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
            let mut conn = self.pool().acquire().await.map_err(database)?;
            delete_details(&mut conn, &ids).await
        })
    }
}

const RESERVATION_COLUMNS: &str =
    "id, customer_id, status, total_cents, detail_ids, created_at, updated_at, version";

impl ReservationStore for PostgresStore {
    fn insert(&self, reservation: Reservation) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query(
                r"
                INSERT INTO reservations
                    (id, customer_id, status, total_cents, detail_ids, created_at, updated_at, version)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ",
            )
            .bind(reservation.id.as_uuid())
            .bind(reservation.customer.as_uuid())
            .bind(reservation.status.as_str())
            .bind(reservation.total.cents())
            .bind(detail_ids(&reservation))
            .bind(reservation.created_at)
            .bind(reservation.updated_at)
            .bind(version_param(reservation.version)?)
            .execute(self.pool())
            .await
            .map_err(database)?;
            Ok(())
        })
    }

    fn get(&self, id: ReservationId) -> StoreFuture<'_, Option<Reservation>> {
        Box::pin(async move {
            let sql = format!("SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = $1");
            let row = sqlx::query(&sql)
                .bind(id.as_uuid())
                .fetch_optional(self.pool())
                .await
                .map_err(database)?;
            row.as_ref().map(row_to_reservation).transpose()
        })
    }

    fn save(&self, write: ReservationWrite) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let reservation = &write.reservation;
            let mut tx = self.pool().begin().await.map_err(database)?;

            let claimed = sqlx::query(
                r"
                UPDATE reservations
                SET customer_id = $2, status = $3, total_cents = $4,
                    detail_ids = $5, updated_at = $6, version = $7
                WHERE id = $1 AND version = $8
                ",
            )
            .bind(reservation.id.as_uuid())
            .bind(reservation.customer.as_uuid())
            .bind(reservation.status.as_str())
            .bind(reservation.total.cents())
            .bind(detail_ids(reservation))
            .bind(reservation.updated_at)
            .bind(version_param(reservation.version)?)
            .bind(version_param(write.expected_version)?)
            .execute(&mut *tx)
            .await
            .map_err(database)?;
            if claimed.rows_affected() != 1 {
                // Dropping the transaction rolls it back.
                return Ok(false);
            }

            let deleted: Vec<Uuid> = write.delete.iter().map(|id| *id.as_uuid()).collect();
            delete_details(&mut tx, &deleted).await?;
            for detail in &write.update {
                update_detail(&mut tx, detail).await?;
            }
            insert_details(&mut tx, &write.insert).await?;

            tx.commit().await.map_err(database)?;
            Ok(true)
        })
    }

    fn delete(&self, id: ReservationId, expected_version: u64) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let mut tx = self.pool().begin().await.map_err(database)?;
            let row = sqlx::query(
                "DELETE FROM reservations WHERE id = $1 AND version = $2 RETURNING detail_ids",
            )
            .bind(id.as_uuid())
            .bind(version_param(expected_version)?)
            .fetch_optional(&mut *tx)
            .await
            .map_err(database)?;
            let Some(row) = row else {
                return Ok(false);
            };

            let details: Vec<Uuid> = row.try_get("detail_ids").map_err(decode)?;
            delete_details(&mut tx, &details).await?;
            tx.commit().await.map_err(database)?;
            Ok(true)
        })
    }

    fn list(
        &self,
        filter: ReservationFilter,
        page: Option<Page>,
    ) -> StoreFuture<'_, Vec<Reservation>> {
        Box::pin(async move {
            // LIMIT NULL means no limit.
            let limit = page.map(|p| i64::from(p.limit()));
            let offset = page.map_or(0, |p| i64::try_from(p.offset()).unwrap_or(i64::MAX));
            let sql = format!(
                r"
                SELECT {RESERVATION_COLUMNS} FROM reservations
                WHERE ($1::uuid IS NULL OR customer_id = $1)
                  AND ($2::text IS NULL OR status = $2)
                ORDER BY created_at DESC, seq DESC
                LIMIT $3 OFFSET $4
                "
            );
            let rows = sqlx::query(&sql)
                .bind(filter.customer.map(|c| *c.as_uuid()))
                .bind(filter.status.map(|s| s.as_str()))
                .bind(limit)
                .bind(offset)
                .fetch_all(self.pool())
                .await
                .map_err(database)?;
            rows.iter().map(row_to_reservation).collect()
        })
    }
}
