//! Persistence of company aggregates
//!
//! All writes of a run happen inside one shared transaction owned by the
//! sink. Each aggregate is wrapped in a savepoint: in Postgres a failed
//! statement poisons the enclosing transaction, so the savepoint is what
//! lets a duplicate key skip one aggregate while the run keeps going.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;

use crate::error::{IngestError, Result};
use crate::models::Company;

/// Destination for mapped aggregates.
///
/// The pipeline serializes all calls through a single writer task, so
/// implementations never see concurrent `persist` calls.
#[async_trait]
pub trait AggregateSink {
    /// Persist one aggregate and everything it owns as a unit.
    ///
    /// An error means this aggregate was not (fully) written; it must leave
    /// the sink usable for the next one.
    async fn persist(&mut self, company: &Company) -> Result<()>;
}

/// Postgres sink holding the run-wide transaction.
///
/// Dropping the sink without calling [`commit`](Self::commit) rolls the
/// whole run back.
pub struct PgCompanySink {
    tx: Transaction<'static, Postgres>,
}

impl PgCompanySink {
    /// Open the shared transaction for a run.
    pub async fn begin(pool: &PgPool) -> Result<Self> {
        let tx = pool.begin().await?;
        Ok(Self { tx })
    }

    /// Commit everything persisted during the run.
    pub async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    /// Discard everything persisted during the run.
    pub async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }

    /// Insert the aggregate's rows. Pure insertion: a re-loaded company
    /// surfaces as a unique violation, never an update.
    async fn insert_aggregate(&mut self, company: &Company) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO company (
                company_number, company_name, category, status,
                country_of_origin, dissolution_date, incorporation_date, uri
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(&company.company_number)
        .bind(&company.company_name)
        .bind(&company.category)
        .bind(&company.status)
        .bind(&company.country_of_origin)
        .bind(company.dissolution_date)
        .bind(company.incorporation_date)
        .bind(&company.uri)
        .execute(&mut *self.tx)
        .await?;

        let address = &company.registered_address;
        sqlx::query(
            r#"
            INSERT INTO registered_address (
                company_number, care_of, po_box, address_line_1,
                address_line_2, post_town, county, country, postcode
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(&company.company_number)
        .bind(&address.care_of)
        .bind(&address.po_box)
        .bind(&address.address_line_1)
        .bind(&address.address_line_2)
        .bind(&address.post_town)
        .bind(&address.county)
        .bind(&address.country)
        .bind(&address.postcode)
        .execute(&mut *self.tx)
        .await?;

        let sic = &company.sic_codes;
        sqlx::query(
            r#"
            INSERT INTO sic_code (
                company_number, sic_text_1, sic_text_2, sic_text_3, sic_text_4
            )
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&company.company_number)
        .bind(&sic.sic_text_1)
        .bind(&sic.sic_text_2)
        .bind(&sic.sic_text_3)
        .bind(&sic.sic_text_4)
        .execute(&mut *self.tx)
        .await?;

        for previous in &company.previous_names {
            sqlx::query(
                r#"
                INSERT INTO previous_name (company_number, effective_date, company_name)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(&company.company_number)
            .bind(previous.effective_date)
            .bind(&previous.name)
            .execute(&mut *self.tx)
            .await?;
        }

        Ok(())
    }
}

#[async_trait]
impl AggregateSink for PgCompanySink {
    async fn persist(&mut self, company: &Company) -> Result<()> {
        sqlx::query("SAVEPOINT company_row")
            .execute(&mut *self.tx)
            .await?;

        match self.insert_aggregate(company).await {
            Ok(()) => {
                sqlx::query("RELEASE SAVEPOINT company_row")
                    .execute(&mut *self.tx)
                    .await?;
                debug!(company_number = %company.company_number, "aggregate persisted");
                Ok(())
            },
            Err(err) => {
                // Restore the transaction to its pre-aggregate state so the
                // next row can proceed.
                sqlx::query("ROLLBACK TO SAVEPOINT company_row")
                    .execute(&mut *self.tx)
                    .await?;
                Err(IngestError::Persistence {
                    company_number: company.company_number.clone(),
                    reason: err.to_string(),
                })
            },
        }
    }
}
