use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

use crate::db::{DbError, FireRow, InseeMetricRow, KeyCountRow, TotalsRow};
use crate::fires::{Alerte, FireRecord, FireStats, InseeMetric, MetricFilters};
use crate::utils::round2;

/// Read access to the `fires` table
///
/// Expected columns: `id bigint`, `annee int`, `numero bigint`,
/// `departement text`, `insee text`, `commune text`,
/// `date_alerte timestamptz`, `surface_ha double precision`.
#[derive(Clone)]
pub struct FireRepository {
    pool: PgPool,
}

impl FireRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn push_allow_list(query: &mut QueryBuilder<'_, Postgres>, allowed: &[String]) {
        if !allowed.is_empty() {
            query
                .push(" AND departement = ANY(")
                .push_bind(allowed.to_vec())
                .push(")");
        }
    }

    /// Most recent fires first, capped at `limit`
    #[instrument(skip(self, allowed), fields(allowed = allowed.len()))]
    pub async fn find_recent(
        &self,
        allowed: &[String],
        limit: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<FireRecord>, DbError> {
        let mut query = QueryBuilder::<Postgres>::new(format!(
            r#"
            SELECT COALESCE(numero, id)::bigint AS id,
                   COALESCE(commune, '-') AS commune,
                   surface_ha,
                   {} AS alerte,
                   'Inconnue' AS cause,
                   date_alerte,
                   departement,
                   insee
            FROM fires
            WHERE TRUE"#,
            Alerte::sql_case("surface_ha")
        ));
        Self::push_allow_list(&mut query, allowed);
        query
            .push(" ORDER BY date_alerte DESC NULLS LAST, id DESC LIMIT ")
            .push_bind(limit);

        let rows = query
            .build_query_as::<FireRow>()
            .fetch_all(&self.pool)
            .await?;

        debug!("Found {} fires", rows.len());
        Ok(rows.into_iter().map(|row| row.into_record(now)).collect())
    }

    /// Per-INSEE counts and areas with the same filters as the CSV path
    #[instrument(skip(self, allowed))]
    pub async fn metrics_by_insee(
        &self,
        allowed: &[String],
        filters: &MetricFilters,
    ) -> Result<BTreeMap<String, InseeMetric>, DbError> {
        let mut query = QueryBuilder::<Postgres>::new(
            r#"
            SELECT insee,
                   COUNT(*)::bigint AS fires,
                   COALESCE(SUM(COALESCE(surface_ha, 0)), 0)::double precision AS surface_ha
            FROM fires
            WHERE insee IS NOT NULL AND insee <> ''"#,
        );
        Self::push_allow_list(&mut query, allowed);

        if let Some(departement) = filters.departement() {
            query
                .push(" AND departement = ")
                .push_bind(departement.to_string());
        }
        if let Some(alerte) = filters.alerte() {
            query
                .push(format!(" AND ({}) = ", Alerte::sql_case("surface_ha")))
                .push_bind(alerte.to_string());
        }
        if let Some(year) = filters.year() {
            query
                .push(
                    " AND COALESCE(EXTRACT(YEAR FROM date_alerte AT TIME ZONE 'UTC')::int, annee)::text = ",
                )
                .push_bind(year.to_string());
        }
        if let Some(min_surface) = filters.min_surface() {
            query
                .push(" AND COALESCE(surface_ha, 0) >= ")
                .push_bind(min_surface);
        }
        query.push(" GROUP BY insee");

        let rows = query
            .build_query_as::<InseeMetricRow>()
            .fetch_all(&self.pool)
            .await?;

        debug!("Aggregated {} communes", rows.len());
        Ok(rows
            .into_iter()
            .map(|row| {
                (
                    row.insee,
                    InseeMetric {
                        fires: row.fires.max(0) as u64,
                        surface_ha: round2(row.surface_ha),
                    },
                )
            })
            .collect())
    }

    #[instrument(skip(self, allowed))]
    pub async fn stats(
        &self,
        allowed: &[String],
        now: DateTime<Utc>,
    ) -> Result<FireStats, DbError> {
        let mut totals_query = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*)::bigint AS n, \
             COALESCE(SUM(COALESCE(surface_ha, 0)), 0)::double precision AS s \
             FROM fires WHERE TRUE",
        );
        Self::push_allow_list(&mut totals_query, allowed);
        let totals = totals_query
            .build_query_as::<TotalsRow>()
            .fetch_one(&self.pool)
            .await?;

        let by_alerte = self
            .count_by(&Alerte::sql_case("surface_ha"), allowed)
            .await?;
        let by_commune = self.count_by("COALESCE(commune, '?')", allowed).await?;

        Ok(FireStats {
            count: totals.n.max(0) as u64,
            total_surface_ha: round2(totals.s),
            by_alerte,
            by_commune,
            generated_at: now,
            source: "postgres".to_string(),
        })
    }

    async fn count_by(
        &self,
        key_expr: &str,
        allowed: &[String],
    ) -> Result<BTreeMap<String, u64>, DbError> {
        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} AS key, COUNT(*)::bigint AS n FROM fires WHERE TRUE",
            key_expr
        ));
        Self::push_allow_list(&mut query, allowed);
        query.push(" GROUP BY 1");

        let rows = query
            .build_query_as::<KeyCountRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| (row.key, row.n.max(0) as u64))
            .collect())
    }
}
