//! Warehouse access layer
//!
//! The pipeline treats the warehouse as an external collaborator behind the
//! [`Warehouse`] trait: deal rows and the next-best-action row set come in,
//! the two output tables (forecast predictions, feature importances) go out.
//! Output tables are replaced wholesale per run inside one transaction, so a
//! failed run never leaves a half-written table. No implicit retry - errors
//! propagate to the caller.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use tempfile::TempDir;
use tracing::info;

use crate::error::{Error, Result};
use crate::levers::Lever;
use crate::models::{ActionDeal, DealRecord, FeatureImportance, ForecastPoint};

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// The external query/persistence collaborator seen by the pipeline
pub trait Warehouse: Send + Sync {
    /// Load the full deal row set
    fn load_deals(&self) -> Result<Vec<DealRecord>>;

    /// Load the externally prioritized next-best-action row set
    fn load_actions(&self) -> Result<Vec<ActionDeal>>;

    /// Replace the predictions table wholesale with this run's output
    fn replace_predictions(&self, points: &[ForecastPoint], run_at: DateTime<Utc>) -> Result<()>;

    /// Replace the importance table wholesale with this run's output
    fn replace_importances(
        &self,
        features: &[FeatureImportance],
        run_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Read back the persisted predictions (most recent run)
    fn latest_predictions(&self) -> Result<Vec<ForecastPoint>>;

    /// Read back the persisted importances (most recent run)
    fn latest_importances(&self) -> Result<Vec<FeatureImportance>>;
}

/// SQLite-backed warehouse with connection pooling
#[derive(Clone)]
pub struct SqliteWarehouse {
    pool: DbPool,
    db_path: String,
    /// Keeps the backing directory of an ephemeral warehouse alive; removed
    /// (database included) once the last clone drops
    _tempdir: Option<Arc<TempDir>>,
}

impl SqliteWarehouse {
    /// Open (or create) a warehouse at the given path
    pub fn open(path: &str) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder().max_size(10).build(manager)?;
        let warehouse = Self {
            pool,
            db_path: path.to_string(),
            _tempdir: None,
        };
        warehouse.init_schema()?;
        Ok(warehouse)
    }

    /// Create a throwaway warehouse backed by a temp directory (for
    /// testing).
    ///
    /// A file is used rather than `:memory:` because pooled connections
    /// would each see their own private in-memory database. The directory
    /// is deleted when the warehouse (and all clones) drop.
    pub fn ephemeral() -> Result<Self> {
        let dir = TempDir::new()?;
        let path = dir.path().join("revcast.db").to_string_lossy().into_owned();
        let mut warehouse = Self::open(&path)?;
        warehouse._tempdir = Some(Arc::new(dir));
        Ok(warehouse)
    }

    pub fn path(&self) -> &str {
        &self.db_path
    }

    fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS deals (
                deal_id TEXT PRIMARY KEY,
                company_name TEXT NOT NULL,
                mrr REAL NOT NULL,
                stage TEXT NOT NULL,
                close_date TEXT,
                created_date TEXT NOT NULL,
                region TEXT NOT NULL,
                is_at_risk INTEGER NOT NULL,
                days_in_pipeline INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS action_deals (
                company_name TEXT NOT NULL,
                mrr REAL NOT NULL,
                action_type TEXT NOT NULL,
                priority INTEGER NOT NULL,
                velocity_days INTEGER,
                region TEXT
            );

            CREATE TABLE IF NOT EXISTS forecast_predictions (
                week_offset INTEGER NOT NULL,
                forecast_week TEXT NOT NULL,
                predicted_mrr REAL NOT NULL,
                baseline_mrr REAL NOT NULL,
                weekly_trend REAL NOT NULL,
                change_pct REAL NOT NULL,
                run_date TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS forecast_feature_importance (
                feature TEXT NOT NULL,
                lever TEXT NOT NULL,
                importance REAL NOT NULL,
                importance_pct REAL NOT NULL,
                rank INTEGER NOT NULL,
                run_date TEXT NOT NULL
            );
            "#,
        )?;
        info!(path = %self.db_path, "warehouse schema ready");
        Ok(())
    }

    /// Insert or replace deal rows (used by the import command)
    pub fn upsert_deals(&self, deals: &[DealRecord]) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO deals
                 (deal_id, company_name, mrr, stage, close_date, created_date, region, is_at_risk, days_in_pipeline)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for deal in deals {
                stmt.execute(params![
                    deal.deal_id,
                    deal.company_name,
                    deal.mrr,
                    deal.stage.as_str(),
                    deal.close_date.map(|d| d.format("%Y-%m-%d").to_string()),
                    deal.created_date.format("%Y-%m-%d").to_string(),
                    deal.region,
                    deal.is_at_risk as i64,
                    deal.days_in_pipeline as i64,
                ])?;
            }
        }
        tx.commit()?;
        Ok(deals.len())
    }

    /// Replace the next-best-action rows (used by the import command)
    pub fn replace_actions(&self, actions: &[ActionDeal]) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        {
            tx.execute("DELETE FROM action_deals", [])?;
            let mut stmt = tx.prepare(
                "INSERT INTO action_deals
                 (company_name, mrr, action_type, priority, velocity_days, region)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for action in actions {
                stmt.execute(params![
                    action.company_name,
                    action.mrr,
                    action.action.as_str(),
                    action.priority,
                    action.velocity_days.map(|d| d as i64),
                    action.region,
                ])?;
            }
        }
        tx.commit()?;
        Ok(actions.len())
    }
}

fn parse_date(s: &str, field: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| Error::InvalidData(format!("invalid {} in warehouse: {}", field, s)))
}

impl Warehouse for SqliteWarehouse {
    fn load_deals(&self) -> Result<Vec<DealRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT deal_id, company_name, mrr, stage, close_date, created_date, region, is_at_risk, days_in_pipeline
             FROM deals ORDER BY created_date, deal_id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, i64>(7)?,
                row.get::<_, i64>(8)?,
            ))
        })?;

        let mut deals = Vec::new();
        for row in rows {
            let (deal_id, company_name, mrr, stage, close_date, created_date, region, at_risk, days) =
                row?;
            deals.push(DealRecord {
                stage: stage
                    .parse()
                    .map_err(|e: String| Error::SchemaMismatch(e))?,
                close_date: close_date
                    .map(|d| parse_date(&d, "close_date"))
                    .transpose()?,
                created_date: parse_date(&created_date, "created_date")?,
                deal_id,
                company_name,
                mrr,
                region,
                is_at_risk: at_risk != 0,
                days_in_pipeline: days as u32,
            });
        }
        Ok(deals)
    }

    fn load_actions(&self) -> Result<Vec<ActionDeal>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT company_name, mrr, action_type, priority, velocity_days, region
             FROM action_deals ORDER BY priority",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, f64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, Option<i64>>(4)?,
                row.get::<_, Option<String>>(5)?,
            ))
        })?;

        let mut actions = Vec::new();
        for row in rows {
            let (company_name, mrr, action_type, priority, velocity_days, region) = row?;
            actions.push(ActionDeal {
                action: action_type
                    .parse()
                    .map_err(|e: String| Error::SchemaMismatch(e))?,
                company_name,
                mrr,
                priority,
                velocity_days: velocity_days.map(|d| d as u32),
                region,
            });
        }
        Ok(actions)
    }

    fn replace_predictions(&self, points: &[ForecastPoint], run_at: DateTime<Utc>) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        {
            tx.execute("DELETE FROM forecast_predictions", [])?;
            let mut stmt = tx.prepare(
                "INSERT INTO forecast_predictions
                 (week_offset, forecast_week, predicted_mrr, baseline_mrr, weekly_trend, change_pct, run_date)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for point in points {
                stmt.execute(params![
                    point.week_offset as i64,
                    point.forecast_week.format("%Y-%m-%d").to_string(),
                    point.predicted_mrr,
                    point.baseline_mrr,
                    point.weekly_trend,
                    point.change_pct,
                    run_at.to_rfc3339(),
                ])?;
            }
        }
        tx.commit()?;
        info!(points = points.len(), "persisted forecast predictions");
        Ok(())
    }

    fn replace_importances(
        &self,
        features: &[FeatureImportance],
        run_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        {
            tx.execute("DELETE FROM forecast_feature_importance", [])?;
            let mut stmt = tx.prepare(
                "INSERT INTO forecast_feature_importance
                 (feature, lever, importance, importance_pct, rank, run_date)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for feature in features {
                stmt.execute(params![
                    feature.feature,
                    feature.lever.as_str(),
                    feature.weight,
                    (feature.weight * 1000.0).round() / 10.0,
                    feature.rank as i64,
                    run_at.to_rfc3339(),
                ])?;
            }
        }
        tx.commit()?;
        info!(features = features.len(), "persisted feature importances");
        Ok(())
    }

    fn latest_predictions(&self) -> Result<Vec<ForecastPoint>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT week_offset, forecast_week, predicted_mrr, baseline_mrr, weekly_trend, change_pct
             FROM forecast_predictions ORDER BY week_offset",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, f64>(4)?,
                row.get::<_, f64>(5)?,
            ))
        })?;

        let mut points = Vec::new();
        for row in rows {
            let (week_offset, forecast_week, predicted_mrr, baseline_mrr, weekly_trend, change_pct) =
                row?;
            points.push(ForecastPoint {
                week_offset: week_offset as usize,
                forecast_week: parse_date(&forecast_week, "forecast_week")?,
                predicted_mrr,
                baseline_mrr,
                weekly_trend,
                change_pct,
            });
        }
        Ok(points)
    }

    fn latest_importances(&self) -> Result<Vec<FeatureImportance>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT feature, lever, importance, rank
             FROM forecast_feature_importance ORDER BY rank",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?;

        let mut features = Vec::new();
        for row in rows {
            let (feature, lever, weight, rank) = row?;
            features.push(FeatureImportance {
                lever: lever
                    .parse::<Lever>()
                    .map_err(Error::InvalidData)?,
                feature,
                weight,
                rank: rank as usize,
            });
        }
        Ok(features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActionType, DealStage};

    fn sample_deal(id: &str) -> DealRecord {
        DealRecord {
            deal_id: id.to_string(),
            company_name: "Acme".into(),
            mrr: 2_500.0,
            stage: DealStage::Negotiation,
            close_date: None,
            created_date: NaiveDate::from_ymd_opt(2026, 2, 3).unwrap(),
            region: "EMEA".into(),
            is_at_risk: true,
            days_in_pipeline: 33,
        }
    }

    #[test]
    fn test_ephemeral_removes_database_on_drop() {
        let warehouse = SqliteWarehouse::ephemeral().unwrap();
        let path = std::path::PathBuf::from(warehouse.path());
        assert!(path.exists());

        let clone = warehouse.clone();
        drop(warehouse);
        // a live clone keeps the backing directory around
        assert!(path.exists());

        drop(clone);
        assert!(!path.exists());
    }

    #[test]
    fn test_deal_roundtrip() {
        let warehouse = SqliteWarehouse::ephemeral().unwrap();
        warehouse
            .upsert_deals(&[sample_deal("d1"), sample_deal("d2")])
            .unwrap();

        let deals = warehouse.load_deals().unwrap();
        assert_eq!(deals.len(), 2);
        assert_eq!(deals[0].stage, DealStage::Negotiation);
        assert!(deals[0].is_at_risk);
        assert_eq!(deals[0].close_date, None);
    }

    #[test]
    fn test_upsert_replaces_same_deal_id() {
        let warehouse = SqliteWarehouse::ephemeral().unwrap();
        warehouse.upsert_deals(&[sample_deal("d1")]).unwrap();
        let mut updated = sample_deal("d1");
        updated.mrr = 9_999.0;
        warehouse.upsert_deals(&[updated]).unwrap();

        let deals = warehouse.load_deals().unwrap();
        assert_eq!(deals.len(), 1);
        assert_eq!(deals[0].mrr, 9_999.0);
    }

    #[test]
    fn test_predictions_replaced_wholesale() {
        let warehouse = SqliteWarehouse::ephemeral().unwrap();
        let run_at = Utc::now();
        let point = |offset: usize, mrr: f64| ForecastPoint {
            week_offset: offset,
            forecast_week: NaiveDate::from_ymd_opt(2026, 3, 30).unwrap(),
            predicted_mrr: mrr,
            baseline_mrr: 100.0,
            weekly_trend: 5.0,
            change_pct: 5.0,
        };

        warehouse
            .replace_predictions(&[point(1, 105.0), point(2, 110.0)], run_at)
            .unwrap();
        warehouse.replace_predictions(&[point(1, 200.0)], run_at).unwrap();

        let persisted = warehouse.latest_predictions().unwrap();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].predicted_mrr, 200.0);
    }

    #[test]
    fn test_importances_roundtrip() {
        let warehouse = SqliteWarehouse::ephemeral().unwrap();
        let features = vec![
            FeatureImportance {
                feature: "win_rate_pct".into(),
                weight: 0.6,
                lever: Lever::DealClose,
                rank: 1,
            },
            FeatureImportance {
                feature: "mrr_lag1".into(),
                weight: 0.4,
                lever: Lever::Trend,
                rank: 2,
            },
        ];
        warehouse.replace_importances(&features, Utc::now()).unwrap();

        let persisted = warehouse.latest_importances().unwrap();
        assert_eq!(persisted.len(), 2);
        assert_eq!(persisted[0].lever, Lever::DealClose);
        assert_eq!(persisted[0].rank, 1);
        assert!((persisted[1].weight - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_actions_roundtrip_in_priority_order() {
        let warehouse = SqliteWarehouse::ephemeral().unwrap();
        let actions = vec![
            ActionDeal {
                company_name: "Globex".into(),
                mrr: 8_000.0,
                action: ActionType::Win,
                priority: 2,
                velocity_days: Some(12),
                region: Some("AMER".into()),
            },
            ActionDeal {
                company_name: "Acme".into(),
                mrr: 3_000.0,
                action: ActionType::Save,
                priority: 1,
                velocity_days: None,
                region: None,
            },
        ];
        warehouse.replace_actions(&actions).unwrap();

        let loaded = warehouse.load_actions().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].company_name, "Acme");
        assert_eq!(loaded[0].action, ActionType::Save);
        assert_eq!(loaded[1].velocity_days, Some(12));
    }
}
