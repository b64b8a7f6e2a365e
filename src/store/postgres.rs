use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    postgres::{PgPoolOptions, PgRow},
    PgPool, Postgres, Row, Transaction,
};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::{StampStore, StoreTransaction};
use crate::card::models::StampCard;
use crate::child::models::ChildModel;
use crate::family::FamilyId;
use crate::goal::models::GoalModel;
use crate::reward::{Rarity, RewardItem};
use crate::shared::AppError;
use crate::stamp::models::StampModel;

const UNIQUE_VIOLATION: &str = "23505";

const CHILD_COLUMNS: &str = "id, family_id, name, target_stamps, created_at";
const CARD_COLUMNS: &str =
    "id, child_id, card_number, target_stamps, is_completed, completed_at, created_at";
const STAMP_COLUMNS: &str =
    "id, child_id, stamp_card_id, reward_item_id, stamped_at, opened_at, comment";
const GOAL_COLUMNS: &str =
    "id, child_id, title, target_stamps, created_at, completed_at, cancelled_at";

/// PostgreSQL implementation of StampStore
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to connect to database");
                AppError::DatabaseError(e.to_string())
            })?;
        Ok(Self::new(pool))
    }

    /// Applies the embedded schema migrations
    pub async fn migrate(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to run migrations");
                AppError::DatabaseError(e.to_string())
            })
    }
}

#[async_trait]
impl StampStore for PostgresStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, AppError> {
        let tx = self.pool.begin().await.map_err(db_error)?;
        Ok(Box::new(PostgresTransaction { tx }))
    }
}

struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
}

/// Maps unique violations to Conflict, everything else to DatabaseError
fn db_error(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &e {
        if db.code().as_deref() == Some(UNIQUE_VIOLATION) {
            warn!(error = %e, "Unique constraint violated");
            return AppError::Conflict("Concurrent modification, please retry".to_string());
        }
    }
    warn!(error = %e, "Database operation failed");
    AppError::DatabaseError(e.to_string())
}

fn reward_from_row(row: &PgRow) -> Result<RewardItem, AppError> {
    let rarity: String = row.try_get("rarity").map_err(db_error)?;
    Ok(RewardItem {
        id: row.try_get("id").map_err(db_error)?,
        name: row.try_get("name").map_err(db_error)?,
        rarity: Rarity::try_from(rarity.as_str())
            .map_err(|value| AppError::DatabaseError(format!("Unknown rarity: {value}")))?,
    })
}

#[async_trait]
impl StoreTransaction for PostgresTransaction {
    #[instrument(skip(self, child))]
    async fn insert_child(&mut self, child: &ChildModel) -> Result<(), AppError> {
        debug!(child_id = %child.id, "Creating child in database");

        sqlx::query(
            "INSERT INTO children (id, family_id, name, target_stamps, created_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(child.id)
        .bind(child.family_id)
        .bind(&child.name)
        .bind(child.target_stamps)
        .bind(child.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_child(
        &mut self,
        family: FamilyId,
        child_id: Uuid,
    ) -> Result<Option<ChildModel>, AppError> {
        sqlx::query_as::<_, ChildModel>(&format!(
            "SELECT {CHILD_COLUMNS} FROM children WHERE id = $1 AND family_id = $2"
        ))
        .bind(child_id)
        .bind(family.0)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error)
    }

    #[instrument(skip(self))]
    async fn lock_child(
        &mut self,
        family: FamilyId,
        child_id: Uuid,
    ) -> Result<Option<ChildModel>, AppError> {
        debug!(child_id = %child_id, "Locking child row");

        sqlx::query_as::<_, ChildModel>(&format!(
            "SELECT {CHILD_COLUMNS} FROM children WHERE id = $1 AND family_id = $2 FOR UPDATE"
        ))
        .bind(child_id)
        .bind(family.0)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error)
    }

    async fn list_children(&mut self, family: FamilyId) -> Result<Vec<ChildModel>, AppError> {
        sqlx::query_as::<_, ChildModel>(&format!(
            "SELECT {CHILD_COLUMNS} FROM children WHERE family_id = $1 ORDER BY created_at"
        ))
        .bind(family.0)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(db_error)
    }

    #[instrument(skip(self, child))]
    async fn update_child(&mut self, child: &ChildModel) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE children SET name = $2, target_stamps = $3 WHERE id = $1 AND family_id = $4",
        )
        .bind(child.id)
        .bind(&child.name)
        .bind(child.target_stamps)
        .bind(child.family_id)
        .execute(&mut *self.tx)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            warn!(child_id = %child.id, "Child not found for update");
            return Err(AppError::NotFound("Child not found".to_string()));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_child(&mut self, family: FamilyId, child_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM children WHERE id = $1 AND family_id = $2")
            .bind(child_id)
            .bind(family.0)
            .execute(&mut *self.tx)
            .await
            .map_err(db_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_reward_items(&mut self) -> Result<Vec<RewardItem>, AppError> {
        let rows = sqlx::query("SELECT id, name, rarity FROM reward_items ORDER BY id")
            .fetch_all(&mut *self.tx)
            .await
            .map_err(db_error)?;

        rows.iter().map(reward_from_row).collect()
    }

    async fn get_reward_item(&mut self, reward_id: i32) -> Result<Option<RewardItem>, AppError> {
        let row = sqlx::query("SELECT id, name, rarity FROM reward_items WHERE id = $1")
            .bind(reward_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db_error)?;

        row.as_ref().map(reward_from_row).transpose()
    }

    async fn upsert_reward_item(&mut self, item: &RewardItem) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO reward_items (id, name, rarity) VALUES ($1, $2, $3)
             ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, rarity = EXCLUDED.rarity",
        )
        .bind(item.id)
        .bind(&item.name)
        .bind(item.rarity.as_str())
        .execute(&mut *self.tx)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn find_open_card(&mut self, child_id: Uuid) -> Result<Option<StampCard>, AppError> {
        sqlx::query_as::<_, StampCard>(&format!(
            "SELECT {CARD_COLUMNS} FROM stamp_cards WHERE child_id = $1 AND NOT is_completed"
        ))
        .bind(child_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error)
    }

    async fn last_card_number(&mut self, child_id: Uuid) -> Result<Option<i32>, AppError> {
        sqlx::query_scalar::<_, Option<i32>>(
            "SELECT MAX(card_number) FROM stamp_cards WHERE child_id = $1",
        )
        .bind(child_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(db_error)
    }

    #[instrument(skip(self, card))]
    async fn insert_card(&mut self, card: &StampCard) -> Result<(), AppError> {
        debug!(card_id = %card.id, card_number = card.card_number, "Creating card in database");

        sqlx::query(&format!(
            "INSERT INTO stamp_cards ({CARD_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7)"
        ))
        .bind(card.id)
        .bind(card.child_id)
        .bind(card.card_number)
        .bind(card.target_stamps)
        .bind(card.is_completed)
        .bind(card.completed_at)
        .bind(card.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    #[instrument(skip(self, card))]
    async fn update_card(&mut self, card: &StampCard) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE stamp_cards SET target_stamps = $2, is_completed = $3, completed_at = $4
             WHERE id = $1 AND NOT is_completed",
        )
        .bind(card.id)
        .bind(card.target_stamps)
        .bind(card.is_completed)
        .bind(card.completed_at)
        .execute(&mut *self.tx)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            warn!(card_id = %card.id, "Card missing or already completed");
            return Err(AppError::Conflict(format!(
                "Card #{} is already completed",
                card.card_number
            )));
        }
        Ok(())
    }

    async fn list_cards(&mut self, child_id: Uuid) -> Result<Vec<StampCard>, AppError> {
        sqlx::query_as::<_, StampCard>(&format!(
            "SELECT {CARD_COLUMNS} FROM stamp_cards WHERE child_id = $1 ORDER BY card_number"
        ))
        .bind(child_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(db_error)
    }

    async fn count_card_stamps(&mut self, card_id: Uuid) -> Result<i32, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM stamps WHERE stamp_card_id = $1",
        )
        .bind(card_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(db_error)?;

        i32::try_from(count).map_err(|_| AppError::Internal)
    }

    #[instrument(skip(self, stamp))]
    async fn insert_stamp(&mut self, stamp: &StampModel) -> Result<(), AppError> {
        debug!(stamp_id = %stamp.id, child_id = %stamp.child_id, "Creating stamp in database");

        sqlx::query(&format!(
            "INSERT INTO stamps ({STAMP_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7)"
        ))
        .bind(stamp.id)
        .bind(stamp.child_id)
        .bind(stamp.stamp_card_id)
        .bind(stamp.reward_item_id)
        .bind(stamp.stamped_at)
        .bind(stamp.opened_at)
        .bind(&stamp.comment)
        .execute(&mut *self.tx)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn get_stamp(&mut self, stamp_id: Uuid) -> Result<Option<StampModel>, AppError> {
        sqlx::query_as::<_, StampModel>(&format!(
            "SELECT {STAMP_COLUMNS} FROM stamps WHERE id = $1"
        ))
        .bind(stamp_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error)
    }

    #[instrument(skip(self))]
    async fn assign_stamp(&mut self, stamp_id: Uuid, card_id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE stamps SET stamp_card_id = $2
             WHERE id = $1
               AND stamp_card_id IS NULL
               AND EXISTS (
                   SELECT 1 FROM stamp_cards c
                   WHERE c.id = $2 AND c.child_id = stamps.child_id AND NOT c.is_completed
               )",
        )
        .bind(stamp_id)
        .bind(card_id)
        .execute(&mut *self.tx)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            warn!(stamp_id = %stamp_id, card_id = %card_id, "Stamp assignment rejected");
            return Err(AppError::Conflict(
                "Stamp is already assigned or the card is completed".to_string(),
            ));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn mark_stamp_opened(
        &mut self,
        stamp_id: Uuid,
        opened_at: DateTime<Utc>,
    ) -> Result<StampModel, AppError> {
        sqlx::query_as::<_, StampModel>(&format!(
            "UPDATE stamps SET opened_at = COALESCE(opened_at, $2) WHERE id = $1 RETURNING {STAMP_COLUMNS}"
        ))
        .bind(stamp_id)
        .bind(opened_at)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error)?
        .ok_or_else(|| AppError::NotFound("Stamp not found".to_string()))
    }

    async fn list_stamps(&mut self, child_id: Uuid) -> Result<Vec<StampModel>, AppError> {
        sqlx::query_as::<_, StampModel>(&format!(
            "SELECT {STAMP_COLUMNS} FROM stamps WHERE child_id = $1 ORDER BY stamped_at, id"
        ))
        .bind(child_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(db_error)
    }

    async fn list_unassigned_stamps(
        &mut self,
        child_id: Uuid,
    ) -> Result<Vec<StampModel>, AppError> {
        sqlx::query_as::<_, StampModel>(&format!(
            "SELECT {STAMP_COLUMNS} FROM stamps
             WHERE child_id = $1 AND stamp_card_id IS NULL
             ORDER BY stamped_at, id"
        ))
        .bind(child_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(db_error)
    }

    async fn insert_goal(&mut self, goal: &GoalModel) -> Result<(), AppError> {
        sqlx::query(&format!(
            "INSERT INTO goals ({GOAL_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7)"
        ))
        .bind(goal.id)
        .bind(goal.child_id)
        .bind(&goal.title)
        .bind(goal.target_stamps)
        .bind(goal.created_at)
        .bind(goal.completed_at)
        .bind(goal.cancelled_at)
        .execute(&mut *self.tx)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn find_active_goal(&mut self, child_id: Uuid) -> Result<Option<GoalModel>, AppError> {
        sqlx::query_as::<_, GoalModel>(&format!(
            "SELECT {GOAL_COLUMNS} FROM goals
             WHERE child_id = $1 AND completed_at IS NULL AND cancelled_at IS NULL
             ORDER BY created_at DESC LIMIT 1"
        ))
        .bind(child_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error)
    }

    async fn update_goal(&mut self, goal: &GoalModel) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE goals SET title = $2, target_stamps = $3, completed_at = $4, cancelled_at = $5 WHERE id = $1",
        )
        .bind(goal.id)
        .bind(&goal.title)
        .bind(goal.target_stamps)
        .bind(goal.completed_at)
        .bind(goal.cancelled_at)
        .execute(&mut *self.tx)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Goal not found".to_string()));
        }
        Ok(())
    }

    async fn list_goals(&mut self, child_id: Uuid) -> Result<Vec<GoalModel>, AppError> {
        sqlx::query_as::<_, GoalModel>(&format!(
            "SELECT {GOAL_COLUMNS} FROM goals WHERE child_id = $1 ORDER BY created_at DESC"
        ))
        .bind(child_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(db_error)
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        let PostgresTransaction { tx } = *self;
        tx.commit().await.map_err(db_error)
    }
}
