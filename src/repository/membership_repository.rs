use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};

use crate::{
    domain::{MembershipPurchase, NewMembershipPurchase, Role},
    error::{AppError, Result},
    repository::{parse_role, to_utc, MembershipRepository},
};

#[derive(FromRow)]
struct PurchaseRow {
    id: i64,
    user_id: i64,
    role: String,
    price_id: String,
    amount: i64,
    currency: String,
    stripe_session_id: String,
    created_at: NaiveDateTime,
}

/// Result of applying a completed checkout.
#[derive(Debug, Clone, PartialEq)]
pub struct Fulfillment {
    pub purchase: MembershipPurchase,
    /// False when the session had already been fulfilled.
    pub newly_recorded: bool,
    /// The buyer's role after fulfillment.
    pub role: Role,
}

pub struct SqliteMembershipRepository {
    pool: SqlitePool,
}

impl SqliteMembershipRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_purchase(row: PurchaseRow) -> Result<MembershipPurchase> {
        Ok(MembershipPurchase {
            id: row.id,
            user_id: row.user_id,
            role: parse_role(&row.role)?,
            price_id: row.price_id,
            amount: row.amount,
            currency: row.currency,
            stripe_session_id: row.stripe_session_id,
            created_at: to_utc(row.created_at),
        })
    }
}

/// Whether buying `purchased` should replace `current`. Staff roles are
/// never touched and tiers only move upwards.
pub(crate) fn should_upgrade(current: Role, purchased: Role) -> bool {
    match (current.tier_rank(), purchased.tier_rank()) {
        (Some(have), Some(want)) => want > have,
        _ => false,
    }
}

#[async_trait]
impl MembershipRepository for SqliteMembershipRepository {
    async fn fulfill(&self, purchase: NewMembershipPurchase) -> Result<Fulfillment> {
        let now = Utc::now().naive_utc();
        let mut tx = self.pool.begin().await?;

        // The insert is the first statement so the transaction holds the
        // write lock before it reads. Replays of a session queue behind it.
        let inserted = sqlx::query(
            r#"
            INSERT INTO membership_purchases (
                user_id, role, price_id, amount, currency, stripe_session_id, created_at
            )
            SELECT id, ?, ?, ?, ?, ?, ? FROM users WHERE id = ?
            ON CONFLICT (stripe_session_id) DO NOTHING
            "#
        )
        .bind(purchase.role.as_str())
        .bind(&purchase.price_id)
        .bind(purchase.amount)
        .bind(&purchase.currency)
        .bind(&purchase.stripe_session_id)
        .bind(now)
        .bind(purchase.user_id)
        .execute(&mut *tx)
        .await?;

        let current: String = sqlx::query_scalar("SELECT role FROM users WHERE id = ?")
            .bind(purchase.user_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("user not found".to_string()))?;
        let mut role = parse_role(&current)?;

        let newly_recorded = inserted.rows_affected() > 0;

        if newly_recorded && should_upgrade(role, purchase.role) {
            sqlx::query("UPDATE users SET role = ?, updated_at = ? WHERE id = ?")
                .bind(purchase.role.as_str())
                .bind(now)
                .bind(purchase.user_id)
                .execute(&mut *tx)
                .await?;
            role = purchase.role;
        }

        let row = sqlx::query_as::<_, PurchaseRow>(
            r#"
            SELECT id, user_id, role, price_id, amount, currency, stripe_session_id, created_at
            FROM membership_purchases
            WHERE stripe_session_id = ?
            "#
        )
        .bind(&purchase.stripe_session_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Fulfillment {
            purchase: Self::row_to_purchase(row)?,
            newly_recorded,
            role,
        })
    }

    async fn find_by_session(&self, stripe_session_id: &str) -> Result<Option<MembershipPurchase>> {
        let row = sqlx::query_as::<_, PurchaseRow>(
            r#"
            SELECT id, user_id, role, price_id, amount, currency, stripe_session_id, created_at
            FROM membership_purchases
            WHERE stripe_session_id = ?
            "#
        )
        .bind(stripe_session_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_purchase).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_only_move_up() {
        assert!(should_upgrade(Role::User, Role::UserGold));
        assert!(should_upgrade(Role::UserBronze, Role::UserPlatinum));
        assert!(!should_upgrade(Role::UserGold, Role::UserBronze));
        assert!(!should_upgrade(Role::UserGold, Role::UserGold));
    }

    #[test]
    fn staff_roles_are_left_alone() {
        assert!(!should_upgrade(Role::Trainer, Role::UserPlatinum));
        assert!(!should_upgrade(Role::Admin, Role::UserBronze));
    }
}
