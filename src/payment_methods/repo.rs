use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::is_unique_violation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentKind {
    Mpesa,
    Card,
    Paypal,
}

#[derive(Debug, Clone, FromRow)]
pub struct PaymentMethod {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: PaymentKind,
    pub phone_number: Option<String>,
    pub card_holder: Option<String>,
    pub last_four: Option<String>,
    pub card_token: Option<String>,
    pub expiry: Option<String>,
    pub paypal_email: Option<String>,
    pub is_default: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

pub struct NewPaymentMethod<'a> {
    pub user_id: Uuid,
    pub kind: PaymentKind,
    pub phone_number: Option<&'a str>,
    pub card_holder: Option<&'a str>,
    pub last_four: Option<&'a str>,
    pub card_token: Option<&'a str>,
    pub expiry: Option<&'a str>,
    pub paypal_email: Option<&'a str>,
    /// Caller may claim the default slot even when other methods exist.
    pub make_default: bool,
}

const COLUMNS: &str = "id, user_id, kind, phone_number, card_holder, last_four, card_token, \
                       expiry, paypal_email, is_default, created_at, updated_at";

pub async fn list_by_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<PaymentMethod>> {
    let rows = sqlx::query_as::<_, PaymentMethod>(&format!(
        r#"
        SELECT {COLUMNS} FROM payment_methods
        WHERE user_id = $1
        ORDER BY is_default DESC, created_at DESC
        "#
    ))
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// Unlike addresses, an explicit default request is honored on create: the
/// existing defaults are unset in the same transaction as the insert. The
/// first method for a user becomes default regardless. Losing a race to the
/// one-default index aborts the transaction; the retry either steals the
/// flag (explicit request) or settles for non-default (first-method claim).
pub async fn create(db: &PgPool, new: NewPaymentMethod<'_>) -> anyhow::Result<PaymentMethod> {
    match try_create(db, &new, true).await {
        Ok(method) => Ok(method),
        Err(e) if is_unique_violation(&e) => Ok(try_create(db, &new, false).await?),
        Err(e) => Err(e.into()),
    }
}

async fn try_create(
    db: &PgPool,
    new: &NewPaymentMethod<'_>,
    claim_first: bool,
) -> Result<PaymentMethod, sqlx::Error> {
    let mut tx = db.begin().await?;

    if new.make_default {
        sqlx::query("UPDATE payment_methods SET is_default = FALSE WHERE user_id = $1")
            .bind(new.user_id)
            .execute(&mut *tx)
            .await?;
    }

    let method = sqlx::query_as::<_, PaymentMethod>(&format!(
        r#"
        INSERT INTO payment_methods
            (user_id, kind, phone_number, card_holder, last_four, card_token,
             expiry, paypal_email, is_default)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8,
                $9 OR ($10 AND NOT EXISTS (SELECT 1 FROM payment_methods WHERE user_id = $1)))
        RETURNING {COLUMNS}
        "#
    ))
    .bind(new.user_id)
    .bind(new.kind)
    .bind(new.phone_number)
    .bind(new.card_holder)
    .bind(new.last_four)
    .bind(new.card_token)
    .bind(new.expiry)
    .bind(new.paypal_email)
    .bind(new.make_default)
    .bind(claim_first)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(method)
}

/// Same transactional unset-all/set-one protocol as addresses.
pub async fn set_default(
    db: &PgPool,
    id: Uuid,
    user_id: Uuid,
) -> anyhow::Result<Option<PaymentMethod>> {
    let mut tx = db.begin().await?;

    sqlx::query("UPDATE payment_methods SET is_default = FALSE WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    let method = sqlx::query_as::<_, PaymentMethod>(&format!(
        r#"
        UPDATE payment_methods SET is_default = TRUE, updated_at = now()
        WHERE id = $1 AND user_id = $2
        RETURNING {COLUMNS}
        "#
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    match method {
        Some(method) => {
            tx.commit().await?;
            Ok(Some(method))
        }
        None => Ok(None),
    }
}

pub async fn delete(db: &PgPool, id: Uuid, user_id: Uuid) -> anyhow::Result<bool> {
    let mut tx = db.begin().await?;

    let was_default: Option<bool> = sqlx::query_scalar(
        "DELETE FROM payment_methods WHERE id = $1 AND user_id = $2 RETURNING is_default",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(was_default) = was_default else {
        return Ok(false);
    };

    if was_default {
        sqlx::query(
            r#"
            UPDATE payment_methods SET is_default = TRUE
            WHERE id = (
                SELECT id FROM payment_methods
                WHERE user_id = $1
                ORDER BY created_at DESC
                LIMIT 1
            )
            "#,
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::repo::{self as users, NewUser, Role};

    async fn seed_user(db: &PgPool) -> Uuid {
        users::create(
            db,
            NewUser {
                firstname: "Otieno",
                lastname: "Owuor",
                username: None,
                email: "otieno@example.com",
                phone: None,
                password_hash: "$argon2id$stub",
                profile_img: "default-avatar.png",
                role: Role::Customer,
            },
        )
        .await
        .unwrap()
        .id
    }

    fn mpesa(user_id: Uuid, phone: &'static str, make_default: bool) -> NewPaymentMethod<'static> {
        NewPaymentMethod {
            user_id,
            kind: PaymentKind::Mpesa,
            phone_number: Some(phone),
            card_holder: None,
            last_four: None,
            card_token: None,
            expiry: None,
            paypal_email: None,
            make_default,
        }
    }

    #[sqlx::test]
    async fn first_method_becomes_default(db: PgPool) {
        let user_id = seed_user(&db).await;
        let method = create(&db, mpesa(user_id, "+254700000001", false))
            .await
            .unwrap();
        assert!(method.is_default);
    }

    #[sqlx::test]
    async fn explicit_default_steals_the_flag(db: PgPool) {
        let user_id = seed_user(&db).await;
        let first = create(&db, mpesa(user_id, "+254700000001", false))
            .await
            .unwrap();
        create(&db, mpesa(user_id, "+254700000002", false))
            .await
            .unwrap();
        let third = create(&db, mpesa(user_id, "+254700000003", true))
            .await
            .unwrap();

        assert!(third.is_default);
        let all = list_by_user(&db, user_id).await.unwrap();
        assert_eq!(all.iter().filter(|m| m.is_default).count(), 1);
        let old = all.iter().find(|m| m.id == first.id).unwrap();
        assert!(!old.is_default);
    }

    #[sqlx::test]
    async fn set_default_moves_the_flag(db: PgPool) {
        let user_id = seed_user(&db).await;
        create(&db, mpesa(user_id, "+254700000001", false))
            .await
            .unwrap();
        let second = create(&db, mpesa(user_id, "+254700000002", false))
            .await
            .unwrap();

        let updated = set_default(&db, second.id, user_id).await.unwrap().unwrap();
        assert!(updated.is_default);
        let all = list_by_user(&db, user_id).await.unwrap();
        assert_eq!(all.iter().filter(|m| m.is_default).count(), 1);
    }

    #[sqlx::test]
    async fn deleting_the_default_promotes_the_newest_survivor(db: PgPool) {
        let user_id = seed_user(&db).await;
        let first = create(&db, mpesa(user_id, "+254700000001", false))
            .await
            .unwrap();
        let second = create(&db, mpesa(user_id, "+254700000002", false))
            .await
            .unwrap();

        assert!(delete(&db, first.id, user_id).await.unwrap());
        let all = list_by_user(&db, user_id).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, second.id);
        assert!(all[0].is_default);
    }
}
