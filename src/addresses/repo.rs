use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::is_unique_violation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "address_kind", rename_all = "PascalCase")]
pub enum AddressKind {
    Home,
    Work,
    Other,
}

#[derive(Debug, Clone, FromRow)]
pub struct Address {
    pub id: Uuid,
    pub user_id: Uuid,
    pub address_line_1: String,
    pub address_line_2: Option<String>,
    pub city: String,
    pub state_region: Option<String>,
    pub postal_code: String,
    pub country: String,
    pub kind: AddressKind,
    pub is_default: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

pub struct NewAddress<'a> {
    pub user_id: Uuid,
    pub address_line_1: &'a str,
    pub address_line_2: Option<&'a str>,
    pub city: &'a str,
    pub state_region: Option<&'a str>,
    pub postal_code: &'a str,
    pub country: &'a str,
    pub kind: AddressKind,
}

#[derive(Debug, Default)]
pub struct AddressPatch {
    pub address_line_1: Option<String>,
    pub address_line_2: Option<String>,
    pub city: Option<String>,
    pub state_region: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub kind: Option<AddressKind>,
}

const COLUMNS: &str = "id, user_id, address_line_1, address_line_2, city, state_region, \
                       postal_code, country, kind, is_default, created_at, updated_at";

pub async fn list_by_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Address>> {
    let rows = sqlx::query_as::<_, Address>(&format!(
        r#"
        SELECT {COLUMNS} FROM addresses
        WHERE user_id = $1
        ORDER BY is_default DESC, created_at DESC
        "#
    ))
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// The first address a user creates is forced default; callers cannot set
/// the flag on create. The partial unique index on (user_id) WHERE
/// is_default allows at most one default per user, so when two first-creates
/// race the loser hits the index and retries as non-default.
pub async fn create(db: &PgPool, new: NewAddress<'_>) -> anyhow::Result<Address> {
    match insert(db, &new, true).await {
        Ok(address) => Ok(address),
        Err(e) if is_unique_violation(&e) => Ok(insert(db, &new, false).await?),
        Err(e) => Err(e.into()),
    }
}

async fn insert(
    db: &PgPool,
    new: &NewAddress<'_>,
    claim_default: bool,
) -> Result<Address, sqlx::Error> {
    sqlx::query_as::<_, Address>(&format!(
        r#"
        INSERT INTO addresses
            (user_id, address_line_1, address_line_2, city, state_region,
             postal_code, country, kind, is_default)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8,
                $9 AND NOT EXISTS (SELECT 1 FROM addresses WHERE user_id = $1))
        RETURNING {COLUMNS}
        "#
    ))
    .bind(new.user_id)
    .bind(new.address_line_1)
    .bind(new.address_line_2)
    .bind(new.city)
    .bind(new.state_region)
    .bind(new.postal_code)
    .bind(new.country)
    .bind(new.kind)
    .bind(claim_default)
    .fetch_one(db)
    .await
}

/// Patch scoped to the (id, user) pair; `None` when the pair matches nothing.
pub async fn update(
    db: &PgPool,
    id: Uuid,
    user_id: Uuid,
    patch: AddressPatch,
) -> anyhow::Result<Option<Address>> {
    let address = sqlx::query_as::<_, Address>(&format!(
        r#"
        UPDATE addresses SET
            address_line_1 = COALESCE($3, address_line_1),
            address_line_2 = COALESCE($4, address_line_2),
            city = COALESCE($5, city),
            state_region = COALESCE($6, state_region),
            postal_code = COALESCE($7, postal_code),
            country = COALESCE($8, country),
            kind = COALESCE($9, kind),
            updated_at = now()
        WHERE id = $1 AND user_id = $2
        RETURNING {COLUMNS}
        "#
    ))
    .bind(id)
    .bind(user_id)
    .bind(patch.address_line_1)
    .bind(patch.address_line_2)
    .bind(patch.city)
    .bind(patch.state_region)
    .bind(patch.postal_code)
    .bind(patch.country)
    .bind(patch.kind)
    .fetch_optional(db)
    .await?;
    Ok(address)
}

/// Unset-all then set-one, in a single transaction. If the target does not
/// belong to the user the whole transaction rolls back, including the unset
/// step.
pub async fn set_default(db: &PgPool, id: Uuid, user_id: Uuid) -> anyhow::Result<Option<Address>> {
    let mut tx = db.begin().await?;

    sqlx::query("UPDATE addresses SET is_default = FALSE WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    let address = sqlx::query_as::<_, Address>(&format!(
        r#"
        UPDATE addresses SET is_default = TRUE, updated_at = now()
        WHERE id = $1 AND user_id = $2
        RETURNING {COLUMNS}
        "#
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    match address {
        Some(address) => {
            tx.commit().await?;
            Ok(Some(address))
        }
        None => Ok(None), // dropped tx rolls the unset back
    }
}

/// Delete scoped to (id, user); when the default address goes away the most
/// recently created survivor inherits the flag, inside the same transaction.
pub async fn delete(db: &PgPool, id: Uuid, user_id: Uuid) -> anyhow::Result<bool> {
    let mut tx = db.begin().await?;

    let was_default: Option<bool> = sqlx::query_scalar(
        "DELETE FROM addresses WHERE id = $1 AND user_id = $2 RETURNING is_default",
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
            UPDATE addresses SET is_default = TRUE
            WHERE id = (
                SELECT id FROM addresses
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

    async fn seed_user(db: &PgPool, email: &str) -> Uuid {
        users::create(
            db,
            NewUser {
                firstname: "Njeri",
                lastname: "Mwangi",
                username: None,
                email,
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

    fn sample(user_id: Uuid, line1: &'static str) -> NewAddress<'static> {
        NewAddress {
            user_id,
            address_line_1: line1,
            address_line_2: None,
            city: "Nairobi",
            state_region: None,
            postal_code: "00100",
            country: "Kenya",
            kind: AddressKind::Home,
        }
    }

    #[sqlx::test]
    async fn first_address_becomes_default(db: PgPool) {
        let user_id = seed_user(&db, "njeri@example.com").await;
        let created = create(&db, sample(user_id, "Moi Avenue 12")).await.unwrap();
        assert!(created.is_default);
    }

    #[sqlx::test]
    async fn later_addresses_leave_exactly_one_default(db: PgPool) {
        let user_id = seed_user(&db, "njeri@example.com").await;
        let first = create(&db, sample(user_id, "Moi Avenue 12")).await.unwrap();
        create(&db, sample(user_id, "Kenyatta Avenue 3"))
            .await
            .unwrap();
        create(&db, sample(user_id, "Haile Selassie 8"))
            .await
            .unwrap();

        let all = list_by_user(&db, user_id).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all.iter().filter(|a| a.is_default).count(), 1);
        // Default sorts first.
        assert_eq!(all[0].id, first.id);
    }

    #[sqlx::test]
    async fn set_default_moves_the_flag(db: PgPool) {
        let user_id = seed_user(&db, "njeri@example.com").await;
        let first = create(&db, sample(user_id, "Moi Avenue 12")).await.unwrap();
        let second = create(&db, sample(user_id, "Kenyatta Avenue 3"))
            .await
            .unwrap();

        let updated = set_default(&db, second.id, user_id).await.unwrap().unwrap();
        assert!(updated.is_default);

        let all = list_by_user(&db, user_id).await.unwrap();
        assert_eq!(all.iter().filter(|a| a.is_default).count(), 1);
        let old = all.iter().find(|a| a.id == first.id).unwrap();
        assert!(!old.is_default);
    }

    #[sqlx::test]
    async fn set_default_for_wrong_owner_changes_nothing(db: PgPool) {
        let owner = seed_user(&db, "njeri@example.com").await;
        let stranger = seed_user(&db, "otieno@example.com").await;
        let address = create(&db, sample(owner, "Moi Avenue 12")).await.unwrap();

        let result = set_default(&db, address.id, stranger).await.unwrap();
        assert!(result.is_none());

        let all = list_by_user(&db, owner).await.unwrap();
        assert!(all[0].is_default);
    }

    #[sqlx::test]
    async fn deleting_the_default_promotes_the_newest_survivor(db: PgPool) {
        let user_id = seed_user(&db, "njeri@example.com").await;
        let first = create(&db, sample(user_id, "Moi Avenue 12")).await.unwrap();
        create(&db, sample(user_id, "Kenyatta Avenue 3"))
            .await
            .unwrap();
        let third = create(&db, sample(user_id, "Haile Selassie 8"))
            .await
            .unwrap();

        assert!(delete(&db, first.id, user_id).await.unwrap());

        let all = list_by_user(&db, user_id).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all.iter().filter(|a| a.is_default).count(), 1);
        let promoted = all.iter().find(|a| a.id == third.id).unwrap();
        assert!(promoted.is_default);
    }

    #[sqlx::test]
    async fn deleting_the_only_address_leaves_nothing_behind(db: PgPool) {
        let user_id = seed_user(&db, "njeri@example.com").await;
        let only = create(&db, sample(user_id, "Moi Avenue 12")).await.unwrap();

        assert!(delete(&db, only.id, user_id).await.unwrap());
        assert!(list_by_user(&db, user_id).await.unwrap().is_empty());
        // Second delete of the same id reports a miss.
        assert!(!delete(&db, only.id, user_id).await.unwrap());
    }

    #[sqlx::test]
    async fn deleting_a_non_default_keeps_the_default(db: PgPool) {
        let user_id = seed_user(&db, "njeri@example.com").await;
        let first = create(&db, sample(user_id, "Moi Avenue 12")).await.unwrap();
        let second = create(&db, sample(user_id, "Kenyatta Avenue 3"))
            .await
            .unwrap();

        assert!(delete(&db, second.id, user_id).await.unwrap());

        let all = list_by_user(&db, user_id).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, first.id);
        assert!(all[0].is_default);
    }
}
