#![cfg(test)]
use tokio::sync::OnceCell;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use uuid::Uuid;
use migration::MigratorTrait;
use models::db::connect_with_config;
use configs::DatabaseConfig;
use models::user::{self, Role};
use models::clinic;

use crate::context::Actor;

// Migrations run once per test process; `false` means the database is unusable.
static MIGRATED: OnceCell<bool> = OnceCell::const_new();

fn test_config() -> DatabaseConfig {
    let mut cfg = DatabaseConfig { url: models::db::DATABASE_URL.clone(), ..DatabaseConfig::default() };
    cfg.max_connections = cfg.max_connections.max(10);
    cfg.min_connections = 1;
    cfg.connect_timeout_secs = 5;
    cfg.acquire_timeout_secs = 10;
    cfg
}

/// Connected, migrated database; `None` when DB tests are skipped or unreachable.
pub async fn get_db() -> Option<DatabaseConnection> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return None;
    }
    let ready = *MIGRATED
        .get_or_init(|| async {
            match connect_with_config(&test_config()).await {
                Ok(db) => match migration::Migrator::up(&db, None).await {
                    Ok(()) => true,
                    Err(e) => {
                        eprintln!("skipping db tests, migrations failed: {e}");
                        false
                    }
                },
                Err(e) => {
                    eprintln!("skipping db tests, database unreachable: {e}");
                    false
                }
            }
        })
        .await;
    if !ready {
        return None;
    }
    connect_with_config(&test_config()).await.ok()
}

/// Admin caller with no clinic.
pub fn admin() -> Actor {
    Actor { user_id: Uuid::new_v4(), email: "admin@example.com".into(), role: Role::Admin, clinic_id: None }
}

/// Clinic owner linked to a fresh clinic in Dubai.
pub async fn seed_clinic(db: &DatabaseConnection) -> anyhow::Result<(Actor, clinic::Model)> {
    let tag = Uuid::new_v4().simple().to_string();
    let owner = user::create(
        db,
        user::NewUser { email: &format!("owner_{tag}@example.com"), name: "Clinic Owner", phone: None, role: Role::Clinic, clinic_id: None },
    )
    .await?;
    let c = clinic::create(
        db,
        clinic::NewClinic {
            owner_id: owner.id,
            name: format!("Smile {tag}"),
            slug: format!("smile-{tag}"),
            address: "Sheikh Zayed Road".into(),
            city: "Dubai".into(),
            phone: "+971501234567".into(),
            email: None,
            latitude: Some(25.2048),
            longitude: Some(55.2708),
            treatments: vec!["Botox".into()],
            timings: None,
            photos: vec![],
        },
    )
    .await?;
    let mut am: user::ActiveModel = owner.clone().into();
    am.clinic_id = Set(Some(c.id));
    am.update(db).await?;
    Ok((Actor { user_id: owner.id, email: owner.email, role: Role::Clinic, clinic_id: Some(c.id) }, c))
}

/// Member account of `clinic_id` with the given role.
pub async fn seed_member(db: &DatabaseConnection, clinic_id: Uuid, role: Role) -> anyhow::Result<Actor> {
    let email = format!("{}_{}@example.com", role.as_str(), Uuid::new_v4().simple());
    let u = user::create(db, user::NewUser { email: &email, name: "Member", phone: Some("+971500000001"), role, clinic_id: Some(clinic_id) }).await?;
    Ok(Actor { user_id: u.id, email: u.email, role, clinic_id: Some(clinic_id) })
}

/// Drops a seeded clinic (children cascade) and its members.
pub async fn cleanup(db: &DatabaseConnection, clinic_id: Uuid, owner_id: Uuid) {
    let _ = clinic::Entity::delete_by_id(clinic_id).exec(db).await;
    let _ = user::Entity::delete_many().filter(user::Column::ClinicId.eq(clinic_id)).exec(db).await;
    let _ = user::Entity::delete_by_id(owner_id).exec(db).await;
}
