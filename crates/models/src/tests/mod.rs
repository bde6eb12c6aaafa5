
/// Save-hook derivations against a live database
pub mod billing_tests;

use migration::MigratorTrait;
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::db::connect;
use crate::{clinic, user};

/// Connected and migrated database, or `None` when DB tests are skipped or unreachable.
pub(crate) async fn setup_test_db() -> Option<DatabaseConnection> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return None;
    }
    let db = match connect().await {
        Ok(db) => db,
        Err(e) => {
            eprintln!("skipping db test: {e}");
            return None;
        }
    };
    if let Err(e) = migration::Migrator::up(&db, None).await {
        eprintln!("skipping db test, migrations failed: {e}");
        return None;
    }
    Some(db)
}

/// Owner account plus its clinic.
pub(crate) async fn seed_clinic(db: &DatabaseConnection) -> anyhow::Result<(user::Model, clinic::Model)> {
    let tag = Uuid::new_v4().simple().to_string();
    let owner = user::create(
        db,
        user::NewUser {
            email: &format!("owner_{tag}@example.com"),
            name: "Clinic Owner",
            phone: None,
            role: user::Role::Clinic,
            clinic_id: None,
        },
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
    Ok((owner, c))
}

/// Removes a seeded clinic and its owner; child rows cascade.
pub(crate) async fn cleanup(db: &DatabaseConnection, owner: &user::Model, c: &clinic::Model) -> anyhow::Result<()> {
    use sea_orm::EntityTrait;
    clinic::Entity::delete_by_id(c.id).exec(db).await?;
    user::Entity::delete_by_id(owner.id).exec(db).await?;
    Ok(())
}
