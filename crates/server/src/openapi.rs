use utoipa::OpenApi;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(ToSchema)]
pub struct HealthResponse { pub status: String }

#[derive(ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub password: String,
    /// One of admin, clinic, doctor, staff, agent, user. Defaults to user.
    pub role: Option<String>,
    pub clinic_id: Option<Uuid>,
    pub phone: Option<String>,
}

#[derive(ToSchema)]
pub struct LoginRequest { pub email: String, pub password: String }

#[derive(ToSchema)]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: Option<String>,
    pub message: String,
}

#[derive(ToSchema)]
pub struct CreateClinicRequest {
    pub owner_id: Option<Uuid>,
    pub name: String,
    pub address: String,
    pub city: String,
    pub phone: String,
    pub email: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub treatments: Vec<String>,
}

#[derive(ToSchema)]
pub struct AssignLeadRequest { pub assignee_id: Uuid }

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::auth::register,
        crate::routes::auth::login,
        crate::routes::auth::me,
        crate::routes::public::nearby_clinics,
        crate::routes::public::search_clinics,
        crate::routes::public::get_in_touch,
        crate::routes::clinics::create,
        crate::routes::clinics::delete,
        crate::routes::leads::assign,
    ),
    components(
        schemas(
            HealthResponse,
            RegisterRequest,
            LoginRequest,
            ContactRequest,
            CreateClinicRequest,
            AssignLeadRequest,
        )
    ),
    tags(
        (name = "health"),
        (name = "auth"),
        (name = "public"),
        (name = "clinics"),
        (name = "leads")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_core_paths() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        for expected in ["/health", "/auth/login", "/api/public/clinics/search", "/api/clinics/{id}"] {
            assert!(paths.iter().any(|p| p.as_str() == expected), "missing {expected}");
        }
    }
}
