use crate::api::dtr::{DtrListResponse, ShiftNote};
use crate::dtr::import::ImportSummary;
use crate::dtr::normalizer::ImportFormat;
use crate::dtr::record::DtrSubmission;
use crate::model::dtr::DtrRecord;
use crate::model::nap_report::{CreateNapReport, NapReport};
use crate::model::team_status::{AgentStatus, ShiftState};
use crate::models::{LoginReqDto, RegisterReq, RoleChangeReq, TokenPair};
use crate::utils::nap_totals::MonthlyTotals;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "TeamBabe TMS API",
        version = "0.1.0",
        description = r#"
## TeamBabe Team Management System

Back end for a team-management and recruitment CRM.

### Key Features
- **Daily Time Records (DTR)**
  - Time in / time out, manual entries, paginated history
  - Bulk import of CSV or JSON attendance logs with per-row diagnostics
- **Team Status**
  - Supervisor view of who is on shift today
- **NAP Reports**
  - Store extracted agent performance reports and view monthly totals

### Roles
Self-registration always creates an **agent**. Admins grant other roles with
`PUT /api/users/{user_id}/role`.

### Security
Everything under `/api` needs a **JWT Bearer** access token from `/auth/login`.
"#,
    ),
    paths(
        crate::auth::handlers::register,
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,

        crate::api::dtr::create_record,
        crate::api::dtr::list_records,
        crate::api::dtr::time_in,
        crate::api::dtr::time_out,
        crate::api::dtr::import_records,

        crate::api::team::team_status,

        crate::api::users::change_role,

        crate::api::nap::create_report,
        crate::api::nap::totals
    ),
    components(
        schemas(
            RegisterReq,
            LoginReqDto,
            TokenPair,
            RoleChangeReq,
            DtrSubmission,
            DtrRecord,
            DtrListResponse,
            ShiftNote,
            ImportFormat,
            ImportSummary,
            AgentStatus,
            ShiftState,
            NapReport,
            CreateNapReport,
            MonthlyTotals
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Auth", description = "Registration, login and token rotation"),
        (name = "DTR", description = "Daily time record APIs"),
        (name = "Team", description = "Supervisor team views"),
        (name = "Users", description = "Account administration"),
        (name = "NAP", description = "Agent performance reports"),
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
