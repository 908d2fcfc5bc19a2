use crate::{
    api::{dtr, nap, team, users},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};

type LimiterConfig = GovernorConfig<PeerIpKeyExtractor, NoOpMiddleware>;

/// Token-bucket quota allowing `requests_per_min` with an equal burst.
fn limiter_config(requests_per_min: u32) -> LimiterConfig {
    let requests_per_min = requests_per_min.max(1);
    GovernorConfigBuilder::default()
        .milliseconds_per_request((60_000 / u64::from(requests_per_min)).max(1))
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .expect("non-zero governor quota")
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Governors built from one config share its bucket.
    let login_limit = limiter_config(config.rate_login_per_min);
    let register_limit = limiter_config(config.rate_register_per_min);
    let refresh_limit = limiter_config(config.rate_refresh_per_min);
    let protected_limit = limiter_config(config.rate_protected_per_min);

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(Governor::new(&login_limit))
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/register")
                    .wrap(Governor::new(&register_limit))
                    .route(web::post().to(handlers::register)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(Governor::new(&refresh_limit))
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(Governor::new(&login_limit))
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(Governor::new(&protected_limit))
            .service(handlers::me)
            .service(
                web::scope("/dtr")
                    // /dtr
                    .service(
                        web::resource("")
                            .route(web::post().to(dtr::create_record))
                            .route(web::get().to(dtr::list_records)),
                    )
                    // /dtr/time-in
                    .service(web::resource("/time-in").route(web::post().to(dtr::time_in)))
                    // /dtr/time-out
                    .service(web::resource("/time-out").route(web::put().to(dtr::time_out)))
                    // /dtr/import
                    .service(
                        web::resource("/import")
                            .app_data(web::PayloadConfig::new(config.dtr_import_max_bytes))
                            .route(web::post().to(dtr::import_records)),
                    ),
            )
            .service(
                web::scope("/team")
                    // /team/status
                    .service(web::resource("/status").route(web::get().to(team::team_status))),
            )
            .service(
                web::scope("/users")
                    // /users/{user_id}/role
                    .service(
                        web::resource("/{user_id}/role").route(web::put().to(users::change_role)),
                    ),
            )
            .service(
                web::scope("/nap")
                    // /nap
                    .service(web::resource("").route(web::post().to(nap::create_report)))
                    // /nap/totals
                    .service(web::resource("/totals").route(web::get().to(nap::totals))),
            ),
    );
}

// LOGIN
//  ├─ access_token (15 min)
//  └─ refresh_token (7 days)

// API REQUEST
//  └─ Authorization: Bearer access_token

// ACCESS EXPIRED
//  └─ POST /auth/refresh with refresh_token
//       └─ returns new token pair, old refresh token revoked

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limiter_quota_builds_for_any_rate() {
        // 0 is raised to 1/min, rates above 60k/min bottom out at 1 ms
        for rpm in [0, 1, 5, 60, 60_000, 1_000_000] {
            let _ = limiter_config(rpm);
        }
    }
}
