use crate::{
    api::{attendance, shift},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::web;
use std::sync::Arc;

/// Per-peer limiter refilling `requests_per_min` tokens a minute.
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond((60_000 / u64::from(requests_per_min)).max(1))
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .expect("limiter period and burst are non-zero");
    Governor::new(&cfg)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config) {
    let verify_limiter = Arc::new(build_limiter(config.rate_verify_per_min));
    let clock_limiter = Arc::new(build_limiter(config.rate_clock_per_min));
    let admin_limiter = Arc::new(build_limiter(config.rate_admin_per_min));

    cfg.service(
        web::scope(&config.api_prefix)
            .service(
                web::scope("/attendance")
                    // kiosk traffic
                    .service(
                        web::resource("/verify")
                            .wrap(verify_limiter)
                            .route(web::post().to(attendance::verify)),
                    )
                    .service(
                        web::resource("/clock-in")
                            .wrap(clock_limiter.clone())
                            .route(web::post().to(attendance::clock_in)),
                    )
                    .service(
                        web::resource("/clock-out")
                            .wrap(clock_limiter)
                            .route(web::post().to(attendance::clock_out)),
                    )
                    // dashboards
                    .service(
                        web::resource("/today")
                            .wrap(admin_limiter.clone())
                            .route(web::get().to(attendance::today)),
                    )
                    .service(
                        web::resource("/present")
                            .wrap(admin_limiter.clone())
                            .route(web::get().to(attendance::present)),
                    )
                    .service(
                        web::resource("/face-snapshot/refresh")
                            .wrap(admin_limiter.clone())
                            .route(web::post().to(attendance::refresh_face_snapshot)),
                    )
                    .service(
                        web::resource("/employee/{employee_code}")
                            .wrap(admin_limiter.clone())
                            .route(web::get().to(attendance::employee_history)),
                    )
                    // /attendance/{id} last so it never shadows the names above
                    .service(
                        web::resource("/{id}")
                            .wrap(admin_limiter.clone())
                            .route(web::get().to(attendance::get_record)),
                    ),
            )
            .service(
                web::scope("/shifts")
                    .wrap(admin_limiter)
                    // /shifts
                    .service(
                        web::resource("")
                            .route(web::get().to(shift::list_shifts))
                            .route(web::post().to(shift::create_shift)),
                    )
                    // /shifts/{id}
                    .service(web::resource("/{id}").route(web::get().to(shift::get_shift))),
            ),
    );
}
