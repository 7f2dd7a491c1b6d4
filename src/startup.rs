use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use sqlx::postgres::PgPoolOptions;
use std::net::TcpListener;
use std::sync::Arc;

use crate::account::AccountService;
use crate::auth::{AuthService, TokenIssuer};
use crate::configuration::{JwtSettings, Settings};
use crate::error::AppError;
use crate::media::{HttpMediaUploader, MediaUploader};
use crate::middleware::JwtMiddleware;
use crate::routes::{
    change_password, current_user, health_check, login, logout, refresh_token, register,
    update_account, update_avatar, update_cover_image,
};
use crate::store::{PgUserStore, UserStore};

/// Largest accepted avatar / cover image body
const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

pub fn run(
    listener: TcpListener,
    store: Arc<dyn UserStore>,
    media: Arc<dyn MediaUploader>,
    jwt_config: JwtSettings,
    password_hash_cost: u32,
) -> Result<Server, std::io::Error> {
    let issuer = Arc::new(TokenIssuer::new(jwt_config));
    let auth = web::Data::new(AuthService::new(
        store.clone(),
        issuer.clone(),
        password_hash_cost,
    ));
    let account = web::Data::new(AccountService::new(store, media, password_hash_cost));

    let server = HttpServer::new(move || {
        let protected = || JwtMiddleware::new(issuer.clone());

        App::new()
            .wrap(Logger::default())
            .app_data(auth.clone())
            .app_data(account.clone())
            .app_data(web::PayloadConfig::new(MAX_IMAGE_BYTES))
            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/api/v1/users")
                    // Public routes
                    .route("/register", web::post().to(register))
                    .route("/login", web::post().to(login))
                    .route("/refresh-token", web::post().to(refresh_token))
                    // Routes requiring a valid access token
                    .service(
                        web::resource("/logout")
                            .wrap(protected())
                            .route(web::post().to(logout)),
                    )
                    .service(
                        web::resource("/current-user")
                            .wrap(protected())
                            .route(web::get().to(current_user)),
                    )
                    .service(
                        web::resource("/change-password")
                            .wrap(protected())
                            .route(web::post().to(change_password)),
                    )
                    .service(
                        web::resource("/update-account")
                            .wrap(protected())
                            .route(web::patch().to(update_account)),
                    )
                    .service(
                        web::resource("/avatar")
                            .wrap(protected())
                            .route(web::patch().to(update_avatar)),
                    )
                    .service(
                        web::resource("/cover-image")
                            .wrap(protected())
                            .route(web::patch().to(update_cover_image)),
                    ),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}

/// Wire the PostgreSQL store and HTTP media host from configuration
pub async fn build(configuration: Settings) -> Result<Server, AppError> {
    configuration.validate()?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&configuration.database.connection_string())
        .await?;
    tracing::info!("Database connection pool created successfully");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to run migrations: {}", e)))?;

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)
        .map_err(|e| AppError::Internal(format!("Failed to bind {}: {}", address, e)))?;
    tracing::info!("Server listening on: {}", address);

    let media = HttpMediaUploader::new(&configuration.media)?;

    run(
        listener,
        Arc::new(PgUserStore::new(pool)),
        Arc::new(media),
        configuration.jwt,
        configuration.password.hash_cost,
    )
    .map_err(|e| AppError::Internal(format!("Failed to start server: {}", e)))
}
