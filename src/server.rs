use anyhow::Result;
use axum::{
    routing::{get, post, put},
    Router,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::{net::SocketAddr, str::FromStr, sync::Arc};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use validator::Validate;

use crate::{
    actions::NewUser,
    auth::JwtKeys,
    config::{AdminSeed, Config},
    handlers,
    models::{user, Role},
    utils::pass,
};

/// Shared state handed to every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub jwt: Arc<JwtKeys>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Attempt to create a new AppState instance: open the pool and bring the schema up to date.
    pub async fn try_new(config: Config) -> Result<AppState> {
        let db_pool = connect(&config.database_url).await?;
        sqlx::migrate!("./migrations").run(&db_pool).await?;

        if let Some(seed) = &config.admin_seed {
            seed_admin(&db_pool, seed).await?;
        }

        Ok(AppState {
            db_pool,
            jwt: Arc::new(JwtKeys::new(&config.jwt_secret, config.jwt_expiration)),
            config: Arc::new(config),
        })
    }
}

/// Open the connection pool.
///
/// An in-memory database lives as long as its connection, so it gets exactly one that never expires.
pub async fn connect(database_url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = if database_url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(8)
    };

    Ok(pool.connect_with(options).await?)
}

/// Create the first admin account when the users table is empty.
async fn seed_admin(db_pool: &SqlitePool, seed: &AdminSeed) -> Result<()> {
    let mut tx = db_pool.begin().await?;
    if user::count(&mut tx).await? > 0 {
        return Ok(());
    }

    let input = NewUser {
        name: seed.name.clone(),
        pass: seed.pass.clone(),
        rol: Role::Admin,
        tlf: None,
        email: None,
        rate: 0.0,
    };
    input.validate()?;
    let hashed = pass::hash(&input.pass)?;
    let created = user::create(&mut tx, 0, &input, &hashed, chrono::Utc::now().naive_utc()).await?;
    tx.commit().await?;

    tracing::info!(user_id = created.id_user, name = %created.name, "seeded admin account");
    Ok(())
}

/// Build the router with every endpoint.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/ping", get(handlers::ping))
        .route("/login", post(handlers::login))
        .route("/history", get(handlers::history))
        // users
        .route("/users", get(handlers::list_users))
        .route(
            "/users/:id",
            get(handlers::get_user).post(handlers::create_user),
        )
        .route(
            "/users/:id/:id_user",
            put(handlers::update_user).delete(handlers::delete_user),
        )
        .route("/usersByJob/:id_job", get(handlers::users_by_job))
        .route("/help", get(handlers::help))
        // locations
        .route("/setLocation", post(handlers::set_location))
        .route("/getRecentlyLocation", get(handlers::recent_locations))
        // jobs
        .route("/jobs", get(handlers::list_jobs))
        .route(
            "/jobs/:id",
            get(handlers::get_job)
                .post(handlers::create_job)
                .put(handlers::update_job)
                .delete(handlers::delete_job),
        )
        .route("/jobs/:id/:fecha", get(handlers::jobs_for_user_on_date))
        .route("/jobs/fecha/:fecha", get(handlers::jobs_by_date))
        .route("/jobs/user/:id", get(handlers::jobs_for_user))
        .route("/jobs/jobStart/:id", put(handlers::start_job))
        .route("/jobs/jobEnd/:id", put(handlers::end_job))
        .route("/job/:id", get(handlers::get_job_detail))
        .route("/jobsPendiente", get(handlers::pending_jobs))
        .route("/notas/:id", put(handlers::set_note))
        .route("/createTaller", post(handlers::create_workshop))
        .route(
            "/finalizados/:fecha_inicio/:fecha_fin",
            get(handlers::finished_jobs),
        )
        // assignments
        .route(
            "/userjob",
            post(handlers::assign).put(handlers::reassign),
        )
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run the server.
pub async fn run(config: Config) -> Result<()> {
    let addr = SocketAddr::from_str(&config.addr)?;
    let app = app(AppState::try_new(config).await?);

    tracing::info!("listening on {}", addr);
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}
