//! HTTP server implementation
//!
//! hyper http1 with TokioIo, one task per connection. Requests are routed by
//! path prefix to the resource handlers in `crate::routes`.

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{HeaderMap, Method, Request, Response};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::auth::{authenticate, AuthUser, JwtValidator};
use crate::config::Args;
use crate::db::schemas::{
    CategoryDoc, CommentDoc, EmailDoc, PostDoc, UserDoc, CATEGORY_COLLECTION, COMMENT_COLLECTION,
    EMAIL_COLLECTION, POST_COLLECTION, USER_COLLECTION,
};
use crate::db::{EntityStore, MongoClient, MongoCollection, MongoStore};
use crate::routes::{self, BoxBody};
use crate::services::{FollowService, LogMailer, Mailer, ReactionEngine, SendGridMailer, TokenWorkflow};
use crate::types::{Result, ScribeError};

/// Typed handles on every collection the routes read or write
#[derive(Clone)]
pub struct Collections {
    pub users: MongoCollection<UserDoc>,
    pub posts: MongoCollection<PostDoc>,
    pub comments: MongoCollection<CommentDoc>,
    pub categories: MongoCollection<CategoryDoc>,
    pub emails: MongoCollection<EmailDoc>,
}

impl Collections {
    pub async fn open(mongo: &MongoClient) -> Result<Self> {
        Ok(Self {
            users: mongo.collection(USER_COLLECTION).await?,
            posts: mongo.collection(POST_COLLECTION).await?,
            comments: mongo.collection(COMMENT_COLLECTION).await?,
            categories: mongo.collection(CATEGORY_COLLECTION).await?,
            emails: mongo.collection(EMAIL_COLLECTION).await?,
        })
    }
}

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub mongo: MongoClient,
    pub db: Collections,
    pub store: Arc<dyn EntityStore>,
    pub reactions: ReactionEngine,
    pub follows: FollowService,
    pub tokens: TokenWorkflow,
    pub mailer: Arc<dyn Mailer>,
    pub jwt: JwtValidator,
}

impl AppState {
    /// Connect to MongoDB and wire up the services
    pub async fn connect(args: Args) -> Result<Self> {
        let jwt = args.jwt_validator()?;
        let mongo = MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await?;
        let db = Collections::open(&mongo).await?;
        let store: Arc<dyn EntityStore> = Arc::new(MongoStore::open(&mongo).await?);

        let mailer: Arc<dyn Mailer> = match (&args.sendgrid_api_key, args.dev_mode) {
            (Some(key), false) => Arc::new(SendGridMailer::new(key.clone())?),
            _ => Arc::new(LogMailer),
        };

        Ok(Self {
            reactions: ReactionEngine::new(Arc::clone(&store)),
            follows: FollowService::new(Arc::clone(&store)),
            tokens: TokenWorkflow::new(Arc::clone(&store), args.token_ttl()),
            store,
            mailer,
            jwt,
            db,
            mongo,
            args,
        })
    }

    /// Resolve the caller of a request
    pub async fn auth(&self, headers: &HeaderMap) -> Result<AuthUser> {
        authenticate(headers, &self.jwt, self.store.as_ref()).await
    }
}

/// Run the HTTP server until the process exits
pub async fn run(state: Arc<AppState>) -> std::result::Result<(), ScribeError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "Scribe listening on {} (database '{}', mail via {})",
        state.args.listen,
        state.mongo.db_name(),
        state.mailer.name()
    );

    if state.args.dev_mode {
        warn!("Development mode enabled - fixed JWT secret, mail is only logged");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .preserve_header_case(true)
                        .title_case_headers(true)
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> std::result::Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    info!("[{}] {} {}", addr, method, path);

    let response = match (&method, path.as_str()) {
        (&Method::OPTIONS, _) => routes::cors_preflight(),

        (&Method::GET, "/health") | (&Method::GET, "/healthz") => {
            routes::health_check(&state).await
        }

        (_, p) if routes::path_segments(p, "/api/users").is_some() => {
            routes::handle_user_request(req, state).await
        }
        (_, p) if routes::path_segments(p, "/api/posts").is_some() => {
            routes::handle_post_request(req, state).await
        }
        (_, p) if routes::path_segments(p, "/api/comments").is_some() => {
            routes::handle_comment_request(req, state).await
        }
        (_, p) if routes::path_segments(p, "/api/category").is_some() => {
            routes::handle_category_request(req, state).await
        }
        (_, p) if routes::path_segments(p, "/api/emails").is_some() => {
            routes::handle_email_request(req, state).await
        }

        _ => routes::not_found_response(&path),
    };

    Ok(response)
}
