use std::env;

use log::info;
use serde::{Deserialize, Serialize};

use laneway::{from_fn, json, Error, Next, Request, Response, Router, RouterConfig, StatusCode};

#[derive(Serialize, Deserialize)]
struct Health {
    status: String,
    version: String,
}

/// アプリケーション独自のレスポンスヘルパー
trait AwesomeResponse {
    fn awesome(&self) -> Result<(), Error>;
}

impl AwesomeResponse for Response {
    fn awesome(&self) -> Result<(), Error> {
        self.send_text("Awesome.")
    }
}

// ルートが処理しなかったリクエストに404を返すフォールバック
async fn not_found_fallback(_req: Request, res: Response, next: Next) -> Result<(), Error> {
    next.run().await?;
    if !res.is_finished() {
        res.set_status(StatusCode::NotFound);
        res.send_text("404")?;
    }
    Ok(())
}

async fn health(_req: Request) -> Result<Health, Error> {
    Ok(Health {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[actix_web::main]
async fn main() {
    // ロガーの初期化
    env_logger::init();

    let app = Router::builder()
        .config(RouterConfig::from_env())
        .middleware(from_fn(not_found_fallback))
        .get("/", from_fn(|_req, res: Response, _next| async move {
            res.send_text("Hello Laneway!")
        }))
        .get("/awesome", from_fn(|_req, res: Response, _next| async move { res.awesome() }))
        .get("/health", json(health))
        // クエリパラメータをそのまま返す
        .get("/echo", json(|req: Request| async move { Ok(req.query_params().clone()) }))
        // JSONボディをそのまま返す
        .post("/echo", json(|req: Request| async move {
            let body = req.body_json().await?;
            Ok((*body).clone())
        }))
        .build();

    let port = match env::var("PORT").unwrap_or_else(|_| "8080".to_string()).parse::<u16>() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error parsing port: {}", e);
            std::process::exit(1);
        }
    };
    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

    info!("Running as HTTP server on {}:{}", host, port);
    if let Err(e) = laneway::server::run_server(app, &host, port).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}
