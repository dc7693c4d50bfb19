//! actix-webによるHTTPサーバー実装（トランスポート層）

use std::sync::Arc;

use actix_web::http::StatusCode as ActixStatusCode;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use futures::future::{self, Either, FutureExt};
use futures::StreamExt;
use log::{error, info, warn};

use crate::common::{BodySender, RawRequest, Response, ResponseParts};
use crate::error::Error;
use crate::Router;

/// actix-webのリクエストからURL（パス + クエリ）を取得
fn request_url(req: &HttpRequest) -> String {
    req.uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string())
}

/// 送信済みレスポンスからactix-webのHttpResponseに変換
fn convert_to_http_response(parts: ResponseParts) -> HttpResponse {
    let status = ActixStatusCode::from_u16(parts.status).unwrap_or_else(|_| {
        warn!("Invalid status code {}, falling back to 500", parts.status);
        ActixStatusCode::INTERNAL_SERVER_ERROR
    });
    let mut builder = HttpResponse::build(status);

    for (key, value) in parts.headers {
        builder.insert_header((key, value));
    }

    builder.body(parts.body)
}

/// actix-webのペイロードをボディチャネルへ流し込む
async fn pump_payload(mut payload: web::Payload, sender: BodySender, max_body_size: usize) {
    let mut received = 0usize;
    while let Some(chunk) = payload.next().await {
        match chunk {
            Ok(bytes) => {
                received += bytes.len();
                if received > max_body_size {
                    warn!("Request body too large: {} bytes (limit {})", received, max_body_size);
                    sender.fail(Error::PayloadTooLarge {
                        size: received,
                        limit: max_body_size,
                    });
                    return;
                }
                // 受信側が閉じていても残りは最後まで読み捨てる
                sender.send_chunk(bytes);
            }
            Err(e) => {
                sender.fail(Error::BodyStream(e.to_string()));
                return;
            }
        }
    }
    sender.finish();
}

/// チェーンが`end`前に失敗したときのエラーレスポンス
fn error_response(e: &Error) -> HttpResponse {
    HttpResponse::build(
        ActixStatusCode::from_u16(e.status_code()).unwrap_or(ActixStatusCode::INTERNAL_SERVER_ERROR),
    )
    .finish()
}

/// ルーターにリクエストを渡すactix-web用ハンドラー
///
/// `end`されたレスポンスは到着した時点で返す。残りのチェーンはバックグラウンドで完了させ、
/// その後のエラーはログに記録するだけにする。
async fn handle_request(
    req: HttpRequest,
    payload: web::Payload,
    app: web::Data<Arc<Router>>,
) -> HttpResponse {
    let url = request_url(&req);
    info!("Received request: {} {}", req.method(), url);

    let (raw, sender) = RawRequest::channel(req.method().as_str(), url);
    let (res, finished) = Response::channel();

    // ボディの受信とチェーンの実行を並行して進める
    let router = Arc::clone(app.get_ref());
    let pump = pump_payload(payload, sender, router.config().max_body_size);
    let chain = async move {
        let ((), outcome) = futures::join!(pump, router.dispatch(raw, res));
        outcome
    }
    .boxed_local();

    match future::select(finished, chain).await {
        Either::Left((Ok(parts), chain)) => {
            actix_web::rt::spawn(async move {
                if let Err(e) = chain.await {
                    error!("Dispatch error after the response was sent: {}", e);
                }
            });
            convert_to_http_response(parts)
        }
        // 全てのレスポンスハンドルが`end`されずにdropされた
        Either::Left((Err(_), chain)) => match chain.await {
            Err(e) => {
                error!("Dispatch error: {}", e);
                error_response(&e)
            }
            Ok(()) => {
                warn!("Request left unresolved: no interceptor ended the response");
                HttpResponse::InternalServerError().finish()
            }
        },
        Either::Right((Err(e), mut finished)) => match finished.try_recv() {
            // 同じポーリング内で`end`された後に失敗した
            Ok(parts) => {
                error!("Dispatch error after the response was sent: {}", e);
                convert_to_http_response(parts)
            }
            Err(_) => {
                error!("Dispatch error: {}", e);
                error_response(&e)
            }
        },
        // チェーンは完了したが、待たずに委譲された処理がまだ`end`するかもしれない
        Either::Right((Ok(()), finished)) => match finished.await {
            Ok(parts) => convert_to_http_response(parts),
            Err(_) => {
                warn!("Request left unresolved: no interceptor ended the response");
                HttpResponse::InternalServerError().finish()
            }
        },
    }
}

/// ルーターをHTTPサーバーとして実行
pub async fn run_server(app: Router, host: &str, port: u16) -> std::io::Result<()> {
    info!("Starting HTTP server on {}:{}", host, port);
    let listener = std::net::TcpListener::bind((host, port))?;
    bind_server(app, listener)?.await
}

/// 束縛済みのリスナーでサーバーを作成（ポート0で起動するテストなどに使う）
pub fn bind_server(app: Router, listener: std::net::TcpListener) -> std::io::Result<actix_web::dev::Server> {
    // アプリケーションをArcで包んでワーカー間で共有する
    let app_data = web::Data::new(Arc::new(app));

    Ok(HttpServer::new(move || {
        App::new()
            .app_data(app_data.clone())
            // すべてのメソッドとパスをルーターに渡す
            .default_service(web::to(handle_request))
    })
    .listen(listener)?
    .run())
}
