//! Stub backend for integration tests: a real actix server on an
//! ephemeral port whose behaviour is driven through shared state.
#![allow(dead_code)]

use actix_web::{
    App,
    HttpRequest,
    HttpResponse,
    HttpServer,
    dev::ServerHandle,
    web,
};
use serde_json::json;
use std::{
    net::TcpListener,
    sync::{
        Arc,
        Mutex,
        atomic::{
            AtomicBool,
            AtomicUsize,
            Ordering,
        },
    },
    thread::JoinHandle,
    time::Duration,
};

#[derive(Default)]
pub struct BackendState {
    /// Served as both `status` and `payment_status`; `None` means the
    /// payment row does not exist.
    pub payment_status: Mutex<Option<String>>,
    pub payment_id: Mutex<Option<String>>,
    pub remote_status: Mutex<String>,
    pub check_delay: Mutex<Duration>,
    pub payment_lookups: AtomicUsize,
    pub status_checks: AtomicUsize,

    /// `None` means the session does not exist.
    pub session_status: Mutex<Option<String>>,
    pub prize_amount: Mutex<f64>,
    pub roster: Mutex<Vec<String>>,
    pub fail_completion: AtomicBool,
    pub completion_writes: AtomicUsize,
    pub participant_writes: Mutex<Vec<String>>,
    pub prize_credits: Mutex<Vec<(String, f64)>>,
}

pub struct StubBackend {
    pub base_url: String,
    pub state: Arc<BackendState>,
    server_handle: ServerHandle,
    server_thread: Option<JoinHandle<()>>,
}

impl StubBackend {
    pub fn start(state: Arc<BackendState>) -> Self {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind stub backend");
        let address = listener.local_addr().expect("stub backend address");
        let base_url = format!("http://{}", address);

        let app_state = state.clone();
        let server = HttpServer::new(move || {
            App::new()
                .app_data(web::Data::from(app_state.clone()))
                .route("/payments/{order_id}", web::get().to(payment))
                .route(
                    "/functions/check-payment-status",
                    web::get().to(check_status),
                )
                .route("/sessions/{id}", web::get().to(session))
                .route("/sessions/{id}", web::patch().to(complete_session))
                .route("/sessions/{id}/participants", web::get().to(participants))
                .route(
                    "/sessions/{id}/participants/{user_id}",
                    web::patch().to(record_result),
                )
                .route("/rpc/add-mxi-from-challenges", web::post().to(credit))
        })
        .listen(listener)
        .expect("start stub backend")
        .run();

        let server_handle = server.handle();
        let server_thread = std::thread::spawn(move || {
            let sys = actix_web::rt::System::new();
            let _ = sys.block_on(server);
        });

        Self {
            base_url,
            state,
            server_handle,
            server_thread: Some(server_thread),
        }
    }
}

impl Drop for StubBackend {
    fn drop(&mut self) {
        let _ = self.server_handle.stop(true);
        if let Some(thread) = self.server_thread.take() {
            let _ = thread.join();
        }
    }
}

async fn payment(state: web::Data<BackendState>, path: web::Path<String>) -> HttpResponse {
    state.payment_lookups.fetch_add(1, Ordering::SeqCst);
    let order_id = path.into_inner();
    let status = state.payment_status.lock().unwrap().clone();
    match status {
        Some(status) => HttpResponse::Ok().json(json!({
            "id": "p-1",
            "order_id": order_id,
            "status": status.clone(),
            "payment_status": status,
            "payment_id": state.payment_id.lock().unwrap().clone(),
        })),
        None => HttpResponse::NotFound().finish(),
    }
}

async fn check_status(state: web::Data<BackendState>, req: HttpRequest) -> HttpResponse {
    state.status_checks.fetch_add(1, Ordering::SeqCst);
    let delay = *state.check_delay.lock().unwrap();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    if req.headers().get("authorization").is_none() {
        return HttpResponse::Unauthorized()
            .json(json!({"success": false, "error": "missing bearer token"}));
    }
    let status = state.remote_status.lock().unwrap().clone();
    HttpResponse::Ok().json(json!({"success": true, "status": status}))
}

async fn session(state: web::Data<BackendState>, path: web::Path<String>) -> HttpResponse {
    let id = path.into_inner();
    let status = state.session_status.lock().unwrap().clone();
    match status {
        Some(status) => HttpResponse::Ok().json(json!({
            "id": id,
            "status": status,
            "winner_user_id": null,
            "completed_at": null,
            "prize_amount": *state.prize_amount.lock().unwrap(),
        })),
        None => HttpResponse::NotFound().finish(),
    }
}

async fn complete_session(
    state: web::Data<BackendState>,
    body: web::Json<serde_json::Value>,
) -> HttpResponse {
    if state.fail_completion.load(Ordering::SeqCst) {
        return HttpResponse::InternalServerError().body("completion rejected");
    }
    state.completion_writes.fetch_add(1, Ordering::SeqCst);
    let status = body["status"].as_str().unwrap_or("completed").to_string();
    *state.session_status.lock().unwrap() = Some(status);
    HttpResponse::Ok().finish()
}

async fn participants(
    state: web::Data<BackendState>,
    path: web::Path<String>,
) -> HttpResponse {
    let session_id = path.into_inner();
    let roster: Vec<serde_json::Value> = state
        .roster
        .lock()
        .unwrap()
        .iter()
        .map(|user_id| json!({"session_id": session_id, "user_id": user_id}))
        .collect();
    HttpResponse::Ok().json(roster)
}

async fn record_result(
    state: web::Data<BackendState>,
    path: web::Path<(String, String)>,
) -> HttpResponse {
    let (_, user_id) = path.into_inner();
    state.participant_writes.lock().unwrap().push(user_id);
    HttpResponse::Ok().finish()
}

async fn credit(
    state: web::Data<BackendState>,
    body: web::Json<serde_json::Value>,
) -> HttpResponse {
    let user_id = body["p_user_id"].as_str().unwrap_or_default().to_string();
    let amount = body["p_amount"].as_f64().unwrap_or_default();
    state.prize_credits.lock().unwrap().push((user_id, amount));
    HttpResponse::Ok().finish()
}
