use actix_web::{middleware::Logger, web, App, HttpResponse, HttpServer};
use serde::Deserialize;
use std::collections::HashMap;

use crate::config::Config;
use crate::error::AppError;
use crate::explain::explain;
use crate::metrics::{DecodePolicy, StudentMetrics};
use crate::model::InferenceContext;
use crate::report::{form_page, PredictionReport, ResponseFormat};

/// Read-only state shared by every worker.
pub struct AppState {
    pub model: Option<InferenceContext>,
    pub policy: DecodePolicy,
    pub format: ResponseFormat,
}

impl AppState {
    fn model(&self) -> Result<&InferenceContext, AppError> {
        self.model.as_ref().ok_or(AppError::ModelUnavailable)
    }
}

#[derive(Deserialize)]
struct PredictQuery {
    format: Option<ResponseFormat>,
}

// Prediction endpoint: form fields in, outcome and commentary out
async fn predict(
    query: web::Query<PredictQuery>,
    form: web::Form<HashMap<String, String>>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let model = state.model()?;
    let metrics = StudentMetrics::from_fields(&form, &state.policy)?;
    let prediction = model.predict(&metrics);
    log::info!("Predicted {:?} for {:?}", prediction, metrics);

    let report = PredictionReport::build(prediction, metrics);
    let response = match query.format.unwrap_or(state.format) {
        ResponseFormat::Json => HttpResponse::Ok().json(report),
        ResponseFormat::Html => HttpResponse::Ok()
            .content_type("text/html; charset=utf-8")
            .body(report.to_html()),
    };
    Ok(response)
}

// Commentary only; works without a model
async fn explain_metrics(
    body: web::Json<serde_json::Value>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let metrics = StudentMetrics::from_json(&body, &state.policy)?;
    Ok(HttpResponse::Ok().json(explain(&metrics)))
}

async fn get_model_info(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(state.model()?.info()))
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().body("Student Insight API is running!")
}

async fn serve_homepage() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(form_page())
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        AppError::BadRequest(err.to_string()).into()
    }))
    .app_data(web::FormConfig::default().error_handler(|err, _req| {
        AppError::BadRequest(err.to_string()).into()
    }))
    .app_data(web::QueryConfig::default().error_handler(|err, _req| {
        AppError::BadRequest(err.to_string()).into()
    }));

    cfg.route("/", web::get().to(serve_homepage))
        .route("/predict", web::post().to(predict))
        .route("/explain", web::post().to(explain_metrics))
        .route("/model/info", web::get().to(get_model_info))
        .route("/health", web::get().to(health_check));
}

pub async fn run(config: &Config, model: Option<InferenceContext>) -> std::io::Result<()> {
    let state = web::Data::new(AppState {
        model,
        policy: config.decode_policy(),
        format: config.format,
    });

    log::info!("Starting Student Insight API on http://{}:{}", config.host, config.port);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
