#![allow(dead_code)]

use actix_multipart::Multipart;
use actix_web::{web, App, HttpResponse, HttpServer};
use futures::{StreamExt, TryStreamExt};
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use xray_client::ClientConfig;

/// Starts an HTTP server on an ephemeral port and returns its base URL.
pub fn spawn_server<F>(configure: F) -> String
where
    F: Fn(&mut web::ServiceConfig) + Send + Clone + 'static,
{
    let server = HttpServer::new(move || App::new().configure(configure.clone()))
        .workers(1)
        .bind(("127.0.0.1", 0))
        .expect("bind test server");
    let addr = server.addrs()[0];
    actix_web::rt::spawn(server.run());
    format!("http://{}/", addr)
}

pub fn config_for(base_url: &str, cache_dir: &Path) -> ClientConfig {
    let mut config = ClientConfig {
        base_url: base_url.to_string(),
        connect_timeout_secs: 5,
        request_timeout_secs: 1,
        cache_dir: cache_dir.to_path_buf(),
        ..ClientConfig::default()
    };
    config.validate().expect("valid test config");
    config
}

pub fn prediction_json(note: &str) -> serde_json::Value {
    json!({
        "success": true,
        "timestamp": "2025-11-02T10:15:30.123456",
        "diagnosis": "PNEUMONIA",
        "confidence": 92.5,
        "risk_level": "HIGH",
        "probability_scores": {"NORMAL": 7.5, "PNEUMONIA": 92.5},
        "recommendations": ["Consult a pulmonologist", "Follow-up X-ray in 2 weeks"],
        "model_info": {
            "model_name": "DenseNet121",
            "recall": "96.4%",
            "false_negative_rate": "3.6%",
            "note": note
        },
        "disclaimer": "Not a substitute for professional diagnosis."
    })
}

pub async fn healthy() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "model_loaded": true,
        "version": "2.1.0",
        "timestamp": "2025-11-02T10:15:30"
    }))
}

pub async fn bad_gateway() -> HttpResponse {
    HttpResponse::BadGateway().body("<html>502 Bad Gateway</html>")
}

pub async fn too_slow() -> HttpResponse {
    actix_web::rt::time::sleep(Duration::from_secs(3)).await;
    HttpResponse::Ok().finish()
}

/// Accepts a single `file` part holding a JPEG and echoes what it saw in `model_info.note`.
pub async fn predict_echo(mut payload: Multipart) -> HttpResponse {
    let mut seen = Vec::new();
    while let Ok(Some(mut field)) = payload.try_next().await {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .unwrap_or_default()
            .to_string();
        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            match chunk {
                Ok(bytes) => data.extend_from_slice(&bytes),
                Err(_) => return HttpResponse::BadRequest().body("broken upload"),
            }
        }
        seen.push((name, file_name, data));
    }

    match seen.as_slice() {
        [(name, file_name, data)] if name == "file" && data.starts_with(&[0xFF, 0xD8]) => {
            HttpResponse::Ok().json(prediction_json(&format!("{}:{}", name, file_name)))
        }
        [(name, _, _)] if name == "file" => HttpResponse::BadRequest().body("Invalid image file"),
        _ => HttpResponse::BadRequest().finish(),
    }
}

pub async fn predict_rejects() -> HttpResponse {
    HttpResponse::UnprocessableEntity().body("Image could not be classified")
}

pub async fn garbled() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("application/json")
        .body("{\"diagnosis\": ")
}

pub async fn model_info() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "architecture": "DenseNet121",
        "input_size": [224, 224],
        "classes": ["NORMAL", "PNEUMONIA"]
    }))
}

pub fn write_png(dir: &Path, name: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    image::RgbImage::from_fn(32, 32, |x, y| image::Rgb([x as u8 * 8, y as u8 * 8, 90]))
        .save(&path)
        .expect("write test png");
    path
}
