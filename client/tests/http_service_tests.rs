mod common;

use actix_web::web;
use common::*;
use shared::Diagnosis;
use tempfile::tempdir;
use xray_client::repository::{
    HEALTH_CHECK_FAILED, MODEL_INFO_FAILED, SERVER_STARTING_UP, SERVER_WAKING_UP,
};
use xray_client::{
    ApiReply, ApiResult, HttpApiService, PneumoniaApi, PneumoniaRepository, TransportError,
};

fn service(base_url: &str) -> HttpApiService {
    let cache = tempdir().unwrap();
    HttpApiService::new(&config_for(base_url, cache.path())).unwrap()
}

#[actix_web::test]
async fn health_check_parses_body() {
    let base = spawn_server(|cfg| {
        cfg.route("/health", web::get().to(healthy));
    });

    match service(&base).check_health().await.unwrap() {
        ApiReply::Ok(health) => {
            assert_eq!(health.status, "healthy");
            assert!(health.model_loaded);
            assert_eq!(health.version, "2.1.0");
        }
        other => panic!("unexpected reply {:?}", other),
    }
}

#[actix_web::test]
async fn non_success_status_is_a_reply_not_an_error() {
    let base = spawn_server(|cfg| {
        cfg.route("/health", web::get().to(bad_gateway));
    });

    let reply = service(&base).check_health().await.unwrap();
    assert_eq!(
        reply,
        ApiReply::Failed {
            status: 502,
            body: "<html>502 Bad Gateway</html>".into()
        }
    );
}

#[actix_web::test]
async fn cold_start_502_maps_to_waking_up() {
    let base = spawn_server(|cfg| {
        cfg.route("/health", web::get().to(bad_gateway));
    });

    let repository = PneumoniaRepository::new(service(&base));
    let error = repository.check_health().await.error().cloned().unwrap();
    assert_eq!(error.message, SERVER_WAKING_UP);
    assert_eq!(error.code, 502);
}

#[actix_web::test]
async fn missing_route_keeps_status_code() {
    let base = spawn_server(|_cfg| {});

    let repository = PneumoniaRepository::new(service(&base));
    let error = repository.check_health().await.error().cloned().unwrap();
    assert_eq!(error.message, HEALTH_CHECK_FAILED);
    assert_eq!(error.code, 404);

    let error = repository.model_info().await.error().cloned().unwrap();
    assert_eq!(error.message, MODEL_INFO_FAILED);
    assert_eq!(error.code, 404);
}

#[actix_web::test]
async fn slow_health_check_times_out() {
    let base = spawn_server(|cfg| {
        cfg.route("/health", web::get().to(too_slow));
    });

    assert_eq!(
        service(&base).check_health().await,
        Err(TransportError::Timeout)
    );

    let repository = PneumoniaRepository::new(service(&base));
    let error = repository.check_health().await.error().cloned().unwrap();
    assert_eq!(error.message, SERVER_STARTING_UP);
    assert_eq!(error.code, 0);
}

#[actix_web::test]
async fn predict_uploads_multipart_file_field() {
    let base = spawn_server(|cfg| {
        cfg.route("/predict", web::post().to(predict_echo));
    });

    let reply = service(&base)
        .predict(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00], "xray_1.jpg")
        .await
        .unwrap();
    match reply {
        ApiReply::Ok(prediction) => {
            assert_eq!(prediction.model_info.note, "file:xray_1.jpg");
            assert_eq!(prediction.diagnosis_kind(), Some(Diagnosis::Pneumonia));
            assert_eq!(prediction.confidence, 92.5);
        }
        other => panic!("unexpected reply {:?}", other),
    }
}

#[actix_web::test]
async fn predict_rejection_carries_server_text() {
    let base = spawn_server(|cfg| {
        cfg.route("/predict", web::post().to(predict_rejects));
    });

    let repository = PneumoniaRepository::new(service(&base));
    let result = repository.predict(b"\xFF\xD8", "xray.jpg").await;
    let error = result.error().cloned().unwrap();
    assert_eq!(error.message, "Image could not be classified");
    assert_eq!(error.code, 422);
}

#[actix_web::test]
async fn unreadable_success_body_is_a_decode_error() {
    let base = spawn_server(|cfg| {
        cfg.route("/predict", web::post().to(garbled));
    });

    let outcome = service(&base).predict(b"\xFF\xD8", "xray.jpg").await;
    assert!(matches!(outcome, Err(TransportError::Decode(_))));
}

#[actix_web::test]
async fn model_info_is_free_form() {
    let base = spawn_server(|cfg| {
        cfg.route("/model-info", web::get().to(model_info));
    });

    let repository = PneumoniaRepository::new(service(&base));
    match repository.model_info().await {
        ApiResult::Success(info) => {
            assert_eq!(info["architecture"], "DenseNet121");
            assert_eq!(info["classes"][1], "PNEUMONIA");
        }
        other => panic!("unexpected result {:?}", other),
    }
}

#[actix_web::test]
async fn refused_connection_is_reported_without_code() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let base = format!("http://127.0.0.1:{}/", port);

    let outcome = service(&base).check_health().await;
    assert!(matches!(outcome, Err(TransportError::Connect(_))));

    let repository = PneumoniaRepository::new(service(&base));
    let error = repository.predict(b"\xFF\xD8", "xray.jpg").await.error().cloned().unwrap();
    assert_eq!(error.code, 0);
    assert!(!error.message.is_empty());
}
