//! Cloudinary uploads and the remote capture/listing round trip.

mod common;

use std::sync::{Arc, Mutex};

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use common::{part, read_parts, ReceivedPart};
use fieldlog::media::CloudinaryMedia;
use fieldlog::store::RestStore;
use fieldlog::{
    CaptureFlow, Coordinates, Error, Listing, MediaStore, Photo, RecordDraft, RecordStore,
};

#[derive(Clone, Default)]
struct Mock {
    uploads: Arc<Mutex<Vec<Vec<ReceivedPart>>>>,
    rows: Arc<Mutex<Vec<Value>>>,
}

async fn upload(State(mock): State<Mock>, multipart: Multipart) -> Response {
    let parts = read_parts(multipart).await;
    let preset = parts
        .iter()
        .find(|p| p.name == "upload_preset")
        .map(ReceivedPart::text);
    if preset.as_deref() != Some("unsigned") {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": { "message": "Upload preset not found" } })),
        )
            .into_response();
    }
    mock.uploads.lock().unwrap().push(parts);
    Json(json!({
        "public_id": "field/abc123",
        "secure_url": "https://res.cloudinary.com/demo/image/upload/v1/field/abc123.jpg",
        "format": "jpg"
    }))
    .into_response()
}

async fn select(State(mock): State<Mock>) -> Json<Vec<Value>> {
    Json(mock.rows.lock().unwrap().clone())
}

async fn insert(State(mock): State<Mock>, Json(mut row): Json<Value>) -> (StatusCode, Json<Value>) {
    row["id"] = json!("9f1c");
    row["created_at"] = json!("2024-01-05T08:00:00Z");
    mock.rows.lock().unwrap().push(row.clone());
    (StatusCode::CREATED, Json(json!([row])))
}

async fn start() -> (String, Mock) {
    let mock = Mock::default();
    let app = Router::new()
        .route("/v1_1/demo/image/upload", post(upload))
        .route("/rest/v1/user_details", get(select).post(insert))
        .with_state(mock.clone());
    (common::serve(app).await, mock)
}

fn media(base: &str, preset: &str) -> CloudinaryMedia {
    CloudinaryMedia::new(
        reqwest::Client::new(),
        &format!("{base}/v1_1"),
        "demo",
        preset,
        None,
    )
    .unwrap()
}

#[tokio::test]
async fn test_upload_returns_public_id() {
    let (base, mock) = start().await;
    let photo = Photo::from_bytes("IMG_1.jpg", vec![0xFF, 0xD8, 0xFF]);

    let reference = media(&base, "unsigned").upload(&photo).await.unwrap();
    assert_eq!(reference, "field/abc123");

    let uploads = mock.uploads.lock().unwrap();
    let file = part(&uploads[0], "file");
    assert_eq!(file.file_name.as_deref(), Some("image.jpg"));
    assert_eq!(file.content_type.as_deref(), Some("image/jpeg"));
    assert_eq!(file.bytes, [0xFF, 0xD8, 0xFF]);
}

#[tokio::test]
async fn test_upload_error_message() {
    let (base, _) = start().await;
    let photo = Photo::from_bytes("IMG_1.jpg", vec![1]);

    match media(&base, "missing").upload(&photo).await.unwrap_err() {
        Error::MediaUpload { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Upload preset not found");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_capture_then_list_resolves_cdn_url() {
    let (base, mock) = start().await;
    let store = Arc::new(
        RestStore::new(reqwest::Client::new(), &base, "anon", "user_details").unwrap(),
    );
    let media = Arc::new(media(&base, "unsigned"));
    let flow = CaptureFlow::new(store.clone(), media.clone(), Coordinates::placeholder());

    let draft = RecordDraft {
        name: "A".to_string(),
        email: "a@b.com".to_string(),
        designation: "D".to_string(),
        description: "desc".to_string(),
        photo: Some(Photo::from_bytes("well.jpg", vec![1, 2, 3])),
    };
    let created = flow.submit(&draft, Coordinates::new(1.0, 2.0)).await.unwrap();
    assert_eq!(created.id.as_str(), "9f1c");
    assert_eq!(created.image.as_deref(), Some("field/abc123"));
    assert_eq!(mock.rows.lock().unwrap()[0]["image"], json!("field/abc123"));

    let mut listing = Listing::new(media.base_url());
    assert_eq!(listing.refresh(store.as_ref()).await.unwrap(), 1);
    assert_eq!(
        listing.records()[0].image_url.as_deref(),
        Some("https://res.cloudinary.com/demo/image/upload/field/abc123")
    );
}

#[tokio::test]
async fn test_failed_upload_creates_nothing() {
    let (base, mock) = start().await;
    let store = Arc::new(
        RestStore::new(reqwest::Client::new(), &base, "anon", "user_details").unwrap(),
    );
    let flow = CaptureFlow::new(
        store.clone(),
        Arc::new(media(&base, "missing")),
        Coordinates::placeholder(),
    );

    let draft = RecordDraft {
        name: "A".to_string(),
        email: "a@b.com".to_string(),
        designation: "D".to_string(),
        description: "desc".to_string(),
        photo: Some(Photo::from_bytes("well.jpg", vec![1])),
    };
    assert!(flow.submit(&draft, flow.placeholder()).await.is_err());
    assert!(mock.rows.lock().unwrap().is_empty());
    assert!(store.list().await.unwrap().is_empty());
}
