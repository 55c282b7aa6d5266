use dav2csv::{WebDAVConfig, WebDAVService};
use tempfile::tempdir;
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn service_for(server: &MockServer) -> WebDAVService {
    let mut config = WebDAVConfig::new(server.uri());
    config.base_path = "/remote.php/dav/files/alice/".to_string();
    config.username = Some("alice".to_string());
    config.password = Some("secret".to_string());
    config.timeout_seconds = 5;
    WebDAVService::new(config).expect("Failed to create WebDAV service")
}

#[tokio::test]
async fn test_upload_streams_file_with_length() {
    let server = MockServer::start().await;
    let payload = "x".repeat(10_000);

    Mock::given(method("PUT"))
        .and(path("/remote.php/dav/files/alice/inbox/big.txt"))
        .and(header("Content-Length", "10000"))
        .and(body_string(payload.clone()))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let local = dir.path().join("big.txt");
    std::fs::write(&local, &payload).unwrap();

    let service = service_for(&server);
    let status = service.upload(&local, "inbox/big.txt").await.expect("Upload should succeed");
    assert_eq!(status.as_u16(), 201);

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("expect").is_none());
    assert!(requests[0].headers.get("authorization").is_some());
}

#[tokio::test]
async fn test_upload_of_missing_file_fails_without_request() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();

    let service = service_for(&server);
    let err = service
        .upload(&dir.path().join("absent.txt"), "inbox/absent.txt")
        .await
        .unwrap_err();

    assert!(matches!(err, dav2csv::DavError::Io(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_download_writes_body_to_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/remote.php/dav/files/alice/Documents/readme%20first.md"))
        .respond_with(ResponseTemplate::new(200).set_body_string("# Read me\n"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let local = dir.path().join("readme.md");

    let service = service_for(&server);
    let status = service
        .download("/Documents/readme first.md", &local)
        .await
        .expect("Download should succeed");

    assert!(status.is_success());
    assert_eq!(std::fs::read_to_string(&local).unwrap(), "# Read me\n");
}

#[tokio::test]
async fn test_failed_download_leaves_no_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let local = dir.path().join("missing.txt");

    let service = service_for(&server);
    let status = service.download("missing.txt", &local).await.unwrap();

    assert_eq!(status.as_u16(), 404);
    assert!(!local.exists());
}

#[tokio::test]
async fn test_create_dir_sends_mkcol() {
    let server = MockServer::start().await;
    Mock::given(method("MKCOL"))
        .and(path("/remote.php/dav/files/alice/Projects/2024"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let service = service_for(&server);
    let status = service.create_dir("Projects/2024").await.unwrap();
    assert_eq!(status.as_u16(), 201);
}

#[tokio::test]
async fn test_create_dir_reports_conflict_status() {
    let server = MockServer::start().await;
    Mock::given(method("MKCOL"))
        .respond_with(ResponseTemplate::new(405))
        .mount(&server)
        .await;

    let service = service_for(&server);
    let status = service.create_dir("Projects").await.unwrap();
    assert_eq!(status.as_u16(), 405);
}

#[tokio::test]
async fn test_delete_keeps_trailing_slash_of_collections() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/remote.php/dav/files/alice/old/"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/remote.php/dav/files/alice/old.txt"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let service = service_for(&server);
    assert_eq!(service.delete("old/").await.unwrap().as_u16(), 204);
    assert_eq!(service.delete("/old.txt").await.unwrap().as_u16(), 204);
}
