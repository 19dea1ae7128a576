use httpmock::prelude::*;
use platform_clients::platforms::cloudflare::CloudflareClient;
use platform_clients::platforms::digitalocean::{DigitalOceanClient, DropletAction};
use platform_clients::platforms::github::{GitHubClient, IssueState, NewIssue};
use platform_clients::platforms::notion::NotionClient;
use platform_clients::platforms::vercel::VercelClient;
use platform_clients::{Error, PlatformConfig, PlatformKind, RuntimeMode};
use serde_json::json;
use std::time::Duration;

fn cfg(kind: PlatformKind, server: &MockServer) -> PlatformConfig {
    let mut cfg = kind.defaults().with_retry(1, Duration::from_millis(5));
    cfg.base_url = server.base_url();
    cfg
}

#[tokio::test]
async fn github_list_issues_drops_pull_requests() {
    let server = MockServer::start_async().await;
    let m = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/repos/octo/hello/issues")
                .query_param("state", "closed")
                .query_param("per_page", "100")
                .header("authorization", "Bearer ghp_x")
                .header("accept", "application/vnd.github+json")
                .header("x-github-api-version", "2022-11-28");
            then.status(200).json_body(json!([
                {
                    "id": 1, "number": 10, "title": "Crash on start", "state": "closed",
                    "html_url": "https://github.com/octo/hello/issues/10", "body": "trace",
                    "created_at": "2025-03-01T10:00:00Z", "updated_at": "2025-03-02T10:00:00Z"
                },
                {
                    "id": 2, "number": 11, "title": "Fix crash", "state": "closed",
                    "html_url": "https://github.com/octo/hello/pull/11", "body": null,
                    "created_at": "2025-03-01T11:00:00Z", "updated_at": "2025-03-02T11:00:00Z",
                    "pull_request": {"url": "https://api.github.com/repos/octo/hello/pulls/11"}
                }
            ]));
        })
        .await;

    let gh = GitHubClient::new(
        cfg(PlatformKind::GitHub, &server).with_access_token("ghp_x"),
        RuntimeMode::Development,
    )
    .unwrap();
    let issues = gh
        .list_issues("octo", "hello", IssueState::Closed, 500)
        .await
        .unwrap();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].number, 10);
    m.assert_hits_async(1).await;
}

#[tokio::test]
async fn github_file_contents_are_decoded() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/repos/octo/hello/contents/docs/README.md")
                .query_param("ref", "main");
            then.status(200).json_body(json!({
                "path": "docs/README.md", "sha": "abc123", "size": 11,
                "encoding": "base64", "content": "aGVsbG8g\nd29ybGQ=\n"
            }));
        })
        .await;
    let gh = GitHubClient::new(
        cfg(PlatformKind::GitHub, &server).with_access_token("t"),
        RuntimeMode::Development,
    )
    .unwrap();
    let file = gh
        .get_file_contents("octo", "hello", "/docs/README.md", Some("main"))
        .await
        .unwrap();
    assert_eq!(file.content, "hello world");
    assert_eq!(file.sha, "abc123");
}

#[tokio::test]
async fn github_create_issue_posts_payload() {
    let server = MockServer::start_async().await;
    let m = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/repos/octo/hello/issues")
                .json_body(json!({"title": "Docs typo", "labels": ["docs"]}));
            then.status(201).json_body(json!({
                "id": 5, "number": 12, "title": "Docs typo", "state": "open",
                "html_url": "https://github.com/octo/hello/issues/12", "body": null,
                "created_at": "2025-03-03T10:00:00Z", "updated_at": "2025-03-03T10:00:00Z"
            }));
        })
        .await;
    let gh = GitHubClient::new(
        cfg(PlatformKind::GitHub, &server).with_access_token("t"),
        RuntimeMode::Development,
    )
    .unwrap();
    let issue = gh
        .create_issue(
            "octo",
            "hello",
            &NewIssue {
                title: "Docs typo".into(),
                labels: vec!["docs".into()],
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(issue.number, 12);
    m.assert_hits_async(1).await;
}

#[tokio::test]
async fn github_not_found_surfaces_status() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/repos/octo/missing");
            then.status(404).json_body(json!({"message": "Not Found"}));
        })
        .await;
    let gh = GitHubClient::new(
        cfg(PlatformKind::GitHub, &server).with_access_token("t"),
        RuntimeMode::Development,
    )
    .unwrap();
    let err = gh.get_repo("octo", "missing").await.unwrap_err();
    assert_eq!(err.status(), Some(reqwest::StatusCode::NOT_FOUND));
}

#[tokio::test]
async fn cloudflare_zones_use_global_key_header() {
    let server = MockServer::start_async().await;
    let m = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/zones")
                .query_param("name", "example.com")
                .header("x-auth-key", "cf_key");
            then.status(200).json_body(json!({
                "success": true, "errors": [], "messages": [],
                "result": [{
                    "id": "023e105f4ecef8ad9ca31a8372d0c353", "name": "example.com",
                    "status": "active", "paused": false,
                    "name_servers": ["bob.ns.cloudflare.com"]
                }]
            }));
        })
        .await;
    let cf = CloudflareClient::new(
        cfg(PlatformKind::Cloudflare, &server).with_api_key("cf_key"),
        RuntimeMode::Development,
    )
    .unwrap();
    let zones = cf.list_zones(Some("example.com")).await.unwrap();
    assert_eq!(zones.len(), 1);
    assert_eq!(zones[0].name_servers, vec!["bob.ns.cloudflare.com"]);
    m.assert_hits_async(1).await;
}

#[tokio::test]
async fn cloudflare_failure_envelope_is_api_error() {
    let server = MockServer::start_async().await;
    let m = server
        .mock_async(|when, then| {
            when.method(DELETE).path("/zones/z1/dns_records/r1");
            then.status(200).json_body(json!({
                "success": false,
                "errors": [{"code": 81044, "message": "Record does not exist."}],
                "messages": [], "result": null
            }));
        })
        .await;
    let cf = CloudflareClient::new(
        cfg(PlatformKind::Cloudflare, &server).with_access_token("cf_token"),
        RuntimeMode::Development,
    )
    .unwrap();
    match cf.delete_dns_record("z1", "r1").await {
        Err(Error::Api { platform, message }) => {
            assert_eq!(platform, "cloudflare");
            assert_eq!(message, "Record does not exist. (81044)");
        }
        other => panic!("unexpected: {other:?}"),
    }
    // An envelope failure is a complete answer, not a failed attempt.
    m.assert_hits_async(1).await;
}

#[tokio::test]
async fn cloudflare_error_status_keeps_envelope_messages() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/zones/z1/dns_records");
            then.status(403).json_body(json!({
                "success": false,
                "errors": [{"code": 9109, "message": "Invalid access token"}],
                "messages": [], "result": null
            }));
        })
        .await;
    let cf = CloudflareClient::new(
        cfg(PlatformKind::Cloudflare, &server).with_access_token("expired"),
        RuntimeMode::Development,
    )
    .unwrap();
    match cf.list_dns_records("z1").await {
        Err(Error::Api { message, .. }) => {
            assert_eq!(message, "HTTP 403: Invalid access token (9109)")
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn cloudflare_requires_some_credential() {
    let cfg = PlatformKind::Cloudflare.defaults();
    assert!(matches!(
        CloudflareClient::new(cfg, RuntimeMode::Development),
        Err(Error::MissingCredentials { .. })
    ));
}

#[tokio::test]
async fn digitalocean_droplets_by_tag() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/droplets")
                .query_param("tag_name", "web")
                .query_param("per_page", "20");
            then.status(200).json_body(json!({
                "droplets": [{
                    "id": 3164444, "name": "web-1", "status": "active",
                    "memory": 1024, "vcpus": 1, "disk": 25,
                    "region": {"slug": "nyc3", "name": "New York 3"},
                    "tags": ["web"]
                }],
                "links": {}, "meta": {"total": 1}
            }));
        })
        .await;
    let dox = DigitalOceanClient::new(
        cfg(PlatformKind::DigitalOcean, &server).with_access_token("dop_v1_x"),
        RuntimeMode::Development,
    )
    .unwrap();
    let droplets = dox.list_droplets(Some("web"), 20).await.unwrap();
    assert_eq!(droplets.len(), 1);
    assert_eq!(droplets[0].region.slug, "nyc3");
}

#[tokio::test]
async fn digitalocean_droplet_action() {
    let server = MockServer::start_async().await;
    let m = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/droplets/42/actions")
                .json_body(json!({"type": "power_cycle"}));
            then.status(201).json_body(json!({
                "action": {"id": 7, "status": "in-progress", "type": "power_cycle",
                           "started_at": "2025-03-01T10:00:00Z"}
            }));
        })
        .await;
    let dox = DigitalOceanClient::new(
        cfg(PlatformKind::DigitalOcean, &server).with_access_token("t"),
        RuntimeMode::Development,
    )
    .unwrap();
    let action = dox.droplet_action(42, DropletAction::PowerCycle).await.unwrap();
    assert_eq!(action.status, "in-progress");
    m.assert_hits_async(1).await;
}

#[tokio::test]
async fn digitalocean_missing_envelope_key() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/account");
            then.status(200).json_body(json!({"id": "not_found"}));
        })
        .await;
    let dox = DigitalOceanClient::new(
        cfg(PlatformKind::DigitalOcean, &server).with_access_token("t"),
        RuntimeMode::Development,
    )
    .unwrap();
    assert!(matches!(dox.account().await, Err(Error::InvalidResponse(_))));
}

#[tokio::test]
async fn vercel_projects_and_deployments() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v9/projects").query_param("limit", "5");
            then.status(200).json_body(json!({
                "projects": [{"id": "prj_1", "name": "site", "framework": "nextjs",
                              "createdAt": 1700000000000i64, "updatedAt": 1700000100000i64}],
                "pagination": {"count": 1}
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v6/deployments")
                .query_param("projectId", "prj_1");
            then.status(200).json_body(json!({
                "deployments": [{"uid": "dpl_1", "name": "site", "url": "site-abc.vercel.app",
                                 "state": "READY", "readyState": "READY",
                                 "created": 1700000000000i64, "createdAt": 1700000000000i64}]
            }));
        })
        .await;
    let vercel = VercelClient::new(
        cfg(PlatformKind::Vercel, &server).with_access_token("vc_x"),
        RuntimeMode::Development,
    )
    .unwrap();
    let projects = vercel.list_projects(5).await.unwrap();
    assert_eq!(projects[0].framework.as_deref(), Some("nextjs"));
    let deployments = vercel.list_deployments(Some("prj_1"), 10).await.unwrap();
    assert_eq!(deployments[0].state.as_deref(), Some("READY"));
    assert_eq!(deployments[0].created, Some(1700000000000));

    server
        .mock_async(|when, then| {
            when.method(GET).path("/v13/deployments/dpl_1");
            then.status(200).json_body(json!({
                "id": "dpl_1", "name": "site", "url": "site-abc.vercel.app",
                "readyState": "ERROR", "createdAt": 1700000000000i64
            }));
        })
        .await;
    let single = vercel.get_deployment("dpl_1").await.unwrap();
    assert_eq!(single.uid, "dpl_1");
    assert_eq!(single.state.as_deref(), Some("ERROR"));
}

#[tokio::test]
async fn notion_search_is_camelized() {
    let server = MockServer::start_async().await;
    let m = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/search")
                .header("notion-version", "2022-06-28")
                .header("authorization", "Bearer secret_x")
                .json_body(json!({"query": "roadmap", "page_size": 10}));
            then.status(200).json_body(json!({
                "object": "list",
                "results": [{
                    "object": "page", "id": "p1",
                    "last_edited_time": "2025-03-01T10:00:00.000Z",
                    "parent": {"type": "database_id", "database_id": "d1"}
                }],
                "has_more": false, "next_cursor": null
            }));
        })
        .await;
    let notion = NotionClient::new(
        cfg(PlatformKind::Notion, &server).with_access_token("secret_x"),
        RuntimeMode::Development,
    )
    .unwrap();
    let results = notion.search("roadmap", 10).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["lastEditedTime"], "2025-03-01T10:00:00.000Z");
    assert_eq!(results[0]["parent"]["databaseId"], "d1");
    m.assert_hits_async(1).await;
}

#[tokio::test]
async fn notion_results_must_be_an_array() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/databases/d1/query");
            then.status(200).json_body(json!({"results": {"oops": true}}));
        })
        .await;
    let notion = NotionClient::new(
        cfg(PlatformKind::Notion, &server).with_access_token("t"),
        RuntimeMode::Development,
    )
    .unwrap();
    let err = notion.query_database("d1", None).await.unwrap_err();
    assert!(matches!(err, Error::InvalidResponse(_)));
}

#[tokio::test]
async fn notion_page_is_camelized() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/pages/p1")
                .header("notion-version", "2022-06-28");
            then.status(200).json_body(json!({
                "object": "page", "id": "p1", "created_time": "2025-03-01T10:00:00.000Z",
                "properties": {"Name": {"type": "title", "rich_text": []}}
            }));
        })
        .await;
    let notion = NotionClient::new(
        cfg(PlatformKind::Notion, &server).with_access_token("t"),
        RuntimeMode::Development,
    )
    .unwrap();
    let page = notion.get_page("p1").await.unwrap();
    assert_eq!(page["createdTime"], "2025-03-01T10:00:00.000Z");
    assert!(page["properties"]["Name"].get("richText").is_some());
}
