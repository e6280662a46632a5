use std::time::{Duration, Instant};

use cinema_search::catalog::{CatalogClient, CatalogError};
use serde_json::json;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

type TestResult<T> = Result<T, Box<dyn std::error::Error>>;

fn client(server: &MockServer, concurrency: usize) -> CatalogClient {
    CatalogClient::new(
        format!("{}/movies", server.uri()),
        concurrency,
        Duration::from_secs(5),
    )
    .expect("client should build")
}

async fn mount_total_pages(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/movies"))
        .and(query_param_is_missing("page"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_page(server: &MockServer, page: u32, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/movies"))
        .and(query_param("page", page.to_string()))
        .respond_with(response)
        .expect(1)
        .mount(server)
        .await;
}

fn page_body(movies: &[(&str, &str, serde_json::Value)]) -> serde_json::Value {
    let data: Vec<serde_json::Value> = movies
        .iter()
        .map(|(id, title, year)| json!({ "imdbID": id, "Title": title, "Year": year }))
        .collect();
    json!({ "page": 1, "data": data })
}

#[tokio::test]
async fn fetch_page_returns_the_data_array() -> TestResult<()> {
    let server = MockServer::start().await;
    mount_page(
        &server,
        1,
        ResponseTemplate::new(200).set_body_json(page_body(&[(
            "tt1234567",
            "Sample Movie",
            json!("2025"),
        )])),
    )
    .await;

    let movies = client(&server, 10).fetch_page(1).await?;
    assert_eq!(movies.len(), 1);
    assert_eq!(movies[0]["imdbID"], "tt1234567");
    assert_eq!(movies[0]["Title"], "Sample Movie");
    Ok(())
}

#[tokio::test]
async fn fetch_page_without_data_is_empty() -> TestResult<()> {
    let server = MockServer::start().await;
    mount_page(
        &server,
        3,
        ResponseTemplate::new(200).set_body_json(json!({ "page": 3 })),
    )
    .await;

    let movies = client(&server, 10).fetch_page(3).await?;
    assert!(movies.is_empty());
    Ok(())
}

#[tokio::test]
async fn fetch_all_pages_fetches_every_page_once() -> TestResult<()> {
    let server = MockServer::start().await;
    mount_total_pages(&server, json!({ "total_pages": 4 })).await;

    // The slow first page completes last; nothing depends on completion order.
    mount_page(
        &server,
        1,
        ResponseTemplate::new(200)
            .set_body_json(page_body(&[
                ("tt1", "A", json!(2000)),
                ("tt2", "B", json!("2001")),
            ]))
            .set_delay(Duration::from_millis(200)),
    )
    .await;
    mount_page(
        &server,
        2,
        ResponseTemplate::new(200).set_body_json(page_body(&[("tt3", "C", json!(2002))])),
    )
    .await;
    mount_page(
        &server,
        3,
        ResponseTemplate::new(200).set_body_json(json!({ "data": [] })),
    )
    .await;
    mount_page(
        &server,
        4,
        ResponseTemplate::new(200).set_body_json(page_body(&[("tt4", "D", json!(2003))])),
    )
    .await;

    let fetched = client(&server, 2).fetch_all_pages().await?;
    assert_eq!(fetched.pages, 4);
    assert_eq!(fetched.rejected, 0);

    let mut ids: Vec<&str> = fetched.movies.iter().map(|m| m.imdb_id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["tt1", "tt2", "tt3", "tt4"]);

    let second = fetched
        .movies
        .iter()
        .find(|m| m.imdb_id == "tt2")
        .expect("tt2 fetched");
    assert_eq!(second.year, 2001);
    Ok(())
}

#[tokio::test]
async fn missing_total_pages_means_nothing_to_fetch() -> TestResult<()> {
    let server = MockServer::start().await;
    mount_total_pages(&server, json!({})).await;

    let fetched = client(&server, 10).fetch_all_pages().await?;
    assert_eq!(fetched.pages, 0);
    assert!(fetched.movies.is_empty());
    Ok(())
}

#[tokio::test]
async fn unreadable_years_are_rejected_individually() -> TestResult<()> {
    let server = MockServer::start().await;
    mount_total_pages(&server, json!({ "total_pages": 1 })).await;
    mount_page(
        &server,
        1,
        ResponseTemplate::new(200).set_body_json(page_body(&[
            ("tt1", "A", json!("2000")),
            ("tt2", "B", json!("N/A")),
        ])),
    )
    .await;

    let fetched = client(&server, 10).fetch_all_pages().await?;
    assert_eq!(fetched.movies.len(), 1);
    assert_eq!(fetched.movies[0].imdb_id, "tt1");
    assert_eq!(fetched.rejected, 1);
    Ok(())
}

#[tokio::test]
async fn null_float_and_untitled_records_do_not_fail_the_page() -> TestResult<()> {
    let server = MockServer::start().await;
    mount_total_pages(&server, json!({ "total_pages": 1 })).await;
    mount_page(
        &server,
        1,
        ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "imdbID": "tt1", "Title": "A", "Year": 2000 },
                { "imdbID": "tt2", "Title": "B", "Year": null },
                { "imdbID": "tt3", "Title": "C", "Year": 1999.0 },
                { "imdbID": "tt4", "Year": 2001 },
            ]
        })),
    )
    .await;

    let fetched = client(&server, 10).fetch_all_pages().await?;
    let mut ids: Vec<&str> = fetched.movies.iter().map(|m| m.imdb_id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["tt1", "tt3"]);
    assert_eq!(fetched.rejected, 2);
    Ok(())
}

#[tokio::test]
async fn in_flight_pages_never_exceed_the_concurrency_limit() -> TestResult<()> {
    let delay = Duration::from_millis(200);
    let server = MockServer::start().await;
    mount_total_pages(&server, json!({ "total_pages": 6 })).await;
    for page in 1..=6 {
        mount_page(
            &server,
            page,
            ResponseTemplate::new(200)
                .set_body_json(page_body(&[(&format!("tt{page}"), "Movie", json!(2000))]))
                .set_delay(delay),
        )
        .await;
    }

    let started = Instant::now();
    let fetched = client(&server, 2).fetch_all_pages().await?;
    let elapsed = started.elapsed();

    assert_eq!(fetched.movies.len(), 6);
    // Six delayed pages, two at a time, take at least three rounds.
    assert!(elapsed >= delay * 3, "finished in {elapsed:?}");
    Ok(())
}

#[tokio::test]
async fn a_failing_page_fails_the_whole_fetch() {
    let server = MockServer::start().await;
    mount_total_pages(&server, json!({ "total_pages": 2 })).await;
    Mock::given(method("GET"))
        .and(path("/movies"))
        .and(query_param("page", "1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(page_body(&[("tt1", "A", json!(2000))])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/movies"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = client(&server, 10)
        .fetch_all_pages()
        .await
        .expect_err("fetch should fail");
    assert!(matches!(err, CatalogError::Request { .. }));
}

#[tokio::test]
async fn malformed_json_is_a_decode_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/movies"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client(&server, 10)
        .fetch_total_pages()
        .await
        .expect_err("decode should fail");
    assert!(matches!(err, CatalogError::Decode { .. }));
}
