//! STAC client tests against a mock server.
//!
//! Tests marked `#[ignore]` hit the live catalogs.
//! Run with: `cargo test -p tidemark-cloud -- --ignored live`

use std::time::Duration;

use mockito::Matcher;
use serde_json::json;
use tidemark_cloud::stac_client::{StacCatalog, StacClient, StacClientOptions};
use tidemark_cloud::{CloudError, HttpClient, StacSearchParams};

fn item(id: &str, cloud: f64) -> serde_json::Value {
    json!({
        "type": "Feature",
        "id": id,
        "properties": {"datetime": "2015-08-01T02:40:00Z", "eo:cloud_cover": cloud},
        "assets": {"green": {"href": format!("https://data.example.com/{id}/B03.tif")}}
    })
}

fn client(server: &mockito::ServerGuard, options: StacClientOptions) -> StacClient {
    let http = HttpClient::new(Duration::from_secs(5), 0).unwrap();
    StacClient::new(StacCatalog::Custom(server.url()), http, options)
}

fn sampang_2015() -> StacSearchParams {
    StacSearchParams::new()
        .bbox([113.35, -7.22, 113.38, -7.19])
        .datetime("2015-01-01T00:00:00Z/2015-12-31T23:59:59Z")
        .collection("sentinel-2-l2a")
        .cloud_cover_below(10.0)
}

#[tokio::test]
async fn search_sends_cloud_filter() {
    let mut server = mockito::Server::new_async().await;
    let search = server
        .mock("POST", "/search")
        .match_body(Matcher::PartialJson(json!({
            "collections": ["sentinel-2-l2a"],
            "bbox": [113.35, -7.22, 113.38, -7.19],
            "query": {"eo:cloud_cover": {"lt": 10.0}}
        })))
        .with_body(json!({"type": "FeatureCollection", "features": [item("a", 2.0)]}).to_string())
        .create_async()
        .await;

    let page = client(&server, StacClientOptions::default()).search(&sampang_2015()).await.unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page.features[0].properties.eo_cloud_cover, Some(2.0));
    search.assert_async().await;
}

#[tokio::test]
async fn search_all_follows_post_and_get_links() {
    let mut server = mockito::Server::new_async().await;
    let first = server
        .mock("POST", "/search")
        .with_body(
            json!({
                "type": "FeatureCollection",
                "features": [item("a", 1.0)],
                "links": [{
                    "rel": "next",
                    "href": format!("{}/search/page2", server.url()),
                    "method": "POST",
                    "body": {"token": "next:a"},
                    "merge": true
                }]
            })
            .to_string(),
        )
        .create_async()
        .await;
    let second = server
        .mock("POST", "/search/page2")
        .match_body(Matcher::PartialJson(json!({
            "token": "next:a",
            "collections": ["sentinel-2-l2a"]
        })))
        .with_body(
            json!({
                "type": "FeatureCollection",
                "features": [item("b", 4.0)],
                "links": [{"rel": "next", "href": format!("{}/page3", server.url())}]
            })
            .to_string(),
        )
        .create_async()
        .await;
    let third = server
        .mock("GET", "/page3")
        .with_body(json!({"type": "FeatureCollection", "features": [item("c", 9.0)], "links": []}).to_string())
        .create_async()
        .await;

    let items = client(&server, StacClientOptions::default()).search_all(&sampang_2015()).await.unwrap();
    let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, ["a", "b", "c"]);
    first.assert_async().await;
    second.assert_async().await;
    third.assert_async().await;
}

#[tokio::test]
async fn search_all_stops_at_max_items() {
    let mut server = mockito::Server::new_async().await;
    let page = server
        .mock("POST", "/search")
        .with_body(
            json!({
                "type": "FeatureCollection",
                "features": [item("a", 1.0), item("b", 1.0), item("c", 1.0)],
                "links": [{"rel": "next", "href": format!("{}/never", server.url())}]
            })
            .to_string(),
        )
        .create_async()
        .await;
    let never = server.mock("GET", "/never").expect(0).create_async().await;

    let options = StacClientOptions { max_items: 2, ..Default::default() };
    let items = client(&server, options).search_all(&sampang_2015()).await.unwrap();
    assert_eq!(items.len(), 2);
    page.assert_async().await;
    never.assert_async().await;
}

#[tokio::test]
async fn rejected_credentials_are_auth_errors() {
    let mut server = mockito::Server::new_async().await;
    server.mock("GET", "/").with_status(401).create_async().await;
    server.mock("POST", "/search").with_status(403).create_async().await;

    let c = client(&server, StacClientOptions::default());
    assert!(matches!(c.check_landing_page().await, Err(CloudError::Auth(_))));
    assert!(c.search(&sampang_2015()).await.unwrap_err().is_auth());
}

#[tokio::test]
async fn landing_page_is_read() {
    let mut server = mockito::Server::new_async().await;
    let landing = server
        .mock("GET", "/")
        .with_body(json!({"type": "Catalog", "id": "mock", "title": "Mock STAC", "links": []}).to_string())
        .create_async()
        .await;
    client(&server, StacClientOptions::default()).check_landing_page().await.unwrap();
    landing.assert_async().await;
}

#[tokio::test]
async fn hrefs_are_signed_through_endpoint() {
    let mut server = mockito::Server::new_async().await;
    let href = "https://data.example.com/a/B03.tif";
    let sign = server
        .mock("GET", "/sign")
        .match_query(Matcher::UrlEncoded("href".into(), href.into()))
        .with_body(json!({"href": format!("{href}?sig=abc"), "msft:expiry": "2030-01-01T00:00:00Z"}).to_string())
        .create_async()
        .await;

    let options = StacClientOptions { sign_url: Some(format!("{}/sign", server.url())), ..Default::default() };
    let c = client(&server, options);
    let signed = c.sign_href(href).await.unwrap();
    assert_eq!(signed, format!("{href}?sig=abc"));
    sign.assert_async().await;
}

#[tokio::test]
async fn signing_failure_is_auth_error() {
    let mut server = mockito::Server::new_async().await;
    server.mock("GET", "/sign").match_query(Matcher::Any).with_status(500).create_async().await;

    let options = StacClientOptions { sign_url: Some(format!("{}/sign", server.url())), ..Default::default() };
    let err = client(&server, options).sign_href("https://data.example.com/x.tif").await.unwrap_err();
    assert!(err.is_auth(), "{err}");
}

#[tokio::test]
async fn public_catalog_hrefs_pass_through() {
    let server = mockito::Server::new_async().await;
    let c = client(&server, StacClientOptions::default());
    let item: tidemark_cloud::StacItem = serde_json::from_value(item("a", 1.0)).unwrap();

    assert_eq!(c.asset_href(&item, "green").await.unwrap(), "https://data.example.com/a/B03.tif");
    let missing = c.asset_href(&item, "swir16").await.unwrap_err();
    assert!(matches!(missing, CloudError::MissingAsset { .. }));
}

#[tokio::test]
#[ignore]
async fn live_earth_search_sampang() {
    let http = HttpClient::new(Duration::from_secs(60), 2).unwrap();
    let c = StacClient::new(StacCatalog::EarthSearch, http, StacClientOptions::default());
    let params = StacSearchParams::new()
        .bbox([113.35, -7.22, 113.38, -7.19])
        .datetime("2020-01-01T00:00:00Z/2020-12-31T23:59:59Z")
        .collection("sentinel-2-l2a")
        .cloud_cover_below(10.0);

    let items = c.search_all(&params).await.expect("search failed");
    assert!(!items.is_empty());
    for item in &items {
        assert!(item.properties.eo_cloud_cover.unwrap_or(100.0) < 10.0);
        assert!(item.asset("green").is_some() && item.asset("swir16").is_some());
    }
}

#[tokio::test]
#[ignore]
async fn live_planetary_computer_signing() {
    let http = HttpClient::new(Duration::from_secs(60), 2).unwrap();
    let c = StacClient::new(StacCatalog::PlanetaryComputer, http, StacClientOptions::default());
    let params = sampang_2015().limit(1);

    let page = c.search(&params).await.expect("search failed");
    let item = page.features.first().expect("no items");
    let signed = c.asset_href(item, "B03").await.expect("signing failed");
    assert!(signed.contains("sig="));
}
