//! Tests for the collect module

use super::*;
use crate::error::{Error, ErrorClass, Result};
use crate::http::{HttpClient, HttpClientConfig, TransportFailure};
use crate::pagination::{NextLinkPaginator, NoPaginator, OffsetPaginator};
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Item {
    id: String,
    name: String,
}

impl Record for Item {
    type Key = String;

    fn key(&self) -> String {
        self.id.clone()
    }
}

fn item(id: &str) -> Item {
    Item {
        id: id.to_string(),
        name: format!("item {id}"),
    }
}

fn extract_item(value: &Value) -> Result<Item> {
    let id = value
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::decode("item has no id"))?;
    Ok(Item {
        id: id.to_string(),
        name: value
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    })
}

fn ids(set: &ResultSet<Item>) -> Vec<&str> {
    set.iter().map(|i| i.id.as_str()).collect()
}

fn client_for(server: &MockServer) -> HttpClient {
    let config = HttpClientConfig::builder()
        .base_url(server.uri())
        .max_retries(0)
        .no_rate_limit()
        .build();
    HttpClient::with_config(config).unwrap()
}

/// In-memory page source driven by a closure
struct FnSource<F> {
    handler: F,
    calls: Mutex<Vec<String>>,
}

impl<F> FnSource<F>
where
    F: Fn(&str, &HashMap<String, String>) -> Result<Value> + Send + Sync,
{
    fn new(handler: F) -> Self {
        Self {
            handler,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl<F> PageSource for FnSource<F>
where
    F: Fn(&str, &HashMap<String, String>) -> Result<Value> + Send + Sync,
{
    async fn fetch_page(&self, url: &str, params: &HashMap<String, String>) -> Result<Value> {
        self.calls.lock().unwrap().push(url.to_string());
        (self.handler)(url, params)
    }
}

// ============================================================================
// ResultSet Tests
// ============================================================================

#[test]
fn test_result_set_rejects_duplicate_keys() {
    let mut set = ResultSet::new();
    assert!(set.insert(item("1")));
    assert!(set.insert(item("2")));
    assert!(!set.insert(Item {
        id: "1".to_string(),
        name: "other".to_string(),
    }));

    assert_eq!(set.len(), 2);
    assert_eq!(set.get(&"1".to_string()).unwrap().name, "item 1");
    assert!(set.contains(&"2".to_string()));
    assert!(!set.contains(&"3".to_string()));
}

#[test]
fn test_result_set_keeps_insertion_order() {
    let set: ResultSet<Item> = ["9", "1", "5", "1"].iter().map(|id| item(id)).collect();
    assert_eq!(ids(&set), vec!["9", "1", "5"]);
    assert_eq!(
        set.into_vec().into_iter().map(|i| i.id).collect::<Vec<_>>(),
        vec!["9", "1", "5"]
    );
}

#[test]
fn test_result_set_merge_counts_new() {
    let mut left: ResultSet<Item> = [item("a"), item("b")].into_iter().collect();
    let right: ResultSet<Item> = [item("b"), item("c"), item("d")].into_iter().collect();

    assert_eq!(left.merge(right), 2);
    assert_eq!(ids(&left), vec!["a", "b", "c", "d"]);
}

#[test]
fn test_result_set_empty() {
    let set: ResultSet<Item> = ResultSet::default();
    assert!(set.is_empty());
    assert_eq!(set.len(), 0);
}

// ============================================================================
// PageQuery Tests
// ============================================================================

#[test]
fn test_page_query_builder() {
    let query = PageQuery::new("https://wiki.example.com/", "/rest/api/space")
        .param("type", "global")
        .page_size(100)
        .limit(Some(10))
        .records_field("items");

    assert_eq!(query.base_url, "https://wiki.example.com");
    assert_eq!(query.url(), "https://wiki.example.com/rest/api/space");
    assert_eq!(query.parameters.get("type"), Some(&"global".to_string()));
    assert_eq!(query.page_size, 100);
    assert_eq!(query.limit, Some(10));
    assert_eq!(query.records_field, "items");
}

#[test]
fn test_page_query_resolve() {
    let query = PageQuery::new("https://host/wiki", "rest/api/space");

    assert_eq!(query.url(), "https://host/wiki/rest/api/space");
    assert_eq!(
        query.resolve("/rest/api/space?start=25"),
        "https://host/wiki/rest/api/space?start=25"
    );
    assert_eq!(
        query.resolve("https://other/rest/api/space"),
        "https://other/rest/api/space"
    );
}

#[test]
fn test_page_query_same_origin() {
    let query = PageQuery::new("https://host/wiki", "rest/api/space");

    assert!(query.is_same_origin("/rest/api/space?start=25"));
    assert!(query.is_same_origin("https://host/wiki/rest/api/space?start=25"));
    assert!(query.is_same_origin("https://host:443/other"));
    assert!(!query.is_same_origin("https://other/rest/api/space"));
    assert!(!query.is_same_origin("http://host/wiki/rest/api/space"));
    assert!(!query.is_same_origin("https://host:8443/wiki/rest/api/space"));
}

#[test]
fn test_tree_limits_default() {
    let limits = TreeLimits::default();
    assert_eq!(limits.max_depth, 16);
    assert_eq!(limits.max_nodes, 10_000);
}

#[test]
fn test_collect_stats_merge() {
    let mut total = CollectStats::new();
    let mut other = CollectStats::new();
    other.pages_fetched = 2;
    other.records_added = 3;
    other.limit_reached = true;
    other.add_failure("http://x", &Error::malformed("bad"));

    total.merge(&other);
    total.merge(&other);

    assert_eq!(total.pages_fetched, 4);
    assert_eq!(total.records_added, 6);
    assert!(total.limit_reached);
    assert_eq!(total.failures.len(), 2);
    assert!(!total.is_complete());
}

// ============================================================================
// Collector Tests (HTTP)
// ============================================================================

#[tokio::test]
async fn test_collect_follows_next_links_without_duplicates() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/api/space"))
        .and(query_param("start", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"id": "c"}, {"id": "a"}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/api/space"))
        .and(query_param("start", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"id": "b"}],
            "_links": {"next": "/rest/api/space?start=2"}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/api/space"))
        .and(query_param("type", "global"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"id": "a"}, {"id": "b"}],
            "_links": {"next": "/rest/api/space?start=1"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let collector = Collector::new(client_for(&server));
    let query = PageQuery::new(server.uri(), "/rest/api/space").param("type", "global");

    let result = collector
        .collect(
            &query,
            &NextLinkPaginator::default(),
            &extract_item,
            ResultSet::new(),
        )
        .await;

    assert_eq!(ids(&result.records), vec!["a", "b", "c"]);
    assert_eq!(result.stats.pages_fetched, 3);
    assert_eq!(result.stats.items_seen, 5);
    assert_eq!(result.stats.records_extracted, 5);
    assert_eq!(result.stats.records_added, 3);
    assert!(result.stats.is_complete());
}

#[tokio::test]
async fn test_collect_offset_stops_at_total() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/api/search"))
        .and(query_param("start", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"id": "p1", "name": "Passwords"}],
            "totalSize": 2
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/api/search"))
        .and(query_param("start", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"id": "p2", "name": "Vault"}],
            "totalSize": 2
        })))
        .expect(1)
        .mount(&server)
        .await;

    let collector = Collector::new(client_for(&server));
    let query = PageQuery::new(server.uri(), "/rest/api/search")
        .param("cql", "text~\"password\"")
        .page_size(1);

    let result = collector
        .collect(
            &query,
            &OffsetPaginator::confluence(1),
            &extract_item,
            ResultSet::new(),
        )
        .await;

    assert_eq!(ids(&result.records), vec!["p1", "p2"]);
    assert_eq!(result.stats.pages_fetched, 2);
}

#[tokio::test]
async fn test_collect_limit_truncates_within_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/api/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"id": "1"}, {"id": "2"}, {"id": "3"}, {"id": "4"}, {"id": "5"}],
            "totalSize": 50
        })))
        .expect(1)
        .mount(&server)
        .await;

    let collector = Collector::new(client_for(&server));
    let query = PageQuery::new(server.uri(), "/rest/api/search")
        .page_size(5)
        .limit(Some(3));

    let result = collector
        .collect(
            &query,
            &OffsetPaginator::confluence(5),
            &extract_item,
            ResultSet::new(),
        )
        .await;

    assert_eq!(ids(&result.records), vec!["1", "2", "3"]);
    assert!(result.stats.limit_reached);
    assert_eq!(result.stats.pages_fetched, 1);
}

#[tokio::test]
async fn test_collect_zero_limit_sends_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": [{"id": "1"}]})))
        .expect(0)
        .mount(&server)
        .await;

    let collector = Collector::new(client_for(&server));
    let query = PageQuery::new(server.uri(), "/rest/api/search").limit(Some(0));

    let result = collector
        .collect(
            &query,
            &OffsetPaginator::confluence(25),
            &extract_item,
            ResultSet::new(),
        )
        .await;

    assert!(result.records.is_empty());
    assert!(result.stats.limit_reached);
    assert_eq!(result.stats.pages_fetched, 0);
}

#[tokio::test]
async fn test_collect_does_not_follow_next_link_to_other_host() {
    let server = MockServer::start().await;
    let elsewhere = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/api/group/staff/member"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"id": "a"}],
            "_links": {"next": format!("{}/collect?start=1", elsewhere.uri())}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": [{"id": "b"}]})))
        .expect(0)
        .mount(&elsewhere)
        .await;

    let collector = Collector::new(client_for(&server));
    let query = PageQuery::new(server.uri(), "/rest/api/group/staff/member");

    let result = collector
        .collect(
            &query,
            &NextLinkPaginator::default(),
            &extract_item,
            ResultSet::new(),
        )
        .await;

    assert_eq!(ids(&result.records), vec!["a"]);
    assert_eq!(result.stats.pages_fetched, 1);
    assert_eq!(result.stats.failures.len(), 1);
    assert_eq!(result.stats.failures[0].class, ErrorClass::MalformedResponse);
}

#[tokio::test]
async fn test_collect_http_error_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/api/space"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&server)
        .await;

    let collector = Collector::new(client_for(&server));
    let query = PageQuery::new(server.uri(), "/rest/api/space");

    let result = collector
        .collect(&query, &NoPaginator, &extract_item, ResultSet::new())
        .await;

    assert!(result.records.is_empty());
    assert_eq!(result.stats.failures.len(), 1);
    assert_eq!(result.stats.failures[0].class, ErrorClass::Transport);
    assert!(result.stats.failures[0].url.ends_with("/rest/api/space"));
}

#[tokio::test]
async fn test_collect_missing_records_field_is_malformed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/api/space"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "nope"})))
        .mount(&server)
        .await;

    let collector = Collector::new(client_for(&server));
    let query = PageQuery::new(server.uri(), "/rest/api/space");

    let result = collector
        .collect(&query, &NoPaginator, &extract_item, ResultSet::new())
        .await;

    assert!(result.records.is_empty());
    assert_eq!(result.stats.failures[0].class, ErrorClass::MalformedResponse);
}

// ============================================================================
// Collector Tests (in-memory)
// ============================================================================

#[tokio::test]
async fn test_collect_failure_keeps_earlier_pages() {
    let source = FnSource::new(|url: &str, _params: &HashMap<String, String>| {
        match url {
            "http://wiki/list" => Ok(json!({
                "results": [{"id": "1"}, {"id": "2"}],
                "_links": {"next": "/list/2"}
            })),
            "http://wiki/list/2" => Err(Error::transport(
                TransportFailure::ReadTimeout,
                url,
                "timed out",
            )),
            _ => Ok(json!({"results": [{"id": "never"}]})),
        }
    });
    let collector = Collector::new(source);
    let query = PageQuery::new("http://wiki", "/list");

    let result = collector
        .collect(
            &query,
            &NextLinkPaginator::default(),
            &extract_item,
            ResultSet::new(),
        )
        .await;

    assert_eq!(ids(&result.records), vec!["1", "2"]);
    assert_eq!(result.stats.pages_fetched, 2);
    assert_eq!(result.stats.failures.len(), 1);
    assert_eq!(result.stats.failures[0].url, "http://wiki/list/2");
    assert!(result.stats.failures[0].message.contains("read timeout"));
    assert_eq!(
        collector.source().calls(),
        vec!["http://wiki/list", "http://wiki/list/2"]
    );
}

#[tokio::test]
async fn test_collect_skips_unextractable_items() {
    let source = FnSource::new(|_: &str, _: &HashMap<String, String>| {
        Ok(json!({"results": [{"id": "1"}, {"title": "no id"}, {"id": "2"}]}))
    });
    let collector = Collector::new(source);
    let query = PageQuery::new("http://wiki", "/list");

    let result = collector
        .collect(&query, &NoPaginator, &extract_item, ResultSet::new())
        .await;

    assert_eq!(ids(&result.records), vec!["1", "2"]);
    assert_eq!(result.stats.records_skipped, 1);
    assert!(result.stats.is_complete());
}

#[tokio::test]
async fn test_collect_respects_page_cap() {
    let source = FnSource::new(|_: &str, _: &HashMap<String, String>| {
        Ok(json!({"results": [{"id": "loop"}], "_links": {"next": "/again"}}))
    });
    let collector = Collector::new(source).with_max_pages(3);
    let query = PageQuery::new("http://wiki", "/start");

    let result = collector
        .collect(
            &query,
            &NextLinkPaginator::default(),
            &extract_item,
            ResultSet::new(),
        )
        .await;

    assert_eq!(result.stats.pages_fetched, 3);
    assert!(result.stats.truncated);
    assert_eq!(result.records.len(), 1);
}

#[tokio::test]
async fn test_collect_threads_existing_accumulator() {
    let source = FnSource::new(|_: &str, _: &HashMap<String, String>| {
        Ok(json!({"results": [{"id": "old"}, {"id": "new"}]}))
    });
    let collector = Collector::new(source);
    let query = PageQuery::new("http://wiki", "/list");
    let acc: ResultSet<Item> = [item("old")].into_iter().collect();

    let result = collector
        .collect(&query, &NoPaginator, &extract_item, acc)
        .await;

    assert_eq!(ids(&result.records), vec!["old", "new"]);
    assert_eq!(result.stats.records_extracted, 2);
    assert_eq!(result.stats.records_added, 1);
}

#[tokio::test]
async fn test_collect_sends_paginator_params() {
    let source = FnSource::new(|_: &str, params: &HashMap<String, String>| {
        assert_eq!(params.get("limit"), Some(&"250".to_string()));
        assert_eq!(params.get("cql"), Some(&"text~\"x\"".to_string()));
        Ok(json!({"results": [], "totalSize": 0}))
    });
    let collector = Collector::new(source);
    let query = PageQuery::new("http://wiki", "/rest/api/search").param("cql", "text~\"x\"");

    let result = collector
        .collect(
            &query,
            &OffsetPaginator::confluence(250),
            &extract_item,
            ResultSet::new(),
        )
        .await;

    assert!(result.records.is_empty());
    assert_eq!(result.stats.pages_fetched, 1);
    assert!(result.stats.is_complete());
}

// ============================================================================
// Tree Collection Tests
// ============================================================================

/// Complete binary tree over ids 1..=size; `/root` returns node 1
fn binary_tree(size: u32) -> impl Fn(&str, &HashMap<String, String>) -> Result<Value> {
    move |url: &str, _: &HashMap<String, String>| {
        let id: u32 = match url.rsplit('/').next() {
            Some("root") => return Ok(json!({"results": [{"id": "1"}]})),
            Some(id) => id.parse().map_err(|_| Error::decode("bad id"))?,
            None => return Err(Error::decode("bad url")),
        };
        let results: Vec<Value> = [id * 2, id * 2 + 1]
            .into_iter()
            .filter(|child| *child <= size)
            .map(|child| json!({"id": child.to_string()}))
            .collect();
        Ok(json!({ "results": results }))
    }
}

fn node_children(record: &Item) -> Option<PageQuery> {
    Some(PageQuery::new("http://wiki", format!("/node/{}", record.id)))
}

#[tokio::test]
async fn test_collect_tree_visits_every_node_once() {
    let collector = Collector::new(FnSource::new(binary_tree(7)));
    let root = PageQuery::new("http://wiki", "/root");

    let tree = collector
        .collect_tree(
            &root,
            &NoPaginator,
            &extract_item,
            node_children,
            TreeLimits::default(),
            ResultSet::new(),
        )
        .await;

    assert_eq!(tree.records.len(), 7);
    assert_eq!(tree.visits.len(), 7);
    assert_eq!(tree.stats.records_added, 7);
    assert!(tree.stats.is_complete());

    let roots: Vec<_> = tree.roots().map(|v| v.key.as_str()).collect();
    assert_eq!(roots, vec!["1"]);

    let children: Vec<_> = tree
        .children_of(&"2".to_string())
        .map(|v| v.key.as_str())
        .collect();
    assert_eq!(children, vec!["4", "5"]);

    let depths: Vec<_> = tree.visits.iter().map(|v| v.depth).collect();
    assert_eq!(depths.iter().filter(|d| **d == 2).count(), 4);

    // Root plus one expansion per node
    assert_eq!(collector.source().calls().len(), 8);
}

#[tokio::test]
async fn test_collect_tree_respects_max_depth() {
    let collector = Collector::new(FnSource::new(binary_tree(15)));
    let root = PageQuery::new("http://wiki", "/root");
    let limits = TreeLimits {
        max_depth: 1,
        max_nodes: 100,
    };

    let tree = collector
        .collect_tree(
            &root,
            &NoPaginator,
            &extract_item,
            node_children,
            limits,
            ResultSet::new(),
        )
        .await;

    let mut keys: Vec<_> = tree.records.iter().map(|i| i.id.clone()).collect();
    keys.sort();
    assert_eq!(keys, vec!["1", "2", "3"]);
    assert!(tree.visits.iter().all(|v| v.depth <= 1));
}

#[tokio::test]
async fn test_collect_tree_respects_max_nodes() {
    let collector = Collector::new(FnSource::new(binary_tree(15)));
    let root = PageQuery::new("http://wiki", "/root");
    let limits = TreeLimits {
        max_depth: 16,
        max_nodes: 4,
    };

    let tree = collector
        .collect_tree(
            &root,
            &NoPaginator,
            &extract_item,
            node_children,
            limits,
            ResultSet::new(),
        )
        .await;

    assert_eq!(tree.records.len(), 4);
    assert!(tree.stats.truncated);
}

#[tokio::test]
async fn test_collect_tree_terminates_on_cycles() {
    // a -> b -> a
    let source = FnSource::new(|url: &str, _: &HashMap<String, String>| {
        let results = match url.rsplit('/').next() {
            Some("root") | Some("b") => json!([{"id": "a"}]),
            _ => json!([{"id": "b"}]),
        };
        Ok(json!({ "results": results }))
    });
    let collector = Collector::new(source);
    let root = PageQuery::new("http://wiki", "/root");

    let tree = collector
        .collect_tree(
            &root,
            &NoPaginator,
            &extract_item,
            node_children,
            TreeLimits::default(),
            ResultSet::new(),
        )
        .await;

    assert_eq!(ids(&tree.records), vec!["a", "b"]);
    assert_eq!(collector.source().calls().len(), 3);
}

#[tokio::test]
async fn test_collect_tree_failed_branch_does_not_stop_siblings() {
    let source = FnSource::new(|url: &str, params: &HashMap<String, String>| {
        if url.ends_with("/node/2") {
            return Err(Error::http_status(500, "boom"));
        }
        binary_tree(7)(url, params)
    });
    let collector = Collector::new(source);
    let root = PageQuery::new("http://wiki", "/root");

    let tree = collector
        .collect_tree(
            &root,
            &NoPaginator,
            &extract_item,
            node_children,
            TreeLimits::default(),
            ResultSet::new(),
        )
        .await;

    let mut keys: Vec<_> = tree.records.iter().map(|i| i.id.clone()).collect();
    keys.sort();
    assert_eq!(keys, vec!["1", "2", "3", "6", "7"]);
    assert_eq!(tree.stats.failures.len(), 1);
    assert!(tree.stats.failures[0].url.ends_with("/node/2"));
}
