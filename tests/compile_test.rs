//! Whole-model compilation tests.
//!
//! These build a full declarative model the way the on-disk store would
//! and assert on the exact JSON document handed to the proxy engine.

use gateway_control::{compile, Data};
use serde_json::json;

fn model(yaml: &str) -> Data {
    let mut data: Data = serde_yaml::from_str(yaml).unwrap();
    data.apply_defaults();
    data
}

#[test]
fn test_full_document() {
    let data = model(
        r#"
        server:
          listen: ["example.com:8080"]
          http_port: 8080
          https_port: 8443
        services:
          users:
            url: localhost:8000
            dial_timeout: 2s
            max_requests: 100
          users-canary:
            url: localhost:8001
        routes:
          users:
            service_name: users
            methods: [GET, POST]
            paths: ["/users"]
            strip_prefix: /api
            priority: 1
        plugins:
          users-canary:
            type: canary
            route_name: users
            config:
              upstream: users-canary
              key: query.tid
              type: int
              whitelist: "$ > 0 && $ <= 10"
        "#,
    );

    let document = compile(&data).unwrap();

    let canary_expr =
        "int({http.request.uri.query.tid}) > 0 && int({http.request.uri.query.tid}) <= 10";
    assert_eq!(
        document,
        json!({
            "admin": { "listen": "localhost:2019" },
            "apps": {
                "http": {
                    "http_port": 8080,
                    "https_port": 8443,
                    "servers": {
                        "srv0": {
                            "automatic_https": { "disable": true },
                            "listen": [":8080"],
                            "logs": { "default_logger_name": "log0" },
                            "routes": [{
                                "match": [{ "host": ["example.com"] }],
                                "terminal": true,
                                "handle": [{
                                    "handler": "subroute",
                                    "routes": [
                                        {
                                            "match": [{
                                                "path": ["/users"],
                                                "method": ["GET", "POST"]
                                            }],
                                            "handle": [{
                                                "handler": "subroute",
                                                "routes": [
                                                    {
                                                        "handle": [{
                                                            "handler": "rewrite",
                                                            "strip_path_prefix": "/api"
                                                        }]
                                                    },
                                                    {
                                                        "match": [{ "expression": canary_expr }],
                                                        "handle": [{
                                                            "handler": "reverse_proxy",
                                                            "upstreams": [{ "dial": "localhost:8001" }],
                                                            "transport": {
                                                                "protocol": "http",
                                                                "dial_timeout": 0
                                                            }
                                                        }]
                                                    },
                                                    {
                                                        "handle": [{
                                                            "handler": "reverse_proxy",
                                                            "upstreams": [{
                                                                "dial": "localhost:8000",
                                                                "max_requests": 100
                                                            }],
                                                            "transport": {
                                                                "protocol": "http",
                                                                "dial_timeout": 2_000_000_000u64
                                                            }
                                                        }]
                                                    }
                                                ]
                                            }]
                                        },
                                        {
                                            "handle": [{
                                                "handler": "static_response",
                                                "status_code": 404
                                            }]
                                        }
                                    ]
                                }]
                            }]
                        }
                    }
                }
            },
            "logging": {
                "logs": {
                    "default": { "exclude": ["http.log.access.log0"] },
                    "log0": {
                        "include": ["http.log.access.log0"],
                        "writer": { "output": "stdout" }
                    }
                }
            }
        })
    );
}

#[test]
fn test_mixed_listeners_and_static_response() {
    let data = model(
        r#"
        server:
          listen: [":6060", "unix//var/run/gw.sock"]
          disable_access_log: true
        routes:
          health:
            paths: ["/health"]
            response: { status_code: 200, body: ok }
        "#,
    );

    let document = compile(&data).unwrap();
    let servers = &document["apps"]["http"]["servers"];

    // Sorted group keys: the TCP port sorts before the socket path.
    assert_eq!(servers["srv0"]["listen"], json!([":6060"]));
    assert_eq!(servers["srv1"]["listen"], json!(["unix//var/run/gw.sock"]));
    assert!(servers["srv0"].get("logs").is_none());

    let routes = servers["srv0"]["routes"][0]["handle"][0]["routes"]
        .as_array()
        .unwrap();
    assert_eq!(routes.len(), 2);
    assert_eq!(
        routes[0]["handle"][0]["routes"][0]["handle"][0],
        json!({ "handler": "static_response", "status_code": 200, "body": "ok" })
    );
}

#[test]
fn test_regexp_paths_produce_or_matches() {
    let data = model(
        r#"
        services:
          svc: { url: "localhost:8000" }
        routes:
          users:
            service_name: svc
            paths: ["/users", "~ver: /v\\d+/users"]
        "#,
    );

    let document = compile(&data).unwrap();
    let matches = &document["apps"]["http"]["servers"]["srv0"]["routes"][0]["handle"][0]["routes"]
        [0]["match"];

    assert_eq!(
        matches,
        &json!([
            { "path": ["/users"] },
            { "path_regexp": { "name": "ver", "pattern": "/v\\d+/users" } }
        ])
    );
}

#[test]
fn test_canary_upstream_must_exist() {
    let data = model(
        r#"
        services:
          svc: { url: "localhost:8000" }
        routes:
          users: { service_name: svc, paths: ["/users"] }
        plugins:
          users-canary:
            type: canary
            route_name: users
            config: { upstream: nowhere, key: query.tid, whitelist: "$ == 1" }
        "#,
    );

    let err = compile(&data).unwrap_err();
    assert_eq!(
        err.to_string(),
        r#"upstream service "nowhere" of plugin "users-canary" not found"#
    );
}

#[test]
fn test_dial_port_range_rejected_but_listen_range_allowed() {
    let data = model(
        r#"
        server:
          listen: [":8080-8090"]
        services:
          svc: { url: "localhost:8000" }
        routes:
          users: { service_name: svc, paths: ["/users"] }
        "#,
    );
    let document = compile(&data).unwrap();
    assert_eq!(
        document["apps"]["http"]["servers"]["srv0"]["listen"],
        json!([":8080-8090"])
    );

    let data = model(
        r#"
        services:
          svc: { url: "localhost:8080-8090" }
        routes:
          users: { service_name: svc, paths: ["/users"] }
        "#,
    );
    let err = compile(&data).unwrap_err();
    assert!(err.to_string().contains("cannot be used as a dial address"));
}
