use async_trait::async_trait;
use mxa_core::{AccessError, FetchOutcome, RecordAccess, ReportStatus, Reportable};
use mxa_strategy::{HttpRequest, HttpResponse, StrategyKind, Transport, TransportError};
use mxa_test_utils::{
    asset_key, member_page, oslc_asset, rdfs_page, rest_asset, test_access, test_config, Rule,
    ScriptedTransport,
};
use mxa_wire::{Condition, FieldValue, ResourceKey, ResourceType, SearchCriteria};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_fetch_normalizes_oslc_records() {
    let transport = Arc::new(ScriptedTransport::new().with_rule(
        Rule::get("oslc/os/mxasset")
            .respond(200, &rdfs_page(vec![oslc_asset("13150", "BEDFORD", "ACTIVE")])),
    ));
    let access = test_access(&transport);

    let fields = vec!["status".to_string(), "spi:Description".to_string()];
    let outcome = access
        .fetch(&asset_key("13150", "BEDFORD"), Some(&fields))
        .await
        .unwrap();

    let FetchOutcome::Found { records, strategy } = outcome else {
        panic!("expected records");
    };
    assert_eq!(strategy, StrategyKind::OslcNamespaced);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].get("assetnum"), Some(&FieldValue::from("13150")));
    assert_eq!(records[0].get("status"), Some(&FieldValue::from("ACTIVE")));
    assert_eq!(records[0].get("description"), Some(&FieldValue::from("Asset 13150")));
    assert!(!records[0].contains("_rowstamp"));

    let read = &transport.reads()[0];
    assert_eq!(
        read.query_value("oslc.select"),
        Some("spi:assetnum,spi:status,spi:description")
    );
    assert!(read.query_value("_ts").is_some());
}

#[tokio::test]
async fn test_fetch_falls_back_to_rest_in_order() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .with_rule(Rule::get("oslc/os/mxasset").respond_raw(404, "not deployed"))
            .with_rule(
                Rule::get("api/os/mxasset")
                    .respond(200, &member_page(vec![rest_asset("13150", "BEDFORD", "ACTIVE")])),
            ),
    );
    let access = test_access(&transport);

    let outcome = access.fetch(&asset_key("13150", "BEDFORD"), None).await.unwrap();
    assert!(matches!(
        outcome,
        FetchOutcome::Found {
            strategy: StrategyKind::RestPlain,
            ..
        }
    ));

    let urls: Vec<String> = transport.reads().into_iter().map(|r| r.url).collect();
    assert_eq!(
        urls,
        vec![
            "https://mx.test/maximo/oslc/os/mxasset".to_string(),
            "https://mx.test/maximo/api/os/mxasset".to_string()
        ]
    );
    let rest = &transport.reads()[1];
    assert_eq!(rest.query_value("lean"), Some("1"));
    assert_eq!(
        rest.query_value("oslc.where"),
        Some(r#"assetnum="13150" and siteid="BEDFORD""#)
    );
}

#[tokio::test]
async fn test_fetch_in_list_and_not_found() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .with_rule(
                Rule::get("oslc/os/mxasset")
                    .times(1)
                    .respond(
                        200,
                        &rdfs_page(vec![
                            oslc_asset("1001", "BEDFORD", "ACTIVE"),
                            oslc_asset("1002", "BEDFORD", "ACTIVE"),
                        ]),
                    ),
            )
            .with_rule(Rule::get("oslc/os/mxasset").respond(200, &json!({"member": []}))),
    );
    let access = test_access(&transport);

    let key = ResourceKey::parse(ResourceType::Asset, "1001, 1002", None).unwrap();
    let outcome = access.fetch(&key, None).await.unwrap();
    assert_eq!(outcome.records().len(), 2);
    assert_eq!(
        transport.reads()[0].query_value("oslc.where"),
        Some(r#"spi:assetnum in ["1001","1002"]"#)
    );

    let missing = access.fetch(&asset_key("NOPE", "BEDFORD"), None).await.unwrap();
    assert!(missing.is_not_found());
    assert_eq!(missing.report().status, ReportStatus::Success);
}

#[tokio::test]
async fn test_fetch_exhaustion_keeps_both_diagnostics() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .with_rule(Rule::get("oslc/os/mxasset").respond_raw(401, "BMXAA7901E"))
            .with_rule(Rule::get("api/os/mxasset").fail(TransportError::Connect("refused".into()))),
    );
    let access = test_access(&transport);

    let err = access.fetch(&asset_key("13150", "BEDFORD"), None).await.unwrap_err();
    assert!(matches!(err, AccessError::AllStrategiesExhausted(_)));
    assert_eq!(err.diagnostics().len(), 2);
    assert!(err.to_string().contains("HTTP 401: BMXAA7901E"));
}

#[tokio::test]
async fn test_list_with_criteria() {
    let transport = Arc::new(ScriptedTransport::new().with_rule(
        Rule::get("oslc/os/mxwo").respond(
            200,
            &rdfs_page(vec![
                json!({"spi:wonum": "WO1", "spi:status": "WAPPR"}),
                json!({"spi:wonum": "WO2", "spi:status": "WAPPR"}),
                json!({"spi:wonum": "WO3", "spi:status": "WAPPR"}),
            ]),
        ),
    ));
    let access = test_access(&transport);

    let criteria = SearchCriteria::new()
        .eq("status", "WAPPR")
        .with("siteid", Condition::In(vec!["BEDFORD".into(), "NASHUA".into()]));
    let records = access
        .list(&ResourceType::WorkOrder, &criteria, None, 2)
        .await
        .unwrap();

    assert_eq!(records.len(), 2);
    let read = &transport.reads()[0];
    assert_eq!(
        read.query_value("oslc.where"),
        Some(r#"spi:status="WAPPR" and spi:siteid in ["BEDFORD","NASHUA"]"#)
    );
    assert_eq!(read.query_value("oslc.pageSize"), Some("2"));
}

#[tokio::test]
async fn test_ping_reads_one_person() {
    let transport = Arc::new(ScriptedTransport::new().with_rule(
        Rule::get("api/os/mxperson").respond(
            200,
            &member_page(vec![json!({"personid": "WILSON", "displayname": "Mike Wilson"})]),
        ),
    ));
    let access = test_access(&transport);

    let outcome = access.ping().await.unwrap();
    assert_eq!(outcome.records().len(), 1);

    let probe = &transport.reads()[0];
    assert_eq!(probe.query_value("oslc.pageSize"), Some("1"));
    assert_eq!(probe.query_value("oslc.select"), Some("personid,displayname"));
    assert_eq!(probe.query_value("oslc.where"), None);
    assert_eq!(probe.header("apikey"), Some("test-api-key"));
}

#[derive(Debug)]
struct StalledTransport;

#[async_trait]
impl Transport for StalledTransport {
    async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(HttpResponse::empty(200))
    }
}

#[tokio::test(start_paused = true)]
async fn test_calls_are_bounded_by_the_deadline() {
    let config = test_config().with_deadline(Duration::from_secs(5));
    let access = RecordAccess::new(config, Arc::new(StalledTransport)).unwrap();

    let err = access.fetch(&asset_key("13150", "BEDFORD"), None).await.unwrap_err();
    assert!(matches!(err, AccessError::DeadlineExceeded(d) if d == Duration::from_secs(5)));
    assert!(err.is_retryable());
}
