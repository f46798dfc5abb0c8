//! Tests for the HTTP API

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::source::{http_client, CoinMetricsClient, SourceRegistry, StaticSource};
    use crate::types::{MetricKind, MetricSeries};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::NaiveDate;
    use tower::ServiceExt;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, day).unwrap()
    }

    fn app() -> Router {
        let mut registry = SourceRegistry::new();
        registry.register(
            MetricKind::FearAndGreed,
            Arc::new(StaticSource::market_wide(
                "fng",
                MetricSeries::from_values("fng", [(d(1), 0.8), (d(2), 0.2)]),
            )),
        );
        registry.register(
            MetricKind::Trends,
            Arc::new(StaticSource::market_wide(
                "trends",
                MetricSeries::from_values("trends", [(d(2), 0.6)]),
            )),
        );

        let state = AppState::new(SentimentManager::new(registry), DefaultsConfig::default());
        router(state, "widgets")
    }

    async fn get(uri: &str) -> (StatusCode, String) {
        let response = app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("alive"));
    }

    #[tokio::test]
    async fn test_sentiment_json() {
        let (status, body) = get(
            "/api/sentiment/coin=btc?start_date=2020-01-01&end_date=2020-01-03&metrics=fear_and_greed,TRENDS&weights=1,1",
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        let map = json.as_object().unwrap();
        assert_eq!(map.len(), 3);
        assert_eq!(json["2020-01-01"], 0.8);
        assert!((json["2020-01-02"].as_f64().unwrap() - 0.4).abs() < 1e-12);
        assert_eq!(json["2020-01-03"], 0.0);
    }

    #[tokio::test]
    async fn test_sentiment_plain_ticker_and_default_weights() {
        let (status, body) =
            get("/api/sentiment/ETH?start_date=2020-01-02&end_date=2020-01-02&metrics=TRENDS").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"2020-01-02":0.6}"#);
    }

    #[tokio::test]
    async fn test_missing_start_date() {
        let (status, body) = get("/api/sentiment/coin=BTC?end_date=2020-01-03&metrics=TRENDS").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Error: No start date field provided. Please specify a start date.");
    }

    #[tokio::test]
    async fn test_missing_end_date() {
        let (status, body) = get("/api/sentiment/coin=BTC?start_date=2020-01-03&metrics=TRENDS").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Error: No end date field provided. Please specify an end date.");
    }

    #[tokio::test]
    async fn test_missing_metrics() {
        let (status, body) = get("/api/sentiment/coin=BTC?start_date=2020-01-01&end_date=2020-01-03").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Error: No metrics field provided. Please specify metrics.");
    }

    #[tokio::test]
    async fn test_inverted_range() {
        let (status, body) =
            get("/api/sentiment/BTC?start_date=2020-01-03&end_date=2020-01-01&metrics=TRENDS").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("Invalid date range"));
    }

    #[tokio::test]
    async fn test_unknown_metric() {
        let (status, body) =
            get("/api/sentiment/BTC?start_date=2020-01-01&end_date=2020-01-01&metrics=HASH_RATE").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("HASH_RATE"));
    }

    #[tokio::test]
    async fn test_unregistered_metric() {
        let (status, _) =
            get("/api/sentiment/BTC?start_date=2020-01-01&end_date=2020-01-01&metrics=BLOCK_COUNT").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_negative_weight() {
        let (status, body) = get(
            "/api/sentiment/BTC?start_date=2020-01-01&end_date=2020-01-01&metrics=TRENDS&weights=-1",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("Invalid weight"));
    }

    #[tokio::test]
    async fn test_price_without_coinmetrics() {
        let (status, _) = get("/api/price/coin=BTC?start_date=2020-01-01&end_date=2020-01-02").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    /// Local stand-in for CoinMetrics that answers every query with `body`
    async fn coinmetrics_stub(body: &'static str) -> Arc<CoinMetricsClient> {
        let stub = Router::new().route("/timeseries/asset-metrics", axum::routing::get(move || async move { body }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, stub).await.unwrap();
        });

        let http = http_client(5).unwrap();
        Arc::new(CoinMetricsClient::new(&format!("http://{}", addr), http))
    }

    async fn price_with(body: &'static str, uri: &str) -> (StatusCode, String) {
        let mut registry = SourceRegistry::new();
        registry.set_coinmetrics(coinmetrics_stub(body).await);
        let app = router(AppState::new(SentimentManager::new(registry), DefaultsConfig::default()), "widgets");

        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_price_from_coinmetrics() {
        let body = r#"{"data": [
            {"asset": "btc", "time": "2020-01-01T00:00:00.000000000Z", "PriceUSD": "7193.59"},
            {"asset": "btc", "time": "2020-01-02T00:00:00.000000000Z", "PriceUSD": "6963.85"}
        ]}"#;
        let (status, body) = price_with(body, "/api/price/BTC?start_date=2020-01-02&end_date=2020-01-02").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"2020-01-02":6963.85}"#);
    }

    #[tokio::test]
    async fn test_malformed_upstream_payload_is_bad_gateway() {
        let body = r#"{"data": [{"asset": "btc", "time": "garbage", "PriceUSD": "1"}]}"#;
        let (status, body) = price_with(body, "/api/price/BTC?start_date=2020-01-01&end_date=2020-01-02").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body.contains("garbage"));
    }

    #[tokio::test]
    async fn test_bad_caller_date_is_bad_request() {
        let (status, _) = price_with("{}", "/api/price/BTC?start_date=01/02/2020&end_date=2020-01-02").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_error_status_mapping() {
        let upstream = crate::source::coinmetrics::parse_page(
            r#"{"data": [{"time": "garbage", "PriceUSD": "1"}]}"#,
            "PriceUSD",
        )
        .unwrap_err();
        assert!(matches!(ApiError::from(upstream), ApiError::Upstream(_)));

        let caller = crate::types::parse_date("yesterday").unwrap_err();
        assert!(matches!(ApiError::from(caller), ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_gauge() {
        let (status, body) = get("/api/gauge/BTC?date=2020-01-01&metrics=FEAR_AND_GREED").await;
        assert_eq!(status, StatusCode::OK);

        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["value"], 0.8);
        assert_eq!(json["title"], "Aggregate Sentiment");
    }

    #[test]
    fn test_parse_metrics_weight_count_mismatch() {
        let err = parse_metrics("FEAR_AND_GREED,TRENDS", Some("0.5")).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(msg) if msg.contains("Expected 2 weights")));
    }

    #[test]
    fn test_parse_metrics_bad_weight() {
        let err = parse_metrics("TRENDS", Some("heavy")).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(msg) if msg.contains("heavy")));
    }

    #[test]
    fn test_parse_metrics() {
        let parsed = parse_metrics("fear_and_greed, block_count", Some("0.7,0.3")).unwrap();
        assert_eq!(
            parsed,
            vec![(MetricKind::FearAndGreed, 0.7), (MetricKind::BlockCount, 0.3)]
        );
    }

    #[test]
    fn test_parse_coin() {
        assert_eq!(parse_coin("coin=ltc").unwrap().ticker(), "LTC");
        assert_eq!(parse_coin("XRP").unwrap().ticker(), "XRP");
        assert!(parse_coin("coin=").is_err());
    }
}
