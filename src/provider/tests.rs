use std::time::Duration;

use super::llm::{classify_genai, classify_genai_error, render_evidence};
use super::parse::{extract_json_object, parse_decomposition, parse_verification};
use super::*;
use crate::model::{ClaimType, Evidence, VerdictLabel};

fn evidence(rank: usize, title: &str, snippet: &str) -> Evidence {
    Evidence {
        id: Evidence::make_id("v:c000", rank, &format!("https://example.org/{rank}")),
        claim_id: "v:c000".to_string(),
        title: title.to_string(),
        url: format!("https://example.org/{rank}"),
        snippet: snippet.to_string(),
        relevance_score: 0.5,
        retrieval_position: rank,
        rank,
    }
}

#[test]
fn test_failure_classes() {
    assert_eq!(
        ProviderError::Timeout { elapsed_ms: 10 }.class(),
        FailureClass::Transient
    );
    assert_eq!(
        ProviderError::RateLimited { retry_after: None }.class(),
        FailureClass::Transient
    );
    assert_eq!(
        ProviderError::transient("reset").class(),
        FailureClass::Transient
    );
    assert_eq!(
        ProviderError::permanent("401").class(),
        FailureClass::Permanent
    );
    assert_eq!(
        ProviderError::malformed("junk").class(),
        FailureClass::Malformed
    );
    assert!(!ProviderError::permanent("nope").is_retryable());
    assert!(ProviderError::malformed("junk").is_retryable());
}

#[test]
fn test_from_status_mapping() {
    let limited = ProviderError::from_status(429, Some(Duration::from_secs(3)), "");
    assert_eq!(limited.retry_after(), Some(Duration::from_secs(3)));

    assert_eq!(
        ProviderError::from_status(503, None, "busy").class(),
        FailureClass::Transient
    );
    assert_eq!(
        ProviderError::from_status(401, None, "bad key").class(),
        FailureClass::Permanent
    );
    assert_eq!(
        ProviderError::from_status(400, None, "").class(),
        FailureClass::Permanent
    );
    assert_eq!(ProviderError::from_status(408, None, "").reason_code(), "timeout");
}

#[test]
fn test_parse_retry_after() {
    assert_eq!(parse_retry_after(Some(" 7 ")), Some(Duration::from_secs(7)));
    assert_eq!(parse_retry_after(Some("soon")), None);
    assert_eq!(parse_retry_after(None), None);
}

#[test]
fn test_extract_json_object_from_fenced_output() {
    let text = "Sure! ```json\n{\"claims\": []}\n``` hope that helps";
    assert_eq!(extract_json_object(text), Some("{\"claims\": []}"));
    assert_eq!(extract_json_object("no json here"), None);
    assert_eq!(extract_json_object("} backwards {"), None);
}

#[test]
fn test_parse_decomposition() {
    let text = r#"{"claims": [
        {"claim_id": 1, "text": " The tower is 330 metres tall ", "claim_type": "statistical", "confidence": 0.9},
        {"text": "It opened in 1889", "claim_type": "factual"},
        {"text": "   ", "claim_type": "factual", "confidence": 0.5},
        {"text": "Best view in Paris", "claim_type": "opinion", "confidence": 1.7}
    ]}"#;

    let claims = parse_decomposition(text).unwrap();
    assert_eq!(claims.len(), 3);
    assert_eq!(claims[0].text, "The tower is 330 metres tall");
    assert_eq!(claims[0].claim_type, ClaimType::Statistical);
    assert_eq!(claims[1].confidence, 1.0);
    assert_eq!(claims[2].claim_type, ClaimType::Opinion);
    assert_eq!(claims[2].confidence, 1.0);
}

#[test]
fn test_parse_decomposition_rejects_wrong_shape() {
    let err = parse_decomposition(r#"{"items": []}"#).unwrap_err();
    assert_eq!(err.class(), FailureClass::Malformed);

    let err = parse_decomposition("I could not find any claims.").unwrap_err();
    assert_eq!(err.class(), FailureClass::Malformed);
}

#[test]
fn test_parse_verification_flat_and_nested() {
    let flat = parse_verification(
        r#"{"label": "refuted", "confidence": 0.7, "explanation": "wrong year", "citations": [1]}"#,
    )
    .unwrap();
    assert_eq!(flat.label, VerdictLabel::Refuted);
    assert_eq!(flat.citations, vec![1]);

    let nested = parse_verification(
        r#"{"verification": {"label": "true", "confidence": 0.9, "explanation": "ok", "citations": []}}"#,
    )
    .unwrap();
    assert_eq!(nested.label, VerdictLabel::Supported);
}

#[test]
fn test_parse_verification_requires_known_label_and_confidence() {
    let err = parse_verification(r#"{"label": "probably", "confidence": 0.4}"#).unwrap_err();
    assert!(matches!(err, ProviderError::MalformedResponse { .. }));

    let err = parse_verification(r#"{"label": "supported"}"#).unwrap_err();
    assert!(matches!(err, ProviderError::MalformedResponse { .. }));
}

#[test]
fn test_verifier_response_validation() {
    let ok = VerifierResponse {
        label: VerdictLabel::Supported,
        confidence: 1.0,
        explanation: String::new(),
        citations: vec![0, 2],
    };
    assert!(ok.clone().validate(3).is_ok());

    let err = ok.clone().validate(2).unwrap_err();
    assert_eq!(err.reason_code(), "malformed_response");

    let bad_conf = VerifierResponse {
        confidence: 1.2,
        ..ok.clone()
    };
    assert!(bad_conf.validate(3).is_err());

    let nan_conf = VerifierResponse {
        confidence: f32::NAN,
        ..ok
    };
    assert!(nan_conf.validate(3).is_err());
}

#[test]
fn test_classify_genai_error() {
    assert!(matches!(
        classify_genai_error("HTTP 429 Too Many Requests"),
        ProviderError::RateLimited { .. }
    ));
    assert_eq!(
        classify_genai_error("Web call failed: 401 Unauthorized").class(),
        FailureClass::Permanent
    );
    assert_eq!(
        classify_genai_error("request timed out").reason_code(),
        "timeout"
    );
    assert_eq!(
        classify_genai_error("connection reset by peer").class(),
        FailureClass::Transient
    );
    assert_eq!(
        classify_genai_error("400 Bad Request: INVALID_ARGUMENT").class(),
        FailureClass::Permanent
    );
}

fn failed_status(status: u16, headers: reqwest::header::HeaderMap) -> genai::Error {
    genai::Error::WebModelCall {
        model_iden: genai::ModelIden::new(genai::adapter::AdapterKind::Gemini, "gemini-2.5-flash"),
        webc_error: genai::webc::Error::ResponseFailedStatus {
            status: reqwest::StatusCode::from_u16(status).unwrap(),
            body: "{\"error\": {\"status\": \"SOME_STATUS\"}}".to_string(),
            headers: Box::new(headers),
        },
    }
}

#[test]
fn test_classify_genai_by_http_status() {
    for status in [400, 401, 403, 404] {
        let err = classify_genai(&failed_status(status, Default::default()));
        assert_eq!(err.class(), FailureClass::Permanent, "status {status}");
    }
    for status in [500, 503] {
        let err = classify_genai(&failed_status(status, Default::default()));
        assert_eq!(err.class(), FailureClass::Transient, "status {status}");
    }

    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(reqwest::header::RETRY_AFTER, "7".parse().unwrap());
    assert_eq!(
        classify_genai(&failed_status(429, headers)).retry_after(),
        Some(Duration::from_secs(7))
    );
}

#[test]
fn test_render_evidence_numbers_from_zero() {
    let rendered = render_evidence(&[
        evidence(0, "First", "alpha"),
        evidence(1, "Second", "beta"),
    ]);
    assert!(rendered.starts_with("[0] First"));
    assert!(rendered.contains("[1] Second"));
}

#[test]
fn test_baseline_refutes_on_debunking_cues() {
    let verifier = KeywordBaselineVerifier::new();
    let response = verifier.judge(&[
        evidence(0, "Claim debunked", "Fact checkers say the video is misleading"),
        evidence(1, "Background", "The tower was built in 1889"),
    ]);

    assert_eq!(response.label, VerdictLabel::Refuted);
    assert_eq!(response.citations, vec![0]);
    assert!((response.confidence - 1.0).abs() < f32::EPSILON);
}

#[test]
fn test_baseline_supports_on_confirming_cues() {
    let verifier = KeywordBaselineVerifier::new();
    let response = verifier.judge(&[
        evidence(0, "Census", "According to official data shows growth"),
        evidence(1, "Blog", "It might be otherwise"),
    ]);

    assert_eq!(response.label, VerdictLabel::Supported);
    assert_eq!(response.citations, vec![0]);
    // 3 supporting cues against 1 uncertain: 3 / (1 + 1), capped at 1.
    assert!((response.confidence - 1.0).abs() < f32::EPSILON);
}

#[test]
fn test_baseline_ties_are_uncertain() {
    let verifier = KeywordBaselineVerifier::new();
    let response = verifier.judge(&[evidence(0, "Mixed", "confirmed but later debunked")]);

    assert_eq!(response.label, VerdictLabel::NotEnoughEvidence);
    assert_eq!(response.confidence, 0.5);
    assert!(response.citations.is_empty());
}

#[test]
fn test_baseline_matches_whole_words_only() {
    let verifier = KeywordBaselineVerifier::new();
    // "falsehood" and "mayor" must not count as "false" or "may".
    let response = verifier.judge(&[evidence(0, "Mayor", "a falsehood spread")]);
    assert!(response.explanation.contains("refuting 0"));
    assert!(response.explanation.contains("uncertain 0"));
}

#[tokio::test]
async fn test_mock_search_records_queries() {
    let search = MockSearch::returning(vec![SearchHit::new("t", "https://a.org", "s")]);
    let hits = search.search("eiffel tower").await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(search.calls(), 1);
    assert_eq!(search.queries(), vec!["eiffel tower".to_string()]);
}
