//! Parsing of canned BLS API responses.

use macrotrend_data::DataError;
use macrotrend_data::bls::parse_response;
use macrotrend_metrics::Period;

const TWO_SERIES: &str = r#"{
    "status": "REQUEST_SUCCEEDED",
    "responseTime": 141,
    "message": [],
    "Results": {
        "series": [
            {
                "seriesID": "WPU081",
                "data": [
                    {"year": "2024", "period": "M03", "periodName": "March", "latest": "true",
                     "value": "261.7", "footnotes": [{"code": "P", "text": "Preliminary. All indexes are subject to revision four months after original publication."}]},
                    {"year": "2024", "period": "M02", "periodName": "February",
                     "value": "258.9", "footnotes": [{}]},
                    {"year": "2023", "period": "M13", "periodName": "Annual",
                     "value": "255.0", "footnotes": [{}]},
                    {"year": "2024", "period": "M01", "periodName": "January",
                     "value": "-", "footnotes": [{}]}
                ]
            },
            {
                "seriesID": "WPU1017",
                "data": [
                    {"year": "2024", "period": "M03", "periodName": "March",
                     "value": "321.004", "footnotes": []}
                ]
            }
        ]
    }
}"#;

#[test]
fn test_monthly_values_are_kept() {
    let obs = parse_response(TWO_SERIES).unwrap();
    assert_eq!(obs.len(), 3);

    let march = &obs[0];
    assert_eq!(march.observation.series_id, "WPU081");
    assert_eq!(march.observation.period, Period::new(2024, 3).unwrap());
    assert_eq!(march.observation.value, 261.7);
    assert!(march.preliminary);

    assert!(!obs[1].preliminary);
    assert_eq!(obs[2].observation.series_id, "WPU1017");
}

#[test]
fn test_annual_average_and_dashes_are_dropped() {
    let obs = parse_response(TWO_SERIES).unwrap();
    assert!(
        obs.iter()
            .all(|o| o.observation.period != Period::new(2024, 1).unwrap())
    );
    assert!(obs.iter().all(|o| o.observation.period.year() == 2024));
}

#[test]
fn test_failed_request_is_an_error() {
    let body = r#"{
        "status": "REQUEST_NOT_PROCESSED",
        "responseTime": 12,
        "message": ["Request could not be serviced, as the daily threshold for total number of requests allocated to the user has been reached."],
        "Results": {}
    }"#;
    match parse_response(body) {
        Err(DataError::BlsApi(msg)) => {
            assert!(msg.contains("REQUEST_NOT_PROCESSED"));
            assert!(msg.contains("daily threshold"));
        }
        other => panic!("expected BlsApi error, got {:?}", other),
    }
}

#[test]
fn test_unparseable_value_is_an_error() {
    let body = r#"{
        "status": "REQUEST_SUCCEEDED",
        "message": [],
        "Results": {"series": [{"seriesID": "X", "data": [
            {"year": "2024", "period": "M01", "value": "abc", "footnotes": []}
        ]}]}
    }"#;
    assert!(matches!(parse_response(body), Err(DataError::Parse(_))));
}
