//! End-to-End Query Tests
//!
//! Full pipeline tests covering:
//! - Filter trees (connectives, comparisons, wildcards)
//! - Grouped aggregation and decimal rounding
//! - Projection and ordering
//! - Result-size guard
//! - Validation failures (malformed and semantic)

use fdql_core::{FdqlError, InMemoryRecordStore, LocalExecutor, ResultLimits};
use serde_json::{json, Value};

fn execute_query(executor: &LocalExecutor<InMemoryRecordStore>, document: Value) -> Vec<Value> {
    executor
        .execute(&document)
        .unwrap_or_else(|e| panic!("Query failed: {e}"))
}

fn create_sections_executor() -> LocalExecutor<InMemoryRecordStore> {
    let mut store = InMemoryRecordStore::new();
    store.add_dataset(
        "sections",
        vec![
            json!({"sections_uuid": "1001", "sections_dept": "cpsc", "sections_id": "310", "sections_instructor": "baniassad, elisa", "sections_title": "intr sftwr eng", "sections_avg": 78.32, "sections_pass": 150.0, "sections_fail": 8.0, "sections_audit": 0.0, "sections_year": 2015.0}),
            json!({"sections_uuid": "1002", "sections_dept": "cpsc", "sections_id": "310", "sections_instructor": "holmes, reid", "sections_title": "intr sftwr eng", "sections_avg": 81.05, "sections_pass": 160.0, "sections_fail": 4.0, "sections_audit": 1.0, "sections_year": 2016.0}),
            json!({"sections_uuid": "1003", "sections_dept": "cpsc", "sections_id": "110", "sections_instructor": "wolfman, steven", "sections_title": "comptn, progrmng", "sections_avg": 71.4, "sections_pass": 400.0, "sections_fail": 55.0, "sections_audit": 2.0, "sections_year": 2016.0}),
            json!({"sections_uuid": "1004", "sections_dept": "math", "sections_id": "100", "sections_instructor": "gomez, jose", "sections_title": "diffr calculus", "sections_avg": 64.78, "sections_pass": 320.0, "sections_fail": 80.0, "sections_audit": 0.0, "sections_year": 2015.0}),
            json!({"sections_uuid": "1005", "sections_dept": "math", "sections_id": "101", "sections_instructor": "gomez, jose", "sections_title": "intgr calculus", "sections_avg": 68.1, "sections_pass": 290.0, "sections_fail": 60.0, "sections_audit": 0.0, "sections_year": 2016.0}),
            json!({"sections_uuid": "1006", "sections_dept": "biol", "sections_id": "112", "sections_instructor": "", "sections_title": "biol bacteria", "sections_avg": 89.9, "sections_pass": 120.0, "sections_fail": 2.0, "sections_audit": 0.0, "sections_year": 1900.0}),
        ],
    );
    LocalExecutor::new(store)
}

fn create_rooms_executor() -> LocalExecutor<InMemoryRecordStore> {
    let mut store = InMemoryRecordStore::new();
    store.add_dataset(
        "rooms",
        vec![
            json!({"rooms_fullname": "Hugh Dempster Pavilion", "rooms_shortname": "DMP", "rooms_number": "110", "rooms_name": "DMP_110", "rooms_seats": 120.0, "rooms_type": "Tiered Large Group", "rooms_furniture": "Classroom-Fixed Tables/Movable Chairs"}),
            json!({"rooms_fullname": "Hugh Dempster Pavilion", "rooms_shortname": "DMP", "rooms_number": "310", "rooms_name": "DMP_310", "rooms_seats": 160.0, "rooms_type": "Tiered Large Group", "rooms_furniture": "Classroom-Fixed Tables/Movable Chairs"}),
            json!({"rooms_fullname": "Woodward (Instructional Resources Centre-IRC)", "rooms_shortname": "WOOD", "rooms_number": "2", "rooms_name": "WOOD_2", "rooms_seats": 503.0, "rooms_type": "Tiered Large Group", "rooms_furniture": "Classroom-Fixed Tablets"}),
        ],
    );
    LocalExecutor::new(store)
}

#[test]
fn test_filter_sort_project() {
    let executor = create_sections_executor();
    let results = execute_query(
        &executor,
        json!({
            "WHERE": {"GT": {"sections_avg": 70}},
            "OPTIONS": {
                "COLUMNS": ["sections_dept", "sections_avg"],
                "ORDER": "sections_avg"
            }
        }),
    );
    assert_eq!(
        results,
        vec![
            json!({"sections_dept": "cpsc", "sections_avg": 71.4}),
            json!({"sections_dept": "cpsc", "sections_avg": 78.32}),
            json!({"sections_dept": "cpsc", "sections_avg": 81.05}),
            json!({"sections_dept": "biol", "sections_avg": 89.9}),
        ]
    );
}

#[test]
fn test_empty_where_returns_everything() {
    let executor = create_sections_executor();
    let results = execute_query(
        &executor,
        json!({
            "WHERE": {},
            "OPTIONS": {"COLUMNS": ["sections_uuid"]}
        }),
    );
    assert_eq!(results.len(), 6);
}

#[test]
fn test_nested_connectives() {
    let executor = create_sections_executor();
    let results = execute_query(
        &executor,
        json!({
            "WHERE": {"OR": [
                {"AND": [
                    {"IS": {"sections_dept": "math"}},
                    {"GT": {"sections_avg": 65}}
                ]},
                {"NOT": {"LT": {"sections_avg": 89}}}
            ]},
            "OPTIONS": {
                "COLUMNS": ["sections_uuid"],
                "ORDER": "sections_uuid"
            }
        }),
    );
    assert_eq!(
        results,
        vec![
            json!({"sections_uuid": "1005"}),
            json!({"sections_uuid": "1006"}),
        ]
    );
}

#[test]
fn test_wildcard_matching() {
    let executor = create_sections_executor();
    let count = |pattern: &str| {
        execute_query(
            &executor,
            json!({
                "WHERE": {"IS": {"sections_instructor": pattern}},
                "OPTIONS": {"COLUMNS": ["sections_uuid"]}
            }),
        )
        .len()
    };
    assert_eq!(count("gomez, jose"), 2);
    assert_eq!(count("gomez*"), 2);
    assert_eq!(count("*reid"), 1);
    assert_eq!(count("*olm*"), 1);
    assert_eq!(count(""), 1); // the empty string matches only empty values
    assert_eq!(count("*"), 6);
    assert_eq!(count("**"), 6);
    assert_eq!(count("gomez"), 0); // no implicit substring match
}

#[test]
fn test_group_with_avg_and_count() {
    let executor = create_sections_executor();
    let results = execute_query(
        &executor,
        json!({
            "WHERE": {},
            "OPTIONS": {
                "COLUMNS": ["sections_dept", "deptAvg", "courses"],
                "ORDER": "sections_dept"
            },
            "TRANSFORMATIONS": {
                "GROUP": ["sections_dept"],
                "APPLY": [
                    {"deptAvg": {"AVG": "sections_avg"}},
                    {"courses": {"COUNT": "sections_id"}}
                ]
            }
        }),
    );
    assert_eq!(
        results,
        vec![
            json!({"sections_dept": "biol", "deptAvg": 89.9, "courses": 1}),
            json!({"sections_dept": "cpsc", "deptAvg": 76.92, "courses": 2}),
            json!({"sections_dept": "math", "deptAvg": 66.44, "courses": 2}),
        ]
    );
}

#[test]
fn test_avg_uses_decimal_accumulation() {
    let mut store = InMemoryRecordStore::new();
    store.add_dataset(
        "sections",
        vec![
            json!({"sections_dept": "test", "sections_avg": 10.005}),
            json!({"sections_dept": "test", "sections_avg": 10.005}),
            json!({"sections_dept": "test", "sections_avg": 10.005}),
        ],
    );
    let executor = LocalExecutor::new(store);
    let results = execute_query(
        &executor,
        json!({
            "WHERE": {},
            "OPTIONS": {"COLUMNS": ["overallAvg"]},
            "TRANSFORMATIONS": {
                "GROUP": ["sections_dept"],
                "APPLY": [{"overallAvg": {"AVG": "sections_avg"}}]
            }
        }),
    );
    assert_eq!(results, vec![json!({"overallAvg": 10.01})]);
}

#[test]
fn test_sum_rounds_to_two_decimals() {
    let mut store = InMemoryRecordStore::new();
    store.add_dataset(
        "sections",
        vec![
            json!({"sections_dept": "test", "sections_avg": 0.111}),
            json!({"sections_dept": "test", "sections_avg": 0.222}),
        ],
    );
    let executor = LocalExecutor::new(store);
    let results = execute_query(
        &executor,
        json!({
            "WHERE": {},
            "OPTIONS": {"COLUMNS": ["total"]},
            "TRANSFORMATIONS": {
                "GROUP": ["sections_dept"],
                "APPLY": [{"total": {"SUM": "sections_avg"}}]
            }
        }),
    );
    assert_eq!(results, vec![json!({"total": 0.33})]);
}

#[test]
fn test_rooms_group_max_seats_sorted_down() {
    let executor = create_rooms_executor();
    let results = execute_query(
        &executor,
        json!({
            "WHERE": {"IS": {"rooms_furniture": "*Tables*"}},
            "OPTIONS": {
                "COLUMNS": ["rooms_shortname", "maxSeats"],
                "ORDER": {"dir": "DOWN", "keys": ["maxSeats"]}
            },
            "TRANSFORMATIONS": {
                "GROUP": ["rooms_shortname"],
                "APPLY": [{"maxSeats": {"MAX": "rooms_seats"}}]
            }
        }),
    );
    assert_eq!(
        results,
        vec![json!({"rooms_shortname": "DMP", "maxSeats": 160.0})]
    );
}

#[test]
fn test_multi_key_order_breaks_ties_in_listed_order() {
    let executor = create_sections_executor();
    let results = execute_query(
        &executor,
        json!({
            "WHERE": {"EQ": {"sections_year": 2016}},
            "OPTIONS": {
                "COLUMNS": ["sections_dept", "sections_avg"],
                "ORDER": {"dir": "UP", "keys": ["sections_dept", "sections_avg"]}
            }
        }),
    );
    assert_eq!(
        results,
        vec![
            json!({"sections_dept": "cpsc", "sections_avg": 71.4}),
            json!({"sections_dept": "cpsc", "sections_avg": 81.05}),
            json!({"sections_dept": "math", "sections_avg": 68.1}),
        ]
    );
}

#[test]
fn test_order_key_need_not_be_projected() {
    // sorting happens before projection, so the sort key can be absent
    // from COLUMNS
    let executor = create_sections_executor();
    let results = execute_query(
        &executor,
        json!({
            "WHERE": {"IS": {"sections_dept": "math"}},
            "OPTIONS": {
                "COLUMNS": ["sections_id"],
                "ORDER": "sections_avg"
            }
        }),
    );
    assert_eq!(
        results,
        vec![json!({"sections_id": "100"}), json!({"sections_id": "101"})]
    );
}

#[test]
fn test_result_guard_at_limit_and_over() {
    let make_store = |n: usize| {
        let mut store = InMemoryRecordStore::new();
        store.add_dataset(
            "sections",
            (0..n).map(|i| json!({"sections_avg": i as f64})).collect(),
        );
        store
    };
    let document = json!({
        "WHERE": {},
        "OPTIONS": {"COLUMNS": ["sections_avg"]}
    });

    let executor = LocalExecutor::with_limits(make_store(100), ResultLimits { max_results: 100 });
    assert_eq!(executor.execute(&document).unwrap().len(), 100);

    let executor = LocalExecutor::with_limits(make_store(101), ResultLimits { max_results: 100 });
    match executor.execute(&document) {
        Err(FdqlError::ResultTooLarge(n)) => assert_eq!(n, 101),
        other => panic!("expected ResultTooLarge, got {other:?}"),
    }
}

#[test]
fn test_aggregation_can_dodge_the_guard() {
    // many raw matches collapse into few groups; the guard sees group count
    let mut store = InMemoryRecordStore::new();
    store.add_dataset(
        "sections",
        (0..50)
            .map(|i| json!({"sections_dept": "cpsc", "sections_avg": i as f64}))
            .collect(),
    );
    let executor = LocalExecutor::with_limits(store, ResultLimits { max_results: 10 });
    let results = execute_query(
        &executor,
        json!({
            "WHERE": {},
            "OPTIONS": {"COLUMNS": ["sections_dept"]},
            "TRANSFORMATIONS": {"GROUP": ["sections_dept"], "APPLY": []}
        }),
    );
    assert_eq!(results.len(), 1);
}

#[test]
fn test_unknown_dataset() {
    let executor = create_sections_executor();
    let err = executor
        .execute(&json!({
            "WHERE": {},
            "OPTIONS": {"COLUMNS": ["rooms_seats"]}
        }))
        .unwrap_err();
    assert!(matches!(err, FdqlError::DatasetNotFound(ref id) if id == "rooms"));
}

#[test]
fn test_cross_dataset_query_rejected() {
    let executor = create_sections_executor();
    let err = executor
        .execute(&json!({
            "WHERE": {"GT": {"sections_avg": 70}},
            "OPTIONS": {"COLUMNS": ["rooms_seats"]}
        }))
        .unwrap_err();
    assert!(matches!(err, FdqlError::SemanticError(_)));
}

#[test]
fn test_column_outside_transformed_schema_rejected() {
    let executor = create_sections_executor();
    let err = executor
        .execute(&json!({
            "WHERE": {},
            "OPTIONS": {"COLUMNS": ["sections_dept", "sections_avg"]},
            "TRANSFORMATIONS": {
                "GROUP": ["sections_dept"],
                "APPLY": [{"deptAvg": {"AVG": "sections_avg"}}]
            }
        }),
    );
    assert!(matches!(err.unwrap_err(), FdqlError::SemanticError(_)));
}

#[test]
fn test_malformed_documents_rejected() {
    let executor = create_sections_executor();
    let reject = |document: Value| {
        assert!(
            matches!(executor.execute(&document), Err(FdqlError::MalformedQuery(_))),
            "expected MalformedQuery for {document}"
        );
    };
    reject(json!([1, 2, 3]));
    reject(json!({"OPTIONS": {"COLUMNS": ["sections_dept"]}}));
    reject(json!({"WHERE": {}}));
    reject(json!({"WHERE": {}, "OPTIONS": {"COLUMNS": []}}));
    reject(json!({"WHERE": {"AND": []}, "OPTIONS": {"COLUMNS": ["sections_dept"]}}));
    reject(json!({"WHERE": {"GT": {"sections_avg": "70"}}, "OPTIONS": {"COLUMNS": ["sections_dept"]}}));
    reject(json!({"WHERE": {"IS": {"sections_dept": "a*b"}}, "OPTIONS": {"COLUMNS": ["sections_dept"]}}));
    reject(json!({"WHERE": {}, "OPTIONS": {"COLUMNS": ["sections_dept"]}, "TRANSFORMATIONS": {"GROUP": ["sections_dept"]}}));
}

#[test]
fn test_semantic_violations_rejected() {
    let executor = create_sections_executor();
    let reject = |document: Value| {
        assert!(
            matches!(executor.execute(&document), Err(FdqlError::SemanticError(_))),
            "expected SemanticError for {document}"
        );
    };
    // numeric comparator over a text field
    reject(json!({"WHERE": {"GT": {"sections_dept": 70}}, "OPTIONS": {"COLUMNS": ["sections_dept"]}}));
    // wildcard over a numeric field
    reject(json!({"WHERE": {"IS": {"sections_avg": "7*"}}, "OPTIONS": {"COLUMNS": ["sections_dept"]}}));
    // duplicate APPLY output keys
    reject(json!({
        "WHERE": {},
        "OPTIONS": {"COLUMNS": ["sections_dept"]},
        "TRANSFORMATIONS": {
            "GROUP": ["sections_dept"],
            "APPLY": [
                {"x": {"MAX": "sections_avg"}},
                {"x": {"MIN": "sections_avg"}}
            ]
        }
    }));
    // apply-key column without TRANSFORMATIONS
    reject(json!({"WHERE": {}, "OPTIONS": {"COLUMNS": ["deptAvg"]}}));
}

#[test]
fn test_validation_precedes_execution() {
    // an invalid document fails the same way whether or not the dataset exists
    let executor = LocalExecutor::new(InMemoryRecordStore::new());
    let err = executor
        .execute(&json!({
            "WHERE": {"GT": {"sections_dept": 70}},
            "OPTIONS": {"COLUMNS": ["sections_dept"]}
        }))
        .unwrap_err();
    assert!(matches!(err, FdqlError::SemanticError(_)));
}
