//! End-to-end tests for the search engine over the in-memory executor.

#![cfg(feature = "derive")]

use rust_decimal::Decimal;
use searchkit::{
    Bound, CoercionError, CoercionRegistry, Comparison, FieldType, FilterOperator, InvalidRequest,
    MemoryExecutor, Predicate, QueryExecutor, QueryPlan, SearchEngine, SearchError, SearchField,
    SearchRequest, Searchable, SearchableEnum, Target, TypeKind, Value,
};

// ============================================================================
// Fixtures
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, SearchableEnum)]
enum CustomerStatus {
    Active,
    Blocked,
}

#[derive(Debug, Searchable)]
struct Address {
    #[search]
    city: String,
}

#[derive(Debug, Searchable)]
struct Order {
    #[search]
    total: Decimal,
    #[search]
    item_count: i32,
}

#[derive(Debug, Searchable)]
struct Customer {
    #[search]
    name: String,
    #[search]
    age: i32,
    #[search]
    status: CustomerStatus,
    #[search(elements)]
    tags: Vec<String>,
    #[search(one)]
    address: Option<Address>,
    #[search(many)]
    orders: Vec<Order>,
}

fn order(cents: i64, item_count: i32) -> Order {
    Order {
        total: Decimal::new(cents, 2),
        item_count,
    }
}

fn customer(name: &str, age: i32, status: CustomerStatus) -> Customer {
    Customer {
        name: name.to_string(),
        age,
        status,
        tags: Vec::new(),
        address: None,
        orders: Vec::new(),
    }
}

fn customers() -> Vec<Customer> {
    let mut ann = customer("Ann", 34, CustomerStatus::Active);
    ann.tags = vec!["vip".into(), "early".into()];
    ann.address = Some(Address {
        city: "Lyon".into(),
    });
    ann.orders = vec![order(10000, 1), order(25050, 3)];

    let mut bob = customer("Bob", 17, CustomerStatus::Active);
    bob.orders = vec![order(90000, 5)];

    let mut cid = customer("Cid", 52, CustomerStatus::Blocked);
    cid.tags = vec!["vip".into()];
    cid.address = Some(Address {
        city: "Paris".into(),
    });

    let mut dee = customer("Dee", 41, CustomerStatus::Active);
    dee.address = Some(Address {
        city: "Lyon".into(),
    });
    dee.orders = vec![order(12000, 1), order(13000, 2)];

    vec![ann, bob, cid, dee]
}

fn names<'a>(rows: &[&'a Customer]) -> Vec<&'a str> {
    rows.iter().map(|c| c.name.as_str()).collect()
}

fn page_plan(request: &SearchRequest) -> searchkit::Result<QueryPlan> {
    let engine = SearchEngine::new();
    let catalogue = engine.discover_fields::<Customer>()?;
    engine.plan(request, &catalogue)
}

fn invalid(err: &SearchError) -> &InvalidRequest {
    err.as_invalid_request()
        .unwrap_or_else(|| panic!("expected an invalid request, got {err:?}"))
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn test_page_size_over_limit_is_rejected() {
    let err = page_plan(&SearchRequest::new(1, 101)).unwrap_err();
    assert_eq!(
        invalid(&err),
        &InvalidRequest::PageSizeExceeded {
            requested: 101,
            max: 100
        }
    );
    assert!(err.to_string().contains("limited to 100 results"));
}

#[test]
fn test_page_zero_is_rejected() {
    let err = page_plan(&SearchRequest::new(0, 10)).unwrap_err();
    assert_eq!(invalid(&err), &InvalidRequest::PageOutOfRange { page: 0 });
}

#[test]
fn test_unknown_field_lists_known_fields() {
    let request = SearchRequest::new(1, 10).filter_eq("ghost", "boo");
    let err = page_plan(&request).unwrap_err();
    match invalid(&err) {
        InvalidRequest::UnknownField { field, known } => {
            assert_eq!(field, "ghost");
            assert!(known.contains(&"ordersTotal".to_string()));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_comparison_on_string_is_rejected() {
    let request = SearchRequest::new(1, 10).filter("name", FilterOperator::GreaterThan, ["A"]);
    let err = page_plan(&request).unwrap_err();
    match invalid(&err) {
        InvalidRequest::OperatorNotAllowed {
            field,
            operator,
            allowed,
        } => {
            assert_eq!(field, "name");
            assert_eq!(*operator, FilterOperator::GreaterThan);
            assert!(allowed.contains(FilterOperator::Like));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_equal_without_value_is_rejected() {
    let request =
        SearchRequest::new(1, 10).filter("age", FilterOperator::Equal, std::iter::empty::<&str>());
    let err = page_plan(&request).unwrap_err();
    assert_eq!(
        invalid(&err),
        &InvalidRequest::MissingValue {
            field: "age".into(),
            operator: FilterOperator::Equal
        }
    );
}

#[test]
fn test_is_null_ignores_values() {
    let request = SearchRequest::new(1, 10).filter("name", FilterOperator::IsNull, ["ignored"]);
    let plan = page_plan(&request).unwrap();
    assert_eq!(plan.conditions[0].predicate, Predicate::IsNull);
}

#[test]
fn test_sort_on_collection_is_rejected() {
    let request = SearchRequest::new(1, 10).sort_asc("ordersTotal");
    let err = page_plan(&request).unwrap_err();
    assert_eq!(
        invalid(&err),
        &InvalidRequest::SortOnCollection {
            field: "ordersTotal".into()
        }
    );

    let request = SearchRequest::new(1, 10).sort_desc("tags");
    assert!(page_plan(&request).is_err());
}

#[test]
fn test_unknown_enum_member_is_a_conversion_error() {
    let request = SearchRequest::new(1, 10).filter_eq("status", "bogus");
    let err = page_plan(&request).unwrap_err();
    assert!(err.is_conversion());
    assert!(err.to_string().contains("'status'"));
    assert!(err.to_string().contains("bogus"));
}

#[test]
fn test_bad_number_is_a_conversion_error() {
    let request = SearchRequest::new(1, 10).filter("age", FilterOperator::In, ["18", "x"]);
    assert!(page_plan(&request).unwrap_err().is_conversion());
}

#[test]
fn test_coercion_yielding_the_wrong_kind_is_a_conversion_error() {
    let coercion = CoercionRegistry::standard()
        .with(TypeKind::I32, |raw| Ok(Value::String(raw.to_string())));
    let engine = SearchEngine::builder().coercion(coercion).build().unwrap();
    let catalogue = engine.discover_fields::<Customer>().unwrap();

    let request = SearchRequest::new(1, 10).filter("age", FilterOperator::GreaterThan, ["18"]);
    let err = engine.plan(&request, &catalogue).unwrap_err();
    assert!(err.is_conversion());
    match err {
        SearchError::Conversion { source, .. } => assert_eq!(
            source,
            CoercionError::WrongKind {
                expected: TypeKind::I32,
                got: TypeKind::String,
            }
        ),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_sort_on_fan_out_field_is_rejected_for_explicit_catalogues() {
    let engine = SearchEngine::new();
    let err = engine
        .catalogue(
            "Customer",
            [SearchField::new("ordersTotal", "orders.total", FieldType::I64)
                .multi_valued()
                .with_distinct(false)],
        )
        .unwrap_err();
    assert!(err.is_configuration());

    let catalogue = engine
        .catalogue(
            "Customer",
            [SearchField::new("ordersTotal", "orders.total", FieldType::I64).multi_valued()],
        )
        .unwrap();
    let request = SearchRequest::new(1, 10).sort_desc("ordersTotal");
    let err = engine.plan(&request, &catalogue).unwrap_err();
    assert_eq!(
        invalid(&err),
        &InvalidRequest::SortOnCollection {
            field: "ordersTotal".into()
        }
    );
}

// ============================================================================
// Planning
// ============================================================================

#[test]
fn test_plan_for_age_and_order_total() {
    let request = SearchRequest::new(1, 10)
        .filter("age", FilterOperator::GreaterThan, ["18"])
        .filter("ordersTotal", FilterOperator::GreaterThan, ["100.00"]);
    let plan = page_plan(&request).unwrap();

    assert_eq!(plan.conditions.len(), 2);
    assert!(plan.distinct);
    assert_eq!(plan.skip, 0);
    assert_eq!(plan.take, Some(10));
    assert_eq!(plan.joins.len(), 1);
    assert_eq!(
        plan.conditions[1].predicate,
        Predicate::Compare(
            Comparison::GreaterThan,
            Bound::Decimal(Decimal::new(10000, 2))
        )
    );
    assert_eq!(
        plan.to_string(),
        "SELECT DISTINCT root FROM Customer root JOIN root.orders j0 \
         WHERE root.age > 18 AND j0.total > 100.00 OFFSET 0 LIMIT 10"
    );
}

#[test]
fn test_filters_through_one_relationship_share_a_join() {
    let request = SearchRequest::new(1, 10)
        .filter("ordersTotal", FilterOperator::GreaterThan, ["100"])
        .filter("ordersItemCount", FilterOperator::GreaterThanOrEqual, ["2"]);
    let plan = page_plan(&request).unwrap();

    assert_eq!(plan.joins.len(), 1);
    let join = plan.joins.find("orders").unwrap();
    assert_eq!(plan.conditions_on(join).count(), 2);
}

#[test]
fn test_count_plan_ignores_sorts_and_pagination() {
    let engine = SearchEngine::new();
    let catalogue = engine.discover_fields::<Customer>().unwrap();
    let request = SearchRequest::new(3, 10)
        .filter_eq("addressCity", "Lyon")
        .sort_desc("age");

    let count = engine.count_plan(&request, &catalogue).unwrap();
    assert!(count.is_count());
    assert!(count.orderings.is_empty());
    assert_eq!(count.take, None);
    assert_eq!(count.skip, 0);
    assert!(!count.distinct);
    assert_eq!(
        count.to_string(),
        "SELECT COUNT(root) FROM Customer root JOIN root.address j0 WHERE j0.city = 'Lyon'"
    );

    let page = engine.plan(&request, &catalogue).unwrap();
    assert_eq!(page.skip, 20);
}

#[test]
fn test_sort_only_relationship_is_an_optional_join() {
    let request = SearchRequest::new(1, 10).sort_asc("addressCity");
    let plan = page_plan(&request).unwrap();
    assert_eq!(
        plan.to_string(),
        "SELECT root FROM Customer root LEFT JOIN root.address j0 ORDER BY j0.city ASC OFFSET 0 LIMIT 10"
    );
}

#[test]
fn test_enum_values_are_case_insensitive() {
    let request = SearchRequest::new(1, 10).filter_eq("status", "active");
    let plan = page_plan(&request).unwrap();
    match &plan.conditions[0].predicate {
        Predicate::Equal(Value::Enum(member)) => assert_eq!(member.name(), "ACTIVE"),
        other => panic!("unexpected predicate: {other:?}"),
    }
}

#[test]
fn test_element_collection_targets_the_element() {
    let request = SearchRequest::new(1, 10).filter_eq("tags", "vip");
    let plan = page_plan(&request).unwrap();
    assert!(plan.distinct);
    assert!(matches!(plan.conditions[0].target, Target::Element { .. }));
}

// ============================================================================
// Searching
// ============================================================================

#[test]
fn test_search_returns_distinct_matches_with_totals() {
    let data = customers();
    let request = SearchRequest::new(1, 10)
        .filter("age", FilterOperator::GreaterThan, ["18"])
        .filter("ordersTotal", FilterOperator::GreaterThan, ["100.00"]);

    let page = SearchEngine::new()
        .search(&request, &MemoryExecutor::new(&data))
        .unwrap();

    assert_eq!(names(&page.data), ["Ann", "Dee"]);
    assert_eq!(page.returned_count, 2);
    assert_eq!(page.total_count, Some(2));
}

#[test]
fn test_conditions_on_a_shared_join_hold_for_one_related_record() {
    let data = customers();
    let request = SearchRequest::new(1, 10)
        .filter("ordersTotal", FilterOperator::GreaterThanOrEqual, ["120"])
        .filter_eq("ordersItemCount", "1");

    let page = SearchEngine::new()
        .search(&request, &MemoryExecutor::new(&data))
        .unwrap();

    // Ann has a 1-item order and a 250.50 order, but not one order with both
    assert_eq!(names(&page.data), ["Dee"]);
    assert_eq!(page.total_count, Some(1));
}

#[test]
fn test_pagination_and_sorting() {
    let data = customers();
    let engine = SearchEngine::new();
    let executor = MemoryExecutor::new(&data);

    let request = SearchRequest::new(2, 2).sort_asc("name");
    let page = engine.search(&request, &executor).unwrap();
    assert_eq!(names(&page.data), ["Cid", "Dee"]);
    assert_eq!(page.total_count, Some(4));
    assert_eq!(page.total_pages(), Some(2));

    let request = SearchRequest::new(1, 10).sort_desc("age");
    let page = engine.search(&request, &executor).unwrap();
    assert_eq!(names(&page.data), ["Cid", "Dee", "Ann", "Bob"]);
}

#[test]
fn test_sort_through_optional_relationship_puts_missing_last() {
    let data = customers();
    let request = SearchRequest::new(1, 10).sort_asc("addressCity");

    let page = SearchEngine::new()
        .search(&request, &MemoryExecutor::new(&data))
        .unwrap();

    assert_eq!(names(&page.data), ["Ann", "Dee", "Cid", "Bob"]);
}

#[test]
fn test_like_is_case_insensitive_substring() {
    let data = customers();
    let request = SearchRequest::new(1, 10).filter("name", FilterOperator::Like, ["AN"]);

    let page = SearchEngine::new()
        .search(&request, &MemoryExecutor::new(&data))
        .unwrap();
    assert_eq!(names(&page.data), ["Ann"]);

    let request = SearchRequest::new(1, 10).filter("name", FilterOperator::NotLike, ["d"]);
    let page = SearchEngine::new()
        .search(&request, &MemoryExecutor::new(&data))
        .unwrap();
    assert_eq!(names(&page.data), ["Ann", "Bob"]);
}

#[test]
fn test_enum_and_element_filters() {
    let data = customers();
    let engine = SearchEngine::new();
    let executor = MemoryExecutor::new(&data);

    let request = SearchRequest::new(1, 10).filter_eq("status", "blocked");
    assert_eq!(names(&engine.fetch(&request, &executor).unwrap()), ["Cid"]);

    let request = SearchRequest::new(1, 10).filter_eq("tags", "vip");
    assert_eq!(names(&engine.fetch(&request, &executor).unwrap()), ["Ann", "Cid"]);
    assert_eq!(engine.count(&request, &executor).unwrap(), 2);

    let request =
        SearchRequest::new(1, 10).filter("status", FilterOperator::NotIn, ["ACTIVE", "blocked"]);
    assert!(engine.fetch(&request, &executor).unwrap().is_empty());
}

#[test]
fn test_search_map_transforms_rows() {
    let data = customers();
    let request = SearchRequest::new(1, 10).filter("age", FilterOperator::LessThan, ["40"]);

    let page = SearchEngine::new()
        .search_map(&request, &MemoryExecutor::new(&data), |c| c.name.to_uppercase())
        .unwrap();

    assert_eq!(page.data, ["ANN", "BOB"]);
    assert_eq!(page.total_count, Some(2));
}

#[test]
fn test_search_without_totals_omits_total_count() {
    let data = customers();
    let request = SearchRequest::new(1, 3).sort_asc("name");

    let page = SearchEngine::new()
        .search_without_totals(&request, &MemoryExecutor::new(&data))
        .unwrap()
        .map(|c| c.name.clone());

    assert_eq!(page.total_count, None);
    assert_eq!(page.returned_count, 3);

    let json = serde_json::to_value(&page).unwrap();
    assert!(json.get("totalCount").is_none());
    assert_eq!(json["returnedCount"], 3);
    assert_eq!(json["pageSize"], 3);
}

#[test]
fn test_request_from_json() {
    let data = customers();
    let request: SearchRequest = serde_json::from_str(
        r#"{
            "page": 1,
            "size": 5,
            "sorts": [{ "field": "age", "direction": "desc" }],
            "filters": [{ "field": "addressCity", "operator": "EQUAL", "values": ["Lyon"] }]
        }"#,
    )
    .unwrap();

    let page = SearchEngine::new()
        .search(&request, &MemoryExecutor::new(&data))
        .unwrap();
    assert_eq!(names(&page.data), ["Dee", "Ann"]);
}

// ============================================================================
// Executor failures
// ============================================================================

struct Unavailable;

impl QueryExecutor for Unavailable {
    type Root = Customer;
    type Row = Customer;
    type Error = std::io::Error;

    fn fetch(&self, _plan: &QueryPlan) -> Result<Vec<Customer>, std::io::Error> {
        Err(std::io::Error::other("database unavailable"))
    }

    fn count(&self, _plan: &QueryPlan) -> Result<u64, std::io::Error> {
        Err(std::io::Error::other("database unavailable"))
    }
}

#[test]
fn test_executor_errors_are_wrapped() {
    let err = SearchEngine::new()
        .search(&SearchRequest::new(1, 10), &Unavailable)
        .unwrap_err();
    assert!(matches!(err, SearchError::Executor(_)));
    assert!(err.to_string().contains("database unavailable"));
}

#[test]
fn test_conversion_fails_before_execution() {
    let request = SearchRequest::new(1, 10).filter_eq("age", "old");
    let err = SearchEngine::new().search(&request, &Unavailable).unwrap_err();
    assert!(err.is_conversion());
}
