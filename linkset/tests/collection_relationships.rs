//! Integration tests for collection relationship fields
//!
//! These tests drive `CollectionRelationshipProvider` against in-memory
//! stores and cover:
//! - Bulk replace, append and clear
//! - Reverse fields seeing edges created from either side
//! - Fail-fast validation without store calls
//! - Partial failures of the write fan-out
//! - Query ids, filters and expansion
//! - Activity logging of client requests

mod common;

use async_trait::async_trait;
use common::*;
use linkset::config::RelationshipConfig;
use linkset::context::RequestContext;
use linkset::query::{QUERY_ALL, QUERY_ALL_IDS, QueryFilter, QueryRequest};
use linkset::relationships::{ActivityLogger, ActivityStatus, RelationshipReference};
use linkset::storage::{MemoryResourceStore, ResourceStore};
use linkset::LinksetError;
use mockall::mock;
use serde_json::json;
use std::sync::Arc;

mock! {
    pub Activity {}

    #[async_trait]
    impl ActivityLogger for Activity {
        async fn log(
            &self,
            context: &RequestContext,
            operation: &str,
            resource_path: &str,
            status: ActivityStatus,
        ) -> linkset::Result<()>;
    }
}

async fn query_all(
    provider: &linkset::relationships::CollectionRelationshipProvider,
    resource_id: &str,
    request: QueryRequest,
) -> linkset::Result<Vec<RelationshipReference>> {
    let mut references = Vec::new();
    provider
        .query_collection(&RequestContext::new(), resource_id, &request, &mut |reference| {
            references.push(reference);
            true
        })
        .await?;
    Ok(references)
}

#[tokio::test]
async fn test_replace_keeps_named_edges_and_drops_the_rest() {
    let store = Arc::new(MemoryResourceStore::new());
    seed(store.as_ref()).await;
    let roles = collection("managed/user", roles_field(), store.clone(), &RelationshipConfig::default());
    let context = RequestContext::new();

    let written = roles
        .set_relationship_value_for_resource(
            true,
            &context,
            "1",
            vec![
                RelationshipReference::to("managed/role/1"),
                RelationshipReference::to("managed/role/2"),
                RelationshipReference::to("managed/role/3"),
            ],
        )
        .await
        .unwrap();
    let kept = written
        .iter()
        .find(|r| r.reference.as_deref() == Some("managed/role/2"))
        .and_then(|r| r.id.clone())
        .unwrap();

    // the kept edge's referent disappears; unchanged references are not re-validated
    store.delete("managed/role/2", None).await.unwrap();

    roles
        .set_relationship_value_for_resource(
            true,
            &context,
            "1",
            vec![
                RelationshipReference::to("managed/role/2").with_id(kept.clone()),
                RelationshipReference::to("managed/role/4"),
            ],
        )
        .await
        .unwrap();

    let current = roles.get_relationship_value_for_resource(&context, "1").await.unwrap();
    assert_eq!(targets(&current), vec!["managed/role/2", "managed/role/4"]);
    assert!(current.iter().any(|r| r.id.as_deref() == Some(kept.as_str())));
    assert_eq!(store.count(REPO).await, 2);

    // expansion of the dangling reference failed and it was still returned
    let dangling = current
        .iter()
        .find(|r| r.reference.as_deref() == Some("managed/role/2"))
        .unwrap();
    assert!(dangling.expanded.is_empty());
}

#[tokio::test]
async fn test_empty_value_clears_or_does_nothing() {
    let store = Arc::new(MemoryResourceStore::new());
    seed(store.as_ref()).await;
    let roles = collection("managed/user", roles_field(), store.clone(), &RelationshipConfig::default());
    let context = RequestContext::new();

    roles
        .set_relationship_value_for_resource(
            true,
            &context,
            "1",
            vec![RelationshipReference::to("managed/role/1"), RelationshipReference::to("managed/role/2")],
        )
        .await
        .unwrap();

    let written = roles
        .set_relationship_value_for_resource(false, &context, "1", Vec::new())
        .await
        .unwrap();
    assert!(written.is_empty());
    assert_eq!(store.count(REPO).await, 2);

    let written = roles
        .set_relationship_value_for_resource(true, &context, "1", Vec::new())
        .await
        .unwrap();
    assert!(written.is_empty());
    assert_eq!(store.count(REPO).await, 0);
}

#[tokio::test]
async fn test_reverse_field_sees_edges_from_both_sides() {
    let store = Arc::new(MemoryResourceStore::new());
    seed(store.as_ref()).await;
    let config = RelationshipConfig::default();
    let roles = collection("managed/user", roles_field(), store.clone(), &config);
    let members = collection("managed/role", members_field(), store.clone(), &config);
    let context = RequestContext::new();

    // alice is assigned from the user side, bob from the role side
    roles
        .set_relationship_value_for_resource(false, &context, "1", vec![RelationshipReference::to("managed/role/1")])
        .await
        .unwrap();
    members
        .set_relationship_value_for_resource(false, &context, "1", vec![RelationshipReference::to("managed/user/2")])
        .await
        .unwrap();

    let all = query_all(&members, "1", QueryRequest::new().with_query_id(QUERY_ALL)).await.unwrap();
    assert_eq!(targets(&all), vec!["managed/user/1", "managed/user/2"]);
    assert_eq!(all.len(), 2);

    let filtered = query_all(
        &members,
        "1",
        QueryRequest::new()
            .with_filter_expression("/_ref eq \"managed/user/1\"")
            .unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(targets(&filtered), vec!["managed/user/1"]);
    assert_eq!(filtered[0].expanded["userName"], json!("alice"));

    // the user side sees the edge created from the role side too
    let bob = roles.get_relationship_value_for_resource(&context, "2").await.unwrap();
    assert_eq!(targets(&bob), vec!["managed/role/1"]);
}

#[tokio::test]
async fn test_duplicates_in_request_fail_without_store_calls() {
    let store = Arc::new(CountingStore::default());
    seed(store.as_ref()).await;
    let roles = collection("managed/user", roles_field(), store.clone(), &RelationshipConfig::default());
    store.reset();

    let result = roles
        .set_relationship_value_for_resource(
            true,
            &RequestContext::new(),
            "1",
            vec![
                RelationshipReference::to("managed/role/1").with_property("grantType", "direct"),
                RelationshipReference::to("managed/role/1").with_property("grantType", "direct"),
            ],
        )
        .await;
    assert!(matches!(result, Err(LinksetError::Validation(_))));
    assert_eq!(store.calls(), 0);

    let result = roles
        .set_relationship_value_for_resource(
            true,
            &RequestContext::new(),
            "1",
            vec![RelationshipReference::to("managed/user/2")],
        )
        .await;
    assert!(matches!(result, Err(LinksetError::BadRequest(_))));
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn test_replacing_with_current_value_is_idempotent() {
    let store = Arc::new(MemoryResourceStore::new());
    seed(store.as_ref()).await;
    let roles = collection("managed/user", roles_field(), store.clone(), &RelationshipConfig::default());
    let context = RequestContext::new();

    roles
        .set_relationship_value_for_resource(
            true,
            &context,
            "1",
            vec![
                RelationshipReference::to("managed/role/1").with_property("grantType", "direct"),
                RelationshipReference::to("managed/role/3"),
            ],
        )
        .await
        .unwrap();

    let summary = |references: &[RelationshipReference]| {
        let mut items: Vec<(Option<String>, Option<String>, Option<serde_json::Value>)> = references
            .iter()
            .map(|r| (r.id.clone(), r.reference.clone(), r.properties.get("grantType").cloned()))
            .collect();
        items.sort_by_key(|(id, reference, grant)| (id.clone(), reference.clone(), grant.as_ref().map(|v| v.to_string())));
        items
    };

    // the same read-back value, revisions included, is applied twice
    let before = roles.get_relationship_value_for_resource(&context, "1").await.unwrap();
    for _ in 0..2 {
        let written = roles
            .set_relationship_value_for_resource(true, &context, "1", before.clone())
            .await
            .unwrap();
        assert_eq!(written.len(), 2);

        let after = roles.get_relationship_value_for_resource(&context, "1").await.unwrap();
        assert_eq!(summary(&before), summary(&after));
        assert_eq!(store.count(REPO).await, 2);
    }
}

#[tokio::test]
async fn test_append_updates_properties_of_existing_edge() {
    let store = Arc::new(MemoryResourceStore::new());
    seed(store.as_ref()).await;
    let roles = collection("managed/user", roles_field(), store.clone(), &RelationshipConfig::default());
    let context = RequestContext::new();

    let created = roles
        .set_relationship_value_for_resource(true, &context, "1", vec![RelationshipReference::to("managed/role/1")])
        .await
        .unwrap();
    let id = created[0].id.clone().unwrap();

    // without clear_existing, same target and id, new properties
    let updated = roles
        .set_relationship_value_for_resource(
            false,
            &context,
            "1",
            vec![
                RelationshipReference::to("managed/role/1")
                    .with_id(id.clone())
                    .with_property("grantType", "direct"),
            ],
        )
        .await
        .unwrap();
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0].id.as_deref(), Some(id.as_str()));

    let current = roles.get_relationship_value_for_resource(&context, "1").await.unwrap();
    assert_eq!(current.len(), 1);
    assert_eq!(current[0].properties["grantType"], json!("direct"));
    assert_eq!(store.count(REPO).await, 1);

    // a new reference to the same target is still a duplicate assignment
    assert!(matches!(
        roles
            .set_relationship_value_for_resource(false, &context, "1", vec![RelationshipReference::to("managed/role/1")])
            .await,
        Err(LinksetError::Validation(_))
    ));
}

#[tokio::test]
async fn test_failed_fan_out_keeps_completed_operations() {
    let store = Arc::new(FlakyStore::failing_on("managed/role/3"));
    seed(&store.inner).await;
    let roles = collection("managed/user", roles_field(), store.clone(), &RelationshipConfig::default());
    let context = RequestContext::new();

    roles
        .set_relationship_value_for_resource(true, &context, "1", vec![RelationshipReference::to("managed/role/4")])
        .await
        .unwrap();

    let result = roles
        .set_relationship_value_for_resource(
            true,
            &context,
            "1",
            vec![
                RelationshipReference::to("managed/role/1"),
                RelationshipReference::to("managed/role/2"),
                RelationshipReference::to("managed/role/3"),
            ],
        )
        .await;
    assert!(matches!(result, Err(LinksetError::Internal(_))));

    // nothing is rolled back: the old edge is gone and the successful creates stay
    let current = roles.get_relationship_value_for_resource(&context, "1").await.unwrap();
    assert_eq!(targets(&current), vec!["managed/role/1", "managed/role/2"]);
}

#[tokio::test]
async fn test_query_rejections() {
    let store = Arc::new(MemoryResourceStore::new());
    seed(store.as_ref()).await;
    let roles = collection("managed/user", roles_field(), store.clone(), &RelationshipConfig::default());

    for request in [
        QueryRequest::new().with_query_id("find-by-name"),
        QueryRequest::new().with_query_expression("select * from repo"),
        QueryRequest::new()
            .with_filter_expression("/name eq \"admin\"")
            .unwrap(),
    ] {
        assert!(matches!(
            query_all(&roles, "1", request).await,
            Err(LinksetError::BadRequest(_))
        ));
    }
}

#[tokio::test]
async fn test_lenient_filter_fields_pass_through() {
    let store = Arc::new(MemoryResourceStore::new());
    seed(store.as_ref()).await;
    let config = RelationshipConfig {
        strict_filter_fields: false,
        ..RelationshipConfig::default()
    };
    let roles = collection("managed/user", roles_field(), store.clone(), &config);
    roles
        .set_relationship_value_for_resource(
            true,
            &RequestContext::new(),
            "1",
            vec![RelationshipReference::to("managed/role/1"), RelationshipReference::to("managed/role/2")],
        )
        .await
        .unwrap();

    // an edge-record field name reaches the store unchanged
    let request = QueryRequest::new().with_filter(QueryFilter::equal_to("/secondId", "managed/role/2"));
    let found = query_all(&roles, "1", request).await.unwrap();
    assert_eq!(targets(&found), vec!["managed/role/2"]);
}

#[tokio::test]
async fn test_query_paging_and_ids_only() {
    let store = Arc::new(MemoryResourceStore::new());
    seed(store.as_ref()).await;
    let roles = collection("managed/user", roles_field(), store.clone(), &RelationshipConfig::default());
    roles
        .set_relationship_value_for_resource(
            true,
            &RequestContext::new(),
            "1",
            vec![
                RelationshipReference::to("managed/role/1"),
                RelationshipReference::to("managed/role/2"),
                RelationshipReference::to("managed/role/3"),
            ],
        )
        .await
        .unwrap();

    let mut page = Vec::new();
    let response = roles
        .query_collection(
            &RequestContext::new(),
            "1",
            &QueryRequest::new()
                .with_query_id(QUERY_ALL_IDS)
                .with_page_size(2)
                .with_sort_key(linkset::query::SortKey::ascending("/secondId")),
            &mut |reference| {
                page.push(reference);
                true
            },
        )
        .await
        .unwrap();

    assert_eq!(targets(&page), vec!["managed/role/1", "managed/role/2"]);
    assert!(page.iter().all(|r| r.expanded.is_empty()));
    assert_eq!(response.remaining_paged_results, Some(1));
    assert_eq!(response.paged_results_cookie.as_deref(), Some("2"));
}

#[tokio::test]
async fn test_serialized_replaces_do_not_interleave() {
    let store = Arc::new(MemoryResourceStore::new());
    seed(store.as_ref()).await;
    let config = RelationshipConfig {
        serialize_owner_replaces: true,
        max_concurrent_operations: 1,
        ..RelationshipConfig::default()
    };
    let roles = collection("managed/user", roles_field(), store.clone(), &config);
    let context = RequestContext::new();

    let first = roles.set_relationship_value_for_resource(
        true,
        &context,
        "1",
        vec![RelationshipReference::to("managed/role/1"), RelationshipReference::to("managed/role/2")],
    );
    let second = roles.set_relationship_value_for_resource(
        true,
        &context,
        "1",
        vec![RelationshipReference::to("managed/role/3")],
    );
    let (first, second) = tokio::join!(first, second);
    first.unwrap();
    second.unwrap();

    let current = targets(&roles.get_relationship_value_for_resource(&context, "1").await.unwrap());
    assert!(
        current == vec!["managed/role/1", "managed/role/2"] || current == vec!["managed/role/3"],
        "interleaved replaces produced {:?}",
        current
    );
}

#[tokio::test]
async fn test_unserialized_replaces_may_interleave() {
    let store = Arc::new(MemoryResourceStore::new());
    seed(store.as_ref()).await;
    let config = RelationshipConfig {
        max_concurrent_operations: 1,
        ..RelationshipConfig::default()
    };
    assert!(!config.serialize_owner_replaces);
    let roles = collection("managed/user", roles_field(), store.clone(), &config);
    let context = RequestContext::new();

    let first = roles.set_relationship_value_for_resource(
        true,
        &context,
        "1",
        vec![RelationshipReference::to("managed/role/1"), RelationshipReference::to("managed/role/2")],
    );
    let second = roles.set_relationship_value_for_resource(
        true,
        &context,
        "1",
        vec![RelationshipReference::to("managed/role/3")],
    );
    let (first, second) = tokio::join!(first, second);
    first.unwrap();
    second.unwrap();

    // without the owner lock each replace only deletes the edges it read,
    // so the result may mix both values
    let current = targets(&roles.get_relationship_value_for_resource(&context, "1").await.unwrap());
    assert!(!current.is_empty());
    assert!(
        current
            .iter()
            .all(|target| ["managed/role/1", "managed/role/2", "managed/role/3"].contains(&target.as_str())),
        "unexpected edges {:?}",
        current
    );
    assert_eq!(store.count(REPO).await, current.len());
    let serialized = current == vec!["managed/role/1", "managed/role/2"] || current == vec!["managed/role/3"];
    if !serialized {
        println!("replaces interleaved into {:?}", current);
    }
}

#[tokio::test]
async fn test_activity_logged_for_client_queries_only() {
    let store = Arc::new(MemoryResourceStore::new());
    seed(store.as_ref()).await;

    let mut activity = MockActivity::new();
    activity
        .expect_log()
        .times(1)
        .returning(|context, operation, resource_path, status| {
            assert!(!context.internal);
            assert_eq!(operation, "query");
            assert_eq!(resource_path, "managed/user/1");
            assert_eq!(status, ActivityStatus::Success);
            Ok(())
        });

    let roles = collection_with_activity(
        "managed/user",
        roles_field(),
        store.clone(),
        &RelationshipConfig::default(),
        Arc::new(activity),
    );

    // internal read: not reported
    roles
        .get_relationship_value_for_resource(&RequestContext::new(), "1")
        .await
        .unwrap();
    // client query: reported once
    query_all(&roles, "1", QueryRequest::new().with_query_id(QUERY_ALL))
        .await
        .unwrap();
}
