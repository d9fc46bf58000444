//! Backend-agnostic catalog scenarios shared by the SQLite and PostgreSQL suites.

#![allow(dead_code)]

use super::TestCatalog;
use serde_json::json;
use tabula_catalog::{CatalogError, Record, apply_schema_ops};
use tabula_core::{
    ColumnSpec, NormalizedColumn, SchemaOp, SiteScope, SqlType, diff_schema, normalize_columns,
};

fn record(value: serde_json::Value) -> Record {
    value.as_object().cloned().expect("record must be a JSON object")
}

fn spec(name: &str, ty: &str, not_null: bool) -> ColumnSpec {
    ColumnSpec::new(name, ty, not_null)
}

pub async fn create_and_describe(catalog: &TestCatalog) {
    let store = catalog.store();
    let columns = normalize_columns(&[
        spec("Full Name", "VARCHAR(100)", true),
        spec("Age", "INT", false),
        spec("Photo", "IMAGE", false),
    ])
    .unwrap();

    let table = store.create_table(1, "People", &columns).await.unwrap();
    assert_eq!(table.site_id, 1);
    assert_eq!(table.table_name, "People");
    assert_eq!(table.table_id.len(), tabula_core::TABLE_ID_LEN);

    let described = store.describe_table(&table.table_id).await.unwrap();
    let fields: Vec<&str> = described.iter().map(|c| c.field.as_str()).collect();
    assert_eq!(fields, vec!["id", "full_name", "age", "image_id"]);
    assert!(described[0].primary_key);
    assert!(!described[0].nullable);
    assert!(!described[1].nullable);
    assert!(described[2].nullable);
    assert!(described[3].nullable);

    // Re-applying the same desired columns is a no-op.
    assert!(diff_schema(&columns, &described).is_empty());
}

pub async fn schema_update_preserves_rows(catalog: &TestCatalog) {
    let store = catalog.store();
    let initial = normalize_columns(&[
        spec("name", "TEXT", false),
        spec("age", "INTEGER", false),
        spec("legacy", "TEXT", false),
    ])
    .unwrap();
    let table = store.create_table(1, "Members", &initial).await.unwrap();
    let id = store
        .insert_record(
            &table.table_id,
            &record(json!({"name": "Ana", "age": 31, "legacy": "x"})),
        )
        .await
        .unwrap();

    let desired = normalize_columns(&[
        spec("name", "VARCHAR(50)", true),
        spec("age", "BIGINT", true),
        spec("email", "TEXT", false),
    ])
    .unwrap();
    let ops = diff_schema(&desired, &store.describe_table(&table.table_id).await.unwrap());
    let kinds: Vec<&str> = ops.iter().map(SchemaOp::kind).collect();
    assert_eq!(kinds, vec!["modify", "modify", "add", "drop"]);

    let applied = apply_schema_ops(store.as_ref(), &table.table_id, &ops)
        .await
        .unwrap();
    assert_eq!(applied.len(), 4);

    let described = store.describe_table(&table.table_id).await.unwrap();
    assert!(diff_schema(&desired, &described).is_empty());
    assert!(described[0].primary_key);

    let row = store
        .get_record(&table.table_id, id)
        .await
        .unwrap()
        .expect("row survives schema changes");
    assert_eq!(row["name"], json!("Ana"));
    assert_eq!(row["age"], json!(31));
    assert_eq!(row["email"], json!(null));
    assert!(!row.contains_key("legacy"));
}

pub async fn add_not_null_column_on_empty_table(catalog: &TestCatalog) {
    let store = catalog.store();
    let table = store
        .create_table(1, "Empty", &normalize_columns(&[spec("a", "TEXT", false)]).unwrap())
        .await
        .unwrap();

    let op = SchemaOp::Add {
        column: NormalizedColumn {
            name: "b".to_string(),
            sql_type: SqlType::new("INTEGER", None),
            nullable: false,
        },
    };
    store.apply_schema_op(&table.table_id, &op).await.unwrap();

    let described = store.describe_table(&table.table_id).await.unwrap();
    let b = described.iter().find(|c| c.field == "b").unwrap();
    assert!(!b.nullable);
}

pub async fn id_column_is_untouchable(catalog: &TestCatalog) {
    let store = catalog.store();
    let table = store
        .create_table(1, "Keys", &normalize_columns(&[spec("a", "TEXT", false)]).unwrap())
        .await
        .unwrap();

    let err = store
        .apply_schema_op(
            &table.table_id,
            &SchemaOp::Drop {
                field: "id".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Forbidden(_)));

    let described = store.describe_table(&table.table_id).await.unwrap();
    assert_eq!(described[0].field, "id");
    assert!(described[0].primary_key);
}

pub async fn partial_failure_keeps_applied_ops(catalog: &TestCatalog) {
    let store = catalog.store();
    let table = store
        .create_table(1, "Partial", &normalize_columns(&[spec("a", "TEXT", false)]).unwrap())
        .await
        .unwrap();

    let add = |name: &str| SchemaOp::Add {
        column: NormalizedColumn {
            name: name.to_string(),
            sql_type: SqlType::new("TEXT", None),
            nullable: true,
        },
    };
    let ops = vec![
        add("nickname"),
        SchemaOp::Drop {
            field: "ghost".to_string(),
        },
        add("later"),
    ];

    let err = apply_schema_ops(store.as_ref(), &table.table_id, &ops)
        .await
        .unwrap_err();
    match err {
        CatalogError::PartialFailure {
            failed, applied, ..
        } => {
            assert_eq!(failed.field(), "ghost");
            assert_eq!(applied, vec![add("nickname")]);
        }
        other => panic!("expected partial failure, got {other:?}"),
    }

    let fields: Vec<String> = store
        .describe_table(&table.table_id)
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.field)
        .collect();
    assert!(fields.contains(&"nickname".to_string()));
    assert!(!fields.contains(&"later".to_string()));
}

pub async fn first_op_failure_is_not_partial(catalog: &TestCatalog) {
    let store = catalog.store();
    let table = store
        .create_table(1, "Fails", &normalize_columns(&[spec("a", "TEXT", false)]).unwrap())
        .await
        .unwrap();
    let ops = vec![SchemaOp::Drop {
        field: "ghost".to_string(),
    }];
    let err = apply_schema_ops(store.as_ref(), &table.table_id, &ops)
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Database(_)));
}

pub async fn reserved_tables_cannot_be_deleted(catalog: &TestCatalog) {
    let store = catalog.store();
    for name in ["sites", "SITE_TABLES", "user_main"] {
        let err = store.delete_table(name).await.unwrap_err();
        assert!(matches!(err, CatalogError::Forbidden(_)), "{name}: {err:?}");
    }
    assert!(store.get_site(1).await.unwrap().is_some());
    assert!(
        store
            .list_physical_tables()
            .await
            .unwrap()
            .contains(&"sites".to_string())
    );
}

pub async fn scope_isolation(catalog: &TestCatalog) {
    let store = catalog.store();
    let site_a = store.create_site("alpha").await.unwrap();
    let site_b = store.create_site("beta").await.unwrap();
    assert_ne!(site_a.id, site_b.id);

    let table = store
        .create_table(site_a.id, "Orders", &[])
        .await
        .unwrap();

    assert!(
        store
            .find_table(SiteScope::Site(site_a.id), &table.table_id)
            .await
            .unwrap()
            .is_some()
    );
    assert!(
        store
            .find_table(SiteScope::Site(site_b.id), &table.table_id)
            .await
            .unwrap()
            .is_none()
    );
    let shared = store
        .find_table(SiteScope::Shared, &table.table_id.to_lowercase())
        .await
        .unwrap()
        .expect("shared scope resolves across sites");
    assert_eq!(shared.site_id, site_a.id);

    let listed = store.list_tables(site_b.id).await.unwrap();
    assert!(listed.is_empty());
}

pub async fn table_ids_are_unique(catalog: &TestCatalog) {
    let store = catalog.store();
    let mut ids = std::collections::HashSet::new();
    for i in 0..10 {
        let table = store
            .create_table(1, &format!("T{i}"), &[])
            .await
            .unwrap();
        assert!(ids.insert(table.table_id));
    }
}

pub async fn association_lifecycle(catalog: &TestCatalog) {
    let store = catalog.store();
    let site = store.create_site("legacy").await.unwrap();
    catalog
        .execute_raw("CREATE TABLE legacy_orders (id INTEGER PRIMARY KEY, label TEXT)")
        .await;

    let unassociated = store.list_unassociated_tables().await.unwrap();
    assert_eq!(unassociated, vec!["legacy_orders".to_string()]);

    let row = store
        .associate_table(site.id, "legacy_orders")
        .await
        .unwrap();
    assert_eq!(row.table_id, "legacy_orders");
    assert_eq!(row.table_name, "legacy_orders");
    assert_eq!(row.site_id, site.id);

    let err = store.associate_table(1, "legacy_orders").await.unwrap_err();
    assert!(matches!(err, CatalogError::AlreadyExists(_)));

    let err = store.associate_table(site.id, "sites").await.unwrap_err();
    assert!(matches!(err, CatalogError::Forbidden(_)));

    let err = store.associate_table(site.id, "missing").await.unwrap_err();
    assert!(matches!(err, CatalogError::NotFound(_)));

    assert!(store.list_unassociated_tables().await.unwrap().is_empty());
}

pub async fn record_crud(catalog: &TestCatalog) {
    let store = catalog.store();
    let columns = normalize_columns(&[
        spec("title", "VARCHAR(80)", true),
        spec("score", "INTEGER", false),
        spec("cover", "IMAGE", false),
    ])
    .unwrap();
    let table = store.create_table(1, "Books", &columns).await.unwrap();
    let t = table.table_id.as_str();

    let first = store
        .insert_record(t, &record(json!({"id": 999, "title": "Dune", "score": 5})))
        .await
        .unwrap();
    assert_ne!(first, 999);
    let second = store
        .insert_record(t, &record(json!({"title": "Emma", "score": ""})))
        .await
        .unwrap();
    assert!(second > first);

    let rows = store.list_records(t).await.unwrap();
    assert_eq!(rows.len(), 2);
    let emma = rows.iter().find(|r| r["title"] == json!("Emma")).unwrap();
    assert_eq!(emma["score"], json!(null));

    let latest = store.latest_records(t, 1).await.unwrap();
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0]["id"], json!(second));

    let changed = store
        .update_record(t, first, &record(json!({"score": 4, "image_id": "k.png"})))
        .await
        .unwrap();
    assert_eq!(changed, 1);
    let dune = store.get_record(t, first).await.unwrap().unwrap();
    assert_eq!(dune["score"], json!(4));
    assert_eq!(dune["image_id"], json!("k.png"));

    let err = store
        .insert_record(t, &record(json!({"nope": 1})))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Invalid(_)));

    let err = store
        .update_record(t, first, &record(json!({"id": 5})))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Invalid(_)));

    assert_eq!(store.delete_record(t, first).await.unwrap(), 1);
    assert_eq!(store.delete_record(t, first).await.unwrap(), 0);
    assert!(store.get_record(t, first).await.unwrap().is_none());
}

pub async fn delete_table_drops_physical(catalog: &TestCatalog) {
    let store = catalog.store();
    let table = store.create_table(1, "Gone", &[]).await.unwrap();

    let removed = store.delete_table(&table.table_id).await.unwrap();
    assert_eq!(removed.table_id, table.table_id);
    assert!(store.get_table(&table.table_id).await.unwrap().is_none());
    assert!(
        !store
            .list_physical_tables()
            .await
            .unwrap()
            .contains(&table.table_id)
    );

    let err = store.delete_table(&table.table_id).await.unwrap_err();
    assert!(matches!(err, CatalogError::NotFound(_)));
}

pub async fn rename_changes_display_name_only(catalog: &TestCatalog) {
    let store = catalog.store();
    let table = store.create_table(1, "Before", &[]).await.unwrap();
    store
        .rename_table(&table.table_id, "After")
        .await
        .unwrap();

    let renamed = store.get_table(&table.table_id).await.unwrap().unwrap();
    assert_eq!(renamed.table_name, "After");
    assert_eq!(renamed.table_id, table.table_id);

    let err = store.rename_table("missing", "x").await.unwrap_err();
    assert!(matches!(err, CatalogError::NotFound(_)));
}
