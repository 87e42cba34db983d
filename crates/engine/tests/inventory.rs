use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{
    Actor, AssetDraft, AssetInput, AssetStatus, Engine, EngineError, HistoryAction, LogTimestamp,
    MoneyCents,
    query::{self, InventoryFilter, TrashFilter},
};
use migration::MigratorTrait;
use uuid::Uuid;

async fn engine_with_db() -> (Engine, DatabaseConnection, Actor) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    let alice = engine.create_user("alice", "password", "Alice").await.unwrap();
    (engine, db, alice)
}

async fn add(engine: &Engine, actor: &Actor, input: &AssetInput) -> engine::Asset {
    let draft = AssetDraft::new(input).unwrap();
    engine.add_asset(actor, draft).await.unwrap()
}

#[tokio::test]
async fn notebook_lifecycle_writes_one_log_per_mutation() {
    let (engine, _db, alice) = engine_with_db().await;
    let category = engine.create_category("alice", "Informática").await.unwrap();

    let input = AssetInput::new("Notebook", "NTB-001", category.id.to_string(), "4500").city("SP");
    let asset = add(&engine, &alice, &input).await;
    assert_eq!(asset.status, AssetStatus::Ativo);
    assert_eq!(asset.value, MoneyCents::new(450_000));
    assert_eq!(asset.created_at, asset.updated_at);

    let deleted = engine.deactivate_asset(&alice, asset.id).await.unwrap();
    assert_eq!(deleted.status, AssetStatus::Inativo);

    let snapshot = engine.snapshot("alice").await.unwrap();
    assert!(query::filter_inventory(&snapshot, &InventoryFilter::default()).is_empty());
    assert_eq!(query::filter_trash(&snapshot, &TrashFilter::default()).len(), 1);

    let restored = engine.reactivate_asset(&alice, asset.id).await.unwrap();
    assert_eq!(restored.status, AssetStatus::Ativo);

    let history = engine.asset_history("alice", asset.id).await.unwrap();
    let actions: Vec<HistoryAction> = history.iter().map(|e| e.action).collect();
    assert_eq!(
        actions,
        vec![
            HistoryAction::Created,
            HistoryAction::Deactivated,
            HistoryAction::Reactivated
        ]
    );
    for entry in &history {
        assert_eq!(entry.asset_name, "Notebook");
        assert_eq!(entry.code_id, "NTB-001");
        assert_eq!(entry.user_display_name, "Alice");
        assert!(matches!(entry.timestamp, LogTimestamp::Committed(_)));
    }
    assert_eq!(history[0].details, "Item criado.");
}

#[tokio::test]
async fn update_logs_field_diff_with_category_names() {
    let (engine, _db, alice) = engine_with_db().await;
    let office = engine.create_category("alice", "Escritório").await.unwrap();
    let furniture = engine.create_category("alice", "Móveis").await.unwrap();

    let input = AssetInput::new("Cadeira", "CAD-1", office.id.to_string(), "700").city("Rio");
    let asset = add(&engine, &alice, &input).await;

    let changed = AssetInput::new("Cadeira", "CAD-1", furniture.id.to_string(), "750,50").city("Rio");
    let updated = engine.update_asset(&alice, asset.id, &changed).await.unwrap();
    assert_eq!(updated.category_id, furniture.id);
    assert_eq!(updated.value, MoneyCents::new(75_050));
    assert!(updated.updated_at >= asset.updated_at);

    let history = engine.asset_history("alice", asset.id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].action, HistoryAction::Updated);
    assert_eq!(
        history[1].details,
        "Categoria alterado de \"Escritório\" para \"Móveis\"; \
         Valor alterado de \"R$ 700.00\" para \"R$ 750.50\""
    );
}

#[tokio::test]
async fn update_without_changes_still_writes_a_log() {
    let (engine, _db, alice) = engine_with_db().await;
    let category = engine.create_category("alice", "Geral").await.unwrap();
    let input = AssetInput::new("Mesa", "MES-1", category.id.to_string(), "100");
    let asset = add(&engine, &alice, &input).await;

    engine.update_asset(&alice, asset.id, &input).await.unwrap();

    let history = engine.asset_history("alice", asset.id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].details, "Nenhum campo alterado.");
}

#[tokio::test]
async fn invalid_update_leaves_asset_and_history_untouched() {
    let (engine, _db, alice) = engine_with_db().await;
    let category = engine.create_category("alice", "Geral").await.unwrap();
    let input = AssetInput::new("Mesa", "MES-1", category.id.to_string(), "100");
    let asset = add(&engine, &alice, &input).await;

    let bad = AssetInput::new("Mesa", "MES-1", category.id.to_string(), "0");
    let err = engine.update_asset(&alice, asset.id, &bad).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let unknown_category = AssetInput::new("Mesa", "MES-1", Uuid::new_v4().to_string(), "100");
    let err = engine
        .update_asset(&alice, asset.id, &unknown_category)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));

    let stored = engine.asset("alice", asset.id).await.unwrap();
    assert_eq!(stored.value, asset.value);
    assert_eq!(stored.category_id, asset.category_id);
    assert_eq!(engine.asset_history("alice", asset.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn failed_history_insert_rolls_back_the_asset_write() {
    let (engine, db, alice) = engine_with_db().await;
    let category = engine.create_category("alice", "Geral").await.unwrap();
    let kept = add(
        &engine,
        &alice,
        &AssetInput::new("Mesa", "MES-1", category.id.to_string(), "100"),
    )
    .await;

    db.execute(Statement::from_string(
        db.get_database_backend(),
        "DROP TABLE history_logs".to_string(),
    ))
    .await
    .unwrap();

    let draft = AssetDraft::new(&AssetInput::new(
        "Cadeira",
        "CAD-1",
        category.id.to_string(),
        "50",
    ))
    .unwrap();
    let err = engine.add_asset(&alice, draft).await.unwrap_err();
    assert!(matches!(err, EngineError::Database(_)));

    let err = engine.deactivate_asset(&alice, kept.id).await.unwrap_err();
    assert!(matches!(err, EngineError::Database(_)));

    let assets = engine.list_assets("alice").await.unwrap();
    assert_eq!(assets.len(), 1);
    assert_eq!(assets[0].id, kept.id);
    assert_eq!(assets[0].status, AssetStatus::Ativo);
}

#[tokio::test]
async fn status_transitions_are_checked() {
    let (engine, _db, alice) = engine_with_db().await;
    let category = engine.create_category("alice", "Geral").await.unwrap();
    let asset = add(
        &engine,
        &alice,
        &AssetInput::new("Monitor", "MON-1", category.id.to_string(), "900"),
    )
    .await;

    let err = engine.reactivate_asset(&alice, asset.id).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidState(_)));

    engine.deactivate_asset(&alice, asset.id).await.unwrap();
    let err = engine.deactivate_asset(&alice, asset.id).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidState(_)));

    // Rejected transitions write nothing.
    assert_eq!(engine.asset_history("alice", asset.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn missing_and_foreign_assets_are_rejected() {
    let (engine, _db, alice) = engine_with_db().await;
    let bob = engine.create_user("bob", "password", "Bob").await.unwrap();
    let category = engine.create_category("alice", "Geral").await.unwrap();
    let asset = add(
        &engine,
        &alice,
        &AssetInput::new("Monitor", "MON-1", category.id.to_string(), "900"),
    )
    .await;

    let err = engine.deactivate_asset(&alice, Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));

    let err = engine.deactivate_asset(&bob, asset.id).await.unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let err = engine.asset("bob", asset.id).await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));

    let ghost = Actor::new("ghost", "Ghost");
    let draft = AssetDraft::new(&AssetInput::new("X", "X-1", category.id.to_string(), "1")).unwrap();
    let err = engine.add_asset(&ghost, draft).await.unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
}

#[tokio::test]
async fn foreign_category_cannot_be_used() {
    let (engine, _db, _alice) = engine_with_db().await;
    let bob = engine.create_user("bob", "password", "Bob").await.unwrap();
    let category = engine.create_category("alice", "Geral").await.unwrap();

    let draft = AssetDraft::new(&AssetInput::new("X", "X-1", category.id.to_string(), "1")).unwrap();
    let err = engine.add_asset(&bob, draft).await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
    assert!(engine.list_history("bob").await.unwrap().is_empty());
}

#[tokio::test]
async fn import_collects_row_failures() {
    let (engine, _db, alice) = engine_with_db().await;
    let category = engine.create_category("alice", "Informática").await.unwrap();

    let csv = format!(
        "name,codeId,categoryId,city,value,observation\n\
         Notebook,NTB-001,{id},SP,4500,\n\
         Mouse,MOU-001,{id},SP,\"80,90\",sem fio\n\
         ,TEC-001,{id},SP,120,\n\
         Teclado,TEC-002,informatica,Rio,150.00,\n",
        id = category.id
    );
    let report = engine.import_assets_csv(&alice, csv.as_bytes()).await.unwrap();
    assert_eq!(report.success, 3);
    assert_eq!(report.failed, 1);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].line, 4);

    let history = engine.list_history("alice").await.unwrap();
    assert_eq!(history.len(), 3);
    assert!(history.iter().all(|e| e.action == HistoryAction::Created));
}

#[tokio::test]
async fn import_rejects_unreadable_header() {
    let (engine, _db, alice) = engine_with_db().await;
    let err = engine
        .import_assets_csv(&alice, b"foo;bar\n1;2\n")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Csv(_)));
}

#[tokio::test]
async fn export_then_import_round_trips() {
    let (engine, _db, alice) = engine_with_db().await;
    let bob = engine.create_user("bob", "password", "Bob").await.unwrap();
    let source = engine.create_category("alice", "Informática").await.unwrap();
    engine.create_category("bob", "informatica").await.unwrap();

    add(
        &engine,
        &alice,
        &AssetInput::new("Notebook 15\"", "NTB-001", source.id.to_string(), "4500.50")
            .city("SP")
            .observation("com capa, carregador"),
    )
    .await;
    add(
        &engine,
        &alice,
        &AssetInput::new("Mouse", "MOU-001", source.id.to_string(), "80"),
    )
    .await;

    let exported = engine.export_assets_csv("alice").await.unwrap();
    let report = engine.import_assets_csv(&bob, &exported).await.unwrap();
    assert_eq!(report.failed, 0, "{:?}", report.errors);
    assert_eq!(report.success, 2);

    let key = |a: &engine::Asset| {
        (
            a.name.clone(),
            a.code_id.clone(),
            a.city.clone(),
            a.value,
            a.observation.clone(),
        )
    };
    let mut original: Vec<_> = engine.list_assets("alice").await.unwrap().iter().map(key).collect();
    let mut imported: Vec<_> = engine.list_assets("bob").await.unwrap().iter().map(key).collect();
    original.sort();
    imported.sort();
    assert_eq!(original, imported);
}

#[tokio::test]
async fn history_export_lists_newest_first() {
    let (engine, _db, alice) = engine_with_db().await;
    let category = engine.create_category("alice", "Geral").await.unwrap();
    let asset = add(
        &engine,
        &alice,
        &AssetInput::new("Monitor", "MON-1", category.id.to_string(), "900"),
    )
    .await;
    engine.deactivate_asset(&alice, asset.id).await.unwrap();

    let data = engine.export_history_csv("alice").await.unwrap();
    let text = String::from_utf8(data).unwrap();
    let rows: Vec<&str> = text.lines().collect();
    assert_eq!(rows.len(), 3);
    assert!(rows[0].ends_with("ID,Item,Código ID,Ação,Usuário,Data e Hora,Detalhes"));
    assert!(rows[1].contains(",Excluído,Alice,"));
    assert!(rows[2].contains(",Criado,Alice,"));
}

#[tokio::test]
async fn pending_timestamps_are_read_back() {
    let (engine, db, alice) = engine_with_db().await;
    let category = engine.create_category("alice", "Geral").await.unwrap();
    let asset = add(
        &engine,
        &alice,
        &AssetInput::new("Monitor", "MON-1", category.id.to_string(), "900"),
    )
    .await;

    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO history_logs \
         (id, asset_id, asset_name, code_id, action, details, user_id, user_display_name, timestamp) \
         VALUES (?, ?, 'Monitor', 'MON-1', 'Atualizado', 'x', 'alice', 'Alice', NULL)",
        vec![Uuid::new_v4().to_string().into(), asset.id.to_string().into()],
    ))
    .await
    .unwrap();

    let mut history = engine.list_history("alice").await.unwrap();
    assert_eq!(history.len(), 2);
    query::sort_history_desc(&mut history, chrono::Utc::now());
    assert_eq!(history[0].timestamp, LogTimestamp::Pending);
    assert_eq!(history[1].action, HistoryAction::Created);
}

#[tokio::test]
async fn categories_are_unique_and_restricted() {
    let (engine, _db, alice) = engine_with_db().await;
    let category = engine.create_category("alice", "Eletrônicos").await.unwrap();

    let err = engine.create_category("alice", " eletronicos ").await.unwrap_err();
    assert_eq!(err, EngineError::ExistingKey("Eletrônicos".to_string()));
    // Other accounts have their own namespace.
    engine.create_user("bob", "password", "Bob").await.unwrap();
    engine.create_category("bob", "Eletrônicos").await.unwrap();

    let renamed = engine
        .rename_category("alice", category.id, "Eletrônicos e TI")
        .await
        .unwrap();
    assert_eq!(renamed.name, "Eletrônicos e TI");

    let asset = add(
        &engine,
        &alice,
        &AssetInput::new("TV", "TV-1", category.id.to_string(), "2000"),
    )
    .await;
    engine.deactivate_asset(&alice, asset.id).await.unwrap();

    // Trashed assets still hold the reference.
    let err = engine.delete_category("alice", category.id).await.unwrap_err();
    assert!(matches!(err, EngineError::InUse(_)));

    let spare = engine.create_category("alice", "Sobra").await.unwrap();
    engine.delete_category("alice", spare.id).await.unwrap();
    let names: Vec<String> = engine
        .list_categories("alice")
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["Eletrônicos e TI".to_string()]);
}

#[tokio::test]
async fn locations_are_unique_and_restricted() {
    let (engine, _db, alice) = engine_with_db().await;
    let category = engine.create_category("alice", "Geral").await.unwrap();
    let sp = engine.create_location("alice", "São Paulo").await.unwrap();
    let rio = engine.create_location("alice", "Rio").await.unwrap();

    let err = engine.create_location("alice", "sao paulo").await.unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));

    add(
        &engine,
        &alice,
        &AssetInput::new("Mesa", "MES-1", category.id.to_string(), "300").city("São Paulo"),
    )
    .await;

    let err = engine.delete_location("alice", sp.id).await.unwrap_err();
    assert_eq!(err, EngineError::InUse("São Paulo".to_string()));
    engine.delete_location("alice", rio.id).await.unwrap();

    let err = engine.delete_location("alice", rio.id).await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
    assert_eq!(engine.list_locations("alice").await.unwrap().len(), 1);
}

#[tokio::test]
async fn dashboard_counts_only_active_assets() {
    let (engine, _db, alice) = engine_with_db().await;
    let it = engine.create_category("alice", "TI").await.unwrap();
    engine.create_location("alice", "SP").await.unwrap();
    add(&engine, &alice, &AssetInput::new("A", "A-1", it.id.to_string(), "100").city("SP")).await;
    let gone = add(&engine, &alice, &AssetInput::new("B", "B-1", it.id.to_string(), "50")).await;
    engine.deactivate_asset(&alice, gone.id).await.unwrap();

    let stats = query::dashboard(&engine.snapshot("alice").await.unwrap());
    assert_eq!(stats.total_assets, 1);
    assert_eq!(stats.total_value, MoneyCents::new(10_000));
    assert_eq!(stats.category_count, 1);
    assert_eq!(stats.location_count, 1);
    assert_eq!(stats.assets_by_city[0].label, "SP");
}

#[tokio::test]
async fn authentication_checks_password() {
    let (engine, _db, alice) = engine_with_db().await;

    assert_eq!(
        engine.authenticate("alice", "password").await.unwrap(),
        Some(alice)
    );
    assert_eq!(engine.authenticate("alice", "wrong").await.unwrap(), None);
    assert_eq!(engine.authenticate("nobody", "password").await.unwrap(), None);

    let err = engine
        .create_user("alice", "another", "Alice 2")
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::ExistingKey("alice".to_string()));

    assert_eq!(engine.user("alice").await.unwrap().display_name, "Alice");
    assert!(matches!(
        engine.user("nobody").await,
        Err(EngineError::KeyNotFound(_))
    ));
}
