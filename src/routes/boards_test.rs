use super::*;
use crate::services::board::DEFAULT_BOARD_NAME;
use crate::state::{StoreLimits, test_helpers};

#[tokio::test]
async fn create_then_get_round_trip() {
    let state = test_helpers::test_app_state();

    let created = create_board(State(state.clone()), Some(Json(CreateBoardBody { name: Some("Demo".into()) })))
        .await
        .expect("create should succeed");
    assert_eq!(created.0.name, "Demo");

    let detail = get_board(State(state), Path(created.0.id.to_string()))
        .await
        .expect("board should exist");
    assert_eq!(detail.0.id, created.0.id);
    assert_eq!(detail.0.name, "Demo");
    assert!(detail.0.segments.is_empty());
}

#[tokio::test]
async fn create_without_body_defaults_name() {
    let state = test_helpers::test_app_state();
    let created = create_board(State(state), None).await.expect("create should succeed");
    assert_eq!(created.0.name, DEFAULT_BOARD_NAME);
}

#[tokio::test]
async fn get_unknown_board_returns_404_with_message() {
    let state = test_helpers::test_app_state();
    let err = get_board(State(state), Path(Uuid::new_v4().to_string()))
        .await
        .err()
        .expect("unknown board should be an error");
    assert_eq!(err.0, StatusCode::NOT_FOUND);
    assert_eq!(err.1.0["error"], "Board not found");
}

#[tokio::test]
async fn get_malformed_id_reads_as_unknown_board() {
    let state = test_helpers::test_app_state();
    let err = get_board(State(state), Path("not-a-uuid".into()))
        .await
        .err()
        .expect("malformed id should be an error");
    assert_eq!(err.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_reports_previews_as_data_urls() {
    let state = test_helpers::test_app_state();
    test_helpers::seed_board(&state, "Listed").await;

    let listings = list_boards(State(state)).await;

    assert_eq!(listings.0.len(), 1);
    assert_eq!(listings.0[0].name, "Listed");
    assert!(listings.0[0].preview.starts_with("data:image/png;base64,"));
}

#[tokio::test]
async fn get_reflects_appended_segments() {
    let state = test_helpers::test_app_state();
    let segments = vec![test_helpers::dummy_segment()];
    let board_id = test_helpers::seed_board_with_segments(&state, "Drawn", segments.clone()).await;

    let detail = get_board(State(state), Path(board_id.to_string()))
        .await
        .expect("board should exist");
    assert_eq!(detail.0.segments, segments);
}

#[tokio::test]
async fn create_at_capacity_returns_503() {
    let state = test_helpers::test_app_state_with_limits(StoreLimits { max_boards: 1, max_segments_per_board: 16 });

    create_board(State(state.clone()), None).await.expect("first create should succeed");
    let err = create_board(State(state), None)
        .await
        .err()
        .expect("second create should hit the cap");

    assert_eq!(err.0, StatusCode::SERVICE_UNAVAILABLE);
}
