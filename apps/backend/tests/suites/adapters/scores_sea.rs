use proptest::prelude::*;
use walls_backend::adapters::scores_sea::{self, ScoreCreate};
use walls_backend::db::require_db;
use walls_backend::errors::domain::{ConflictKind, DomainError};
use walls_backend::repos::scores::{self, NewScore, MAX_PLAYER_NAME_CHARS};
use walls_backend::AppError;

use crate::common::proptest_prelude::proptest_prelude_config;
use crate::support::build_test_state;

fn new_score(level_id: i64, score: i32) -> NewScore {
    NewScore {
        level_id,
        player_name: None,
        score,
        passed: score > 0,
    }
}

#[tokio::test]
async fn test_adapter_insert_stamps_created_at() -> Result<(), AppError> {
    let state = build_test_state().await?;
    let db = require_db(&state)?;

    let before = time::OffsetDateTime::now_utc();
    let row = scores_sea::create_score(
        db,
        ScoreCreate {
            level_id: 1,
            player_name: Some("Mo".into()),
            score: 3,
            passed: false,
        },
    )
    .await?;

    assert!(row.id > 0);
    assert_eq!(row.player_name.as_deref(), Some("Mo"));
    assert!(row.created_at >= before - time::Duration::seconds(1));
    Ok(())
}

#[tokio::test]
async fn test_ranked_query_respects_limit_and_level() -> Result<(), AppError> {
    let state = build_test_state().await?;
    let db = require_db(&state)?;

    for s in [5, 1, 9] {
        scores::create_score(db, new_score(1, s)).await?;
    }

    let top = scores_sea::find_ranked_by_level(db, 1, 2).await?;
    assert_eq!(top.iter().map(|r| r.score).collect::<Vec<_>>(), vec![9, 5]);

    assert!(scores_sea::find_ranked_by_level(db, 2, 10).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_orphan_score_is_foreign_key_conflict() -> Result<(), AppError> {
    let state = build_test_state().await?;
    let db = require_db(&state)?;

    let err = scores::create_score(db, new_score(404, 1))
        .await
        .unwrap_err();
    assert!(
        matches!(err, DomainError::Conflict(ConflictKind::ForeignKey, _)),
        "unexpected error {err:?}"
    );
    Ok(())
}

#[tokio::test]
async fn test_overlong_player_name_is_rejected_before_insert() -> Result<(), AppError> {
    let state = build_test_state().await?;
    let db = require_db(&state)?;

    let mut score = new_score(1, 1);
    score.player_name = Some("x".repeat(MAX_PLAYER_NAME_CHARS + 1));
    let err = scores::create_score(db, score).await.unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));

    assert!(scores::list_scores_by_level(db, 1, 20).await?.is_empty());
    Ok(())
}

proptest! {
    #![proptest_config(proptest_prelude_config())]

    /// Higher scores come first; equal scores list the later submission first.
    #[test]
    fn prop_scores_are_ranked(values in proptest::collection::vec(-50i32..50, 1..12)) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let (ids_in_order, listed) = rt.block_on(async {
            let state = build_test_state().await.unwrap();
            let db = require_db(&state).unwrap();

            let mut inserted = Vec::new();
            for v in &values {
                let row = scores::create_score(db, new_score(1, *v)).await.unwrap();
                inserted.push(row);
            }
            let listed = scores::list_scores_by_level(db, 1, 100).await.unwrap();
            (inserted, listed)
        });

        prop_assert_eq!(listed.len(), values.len());
        for pair in listed.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            prop_assert!(a.score >= b.score);
            if a.score == b.score {
                // Later submission has the larger id
                prop_assert!(a.id > b.id);
            }
        }

        let mut expected: Vec<i32> = ids_in_order.iter().map(|s| s.score).collect();
        expected.sort_unstable_by(|a, b| b.cmp(a));
        let got: Vec<i32> = listed.iter().map(|s| s.score).collect();
        prop_assert_eq!(got, expected);
    }
}
