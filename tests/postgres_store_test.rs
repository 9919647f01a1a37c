//! Runs against a real database: `DATABASE_URL=... cargo test -- --ignored`.

use std::sync::Arc;

use quiz_backend::{
    database::pool::{create_pool, run_migrations},
    error::Error,
    models::{question::Difficulty, user_response::NewUserResponse},
    store::{
        CatalogStore, NewAnswer, NewQuestion, NewUser, PgStore, QuestionFilter, QuestionStore,
        ResponseLedger, UserStore,
    },
};

async fn store() -> PgStore {
    dotenvy::dotenv().ok();
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for ignored tests");
    let pool = create_pool(&url, 10).await.expect("pool");
    run_migrations(&pool).await.expect("migrations");
    PgStore::new(pool)
}

fn unique(prefix: &str) -> String {
    format!("{}_{}", prefix, rand::random::<u32>())
}

async fn seed_question(store: &PgStore) -> (i64, i64, i64) {
    let category = store.create_category(&unique("cat")).await.expect("category");
    let created = store
        .create_question(NewQuestion {
            text: "What is 2 + 2?".to_string(),
            difficulty: Difficulty::Easy,
            explanation: Some("Arithmetic.".to_string()),
            category_id: category.id,
            answers: vec![
                NewAnswer { text: "4".to_string(), is_correct: true },
                NewAnswer { text: "5".to_string(), is_correct: false },
            ],
        })
        .await
        .expect("question");
    let correct = created.answers.iter().find(|a| a.is_correct).unwrap().id;
    (category.id, created.question.id, correct)
}

async fn seed_user(store: &PgStore) -> i64 {
    let name = unique("player");
    store
        .create_user(NewUser {
            email: format!("{}@example.com", name),
            username: name,
            password_hash: "not-a-real-hash".to_string(),
        })
        .await
        .expect("user")
        .id
}

async fn response_rows(store: &PgStore, user_id: i64) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM user_responses WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(store.pool())
        .await
        .expect("count")
}

#[tokio::test]
#[ignore]
async fn failed_submission_rolls_back_everything() {
    let store = store().await;
    let (_, qid, correct) = seed_question(&store).await;
    let user_id = seed_user(&store).await;

    let responses = vec![
        NewUserResponse { question_id: qid, answer_id: Some(correct), is_correct: true },
        NewUserResponse { question_id: i64::MAX, answer_id: None, is_correct: false },
    ];
    let err = store.record_submission(user_id, &responses, 1).await;
    assert!(err.is_err());

    let user = store.find_user(user_id).await.unwrap().unwrap();
    assert_eq!((user.total_score, user.games_played), (0, 0));
    assert_eq!(response_rows(&store, user_id).await, 0);
}

#[tokio::test]
#[ignore]
async fn unknown_user_is_not_found() {
    let store = store().await;
    let (_, qid, correct) = seed_question(&store).await;
    let responses = vec![NewUserResponse {
        question_id: qid,
        answer_id: Some(correct),
        is_correct: true,
    }];
    let err = store.record_submission(i64::MAX, &responses, 1).await;
    assert!(matches!(err, Err(Error::NotFound(_))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn concurrent_submissions_do_not_lose_updates() {
    let store = Arc::new(store().await);
    let (_, qid, correct) = seed_question(&store).await;
    let user_id = seed_user(&store).await;

    let mut handles = Vec::new();
    for _ in 0..20 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            let responses = vec![NewUserResponse {
                question_id: qid,
                answer_id: Some(correct),
                is_correct: true,
            }];
            store.record_submission(user_id, &responses, 1).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().expect("submission");
    }

    let user = store.find_user(user_id).await.unwrap().unwrap();
    assert_eq!((user.total_score, user.games_played), (20, 20));
    assert_eq!(response_rows(&store, user_id).await, 20);
}

#[tokio::test]
#[ignore]
async fn answer_keys_and_playable_filter() {
    let store = store().await;
    let (category_id, qid, correct) = seed_question(&store).await;

    let keys = store.answer_keys(&[qid]).await.unwrap();
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0].correct_answer_id, correct);
    assert_eq!(keys[0].answer_ids.len(), 2);

    let filter = QuestionFilter {
        category_id: Some(category_id),
        difficulty: Some(Difficulty::Easy),
    };
    assert_eq!(store.find_questions(filter).await.unwrap().len(), 1);

    let err = store
        .create_answer(qid, NewAnswer { text: "four".to_string(), is_correct: true })
        .await;
    assert!(matches!(err, Err(Error::Conflict(_))));

    let tallies_user = seed_user(&store).await;
    store
        .record_submission(
            tallies_user,
            &[NewUserResponse { question_id: qid, answer_id: Some(correct), is_correct: true }],
            1,
        )
        .await
        .unwrap();
    let tallies = store.response_tallies(tallies_user).await.unwrap();
    assert_eq!(tallies.len(), 1);
    assert_eq!((tallies[0].total, tallies[0].correct), (1, 1));
    assert_eq!(tallies[0].difficulty, Difficulty::Easy);
}
