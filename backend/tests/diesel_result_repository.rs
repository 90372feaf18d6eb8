//! `DieselResultRepository` against embedded PostgreSQL.
//!
//! Resubmitting an attempt must overwrite the row keyed by
//! `(user_id, test_key)` rather than add a second one.

use edulens::domain::UserId;
use edulens::domain::ports::ResultRepository;
use edulens::domain::results::{NewQuizResult, WordEntry};
use edulens::outbound::persistence::{DbPool, DieselResultRepository, PoolConfig, run_migrations};
use pg_embedded_setup_unpriv::TestCluster;
use rstest::{fixture, rstest};
use tokio::runtime::Runtime;

#[path = "support/pg_embed.rs"]
mod pg_embed;

use pg_embed::{handle_cluster_setup_failure, reset_database, test_cluster};

const TEST_DB: &str = "diesel_result_repo_test";

struct TestContext {
    runtime: Runtime,
    _cluster: TestCluster,
    repository: DieselResultRepository,
}

fn setup_context() -> Result<TestContext, String> {
    let runtime = Runtime::new().map_err(|err| err.to_string())?;
    let cluster = test_cluster()?;
    reset_database(&cluster, TEST_DB)?;
    let database_url = cluster.connection().database_url(TEST_DB);
    runtime
        .block_on(run_migrations(&database_url))
        .map_err(|err| err.to_string())?;

    let config = PoolConfig::new(&database_url)
        .with_max_size(2)
        .with_min_idle(Some(1));
    let pool = runtime
        .block_on(async { DbPool::new(config).await })
        .map_err(|err| err.to_string())?;

    Ok(TestContext {
        runtime,
        _cluster: cluster,
        repository: DieselResultRepository::new(pool),
    })
}

#[fixture]
fn repo_context() -> Option<TestContext> {
    match setup_context() {
        Ok(ctx) => Some(ctx),
        Err(reason) => handle_cluster_setup_failure(reason),
    }
}

fn word(word_number: i32, word: &str) -> WordEntry {
    WordEntry {
        word_number,
        word: word.to_owned(),
        meaning: String::new(),
    }
}

fn attempt(user_id: &UserId, test_key: &str) -> NewQuizResult {
    NewQuizResult {
        user_id: *user_id,
        selected_text: "target1900".to_owned(),
        unit: Some("Part 1".to_owned()),
        start_num: Some(1),
        end_num: Some(20),
        total: 20,
        correct: 15,
        incorrect_count: 5,
        incorrect_words: vec![word(3, "abandon"), word(7, "acquire")],
        correct_words: vec![word(1, "accept")],
        test_key: test_key.to_owned(),
        mode: Some("word-to-meaning".to_owned()),
    }
}

#[rstest]
fn resubmitting_an_attempt_overwrites_the_row(repo_context: Option<TestContext>) {
    let Some(context) = repo_context else {
        eprintln!("SKIP-TEST-CLUSTER: resubmitting_an_attempt_overwrites_the_row skipped");
        return;
    };
    let repository = context.repository.clone();
    let user_id = UserId::random();
    let first_attempt = attempt(&user_id, "attempt-1");

    let first = context
        .runtime
        .block_on(async { repository.upsert(&first_attempt).await })
        .expect("first submission");

    let corrected = NewQuizResult {
        correct: 18,
        incorrect_count: 2,
        incorrect_words: vec![word(7, "acquire")],
        mode: Some("meaning-to-word".to_owned()),
        ..first_attempt.clone()
    };
    let second = context
        .runtime
        .block_on(async { repository.upsert(&corrected).await })
        .expect("resubmission");

    assert_eq!(second.id, first.id);
    assert_eq!(second.created_at, first.created_at);

    let stored = context
        .runtime
        .block_on(async { repository.list_for_user(&user_id).await })
        .expect("list results");
    assert_eq!(stored.len(), 1);
    let row = &stored[0];
    assert_eq!(row.id, first.id);
    assert_eq!(row.correct, 18);
    assert_eq!(row.incorrect_count, 2);
    assert_eq!(row.incorrect_words, vec![word(7, "acquire")]);
    assert_eq!(row.correct_words, first_attempt.correct_words);
    assert_eq!(row.mode.as_deref(), Some("meaning-to-word"));
}

#[rstest]
fn distinct_attempts_are_listed_newest_first(repo_context: Option<TestContext>) {
    let Some(context) = repo_context else {
        eprintln!("SKIP-TEST-CLUSTER: distinct_attempts_are_listed_newest_first skipped");
        return;
    };
    let repository = context.repository.clone();
    let user_id = UserId::random();
    let other_user = UserId::random();

    for (owner, key) in [
        (&user_id, "attempt-1"),
        (&user_id, "attempt-2"),
        (&other_user, "attempt-1"),
    ] {
        let submission = attempt(owner, key);
        context
            .runtime
            .block_on(async { repository.upsert(&submission).await })
            .expect("submission");
    }

    let stored = context
        .runtime
        .block_on(async { repository.list_for_user(&user_id).await })
        .expect("list results");
    let keys: Vec<&str> = stored.iter().map(|row| row.test_key.as_str()).collect();
    assert_eq!(keys, ["attempt-2", "attempt-1"]);
}
