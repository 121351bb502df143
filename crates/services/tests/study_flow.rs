use std::fs;

use koda_core::grading::{Grade, QuizMode};
use koda_core::model::{LearnerId, LessonId, ProgramId};
use koda_core::navigation::{NavError, NavEvent};
use koda_core::time::fixed_now;
use services::{AppServices, Clock, LessonDraft, QuizDraft, StudyError};

async fn catalog(services: &AppServices) -> (ProgramId, Vec<LessonId>) {
    let program_id = services
        .program_service()
        .create_program("Mathématiques 3ᵉ".to_string(), None, None)
        .await
        .expect("create program");

    let mut lesson_ids = Vec::new();
    for (module, titles) in [
        ("Nombres et calculs", ["Les fractions", "Les décimaux"]),
        ("Géométrie plane", ["Angles", "Triangles"]),
    ] {
        let module_id = services
            .module_service()
            .create_module(program_id, module.to_string(), None)
            .await
            .expect("create module");
        for title in titles {
            let draft = LessonDraft::new(title)
                .with_video("https://youtu.be/dQw4w9WgXcQ")
                .with_question(QuizDraft::new(format!("{title} ?"), "oui, non", "oui"));
            let id = services
                .lesson_service()
                .create_lesson(module_id, draft)
                .await
                .expect("create lesson");
            lesson_ids.push(id);
        }
    }
    (program_id, lesson_ids)
}

fn ada() -> LearnerId {
    LearnerId::parse("ada").expect("learner")
}

#[tokio::test]
async fn study_flow_gates_and_persists_progress() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = "sqlite:file:memdb_study_flow?mode=memory&cache=shared";
    let services = AppServices::new_sqlite(db, dir.path(), Clock::fixed(fixed_now()))
        .await
        .expect("services");
    let (program_id, ids) = catalog(&services).await;

    let mut session = services
        .start_study(program_id, ada(), QuizMode::Immediate)
        .await
        .expect("start study");
    assert_eq!(session.view_state().selected(), Some(ids[0]));
    assert!(matches!(
        session.select_lesson(ids[2]),
        Err(StudyError::Nav(NavError::Locked(_)))
    ));

    assert_eq!(
        session.answer(0, "oui").expect("answer"),
        Some(Grade { is_correct: true })
    );
    session.complete_and_advance().expect("advance");
    session.complete_and_advance().expect("advance into geometry");
    let outline = session.outline();
    assert!(outline.modules[1].open);
    assert!(!outline.modules[0].open);
    assert_eq!(outline.progress.completed, 2);

    let services = AppServices::new_sqlite(db, dir.path(), Clock::fixed(fixed_now()))
        .await
        .expect("reopen services");
    let mut session = services
        .start_study(program_id, ada(), QuizMode::Immediate)
        .await
        .expect("restart study");
    assert_eq!(session.progress().completed, 2);
    session.select_lesson(ids[2]).expect("unlocked by saved progress");

    let other = services
        .start_study(program_id, LearnerId::parse("bob").expect("learner"), QuizMode::Immediate)
        .await
        .expect("other learner");
    assert_eq!(other.progress().completed, 0);
}

#[tokio::test]
async fn leaving_a_lesson_resets_its_quiz() {
    let services = AppServices::in_memory(Clock::fixed(fixed_now()));
    let (program_id, ids) = catalog(&services).await;
    let mut session = services
        .start_study(program_id, ada(), QuizMode::Deferred)
        .await
        .expect("start study");

    assert_eq!(session.answer(0, "non").expect("answer"), None);
    assert!(!session.lesson_view().expect("view").questions[0].revealed);
    let score = session.submit_quiz().expect("submit");
    assert_eq!(score.correct, 0);

    session.mark_complete().expect("complete");
    session.advance().expect("advance");
    let first_module = session.course().sequence().module_of(ids[0]).expect("module");
    assert_eq!(
        session.back().expect("back"),
        NavEvent::Selected {
            lesson: ids[0],
            module: first_module,
        }
    );

    let view = session.lesson_view().expect("view");
    assert_eq!(view.questions[0].selected, None);
    assert_eq!(view.score, None);
    assert!(view.completed);
}

#[tokio::test]
async fn corrupt_progress_file_starts_fresh() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = "sqlite:file:memdb_study_corrupt?mode=memory&cache=shared";
    let services = AppServices::new_sqlite(db, dir.path(), Clock::fixed(fixed_now()))
        .await
        .expect("services");
    let (program_id, ids) = catalog(&services).await;

    let file = dir
        .path()
        .join(format!("progress%3Aada%3A{}.json", program_id.value()));
    fs::write(&file, "{not json").expect("write corrupt file");

    let mut session = services
        .start_study(program_id, ada(), QuizMode::Immediate)
        .await
        .expect("start study");
    assert_eq!(session.progress().completed, 0);

    session.mark_complete().expect("complete");
    let saved = fs::read_to_string(&file).expect("progress rewritten");
    assert_eq!(saved, format!(r#"{{"{}":true}}"#, ids[0].value()));
}

#[tokio::test]
async fn accented_learner_names_keep_separate_progress() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = "sqlite:file:memdb_study_accents?mode=memory&cache=shared";
    let services = AppServices::new_sqlite(db, dir.path(), Clock::fixed(fixed_now()))
        .await
        .expect("services");
    let (program_id, ids) = catalog(&services).await;

    let mut elodie = services
        .start_study(program_id, LearnerId::parse("élodie").expect("learner"), QuizMode::Immediate)
        .await
        .expect("start study");
    elodie.mark_complete().expect("complete");

    for name in ["àlodie", "_lodie", "%C3%A9lodie"] {
        let mut other = services
            .start_study(program_id, LearnerId::parse(name).expect("learner"), QuizMode::Immediate)
            .await
            .expect("other learner");
        assert_eq!(other.progress().completed, 0, "{name} sees another learner's progress");
        assert!(matches!(
            other.select_lesson(ids[1]),
            Err(StudyError::Nav(NavError::Locked(_)))
        ));
    }
}
